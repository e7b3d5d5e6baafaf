//! CodeView record kinds understood by the managed symbol decoder.
//!
//! Every record of a module symbol stream starts with a 16-bit length followed by a 16-bit kind
//! tag. Only a handful of kinds matter for managed code; everything else maps to
//! [`SymbolKind::Unknown`], which keeps the raw tag so the record can be reported and skipped.
//!
//! # Reference
//! - [Microsoft PDB `cvinfo.h`](https://github.com/microsoft/microsoft-pdb/blob/master/include/cvinfo.h)

use std::fmt;

use strum::{AsRefStr, EnumIter};

/// `S_END` - terminates the body of a procedure or block
pub const S_END: u16 = 0x0006;
/// `S_OEM` - vendor-extension record carrying a GUID-tagged payload
pub const S_OEM: u16 = 0x0404;
/// `S_BLOCK32` - opens a nested lexical block
pub const S_BLOCK32: u16 = 0x1103;
/// `S_MANSLOT` - managed local variable slot
pub const S_MANSLOT: u16 = 0x1120;
/// `S_UNAMESPACE` - namespace imported by the enclosing scope
pub const S_UNAMESPACE: u16 = 0x1124;
/// `S_GMANPROC` - global managed procedure
pub const S_GMANPROC: u16 = 0x112A;
/// `S_LMANPROC` - local managed procedure
pub const S_LMANPROC: u16 = 0x112B;
/// `S_MANCONSTANT` - managed compile-time constant
pub const S_MANCONSTANT: u16 = 0x112D;

/// Closed set of record kinds with an explicit catch-all for everything else.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, AsRefStr, EnumIter)]
pub enum SymbolKind {
    /// `S_END` (0x0006)
    #[strum(serialize = "S_END")]
    End,
    /// `S_OEM` (0x0404)
    #[strum(serialize = "S_OEM")]
    Oem,
    /// `S_BLOCK32` (0x1103)
    #[strum(serialize = "S_BLOCK32")]
    Block32,
    /// `S_MANSLOT` (0x1120)
    #[strum(serialize = "S_MANSLOT")]
    ManagedSlot,
    /// `S_UNAMESPACE` (0x1124)
    #[strum(serialize = "S_UNAMESPACE")]
    UsingNamespace,
    /// `S_GMANPROC` (0x112A)
    #[strum(serialize = "S_GMANPROC")]
    GlobalManagedProc,
    /// `S_LMANPROC` (0x112B)
    #[strum(serialize = "S_LMANPROC")]
    LocalManagedProc,
    /// `S_MANCONSTANT` (0x112D)
    #[strum(serialize = "S_MANCONSTANT")]
    ManagedConstant,
    /// Any other record kind, carrying its raw tag
    #[strum(serialize = "S_UNKNOWN")]
    Unknown(u16),
}

impl SymbolKind {
    /// The raw 16-bit tag of this kind.
    #[must_use]
    pub fn raw(self) -> u16 {
        match self {
            SymbolKind::End => S_END,
            SymbolKind::Oem => S_OEM,
            SymbolKind::Block32 => S_BLOCK32,
            SymbolKind::ManagedSlot => S_MANSLOT,
            SymbolKind::UsingNamespace => S_UNAMESPACE,
            SymbolKind::GlobalManagedProc => S_GMANPROC,
            SymbolKind::LocalManagedProc => S_LMANPROC,
            SymbolKind::ManagedConstant => S_MANCONSTANT,
            SymbolKind::Unknown(raw) => raw,
        }
    }

    /// Returns `true` for the two managed procedure kinds.
    #[must_use]
    pub fn is_procedure(self) -> bool {
        matches!(
            self,
            SymbolKind::GlobalManagedProc | SymbolKind::LocalManagedProc
        )
    }

    /// Minimum record body length (kind tag included) the decoder needs for this kind.
    ///
    /// Covers the fixed-size part of each layout; trailing names are not included.
    #[must_use]
    pub fn min_length(self) -> u16 {
        match self {
            // kind + parent, end, next, len, dbgStart, dbgEnd, token, off + seg + flags + retReg
            SymbolKind::GlobalManagedProc | SymbolKind::LocalManagedProc => 2 + 32 + 2 + 1 + 2,
            // kind + parent, end, len, off + seg
            SymbolKind::Block32 => 2 + 16 + 2,
            // kind + index, typind, offCod + segCod + flags
            SymbolKind::ManagedSlot => 2 + 12 + 2 + 2,
            // kind + typind + numeric leaf tag
            SymbolKind::ManagedConstant => 2 + 4 + 2,
            // kind + GUID + type index
            SymbolKind::Oem => 2 + 16 + 4,
            SymbolKind::End | SymbolKind::UsingNamespace | SymbolKind::Unknown(_) => 2,
        }
    }
}

impl From<u16> for SymbolKind {
    fn from(raw: u16) -> Self {
        match raw {
            S_END => SymbolKind::End,
            S_OEM => SymbolKind::Oem,
            S_BLOCK32 => SymbolKind::Block32,
            S_MANSLOT => SymbolKind::ManagedSlot,
            S_UNAMESPACE => SymbolKind::UsingNamespace,
            S_GMANPROC => SymbolKind::GlobalManagedProc,
            S_LMANPROC => SymbolKind::LocalManagedProc,
            S_MANCONSTANT => SymbolKind::ManagedConstant,
            other => SymbolKind::Unknown(other),
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Unknown(raw) => write!(f, "S_UNKNOWN(0x{raw:04x})"),
            known => f.write_str(known.as_ref()),
        }
    }
}
