//! Local variable slots and constants.
//!
//! Both record kinds appear directly inside procedure and block bodies:
//!
//! ```text
//! S_MANSLOT      u32 slot, u32 type token, u32 code offset, u16 code segment, u16 flags, name
//! S_MANCONSTANT  u32 type token, numeric leaf, name
//! ```
//!
//! Names are null-terminated UTF-8. The readers below expect the cursor right after the
//! record's kind tag; the caller moves the cursor to the end of the record afterwards.

use bitflags::bitflags;

use crate::{file::parser::Parser, symbols::token::Token, Result};

/// `LF_CHAR` numeric leaf
pub const LF_CHAR: u16 = 0x8000;
/// `LF_SHORT` numeric leaf
pub const LF_SHORT: u16 = 0x8001;
/// `LF_USHORT` numeric leaf
pub const LF_USHORT: u16 = 0x8002;
/// `LF_LONG` numeric leaf
pub const LF_LONG: u16 = 0x8003;
/// `LF_ULONG` numeric leaf
pub const LF_ULONG: u16 = 0x8004;
/// `LF_REAL32` numeric leaf
pub const LF_REAL32: u16 = 0x8005;
/// `LF_REAL64` numeric leaf
pub const LF_REAL64: u16 = 0x8006;
/// `LF_QUADWORD` numeric leaf
pub const LF_QUADWORD: u16 = 0x8009;
/// `LF_UQUADWORD` numeric leaf
pub const LF_UQUADWORD: u16 = 0x800A;
/// `LF_VARSTRING` numeric leaf
pub const LF_VARSTRING: u16 = 0x8010;
/// `LF_DECIMAL` numeric leaf
pub const LF_DECIMAL: u16 = 0x8019;

bitflags! {
    /// Local variable flags (`CV_LVARFLAGS`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SlotFlags: u16 {
        /// Variable is a parameter
        const PARAM = 0x0001;
        /// Address is taken
        const ADDRESS_TAKEN = 0x0002;
        /// Variable is compiler generated
        const COMPILER_GENERATED = 0x0004;
        /// The symbol is splitted in temporaries
        const AGGREGATE = 0x0008;
        /// Variable is part of an aggregate
        const AGGREGATED = 0x0010;
        /// Variable has multiple simultaneous lifetimes
        const ALIASED = 0x0020;
        /// Represents one of the multiple simultaneous lifetimes
        const ALIAS = 0x0040;
        /// Represents a function return value
        const RETURN_VALUE = 0x0080;
        /// Variable has no lifetimes
        const OPTIMIZED_OUT = 0x0100;
        /// Variable is an enregistered global
        const ENREGISTERED_GLOBAL = 0x0200;
        /// Variable is an enregistered static
        const ENREGISTERED_STATIC = 0x0400;
    }
}

/// A managed local variable (`S_MANSLOT`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdbSlot {
    /// Index of the local in the method's local signature
    pub slot: u32,
    /// Token of the `StandAloneSig` describing the locals
    pub type_token: Token,
    /// Code offset of the variable's live range
    pub address: u32,
    /// Code segment of the variable's live range
    pub segment: u16,
    /// Variable flags
    pub flags: SlotFlags,
    /// Variable name
    pub name: String,
}

impl PdbSlot {
    /// Read the body of an `S_MANSLOT` record.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated records or
    /// [`crate::Error::Malformed`] for names that are not valid UTF-8.
    pub fn read(parser: &mut Parser<'_>) -> Result<PdbSlot> {
        Ok(PdbSlot {
            slot: parser.read_le::<u32>()?,
            type_token: Token::new(parser.read_le::<u32>()?),
            address: parser.read_le::<u32>()?,
            segment: parser.read_le::<u16>()?,
            flags: SlotFlags::from_bits_retain(parser.read_le::<u16>()?),
            name: parser.read_string_utf8()?,
        })
    }
}

/// Value of a managed constant, as stored in its numeric leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    /// `LF_CHAR`
    Char(i8),
    /// `LF_SHORT`
    Short(i16),
    /// `LF_USHORT`, and values below `0x8000` stored without a leaf tag
    UShort(u16),
    /// `LF_LONG`
    Long(i32),
    /// `LF_ULONG`
    ULong(u32),
    /// `LF_REAL32`
    Real32(f32),
    /// `LF_REAL64`
    Real64(f64),
    /// `LF_QUADWORD`
    QuadWord(i64),
    /// `LF_UQUADWORD`
    UQuadWord(u64),
    /// `LF_VARSTRING`
    VarString(String),
    /// `LF_DECIMAL`, the 16 raw bytes of a `System.Decimal`
    Decimal([u8; 16]),
}

impl ConstantValue {
    /// Read a numeric leaf.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for unknown leaf tags and
    /// [`crate::Error::OutOfBounds`] for truncated values.
    pub fn read(parser: &mut Parser<'_>) -> Result<ConstantValue> {
        let offset = parser.pos();
        let tag = parser.read_le::<u16>()?;
        if tag < LF_CHAR {
            return Ok(ConstantValue::UShort(tag));
        }

        Ok(match tag {
            LF_CHAR => ConstantValue::Char(parser.read_le::<i8>()?),
            LF_SHORT => ConstantValue::Short(parser.read_le::<i16>()?),
            LF_USHORT => ConstantValue::UShort(parser.read_le::<u16>()?),
            LF_LONG => ConstantValue::Long(parser.read_le::<i32>()?),
            LF_ULONG => ConstantValue::ULong(parser.read_le::<u32>()?),
            LF_REAL32 => ConstantValue::Real32(parser.read_le::<f32>()?),
            LF_REAL64 => ConstantValue::Real64(parser.read_le::<f64>()?),
            LF_QUADWORD => ConstantValue::QuadWord(parser.read_le::<i64>()?),
            LF_UQUADWORD => ConstantValue::UQuadWord(parser.read_le::<u64>()?),
            LF_VARSTRING => {
                let length = parser.read_le::<u16>()?;
                let bytes = parser.read_bytes(usize::from(length))?;
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    malformed_error!("Invalid LF_VARSTRING at offset {}: {}", offset, e)
                })?;
                ConstantValue::VarString(value)
            }
            LF_DECIMAL => {
                let mut raw = [0u8; 16];
                raw.copy_from_slice(parser.read_bytes(16)?);
                ConstantValue::Decimal(raw)
            }
            _ => {
                return Err(malformed_error!(
                    "Unknown numeric leaf 0x{:04x} at offset {}",
                    tag,
                    offset
                ))
            }
        })
    }
}

/// A managed compile-time constant (`S_MANCONSTANT`)
#[derive(Debug, Clone, PartialEq)]
pub struct PdbConstant {
    /// Type token of the constant
    pub type_token: Token,
    /// Decoded value
    pub value: ConstantValue,
    /// Constant name
    pub name: String,
}

impl PdbConstant {
    /// Read the body of an `S_MANCONSTANT` record.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated records or
    /// [`crate::Error::Malformed`] for unknown leaves and invalid names.
    pub fn read(parser: &mut Parser<'_>) -> Result<PdbConstant> {
        Ok(PdbConstant {
            type_token: Token::new(parser.read_le::<u32>()?),
            value: ConstantValue::read(parser)?,
            name: parser.read_string_utf8()?,
        })
    }
}
