//! Metadata tokens referenced by managed symbol records.
//!
//! Procedures carry the `MethodDef` token of the method they describe, slots carry the
//! `StandAloneSig` token of the local signature, and custom metadata links methods to each
//! other by token. The decoder never resolves them; they are handed out as [`Token`] values for
//! the caller to look up in the assembly's metadata.

use std::fmt;

/// `TypeDef` table id
pub const TABLE_TYPE_DEF: u8 = 0x02;
/// `MethodDef` table id
pub const TABLE_METHOD_DEF: u8 = 0x06;
/// `StandAloneSig` table id
pub const TABLE_STAND_ALONE_SIG: u8 = 0x11;

/// A metadata token as stored in managed CodeView records.
///
/// The high byte selects the metadata table, the low 24 bits the row. The value 0 stands for
/// "no token".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Creates a token from its raw value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Table id (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Row index (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the null token
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Name of the table this token points into, for the tables symbol records refer to.
    #[must_use]
    pub fn table_name(&self) -> Option<&'static str> {
        match self.table() {
            TABLE_TYPE_DEF => Some("TypeDef"),
            TABLE_METHOD_DEF => Some("MethodDef"),
            TABLE_STAND_ALONE_SIG => Some("StandAloneSig"),
            _ => None,
        }
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table_name() {
            Some(table) => write!(f, "Token({table}[{}])", self.row()),
            None => write!(f, "Token(0x{:08x})", self.0),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
