//! Lexical scopes and the recursive block decoder.
//!
//! An `S_BLOCK32` record opens a nested range of records which runs up to the `S_END` its
//! `end` field points at:
//!
//! ```text
//! u32 parent, u32 end, u32 length, u32 offset, u16 segment, name
//! ```
//!
//! Block offsets are absolute code offsets. Decoded scopes store them relative to the start of
//! the enclosing *function*, at every depth, so a child's address never depends on its parent.

use crate::{
    file::parser::Parser,
    symbols::{
        counts::SymbolCounts,
        kind::SymbolKind,
        locals::{PdbConstant, PdbSlot},
        record::{expect_end, scan_records, RecordHeader, Resume},
        token::Token,
    },
    Error, Result,
};

/// A lexical block of a managed function.
#[derive(Debug, Clone, PartialEq)]
pub struct PdbScope {
    /// Code segment
    pub segment: u16,
    /// Start of the scope, relative to the function's address
    pub address: u32,
    /// Size of the scope in bytes
    pub length: u32,
    /// Nested scopes, in encounter order
    pub scopes: Vec<PdbScope>,
    /// Local variables declared in this scope
    pub slots: Vec<PdbSlot>,
    /// Constants declared in this scope
    pub constants: Vec<PdbConstant>,
    /// Namespaces imported by this scope
    pub used_namespaces: Vec<String>,
}

impl PdbScope {
    /// Returns `true` if the function-relative `offset` lies inside this scope.
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        let start = u64::from(self.address);
        let end = start + u64::from(self.length);
        (start..end).contains(&u64::from(offset))
    }

    /// Depth-first iterator over every scope nested below this one.
    #[must_use]
    pub fn descendants(&self) -> ScopeIter<'_> {
        ScopeIter::new(&self.scopes)
    }

    /// Extends every nested scope by one byte, at any depth. This scope itself is left alone.
    pub(crate) fn extend_nested_scopes(&mut self) {
        for child in &mut self.scopes {
            child.length = child.length.saturating_add(1);
            child.extend_nested_scopes();
        }
    }
}

/// Depth-first, pre-order iterator over a scope forest.
pub struct ScopeIter<'a> {
    stack: Vec<&'a PdbScope>,
}

impl<'a> ScopeIter<'a> {
    pub(crate) fn new(roots: &'a [PdbScope]) -> Self {
        ScopeIter {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for ScopeIter<'a> {
    type Item = &'a PdbScope;

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.stack.pop()?;
        self.stack.extend(scope.scopes.iter().rev());
        Some(scope)
    }
}

/// Fixed part of an `S_BLOCK32` record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Offset of the enclosing procedure or block record
    pub parent: u32,
    /// Stream offset of the `S_END` closing this block
    pub end: u32,
    /// Size of the block in bytes
    pub length: u32,
    /// Absolute code offset of the block
    pub offset: u32,
    /// Code segment
    pub segment: u16,
}

impl BlockHeader {
    /// Read the fixed part of an `S_BLOCK32` record, skipping its name.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecordTooShort`] or [`crate::Error::OutOfBounds`] for truncated
    /// records.
    pub fn read(parser: &mut Parser<'_>, header: &RecordHeader) -> Result<BlockHeader> {
        header.require_fixed_layout()?;

        let block = BlockHeader {
            parent: parser.read_le::<u32>()?,
            end: parser.read_le::<u32>()?,
            length: parser.read_le::<u32>()?,
            offset: parser.read_le::<u32>()?,
            segment: parser.read_le::<u16>()?,
        };
        parser.skip_string_utf8();

        Ok(block)
    }
}

/// Result of decoding one block
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeDecode {
    /// The decoded scope with its whole subtree
    pub scope: PdbScope,
    /// Type token of the last slot seen while decoding the block, nested blocks included.
    ///
    /// A nested block's result replaces whatever was seen before it, so a trailing block
    /// without slots resets this to `None`.
    pub last_slot_type_token: Option<Token>,
}

/// Decodes the body of a block whose header has just been read.
///
/// The cursor must sit at the first record after the block record, and `block.end` must
/// already be checked against the enclosing range. On success the cursor sits right after the
/// block's `S_END`.
///
/// # Arguments
/// * `parser` - Cursor positioned at the block body
/// * `function_address` - Code offset of the enclosing function
/// * `block` - Header of the block record
/// * `depth` - Nesting depth of this block, 1 for blocks directly inside a procedure
/// * `max_depth` - Nesting limit
///
/// # Errors
/// Returns [`crate::Error::RecursionLimit`] if `depth` exceeds `max_depth`,
/// [`crate::Error::Malformed`] for blocks starting before their function, and the framing
/// errors of [`crate::symbols::record`].
pub fn decode_scope(
    parser: &mut Parser<'_>,
    function_address: u32,
    block: &BlockHeader,
    depth: usize,
    max_depth: usize,
) -> Result<ScopeDecode> {
    if depth > max_depth {
        return Err(Error::RecursionLimit(max_depth));
    }

    let address = block.offset.checked_sub(function_address).ok_or_else(|| {
        malformed_error!(
            "Block at code offset 0x{:x} starts before its function at 0x{:x}",
            block.offset,
            function_address
        )
    })?;

    let end = block.end as usize;
    let counts = SymbolCounts::measure(parser, end)?;

    let mut scopes = Vec::with_capacity(counts.scopes);
    let mut slots = Vec::with_capacity(counts.slots);
    let mut constants = Vec::with_capacity(counts.constants);
    let mut used_namespaces = Vec::with_capacity(counts.used_namespaces);
    let mut last_slot_type_token = None;

    scan_records(parser, end, |parser, header| {
        match header.kind {
            SymbolKind::Block32 => {
                let nested = BlockHeader::read(parser, header)?;
                header.checked_end(nested.end, end)?;
                parser.seek(header.stop)?;

                let decoded = decode_scope(parser, function_address, &nested, depth + 1, max_depth)?;
                last_slot_type_token = decoded.last_slot_type_token;
                scopes.push(decoded.scope);

                // The nested decode consumed the terminator as well
                return Ok(Resume::At(parser.pos()));
            }
            SymbolKind::ManagedSlot => {
                header.require_fixed_layout()?;
                let slot = PdbSlot::read(parser)?;
                last_slot_type_token = Some(slot.type_token);
                slots.push(slot);
            }
            SymbolKind::ManagedConstant => {
                header.require_fixed_layout()?;
                constants.push(PdbConstant::read(parser)?);
            }
            SymbolKind::UsingNamespace => {
                used_namespaces.push(parser.read_string_utf8()?);
            }
            _ => {}
        }
        Ok(Resume::RecordEnd)
    })?;

    expect_end(parser, SymbolKind::Block32, end)?;

    Ok(ScopeDecode {
        scope: PdbScope {
            segment: block.segment,
            address,
            length: block.length,
            scopes,
            slots,
            constants,
            used_namespaces,
        },
        last_slot_type_token,
    })
}
