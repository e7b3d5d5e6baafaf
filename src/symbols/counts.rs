//! Measuring pass over a record range.
//!
//! Before a procedure or block body is materialized, [`SymbolCounts::measure`] walks the same
//! range once and tallies what the body directly contains. The decoder then sizes every
//! container from these counts, so no container grows past its first allocation.

use crate::{
    file::parser::Parser,
    symbols::{
        kind::SymbolKind,
        record::{scan_records, Resume},
    },
    Result,
};

/// Direct contents of one procedure or block body.
///
/// Nested blocks count as one scope each; what they contain is measured again when the
/// nested block itself is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolCounts {
    /// `S_BLOCK32` records
    pub scopes: usize,
    /// `S_MANSLOT` records
    pub slots: usize,
    /// `S_MANCONSTANT` records
    pub constants: usize,
    /// `S_UNAMESPACE` records
    pub used_namespaces: usize,
}

impl SymbolCounts {
    /// Tallies the records in `[parser.pos(), limit)` and restores the cursor afterwards.
    ///
    /// # Arguments
    /// * `parser` - Cursor positioned at the first record of the range
    /// * `limit` - Exclusive end of the range
    ///
    /// # Errors
    /// Returns the framing errors of [`crate::symbols::record::scan_records`],
    /// [`crate::Error::EndOutOfRange`] for blocks ending past `limit` and
    /// [`crate::Error::OutOfBounds`] for truncated block headers.
    pub fn measure(parser: &mut Parser<'_>, limit: usize) -> Result<SymbolCounts> {
        let start = parser.pos();
        let mut counts = SymbolCounts::default();

        let scanned = scan_records(parser, limit, |parser, header| {
            match header.kind {
                SymbolKind::Block32 => {
                    header.require_fixed_layout()?;
                    let _parent = parser.read_le::<u32>()?;
                    let end = header.checked_end(parser.read_le::<u32>()?, limit)?;

                    counts.scopes += 1;
                    return Ok(Resume::At(end));
                }
                SymbolKind::ManagedSlot => counts.slots += 1,
                SymbolKind::ManagedConstant => counts.constants += 1,
                SymbolKind::UsingNamespace => counts.used_namespaces += 1,
                _ => {}
            }
            Ok(Resume::RecordEnd)
        });

        parser.seek(start)?;
        scanned.map(|()| counts)
    }

    /// Returns `true` if the body holds slots, constants or used namespaces of its own.
    ///
    /// A procedure body with any of these gets a synthesized root scope.
    #[must_use]
    pub fn has_locals(&self) -> bool {
        self.slots > 0 || self.constants > 0 || self.used_namespaces > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::SymbolStreamBuilder, Error};

    #[test]
    fn test_measure_direct_contents() {
        let mut builder = SymbolStreamBuilder::new();
        builder
            .slot(0, 0x1100_0001, "a")
            .constant(0x0800_0008, 42, "K")
            .using_namespace("System")
            .using_namespace("System.Linq");
        let data = builder.finish();

        let mut parser = Parser::new(&data);
        let counts = SymbolCounts::measure(&mut parser, data.len()).unwrap();
        assert_eq!(
            counts,
            SymbolCounts {
                scopes: 0,
                slots: 1,
                constants: 1,
                used_namespaces: 2,
            }
        );
        assert!(counts.has_locals());
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn test_measure_skips_nested_block_contents() {
        let mut builder = SymbolStreamBuilder::new();
        builder.block(0x100, 0x10);
        builder.slot(0, 0x1100_0001, "inner").slot(1, 0x1100_0001, "inner2");
        builder.block(0x104, 0x4);
        builder.using_namespace("Deep");
        builder.end();
        builder.end();
        builder.block(0x110, 0x8);
        builder.end();
        let data = builder.finish();

        let mut parser = Parser::new(&data);
        let counts = SymbolCounts::measure(&mut parser, data.len()).unwrap();
        assert_eq!(counts.scopes, 2);
        assert_eq!(counts.slots, 0);
        assert_eq!(counts.used_namespaces, 0);
        assert!(!counts.has_locals());
    }

    #[test]
    fn test_measure_restores_cursor_on_error() {
        // S_MANSLOT claiming more bytes than available
        let data = [0x00, 0x00, 0x30, 0x00, 0x20, 0x11];
        let mut parser = Parser::new(&data);
        parser.seek(2).unwrap();

        assert!(SymbolCounts::measure(&mut parser, data.len()).is_err());
        assert_eq!(parser.pos(), 2);
    }

    #[test]
    fn test_measure_rejects_block_ending_past_range() {
        let mut builder = SymbolStreamBuilder::new();
        builder.block(0x100, 0x10).slot(0, 0x1100_0001, "a").end();
        let data = builder.finish();

        // Cut the range right before the block's S_END
        let limit = data.len() - 4;
        let mut parser = Parser::new(&data);
        assert!(matches!(
            SymbolCounts::measure(&mut parser, limit),
            Err(Error::EndOutOfRange {
                kind: SymbolKind::Block32,
                ..
            })
        ));
        assert_eq!(parser.pos(), 0);
    }

    #[test]
    fn test_measure_empty_range() {
        let data = [0x02, 0x00, 0x06, 0x00];
        let mut parser = Parser::new(&data);
        let counts = SymbolCounts::measure(&mut parser, 0).unwrap();
        assert_eq!(counts, SymbolCounts::default());
    }
}
