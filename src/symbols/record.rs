//! Record framing shared by every pass over a symbol stream.
//!
//! A record is laid out as:
//!
//! ```text
//! u16 length      ; bytes following this field, kind tag included
//! u16 kind
//! ...             ; kind-specific body
//! ```
//!
//! [`scan_records`] walks `[position, limit)` record by record, handing each [`RecordHeader`]
//! to a callback. Whatever the callback consumes, the cursor is moved to the record's end
//! afterwards, unless the callback asks to resume at a declared `end` field instead. Procedure
//! and block records do that: their `end` points at the terminator of the nested range they
//! open, not at the end of the record itself.

use crate::{
    file::parser::Parser,
    symbols::kind::{SymbolKind, S_END},
    Error, Result,
};

/// Size of an `S_END` record: length field and kind tag
pub const END_RECORD_SIZE: usize = 4;

/// Where the scan continues once a record callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// Continue with the record following this one
    RecordEnd,
    /// Continue at an absolute position at or past this record's end
    At(usize),
}

/// Framing information of the record currently being dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Decoded kind tag
    pub kind: SymbolKind,
    /// Declared length, kind tag included
    pub length: u16,
    /// Position of the length field
    pub offset: usize,
    /// Position just past the record
    pub stop: usize,
}

impl RecordHeader {
    /// Fails unless the record is long enough for the fixed layout of its kind.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecordTooShort`] for truncated records.
    pub fn require_fixed_layout(&self) -> Result<()> {
        let minimum = self.kind.min_length();
        if self.length < minimum {
            return Err(Error::RecordTooShort {
                kind: self.kind,
                length: self.length,
                minimum,
                offset: self.offset,
            });
        }
        Ok(())
    }

    /// Validates the `end` field of a procedure or block record.
    ///
    /// The terminator at `end` must lie at or after this record's stop and fit entirely
    /// before `limit`, the exclusive end of the range holding the record.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidJump`] if `end` points into the record itself and
    /// [`crate::Error::EndOutOfRange`] if the terminator would cross `limit`.
    pub fn checked_end(&self, end: u32, limit: usize) -> Result<usize> {
        let end = end as usize;
        if end < self.stop {
            return Err(Error::InvalidJump {
                kind: self.kind,
                target: end,
                offset: self.offset,
            });
        }
        if end.saturating_add(END_RECORD_SIZE) > limit {
            return Err(Error::EndOutOfRange {
                kind: self.kind,
                end,
                limit,
                offset: self.offset,
            });
        }
        Ok(end)
    }
}

/// Walks the records in `[parser.pos(), limit)`, dispatching each one to `handler`.
///
/// The loop ends once the cursor reaches `limit`. Nothing at or past `limit` is read.
///
/// # Errors
/// Returns [`crate::Error::RecordOverrun`] for records extending past `limit`,
/// [`crate::Error::InvalidJump`] for resume targets inside the current record,
/// [`crate::Error::EndOutOfRange`] for resume targets past `limit`, and whatever `handler` or
/// the underlying reads fail with.
pub fn scan_records<'a, F>(parser: &mut Parser<'a>, limit: usize, mut handler: F) -> Result<()>
where
    F: FnMut(&mut Parser<'a>, &RecordHeader) -> Result<Resume>,
{
    while parser.pos() < limit {
        let offset = parser.pos();
        let length = parser.read_le::<u16>()?;
        let stop = parser.pos() + usize::from(length);
        let kind = SymbolKind::from(parser.read_le::<u16>()?);

        if stop > limit {
            return Err(Error::RecordOverrun {
                kind,
                stop,
                limit,
                offset,
            });
        }

        let header = RecordHeader {
            kind,
            length,
            offset,
            stop,
        };
        if length < 2 {
            header.require_fixed_layout()?;
        }

        match handler(parser, &header)? {
            Resume::RecordEnd => parser.seek(stop)?,
            Resume::At(target) => {
                if target < stop {
                    return Err(Error::InvalidJump {
                        kind,
                        target,
                        offset,
                    });
                }
                if target > limit {
                    return Err(Error::EndOutOfRange {
                        kind,
                        end: target,
                        limit,
                        offset,
                    });
                }
                parser.seek(target)?;
            }
        }
    }

    Ok(())
}

/// Verifies that a body scan stopped exactly at `end` and consumes the `S_END` found there.
///
/// `kind` names the procedure or block whose body was scanned, for error reporting.
///
/// # Errors
/// Returns [`crate::Error::NotAtEnd`] when the cursor is elsewhere, and
/// [`crate::Error::MissingEnd`] when the record at `end` is not a terminator.
pub fn expect_end(parser: &mut Parser<'_>, kind: SymbolKind, end: usize) -> Result<()> {
    if parser.pos() != end {
        return Err(Error::NotAtEnd {
            kind,
            expected: end,
            actual: parser.pos(),
        });
    }

    let _length = parser.read_le::<u16>()?;
    let raw_kind = parser.read_le::<u16>()?;
    if raw_kind != S_END {
        return Err(Error::MissingEnd {
            found: SymbolKind::from(raw_kind),
            offset: end,
        });
    }

    Ok(())
}
