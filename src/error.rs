use thiserror::Error;

use crate::symbols::SymbolKind;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant is fatal for the module being decoded: CodeView symbol streams are either
/// well-formed compiler output or untrustworthy, so the decoder stops at the first fault and
/// never hands out partial results. Unknown record kinds and unknown custom metadata items are
/// *not* errors, they are skipped by their declared length.
///
/// # Error Categories
///
/// ## Byte Access Errors
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the buffer
/// - [`Error::Malformed`] - Generic structural fault with source location
///
/// ## Record Framing Errors
/// - [`Error::RecordTooShort`] - A record is shorter than its fixed layout
/// - [`Error::RecordOverrun`] - A record extends past the range that contains it
/// - [`Error::InvalidJump`] - A declared `end` field does not move forward
/// - [`Error::EndOutOfRange`] - A declared `end` field leaves no room for its terminator
/// - [`Error::NotAtEnd`] - The scan of a procedure or block did not land on its terminator
/// - [`Error::MissingEnd`] - The terminator position holds some other record
///
/// ## Procedure Errors
/// - [`Error::InvalidSegment`] - A managed procedure lives in a segment other than 1
/// - [`Error::UnexpectedProcedureLink`] - A managed procedure has a parent or next link
/// - [`Error::UnknownOemGuid`] - A vendor-extension record carries an unrecognized GUID
/// - [`Error::RecursionLimit`] - Blocks are nested deeper than the configured limit
///
/// # Examples
///
/// ```rust
/// use pdbscope::{Error, Parser, symbols::{decode_module_functions, DecodeOptions}};
///
/// // A single record which claims to run past the end of the buffer
/// let data = [0x40, 0x00, 0x2B, 0x11];
/// let mut parser = Parser::new(&data);
///
/// match decode_module_functions("Program", &mut parser, data.len(), DecodeOptions::default()) {
///     Ok(_) => println!("decoded"),
///     Err(Error::RecordOverrun { kind, stop, limit, .. }) => {
///         println!("{kind} ends at {stop}, but the module ends at {limit}");
///     }
///     Err(e) => println!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the stream.
    #[error("Out of Bound read would have occurred - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A record declares fewer bytes than its fixed layout requires.
    #[error("{kind} record at {offset:#x} is {length} bytes long, at least {minimum} are required")]
    RecordTooShort {
        /// Kind of the offending record
        kind: SymbolKind,
        /// Declared length of the record body (kind tag included)
        length: u16,
        /// Minimum body length for this kind
        minimum: u16,
        /// Position of the record's length field
        offset: usize,
    },

    /// A record ends beyond the range which is supposed to contain it.
    #[error("{kind} record at {offset:#x} ends at {stop:#x}, past the range limit {limit:#x}")]
    RecordOverrun {
        /// Kind of the offending record
        kind: SymbolKind,
        /// Computed end of the record
        stop: usize,
        /// Exclusive limit of the enclosing range
        limit: usize,
        /// Position of the record's length field
        offset: usize,
    },

    /// A procedure or block `end` field points back into the record itself.
    #[error("{kind} record at {offset:#x} declares its end at {target:#x}")]
    InvalidJump {
        /// Kind of the offending record
        kind: SymbolKind,
        /// Declared end position
        target: usize,
        /// Position of the record's length field
        offset: usize,
    },

    /// A procedure or block `end` field puts its terminator outside the enclosing range.
    #[error("{kind} record at {offset:#x} declares its end at {end:#x}, past the range limit {limit:#x}")]
    EndOutOfRange {
        /// Kind of the offending record
        kind: SymbolKind,
        /// Declared end position
        end: usize,
        /// Exclusive limit of the enclosing range
        limit: usize,
        /// Position of the record's length field
        offset: usize,
    },

    /// The scan of a procedure or block body did not land on its declared end.
    #[error("Not at S_END for {kind}: expected {expected:#x}, cursor at {actual:#x}")]
    NotAtEnd {
        /// Kind of the record whose body was scanned
        kind: SymbolKind,
        /// Declared end position (location of the terminator record)
        expected: usize,
        /// Actual cursor position after the scan
        actual: usize,
    },

    /// The record at a declared end position is not a terminator.
    #[error("Missing S_END at {offset:#x}, found {found}")]
    MissingEnd {
        /// Kind of the record found instead
        found: SymbolKind,
        /// Position of the record
        offset: usize,
    },

    /// A managed procedure is located in a segment other than 1.
    #[error("Segment is {segment}, not 1 (procedure at {offset:#x})")]
    InvalidSegment {
        /// The segment found in the record
        segment: u16,
        /// Position of the procedure record
        offset: usize,
    },

    /// A managed procedure has a non-zero parent or next link.
    #[error("Unexpected procedure link parent={parent:#x}, next={next:#x} (procedure at {offset:#x})")]
    UnexpectedProcedureLink {
        /// The parent field of the record
        parent: u32,
        /// The next field of the record
        next: u32,
        /// Position of the procedure record
        offset: usize,
    },

    /// A vendor-extension record carries a GUID this decoder does not know.
    #[error("OEM section: guid={guid} ti={type_index} (record at {offset:#x})")]
    UnknownOemGuid {
        /// The GUID found in the record
        guid: uguid::Guid,
        /// The type index following the GUID
        type_index: u32,
        /// Position of the record
        offset: usize,
    },

    /// Recursion limit reached.
    ///
    /// Nested blocks are decoded recursively; to prevent stack exhaustion on hostile input a
    /// maximum depth is enforced. The associated value is the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),
}
