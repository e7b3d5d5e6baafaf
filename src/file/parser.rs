//! Positioned byte cursor for CodeView symbol streams.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor over a module's symbol
//! stream. It offers bounds-checked little-endian reads, GUID reads, the string encodings used by
//! managed CodeView records (null-terminated UTF-8 and null-terminated UTF-16), explicit seeking
//! and alignment.
//!
//! Positions handed out and accepted by the parser are absolute offsets into the byte slice it
//! was created from. CodeView stores procedure and block `end` fields as such absolute offsets
//! into the module stream, so the decoder can jump to them directly with
//! [`crate::file::parser::Parser::seek`].
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to a specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by a number of bytes
//! - [`crate::file::parser::Parser::pos`] - Get the current position
//! - [`crate::file::parser::Parser::align`] - Align to a byte boundary
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_guid`] - Read a 128-bit GUID
//! - [`crate::file::parser::Parser::read_bytes`] - Read a raw byte slice
//!
//! ## String Methods
//! - [`crate::file::parser::Parser::read_string_utf8`] - Null-terminated UTF-8
//! - [`crate::file::parser::Parser::skip_string_utf8`] - Skip a null-terminated string
//! - [`crate::file::parser::Parser::read_string_utf16`] - Null-terminated UTF-16
//! - [`crate::file::parser::Parser::read_fixed_string_utf16`] - Fixed-width, NUL padded UTF-16
//!
//! # Examples
//!
//! ```rust
//! use pdbscope::Parser;
//!
//! // S_UNAMESPACE record: length, kind, "System\0"
//! let data = [0x09, 0x00, 0x24, 0x11, b'S', b'y', b's', b't', b'e', b'm', 0x00];
//! let mut parser = Parser::new(&data);
//!
//! let length = parser.read_le::<u16>()?;
//! let kind = parser.read_le::<u16>()?;
//! assert_eq!((length, kind), (9, 0x1124));
//! assert_eq!(parser.read_string_utf8()?, "System");
//! assert_eq!(parser.pos(), data.len());
//! # Ok::<(), pdbscope::Error>(())
//! ```

use widestring::U16Str;

use crate::{
    file::io::{read_le_at, ByteIO},
    Result,
};

/// A cursor-based reader over the bytes of a CodeView symbol stream.
///
/// `Parser` maintains an absolute position into the underlying byte slice and validates every
/// read against the slice length, so truncated input surfaces as
/// [`crate::Error::OutOfBounds`] rather than a panic.
///
/// # Examples
///
/// ```rust
/// use pdbscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// let last_bytes = parser.read_le::<u16>()?;
/// assert_eq!(last_bytes, 0x0807);
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed, which is where a scan over the last
    /// record of a stream naturally lands.
    ///
    /// # Arguments
    /// * `pos` - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pdbscope::Parser;
    /// let data = [0x01, 0x02, 0x03, 0x04];
    /// let mut parser = Parser::new(&data);
    ///
    /// parser.seek(4)?;
    /// assert!(!parser.has_more_data());
    /// assert!(parser.seek(5).is_err());
    /// # Ok::<(), pdbscope::Error>(())
    /// ```
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Arguments
    /// * `step` - Amount of bytes to advance
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        let end = self.calc_end_position(step)?;
        self.position = end;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes left between the current position and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Align the position to a specific boundary.
    ///
    /// The boundary is computed on the absolute position, which matches how CodeView aligns
    /// payloads relative to the start of the module stream.
    ///
    /// # Arguments
    /// * `alignment` - The boundary to align to
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if aligning would exceed the data length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pdbscope::Parser;
    /// let data = [0u8; 8];
    /// let mut parser = Parser::new(&data);
    ///
    /// parser.advance_by(1)?;
    /// parser.align(4)?;
    /// assert_eq!(parser.pos(), 4);
    /// parser.align(4)?;
    /// assert_eq!(parser.pos(), 4);
    /// # Ok::<(), pdbscope::Error>(())
    /// ```
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        if self.position + padding > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        self.position += padding;
        Ok(())
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: ByteIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Calculates an end position safely with overflow checking.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the calculation would overflow or if the
    /// resulting position exceeds the data length.
    pub fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self
            .position
            .checked_add(length)
            .ok_or(out_of_bounds_error!())?;

        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(end)
    }

    /// Reads a slice of bytes of the specified length from the current position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading `length` bytes would exceed the data.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Read a 128-bit GUID in its on-disk (mixed-endian) layout.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 16 bytes remain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pdbscope::Parser;
    /// let data = [
    ///     0xC9, 0x3F, 0xEA, 0xC6, 0xB3, 0x59, 0xD6, 0x49,
    ///     0xBC, 0x25, 0x09, 0x02, 0xBB, 0xAB, 0xB4, 0x60,
    /// ];
    /// let mut parser = Parser::new(&data);
    /// assert_eq!(
    ///     parser.read_guid()?,
    ///     uguid::guid!("c6ea3fc9-59b3-49d6-bc25-0902bbabb460")
    /// );
    /// # Ok::<(), pdbscope::Error>(())
    /// ```
    pub fn read_guid(&mut self) -> Result<uguid::Guid> {
        let bytes = self.read_bytes(16)?;

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(bytes);

        Ok(uguid::Guid::from_bytes(buffer))
    }

    /// Read a null-terminated UTF-8 string.
    ///
    /// A string which runs into the end of the data without a terminator is accepted and ends
    /// there.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for invalid UTF-8 encoding.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let end = self.find_utf8_terminator();

        let string_data = &self.data[start..end];
        self.position = (end + 1).min(self.data.len());

        String::from_utf8(string_data.to_vec()).map_err(|e| {
            malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                end,
                e.utf8_error()
            )
        })
    }

    /// Skip over a null-terminated string without materializing it.
    pub fn skip_string_utf8(&mut self) {
        let end = self.find_utf8_terminator();
        self.position = (end + 1).min(self.data.len());
    }

    /// Read a null-terminated little-endian UTF-16 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the data ends before the terminator, or
    /// [`crate::Error::Malformed`] for unpaired surrogates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pdbscope::Parser;
    /// let data = [b'M', 0x00, b'D', 0x00, b'2', 0x00, 0x00, 0x00, 0xFF];
    /// let mut parser = Parser::new(&data);
    /// assert_eq!(parser.read_string_utf16()?, "MD2");
    /// assert_eq!(parser.pos(), 8);
    /// # Ok::<(), pdbscope::Error>(())
    /// ```
    pub fn read_string_utf16(&mut self) -> Result<String> {
        let start = self.position;
        let mut units = Vec::new();
        loop {
            let unit = self.read_le::<u16>()?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }

        U16Str::from_slice(&units)
            .to_string()
            .map_err(|_| malformed_error!("Invalid UTF-16 string at offset {}", start))
    }

    /// Read a fixed-width UTF-16 field of `units` code units, which is padded with NULs.
    ///
    /// The full width is always consumed; the string ends at the first NUL.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field extends past the data, or
    /// [`crate::Error::Malformed`] for unpaired surrogates.
    pub fn read_fixed_string_utf16(&mut self, units: usize) -> Result<String> {
        let start = self.position;
        let byte_len = units.checked_mul(2).ok_or(out_of_bounds_error!())?;
        let bytes = self.read_bytes(byte_len)?;

        let decoded: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();

        U16Str::from_slice(&decoded)
            .to_string()
            .map_err(|_| malformed_error!("Invalid UTF-16 string at offset {}", start))
    }

    fn find_utf8_terminator(&self) -> usize {
        let mut end = self.position.min(self.data.len());
        while end < self.data.len() && self.data[end] != 0 {
            end += 1;
        }
        end
    }
}
