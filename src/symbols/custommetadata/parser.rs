//! Decoder for the payloads of managed `S_OEM` records.
//!
//! # `S_OEM` Record Format
//!
//! ```text
//! OemRecord ::= guid:[u8; 16] type_index:u32 name:utf16z payload
//! ```
//!
//! Only records tagged with [`MSIL_METADATA_GUID`] are understood. Their payload depends on
//! the name:
//!
//! ## `MD2`
//! ```text
//! Md2      ::= version:u8 [count:u8 align(4) Item*count]     ; items only if version == 4
//! Item     ::= version:u8 kind:u8 padding:[u8; 2] length:u32 content
//! ```
//! `length` covers the item header. Whatever the content decoder consumed, the next item starts
//! at `item_start + length`. Alignment is computed on the absolute stream position.
//!
//! ## `asyncMethodInfo`
//! ```text
//! AsyncInfo ::= kickoff:u32 catch_handler:u32 count:u32 Point*count
//! Point     ::= synchronize_offset:u32 continuation_method:u32 continuation_offset:u32
//! ```

use log::{debug, trace};

use crate::{
    file::parser::Parser,
    symbols::{
        custommetadata::types::*,
        record::RecordHeader,
        token::Token,
    },
    Error, Result,
};

/// Number of flag bytes in a dynamic local entry
const DYNAMIC_FLAG_BYTES: usize = 64;
/// Width of the name field of a dynamic local entry, in UTF-16 code units
const DYNAMIC_NAME_UNITS: usize = 64;

/// Parser for custom metadata payloads, borrowing the cursor of the enclosing symbol stream.
pub struct CustomMetadataParser<'a, 'p> {
    /// Stream cursor, positioned at the payload
    parser: &'p mut Parser<'a>,
}

impl<'a, 'p> CustomMetadataParser<'a, 'p> {
    /// Creates a parser reading from the current position of `parser`.
    #[must_use]
    pub fn new(parser: &'p mut Parser<'a>) -> Self {
        CustomMetadataParser { parser }
    }

    /// Parse an `MD2` blob.
    ///
    /// Blobs of a version other than 4 yield no items.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data and [`crate::Error::Malformed`]
    /// for items whose declared length is shorter than their header.
    pub fn parse_md2(&mut self) -> Result<Vec<CustomMetadataItem>> {
        let version = self.parser.read_le::<u8>()?;
        if version != CUSTOM_METADATA_VERSION {
            debug!("Skipping MD2 blob of version {}", version);
            return Ok(Vec::new());
        }

        let count = self.parser.read_le::<u8>()?;
        self.parser.align(4)?;

        let mut items = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            items.push(self.parse_item()?);
        }
        Ok(items)
    }

    /// Parse one item, leaving the cursor at `item_start + length`.
    ///
    /// The cursor is moved to the declared end whatever the content decoder consumed, so a
    /// decoder reading too little or too much never shifts the following items.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the declared length is shorter than the item
    /// header, and [`crate::Error::OutOfBounds`] if the item or its content runs past the data.
    pub fn parse_item(&mut self) -> Result<CustomMetadataItem> {
        let start = self.parser.pos();
        let version = self.parser.read_le::<u8>()?;
        let kind = CustomMetadataKind::from_byte(self.parser.read_le::<u8>()?);
        self.parser.advance_by(2)?;
        let length = self.parser.read_le::<u32>()?;

        if length < ITEM_HEADER_SIZE {
            return Err(malformed_error!(
                "Custom metadata item at offset {} declares {} bytes",
                start,
                length
            ));
        }
        let end = start
            .checked_add(length as usize)
            .ok_or(out_of_bounds_error!())?;
        if end > self.parser.len() {
            return Err(out_of_bounds_error!());
        }

        trace!(
            "custom metadata item {:?} v{} ({} bytes) at {}",
            kind,
            version,
            length,
            start
        );

        let item = if version == CUSTOM_METADATA_VERSION {
            self.parse_item_content(kind, version, length)?
        } else {
            debug!(
                "Skipping custom metadata item {:?} of version {} at {}",
                kind, version, start
            );
            CustomMetadataItem::Skipped {
                kind,
                version,
                length,
            }
        };

        self.parser.seek(end)?;

        Ok(item)
    }

    /// Parse an `asyncMethodInfo` payload.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated data.
    pub fn parse_async_method_info(&mut self) -> Result<SynchronizationInfo> {
        let kickoff_method = Token::new(self.parser.read_le::<u32>()?);
        let catch_handler_offset = self.parser.read_le::<u32>()?;
        let count = self.parser.read_le::<u32>()? as usize;

        let mut points = Vec::with_capacity(count.min(self.parser.remaining() / 12));
        for _ in 0..count {
            points.push(SynchronizationPoint {
                synchronize_offset: self.parser.read_le::<u32>()?,
                continuation_method: Token::new(self.parser.read_le::<u32>()?),
                continuation_offset: self.parser.read_le::<u32>()?,
            });
        }

        Ok(SynchronizationInfo {
            kickoff_method,
            catch_handler_offset,
            points,
        })
    }

    fn parse_item_content(
        &mut self,
        kind: CustomMetadataKind,
        version: u8,
        length: u32,
    ) -> Result<CustomMetadataItem> {
        Ok(match kind {
            CustomMetadataKind::UsingInfo => {
                let count = self.parser.read_le::<u16>()?;
                let mut counts = Vec::with_capacity(usize::from(count));
                for _ in 0..count {
                    counts.push(self.parser.read_le::<u16>()?);
                }
                CustomMetadataItem::UsingInfo { counts }
            }
            CustomMetadataKind::ForwardInfo => CustomMetadataItem::ForwardInfo {
                token: Token::new(self.parser.read_le::<u32>()?),
            },
            CustomMetadataKind::ForwardToModuleInfo => CustomMetadataItem::ForwardToModuleInfo {
                token: Token::new(self.parser.read_le::<u32>()?),
            },
            CustomMetadataKind::IteratorLocals => CustomMetadataItem::IteratorLocals {
                scopes: self.parse_iterator_scopes()?,
            },
            CustomMetadataKind::ForwardIterator => CustomMetadataItem::ForwardIterator {
                class_name: self.parser.read_string_utf16()?,
            },
            CustomMetadataKind::DynamicLocals => CustomMetadataItem::DynamicLocals {
                locals: self.parse_dynamic_locals()?,
            },
            CustomMetadataKind::EditAndContinueLocalSlotMap
            | CustomMetadataKind::EditAndContinueLambdaMap
            | CustomMetadataKind::Unknown(_) => {
                debug!("Skipping custom metadata item {:?} ({} bytes)", kind, length);
                CustomMetadataItem::Skipped {
                    kind,
                    version,
                    length,
                }
            }
        })
    }

    fn parse_iterator_scopes(&mut self) -> Result<Vec<IteratorScope>> {
        let count = self.parser.read_le::<u32>()? as usize;

        let mut scopes = Vec::with_capacity(count.min(self.parser.remaining() / 8));
        for _ in 0..count {
            let start = self.parser.read_le::<u32>()?;
            let end = self.parser.read_le::<u32>()?;
            let length = end.checked_sub(start).ok_or_else(|| {
                malformed_error!("Iterator scope ends at {} before its start {}", end, start)
            })?;
            scopes.push(IteratorScope {
                offset: start,
                length,
            });
        }
        Ok(scopes)
    }

    fn parse_dynamic_locals(&mut self) -> Result<Vec<DynamicLocal>> {
        let count = self.parser.read_le::<u32>()? as usize;
        let entry_size = DYNAMIC_FLAG_BYTES + 8 + DYNAMIC_NAME_UNITS * 2;

        let mut locals = Vec::with_capacity(count.min(self.parser.remaining() / entry_size));
        for _ in 0..count {
            let flag_bytes = self.parser.read_bytes(DYNAMIC_FLAG_BYTES)?;
            let flag_count = self.parser.read_le::<u32>()? as usize;
            if flag_count > DYNAMIC_FLAG_BYTES {
                return Err(malformed_error!(
                    "Dynamic local declares {} flags, at most {} fit",
                    flag_count,
                    DYNAMIC_FLAG_BYTES
                ));
            }
            let slot_index = self.parser.read_le::<u32>()?;
            let name = self.parser.read_fixed_string_utf16(DYNAMIC_NAME_UNITS)?;

            locals.push(DynamicLocal {
                flags: flag_bytes[..flag_count].iter().map(|&b| b != 0).collect(),
                slot_index,
                name,
            });
        }
        Ok(locals)
    }
}

/// Parse the body of an `S_OEM` record, right after its kind tag.
///
/// Payload decoders read no further than the end of the record. The cursor is left wherever
/// the payload decoder stopped; the caller moves on to the end of the record.
///
/// # Errors
/// Returns [`crate::Error::UnknownOemGuid`] for records tagged with any GUID other than
/// [`MSIL_METADATA_GUID`], plus the errors of the payload decoders.
pub fn parse_oem_record(parser: &mut Parser<'_>, header: &RecordHeader) -> Result<OemPayload> {
    header.require_fixed_layout()?;

    let guid = parser.read_guid()?;
    let type_index = parser.read_le::<u32>()?;
    if guid != MSIL_METADATA_GUID {
        return Err(Error::UnknownOemGuid {
            guid,
            type_index,
            offset: header.offset,
        });
    }

    let name = parser.read_string_utf16()?;
    trace!("S_OEM payload '{}' at {}", name, header.offset);

    let record = parser
        .data()
        .get(..header.stop)
        .ok_or(out_of_bounds_error!())?;
    let mut payload = Parser::new(record);
    payload.seek(parser.pos())?;

    let mut metadata = CustomMetadataParser::new(&mut payload);
    let decoded = match name.as_str() {
        MD2_NAME => OemPayload::CustomMetadata(metadata.parse_md2()?),
        ASYNC_METHOD_INFO_NAME => {
            OemPayload::AsyncMethodInfo(metadata.parse_async_method_info()?)
        }
        _ => OemPayload::Other { name },
    };

    parser.seek(payload.pos())?;
    Ok(decoded)
}

/// Parse a standalone `MD2` blob.
///
/// The item list is aligned relative to the start of `data`, which matches the stream layout
/// when the blob was cut at a 4-byte boundary.
///
/// # Arguments
/// * `data` - The blob, starting at its version byte
///
/// # Errors
/// Returns the errors of [`CustomMetadataParser::parse_md2`].
///
/// # Examples
///
/// ```rust
/// use pdbscope::symbols::custommetadata::{parse_custom_metadata, CustomMetadataItem};
///
/// #[rustfmt::skip]
/// let blob = [
///     0x04, 0x01, 0x00, 0x00,                         // version 4, one item, alignment
///     0x04, 0x01, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x00, // forward info, 12 bytes
///     0x01, 0x00, 0x00, 0x06,                         // token 0x06000001
/// ];
/// let items = parse_custom_metadata(&blob)?;
/// assert!(matches!(items[0], CustomMetadataItem::ForwardInfo { .. }));
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub fn parse_custom_metadata(data: &[u8]) -> Result<Vec<CustomMetadataItem>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let mut parser = Parser::new(data);
    CustomMetadataParser::new(&mut parser).parse_md2()
}
