//! Custom metadata types for managed CodeView symbols.
//!
//! These types describe what the C# and VB compilers attach to a method through `S_OEM`
//! records: using-directive counts, forwarding links, iterator and async state machine
//! information. They are plain owned values with no references into the symbol stream.

use crate::{symbols::token::Token, Result};

/// GUID tagging the `S_OEM` records emitted for managed custom metadata.
///
/// On disk: `C9 3F EA C6 B3 59 D6 49 BC 25 09 02 BB AB B4 60`
pub const MSIL_METADATA_GUID: uguid::Guid = uguid::guid!("c6ea3fc9-59b3-49d6-bc25-0902bbabb460");

/// Name of the `S_OEM` payload holding versioned custom metadata items
pub const MD2_NAME: &str = "MD2";

/// Name of the `S_OEM` payload holding async state machine information
pub const ASYNC_METHOD_INFO_NAME: &str = "asyncMethodInfo";

/// The only custom metadata format version that is interpreted, for both the blob and its items
pub const CUSTOM_METADATA_VERSION: u8 = 4;

/// Size of the header in front of every custom metadata item
pub const ITEM_HEADER_SIZE: u32 = 8;

/// Kind byte of a custom metadata item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomMetadataKind {
    /// Number of namespaces imported at each nesting level (0)
    UsingInfo,
    /// Method whose using information applies to this one (1)
    ForwardInfo,
    /// Method whose module holds the using information for this one (2)
    ForwardToModuleInfo,
    /// Hoisted local scopes of an iterator state machine (3)
    IteratorLocals,
    /// Name of the iterator class generated for this method (4)
    ForwardIterator,
    /// `dynamic` flags of locals (5)
    DynamicLocals,
    /// Edit-and-Continue local slot map (6)
    EditAndContinueLocalSlotMap,
    /// Edit-and-Continue lambda and closure map (7)
    EditAndContinueLambdaMap,
    /// Any kind added after these
    Unknown(u8),
}

impl CustomMetadataKind {
    /// Map an item's kind byte.
    #[must_use]
    pub fn from_byte(kind: u8) -> Self {
        match kind {
            0 => CustomMetadataKind::UsingInfo,
            1 => CustomMetadataKind::ForwardInfo,
            2 => CustomMetadataKind::ForwardToModuleInfo,
            3 => CustomMetadataKind::IteratorLocals,
            4 => CustomMetadataKind::ForwardIterator,
            5 => CustomMetadataKind::DynamicLocals,
            6 => CustomMetadataKind::EditAndContinueLocalSlotMap,
            7 => CustomMetadataKind::EditAndContinueLambdaMap,
            other => CustomMetadataKind::Unknown(other),
        }
    }
}

/// A hoisted local scope of an iterator, as an IL range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IteratorScope {
    /// IL offset where the scope starts
    pub offset: u32,
    /// Length of the scope in IL bytes
    pub length: u32,
}

/// `dynamic` annotation of one local variable or constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicLocal {
    /// One entry per type component, `true` where the component is `dynamic`
    pub flags: Vec<bool>,
    /// Slot of the local, 0 for constants
    pub slot_index: u32,
    /// Name of the local
    pub name: String,
}

/// One `await` of an async method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynchronizationPoint {
    /// IL offset where the method yields
    pub synchronize_offset: u32,
    /// Method which resumes execution, usually `MoveNext` of the state machine
    pub continuation_method: Token,
    /// IL offset at which execution resumes in `continuation_method`
    pub continuation_offset: u32,
}

/// Async state machine information of a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynchronizationInfo {
    /// The user-written async method that starts the state machine
    pub kickoff_method: Token,
    /// IL offset of the catch handler the compiler generated around the body
    pub catch_handler_offset: u32,
    /// Suspension points, in stream order
    pub points: Vec<SynchronizationPoint>,
}

impl SynchronizationInfo {
    /// Build the information from the yield/resume offset tables of a state machine.
    ///
    /// Every yield offset is paired with the resume offset at the same index; all points
    /// continue in `move_next`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the two tables differ in length.
    pub fn from_offsets(
        move_next: Token,
        kickoff_method: Token,
        catch_handler_offset: u32,
        yield_offsets: &[u32],
        resume_offsets: &[u32],
    ) -> Result<SynchronizationInfo> {
        if yield_offsets.len() != resume_offsets.len() {
            return Err(malformed_error!(
                "{} yield offsets but {} resume offsets",
                yield_offsets.len(),
                resume_offsets.len()
            ));
        }

        let points = yield_offsets
            .iter()
            .zip(resume_offsets)
            .map(|(&synchronize_offset, &continuation_offset)| SynchronizationPoint {
                synchronize_offset,
                continuation_method: move_next,
                continuation_offset,
            })
            .collect();

        Ok(SynchronizationInfo {
            kickoff_method,
            catch_handler_offset,
            points,
        })
    }
}

/// One decoded item of an `MD2` blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomMetadataItem {
    /// Namespace counts per nesting level, innermost first
    UsingInfo {
        /// Number of namespaces at each level
        counts: Vec<u16>,
    },

    /// Reuse another method's using information
    ForwardInfo {
        /// Method holding the using information
        token: Token,
    },

    /// Reuse the using information of another method's module
    ForwardToModuleInfo {
        /// Method whose module holds the using information
        token: Token,
    },

    /// Hoisted local scopes of an iterator
    IteratorLocals {
        /// Scopes, converted to `(offset, length)` ranges
        scopes: Vec<IteratorScope>,
    },

    /// Iterator class generated for this method
    ForwardIterator {
        /// Name of the class
        class_name: String,
    },

    /// `dynamic` annotations of locals
    DynamicLocals {
        /// One entry per annotated local
        locals: Vec<DynamicLocal>,
    },

    /// An item whose content is not interpreted: Edit-and-Continue data, kinds added after
    /// these, and items of another version
    Skipped {
        /// Kind byte of the item
        kind: CustomMetadataKind,
        /// Version byte of the item
        version: u8,
        /// Declared size of the item, header included
        length: u32,
    },
}

impl CustomMetadataItem {
    /// Kind of the item.
    #[must_use]
    pub fn kind(&self) -> CustomMetadataKind {
        match self {
            CustomMetadataItem::UsingInfo { .. } => CustomMetadataKind::UsingInfo,
            CustomMetadataItem::ForwardInfo { .. } => CustomMetadataKind::ForwardInfo,
            CustomMetadataItem::ForwardToModuleInfo { .. } => {
                CustomMetadataKind::ForwardToModuleInfo
            }
            CustomMetadataItem::IteratorLocals { .. } => CustomMetadataKind::IteratorLocals,
            CustomMetadataItem::ForwardIterator { .. } => CustomMetadataKind::ForwardIterator,
            CustomMetadataItem::DynamicLocals { .. } => CustomMetadataKind::DynamicLocals,
            CustomMetadataItem::Skipped { kind, .. } => *kind,
        }
    }
}

/// Payload of an `S_OEM` record tagged with [`MSIL_METADATA_GUID`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OemPayload {
    /// `MD2` items
    CustomMetadata(Vec<CustomMetadataItem>),
    /// `asyncMethodInfo`
    AsyncMethodInfo(SynchronizationInfo),
    /// A payload name this decoder does not interpret
    Other {
        /// The payload name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_bytes() {
        assert_eq!(
            CustomMetadataKind::from_byte(0),
            CustomMetadataKind::UsingInfo
        );
        assert_eq!(
            CustomMetadataKind::from_byte(7),
            CustomMetadataKind::EditAndContinueLambdaMap
        );
        assert_eq!(
            CustomMetadataKind::from_byte(3),
            CustomMetadataKind::IteratorLocals
        );
        assert_eq!(
            CustomMetadataKind::from_byte(9),
            CustomMetadataKind::Unknown(9)
        );
    }

    #[test]
    fn test_metadata_guid_layout() {
        #[rustfmt::skip]
        let on_disk = [
            0xC9, 0x3F, 0xEA, 0xC6, 0xB3, 0x59, 0xD6, 0x49,
            0xBC, 0x25, 0x09, 0x02, 0xBB, 0xAB, 0xB4, 0x60,
        ];
        assert_eq!(MSIL_METADATA_GUID.to_bytes(), on_disk);
    }

    #[test]
    fn test_item_kind() {
        let item = CustomMetadataItem::ForwardInfo {
            token: Token::new(0x0600_0001),
        };
        assert_eq!(item.kind(), CustomMetadataKind::ForwardInfo);

        let skipped = CustomMetadataItem::Skipped {
            kind: CustomMetadataKind::EditAndContinueLambdaMap,
            version: 4,
            length: 24,
        };
        assert_eq!(skipped.kind(), CustomMetadataKind::EditAndContinueLambdaMap);
    }

    #[test]
    fn test_synchronization_from_offsets() {
        let info = SynchronizationInfo::from_offsets(
            Token::new(0x0600_0010),
            Token::new(0x0600_0002),
            0x80,
            &[0x10, 0x30],
            &[0x20, 0x40],
        )
        .unwrap();

        assert_eq!(info.kickoff_method, Token::new(0x0600_0002));
        assert_eq!(info.catch_handler_offset, 0x80);
        assert_eq!(
            info.points[1],
            SynchronizationPoint {
                synchronize_offset: 0x30,
                continuation_method: Token::new(0x0600_0010),
                continuation_offset: 0x40,
            }
        );

        assert!(SynchronizationInfo::from_offsets(
            Token::new(0x0600_0010),
            Token::new(0x0600_0002),
            0,
            &[0x10],
            &[],
        )
        .is_err());
    }
}
