//! Custom metadata attached to managed procedures.
//!
//! The C# and VB compilers store information that has no native CodeView record inside
//! `S_OEM` records tagged with [`crate::symbols::custommetadata::MSIL_METADATA_GUID`]. Two payloads are
//! defined:
//!
//! - `MD2`: a versioned list of items (using-directive counts, forwarding links, iterator
//!   scopes, iterator class name, `dynamic` locals, Edit-and-Continue maps)
//! - `asyncMethodInfo`: the kickoff method, catch handler and suspension points of an async
//!   state machine
//!
//! Items are skipped by their declared length when their kind or version is not understood,
//! so newer compilers never desynchronize the stream. Any other `S_OEM` GUID is rejected.
//!
//! # Key Components
//!
//! - [`crate::symbols::custommetadata::CustomMetadataItem`] - Decoded `MD2` item variants
//! - [`crate::symbols::custommetadata::CustomMetadataKind`] - Item kind byte
//! - [`crate::symbols::custommetadata::SynchronizationInfo`] - Async state machine information
//! - [`crate::symbols::custommetadata::parse_oem_record`] - `S_OEM` entry point used by the
//!   function decoder
//! - [`crate::symbols::custommetadata::parse_custom_metadata`] - Standalone `MD2` blob parsing
//!
//! # Examples
//!
//! ```rust
//! use pdbscope::symbols::custommetadata::{parse_custom_metadata, CustomMetadataItem};
//!
//! #[rustfmt::skip]
//! let blob = [
//!     0x04, 0x01, 0x00, 0x00,                         // version 4, one item
//!     0x04, 0x00, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x00, // using info, 12 bytes
//!     0x01, 0x00, 0x02, 0x00,                         // one level, two namespaces
//! ];
//!
//! match &parse_custom_metadata(&blob)?[0] {
//!     CustomMetadataItem::UsingInfo { counts } => assert_eq!(counts, &vec![2]),
//!     other => panic!("unexpected item {other:?}"),
//! }
//! # Ok::<(), pdbscope::Error>(())
//! ```
//!
//! # References
//!
//! - [Roslyn `CustomDebugInfoReader`](https://github.com/dotnet/roslyn/blob/main/src/Dependencies/CodeAnalysis.Debugging/CustomDebugInfoReader.cs)

mod parser;
mod types;

pub use parser::{parse_custom_metadata, parse_oem_record, CustomMetadataParser};
pub use types::*;
