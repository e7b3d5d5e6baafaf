//! Managed CodeView symbol decoding.
//!
//! This module turns the symbol records of one PDB module into [`crate::symbols::PdbFunction`]
//! values: one per managed procedure, each with its tree of lexical scopes, local slots,
//! constants, imported namespaces and compiler-emitted custom metadata.
//!
//! # Architecture
//!
//! Every pass over the stream goes through the same record walker and follows a
//! measure-then-materialize protocol:
//!
//! 1. **Discovery** - [`crate::symbols::decode_module_functions`] counts the `S_GMANPROC` /
//!    `S_LMANPROC` records of the module, jumping over their bodies
//! 2. **Measure** - before a procedure or block body is decoded,
//!    [`crate::symbols::SymbolCounts`] tallies its direct scopes, slots, constants and
//!    namespaces
//! 3. **Materialize** - the body is decoded into containers sized from those counts; nested
//!    blocks recurse through [`crate::symbols::scope::decode_scope`]
//! 4. **Terminate** - every body must end exactly at the `S_END` its header points at
//!
//! `S_OEM` records carrying managed custom metadata are handed to
//! [`crate::symbols::custommetadata`].
//!
//! # Key Components
//!
//! - [`crate::symbols::PdbFunction`] - A decoded managed function
//! - [`crate::symbols::PdbScope`] - A lexical block, addresses relative to the function
//! - [`crate::symbols::PdbSlot`] / [`crate::symbols::PdbConstant`] - Locals and constants
//! - [`crate::symbols::DecodeOptions`] - What to materialize
//! - [`crate::symbols::ordering`] - Orderings for sorted address lookup
//! - [`crate::symbols::record`] - Record framing shared by all passes
//!
//! # Examples
//!
//! ```rust
//! use pdbscope::{Parser, symbols::{decode_module_functions, DecodeOptions}};
//!
//! #[rustfmt::skip]
//! let module = [
//!     // S_LMANPROC, end = 0x2E
//!     0x2C, 0x00, 0x2B, 0x11,
//!     0x00, 0x00, 0x00, 0x00, 0x2E, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     0x01, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
//!     b'M', b'a', b'i', b'n', 0x00,
//!     // S_END
//!     0x02, 0x00, 0x06, 0x00,
//! ];
//!
//! let mut parser = Parser::new(&module);
//! let functions = decode_module_functions("App", &mut parser, module.len(), DecodeOptions::default())?
//!     .unwrap_or_default();
//!
//! for function in &functions {
//!     println!("{function}");
//! }
//! assert_eq!(functions[0].address, 0x100);
//! # Ok::<(), pdbscope::Error>(())
//! ```

pub mod counts;
pub mod custommetadata;
pub mod function;
pub mod kind;
pub mod locals;
pub mod options;
pub mod ordering;
pub mod record;
pub mod scope;
pub mod token;

pub use counts::SymbolCounts;
pub use function::{decode_module_functions, PdbFunction, ProcFlags, ProcedureHeader};
pub use kind::SymbolKind;
pub use locals::{ConstantValue, PdbConstant, PdbSlot, SlotFlags};
pub use options::DecodeOptions;
pub use scope::{PdbScope, ScopeDecode};
pub use token::Token;
