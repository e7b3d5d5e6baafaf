// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # pdbscope
//!
//! A decoder for the managed CodeView symbols stored in Windows PDB files. Given the symbol
//! records of one PDB module, `pdbscope` produces the managed functions they describe: lexical
//! scope trees, local variable slots, constants, imported namespaces, and the custom metadata
//! the C# and VB compilers attach to methods (using-directive counts, forwarding links, iterator
//! scopes and async state machine information).
//!
//! ## Features
//!
//! - **Exact-size decoding** - Every body is measured before it is materialized, containers are
//!   allocated once
//! - **Strict framing** - Records overrunning their range, missing terminators and unknown vendor
//!   extensions are reported as structured errors, never silently skipped
//! - **Forward compatible** - Unknown record kinds and unknown custom metadata items are skipped
//!   by their declared length
//! - **No unsafe code**
//!
//! ## Quick Start
//!
//! Locating a module's symbol records inside the PDB container is left to the caller. Once the
//! bytes are at hand:
//!
//! ```rust,no_run
//! use pdbscope::prelude::*;
//!
//! fn dump(module_name: &str, symbols: &[u8]) -> pdbscope::Result<()> {
//!     let mut parser = Parser::new(symbols);
//!     // Module streams start with a 4 byte signature
//!     parser.seek(4)?;
//!
//!     let functions = decode_module_functions(
//!         module_name,
//!         &mut parser,
//!         symbols.len(),
//!         DecodeOptions::default(),
//!     )?;
//!
//!     for function in functions.unwrap_or_default() {
//!         println!("{function}");
//!         for scope in function.iter_scopes() {
//!             println!("  scope 0x{:x}+0x{:x}: {} locals", scope.address, scope.length, scope.slots.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`crate::symbols`] - Record walking, functions, scopes, locals and custom metadata
//! - [`crate::Parser`] - Bounds-checked cursor over the symbol bytes
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result). A fault aborts the whole module; no
//! partial results are returned:
//!
//! ```rust
//! use pdbscope::{Error, Parser, symbols::{decode_module_functions, DecodeOptions}};
//!
//! // S_LMANPROC whose length runs past the data
//! let data = [0x40, 0x00, 0x2B, 0x11, 0x00, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! match decode_module_functions("App", &mut parser, data.len(), DecodeOptions::default()) {
//!     Ok(_) => unreachable!(),
//!     Err(Error::RecordOverrun { kind, .. }) => println!("{kind} overruns the module"),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run symbols --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```
//!
//! ### References
//!
//! - [Microsoft PDB `cvinfo.h`](https://github.com/microsoft/microsoft-pdb/blob/master/include/cvinfo.h)
//! - [Roslyn custom debug information](https://github.com/dotnet/roslyn/blob/main/src/Dependencies/CodeAnalysis.Debugging/CustomDebugInfoReader.cs)

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use pdbscope::prelude::*;
///
/// let options = DecodeOptions::names_skipped();
/// assert!(!options.read_names);
/// ```
pub mod prelude;

/// Managed CodeView symbol decoding
///
/// This module decodes the symbol records of one PDB module into managed functions. It
/// includes:
///
/// - Record framing and the measuring pass
/// - Procedure, block, slot and constant decoding
/// - `S_OEM` custom metadata (`MD2`, `asyncMethodInfo`)
/// - Orderings over decoded functions
pub mod symbols;

/// `pdbscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust
/// use pdbscope::{Result, Parser};
///
/// fn signature(stream: &[u8]) -> Result<u32> {
///     Parser::new(stream).read_le::<u32>()
/// }
/// assert_eq!(signature(&[4, 0, 0, 0]).unwrap(), 4);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `pdbscope` Error type
///
/// The main error type for all operations in this crate. Record faults carry the offending
/// record kind and stream positions.
pub use error::Error;

/// Bounds-checked cursor over a symbol stream.
///
/// # Example
///
/// ```rust
/// use pdbscope::Parser;
/// let data = [0x02, 0x00, 0x06, 0x00]; // S_END
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_le::<u16>()?, 2);
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub use file::parser::Parser;
