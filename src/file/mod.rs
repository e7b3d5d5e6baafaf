//! Byte-level access to CodeView symbol streams.
//!
//! Locating a module's symbol stream inside a PDB container is the caller's business; this
//! module only deals with the bytes once they are in memory.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser`] - Positioned cursor with bounds-checked reads, string
//!   decoding, seeking and alignment
//! - [`crate::file::io`] - Little-endian primitive decoding shared by the parser
//!
//! # Examples
//!
//! ```rust
//! use pdbscope::Parser;
//!
//! let module_stream = [0x02, 0x00, 0x06, 0x00];
//! let mut parser = Parser::new(&module_stream);
//!
//! assert_eq!(parser.read_le::<u16>()?, 2);
//! assert_eq!(parser.read_le::<u16>()?, 0x0006);
//! assert!(!parser.has_more_data());
//! # Ok::<(), pdbscope::Error>(())
//! ```

pub mod io;
pub mod parser;
