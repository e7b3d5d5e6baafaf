//! # pdbscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! pdbscope library. Import it to get quick access to everything needed to decode a module's
//! managed symbols.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pdbscope operations
pub use crate::Error;

/// The result type used throughout pdbscope
pub use crate::Result;

/// Low-level stream cursor
pub use crate::Parser;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Decode all managed functions of a module
pub use crate::symbols::decode_module_functions;

/// Decoding options
pub use crate::symbols::DecodeOptions;

/// Function orderings for sorted lookup
pub use crate::symbols::ordering::{by_address, by_address_and_token};

// ================================================================================================
// Decoded Symbols
// ================================================================================================

/// Functions, scopes and locals
pub use crate::symbols::{
    ConstantValue, PdbConstant, PdbFunction, PdbScope, PdbSlot, ProcFlags, SlotFlags,
};

/// Metadata token type
pub use crate::symbols::Token;

/// Record kinds
pub use crate::symbols::SymbolKind;

// ================================================================================================
// Custom Metadata
// ================================================================================================

/// Compiler-emitted custom metadata
pub use crate::symbols::custommetadata::{
    CustomMetadataItem, CustomMetadataKind, DynamicLocal, IteratorScope, SynchronizationInfo,
    SynchronizationPoint, MSIL_METADATA_GUID,
};
