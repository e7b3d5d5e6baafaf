//! Decoding options for managed symbol streams
//!
//! The options only influence what gets materialized and how scope ranges are normalized;
//! record framing is validated the same way under every configuration.

/// Options for [`crate::symbols::decode_module_functions`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Read procedure names (default: true)
    /// When disabled, names are skipped without being decoded and `PdbFunction::name` is `None`
    pub read_names: bool,

    /// Apply the Visual Basic scope length fix to every decoded function (default: false)
    /// The VB compiler emits scope ends exclusive; this extends every nested scope by one byte
    pub adjust_visual_basic_scopes: bool,

    /// Maximum nesting depth for `S_BLOCK32` records (default: 128)
    pub max_scope_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            read_names: true,
            adjust_visual_basic_scopes: false,
            max_scope_depth: 128,
        }
    }
}

impl DecodeOptions {
    /// Creates options which skip procedure names
    ///
    /// Useful for callers that only need addresses, tokens and scopes
    #[must_use]
    pub fn names_skipped() -> Self {
        Self {
            read_names: false,
            ..Self::default()
        }
    }

    /// Creates options for modules compiled from Visual Basic sources
    #[must_use]
    pub fn visual_basic() -> Self {
        Self {
            adjust_visual_basic_scopes: true,
            ..Self::default()
        }
    }
}
