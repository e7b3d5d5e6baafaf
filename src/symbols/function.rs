//! Managed procedures and the module-level decoder.
//!
//! A module symbol stream holds one `S_GMANPROC` or `S_LMANPROC` record per managed method:
//!
//! ```text
//! u32 parent, u32 end, u32 next, u32 length, u32 debug_start, u32 debug_end,
//! u32 token, u32 offset, u16 segment, u8 flags, u16 return_register, name
//! ```
//!
//! The records following a procedure up to the `S_END` at `end` form its body. Decoding a module
//! takes two passes: the first counts the procedures, the second materializes them. Each body is
//! measured with [`crate::symbols::counts::SymbolCounts`] before anything is allocated.

use std::fmt;

use bitflags::bitflags;
use log::{debug, trace};

use crate::{
    file::parser::Parser,
    symbols::{
        counts::SymbolCounts,
        custommetadata::{
            parse_oem_record, CustomMetadataItem, DynamicLocal, IteratorScope, OemPayload,
            SynchronizationInfo,
        },
        kind::SymbolKind,
        locals::{PdbConstant, PdbSlot},
        options::DecodeOptions,
        record::{expect_end, scan_records, RecordHeader, Resume},
        scope::{decode_scope, BlockHeader, PdbScope, ScopeIter},
        token::Token,
    },
    Error, Result,
};

bitflags! {
    /// Procedure flags (`CV_PROCFLAGS`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProcFlags: u8 {
        /// Frame pointer present
        const NO_FPO = 0x01;
        /// Interrupt return
        const INTERRUPT_RETURN = 0x02;
        /// Far return
        const FAR_RETURN = 0x04;
        /// Function does not return
        const NEVER_RETURN = 0x08;
        /// Label isn't fallen into
        const NOT_REACHED = 0x10;
        /// Custom calling convention
        const CUSTOM_CALLING_CONVENTION = 0x20;
        /// Function marked as noinline
        const NO_INLINE = 0x40;
        /// Function has debug information for optimized code
        const OPTIMIZED_DEBUG_INFO = 0x80;
    }
}

/// Fixed part of a managed procedure record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureHeader {
    /// Offset of the enclosing record, 0 for managed procedures
    pub parent: u32,
    /// Stream offset of the `S_END` closing the procedure
    pub end: u32,
    /// Offset of the next procedure in a chain, 0 for managed procedures
    pub next: u32,
    /// Size of the procedure in bytes
    pub length: u32,
    /// Start of the debug range, relative to the procedure
    pub debug_start: u32,
    /// End of the debug range, relative to the procedure
    pub debug_end: u32,
    /// `MethodDef` token
    pub token: Token,
    /// Code offset
    pub offset: u32,
    /// Code segment
    pub segment: u16,
    /// Procedure flags
    pub flags: ProcFlags,
    /// Register holding the return value
    pub return_register: u16,
    /// Name, `None` when names are skipped
    pub name: Option<String>,
}

impl ProcedureHeader {
    /// Read the fixed part of a procedure record and its name.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecordTooShort`] or [`crate::Error::OutOfBounds`] for truncated
    /// records, [`crate::Error::Malformed`] for names that are not UTF-8.
    pub fn read(
        parser: &mut Parser<'_>,
        header: &RecordHeader,
        read_name: bool,
    ) -> Result<ProcedureHeader> {
        header.require_fixed_layout()?;

        let parent = parser.read_le::<u32>()?;
        let end = parser.read_le::<u32>()?;
        let next = parser.read_le::<u32>()?;
        let length = parser.read_le::<u32>()?;
        let debug_start = parser.read_le::<u32>()?;
        let debug_end = parser.read_le::<u32>()?;
        let token = Token::new(parser.read_le::<u32>()?);
        let offset = parser.read_le::<u32>()?;
        let segment = parser.read_le::<u16>()?;
        let flags = ProcFlags::from_bits_retain(parser.read_le::<u8>()?);
        let return_register = parser.read_le::<u16>()?;

        let name = if read_name {
            Some(parser.read_string_utf8()?)
        } else {
            parser.skip_string_utf8();
            None
        };

        Ok(ProcedureHeader {
            parent,
            end,
            next,
            length,
            debug_start,
            debug_end,
            token,
            offset,
            segment,
            flags,
            return_register,
            name,
        })
    }
}

/// A decoded managed function.
///
/// Scope addresses are relative to [`PdbFunction::address`] at every depth. When the body holds
/// slots, constants or used namespaces of its own, `scopes[0]` is a synthesized root scope at
/// address 0 spanning the whole function and carrying those locals; blocks follow it as its
/// siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct PdbFunction {
    /// `MethodDef` token
    pub token: Token,
    /// Type token of the last slot decoded in the body, nested blocks included
    pub slot_token: Option<Token>,
    /// Method whose using information applies to this one
    pub forward_token: Option<Token>,
    /// Method whose module holds the using information for this one
    pub forwarded_module_token: Option<Token>,
    /// Name, `None` when names were skipped
    pub name: Option<String>,
    /// Name of the module the function was decoded from
    pub module: String,
    /// Procedure flags
    pub flags: ProcFlags,
    /// Code segment, always 1
    pub segment: u16,
    /// Code offset
    pub address: u32,
    /// Size in bytes
    pub length: u32,
    /// Top-level scopes
    pub scopes: Vec<PdbScope>,
    /// Locals declared directly in the body
    pub slots: Vec<PdbSlot>,
    /// Constants declared directly in the body
    pub constants: Vec<PdbConstant>,
    /// Namespaces imported directly by the body
    pub used_namespaces: Vec<String>,
    /// Number of imported namespaces per nesting level
    pub using_counts: Vec<u16>,
    /// Iterator class generated for this method
    pub iterator_class: Option<String>,
    /// Hoisted local scopes, for iterator `MoveNext` methods
    pub iterator_scopes: Option<Vec<IteratorScope>>,
    /// `dynamic` annotations of locals
    pub dynamic_locals: Vec<DynamicLocal>,
    /// Async state machine information
    pub synchronization: Option<SynchronizationInfo>,
    root_scope: bool,
    visual_basic_scopes_adjusted: bool,
}

impl PdbFunction {
    /// Decode a procedure body whose header has just been read.
    ///
    /// The cursor must sit at the first record after the procedure record. On success it sits
    /// right after the procedure's `S_END`. Callers holding a narrower range than the whole
    /// buffer check `procedure.end` against it first, as [`decode_module_functions`] does.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidSegment`], [`crate::Error::UnexpectedProcedureLink`],
    /// [`crate::Error::UnknownOemGuid`] and the framing errors of [`crate::symbols::record`].
    pub fn decode(
        module: &str,
        procedure: ProcedureHeader,
        record: &RecordHeader,
        parser: &mut Parser<'_>,
        options: DecodeOptions,
    ) -> Result<PdbFunction> {
        if procedure.segment != 1 {
            return Err(Error::InvalidSegment {
                segment: procedure.segment,
                offset: record.offset,
            });
        }
        if procedure.parent != 0 || procedure.next != 0 {
            return Err(Error::UnexpectedProcedureLink {
                parent: procedure.parent,
                next: procedure.next,
                offset: record.offset,
            });
        }

        let end = record.checked_end(procedure.end, parser.len())?;
        let counts = SymbolCounts::measure(parser, end)?;
        let has_root = counts.has_locals();

        let mut function = PdbFunction {
            token: procedure.token,
            slot_token: None,
            forward_token: None,
            forwarded_module_token: None,
            name: procedure.name,
            module: module.to_string(),
            flags: procedure.flags,
            segment: procedure.segment,
            address: procedure.offset,
            length: procedure.length,
            scopes: Vec::with_capacity(counts.scopes + usize::from(has_root)),
            slots: Vec::with_capacity(counts.slots),
            constants: Vec::with_capacity(counts.constants),
            used_namespaces: Vec::with_capacity(counts.used_namespaces),
            using_counts: Vec::new(),
            iterator_class: None,
            iterator_scopes: None,
            dynamic_locals: Vec::new(),
            synchronization: None,
            root_scope: has_root,
            visual_basic_scopes_adjusted: false,
        };

        scan_records(parser, end, |parser, header| {
            match header.kind {
                SymbolKind::Oem => match parse_oem_record(parser, header)? {
                    OemPayload::CustomMetadata(items) => {
                        for item in items {
                            function.apply_custom_metadata(item);
                        }
                    }
                    OemPayload::AsyncMethodInfo(info) => function.synchronization = Some(info),
                    OemPayload::Other { name } => {
                        trace!("Ignoring S_OEM payload '{}' of {}", name, function.token);
                    }
                },
                SymbolKind::Block32 => {
                    let block = BlockHeader::read(parser, header)?;
                    header.checked_end(block.end, end)?;
                    parser.seek(header.stop)?;

                    let decoded =
                        decode_scope(parser, function.address, &block, 1, options.max_scope_depth)?;
                    function.slot_token = decoded.last_slot_type_token;
                    function.scopes.push(decoded.scope);

                    return Ok(Resume::At(parser.pos()));
                }
                SymbolKind::ManagedSlot => {
                    header.require_fixed_layout()?;
                    let slot = PdbSlot::read(parser)?;
                    function.slot_token = Some(slot.type_token);
                    function.slots.push(slot);
                }
                SymbolKind::ManagedConstant => {
                    header.require_fixed_layout()?;
                    function.constants.push(PdbConstant::read(parser)?);
                }
                SymbolKind::UsingNamespace => {
                    function.used_namespaces.push(parser.read_string_utf8()?);
                }
                _ => {}
            }
            Ok(Resume::RecordEnd)
        })?;

        expect_end(parser, record.kind, end)?;

        if has_root {
            let root = PdbScope {
                segment: function.segment,
                address: 0,
                length: function.length,
                scopes: Vec::new(),
                slots: function.slots.clone(),
                constants: function.constants.clone(),
                used_namespaces: function.used_namespaces.clone(),
            };
            function.scopes.insert(0, root);
        }

        if options.adjust_visual_basic_scopes {
            function = function.with_visual_basic_scopes();
        }

        Ok(function)
    }

    fn apply_custom_metadata(&mut self, item: CustomMetadataItem) {
        trace!("Applying {:?} item to {}", item.kind(), self.token);
        match item {
            CustomMetadataItem::UsingInfo { counts } => self.using_counts = counts,
            CustomMetadataItem::ForwardInfo { token } => self.forward_token = Some(token),
            CustomMetadataItem::ForwardToModuleInfo { token } => {
                self.forwarded_module_token = Some(token);
            }
            CustomMetadataItem::IteratorLocals { scopes } => self.iterator_scopes = Some(scopes),
            CustomMetadataItem::ForwardIterator { class_name } => {
                self.iterator_class = Some(class_name);
            }
            CustomMetadataItem::DynamicLocals { locals } => self.dynamic_locals = locals,
            CustomMetadataItem::Skipped { .. } => {}
        }
    }

    /// Applies the Visual Basic scope length fix.
    ///
    /// The VB compiler emits scope ends exclusive. Every scope of the tree grows by one byte,
    /// except the synthesized root scope which already spans the whole function. Applying the
    /// fix to an already fixed function returns it unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pdbscope::symbols::PdbFunction;
    ///
    /// fn normalize(function: PdbFunction) -> PdbFunction {
    ///     // Safe to call on functions that were already adjusted
    ///     function.with_visual_basic_scopes()
    /// }
    /// ```
    #[must_use]
    pub fn with_visual_basic_scopes(mut self) -> Self {
        if !self.visual_basic_scopes_adjusted {
            self.visual_basic_scopes_adjusted = true;
            let first_block = usize::from(self.root_scope);
            for scope in self.scopes.iter_mut().skip(first_block) {
                scope.length = scope.length.saturating_add(1);
                scope.extend_nested_scopes();
            }
        }
        self
    }

    /// Returns `true` once the Visual Basic scope fix has been applied.
    #[must_use]
    pub fn visual_basic_scopes_adjusted(&self) -> bool {
        self.visual_basic_scopes_adjusted
    }

    /// The synthesized root scope, present when the body declares locals, constants or
    /// namespaces of its own.
    #[must_use]
    pub fn root_scope(&self) -> Option<&PdbScope> {
        if self.root_scope {
            self.scopes.first()
        } else {
            None
        }
    }

    /// Depth-first iterator over all scopes of the function.
    #[must_use]
    pub fn iter_scopes(&self) -> ScopeIter<'_> {
        ScopeIter::new(&self.scopes)
    }

    /// Innermost scope containing the function-relative `offset`.
    #[must_use]
    pub fn find_scope(&self, offset: u32) -> Option<&PdbScope> {
        let mut level = self.scopes.as_slice();
        let mut found = None;

        // The synthesized root comes first and overlaps every block, so later siblings win
        while let Some(scope) = level.iter().rev().find(|scope| scope.contains(offset)) {
            found = Some(scope);
            level = &scope.scopes;
        }
        found
    }
}

impl fmt::Display for PdbFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {} - 0x{:x} - 0x{:x}",
            self.module,
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.token,
            self.address,
            self.length
        )
    }
}

/// Decodes every managed procedure in `[parser.pos(), limit)`.
///
/// Returns `Ok(None)` if the range holds no managed procedure.
///
/// # Arguments
/// * `module` - Name of the module, copied into every function
/// * `parser` - Cursor positioned at the first record of the module's symbols
/// * `limit` - Exclusive end of the module's symbols
/// * `options` - What to materialize
///
/// # Errors
/// Any structural fault aborts the whole module; see [`crate::Error`].
///
/// # Examples
///
/// ```rust
/// use pdbscope::{Parser, symbols::{decode_module_functions, DecodeOptions}};
///
/// // A stream without procedures
/// let data = [0x02, 0x00, 0x06, 0x00];
/// let mut parser = Parser::new(&data);
///
/// let functions = decode_module_functions("App", &mut parser, data.len(), DecodeOptions::default())?;
/// assert!(functions.is_none());
/// # Ok::<(), pdbscope::Error>(())
/// ```
pub fn decode_module_functions(
    module: &str,
    parser: &mut Parser<'_>,
    limit: usize,
    options: DecodeOptions,
) -> Result<Option<Vec<PdbFunction>>> {
    let begin = parser.pos();

    let mut count = 0usize;
    scan_records(parser, limit, |parser, header| {
        if header.kind.is_procedure() {
            header.require_fixed_layout()?;
            let _parent = parser.read_le::<u32>()?;
            let end = header.checked_end(parser.read_le::<u32>()?, limit)?;

            count += 1;
            return Ok(Resume::At(end));
        }
        Ok(Resume::RecordEnd)
    })?;

    if count == 0 {
        debug!("No managed procedures in module {}", module);
        return Ok(None);
    }

    parser.seek(begin)?;
    let mut functions = Vec::with_capacity(count);

    scan_records(parser, limit, |parser, header| {
        if !header.kind.is_procedure() {
            return Ok(Resume::RecordEnd);
        }

        let procedure = ProcedureHeader::read(parser, header, options.read_names)?;
        trace!(
            "token={} [{}::{}]",
            procedure.token,
            module,
            procedure.name.as_deref().unwrap_or_default()
        );

        header.checked_end(procedure.end, limit)?;
        parser.seek(header.stop)?;
        functions.push(PdbFunction::decode(module, procedure, header, parser, options)?);

        Ok(Resume::At(parser.pos()))
    })?;

    debug!("Decoded {} managed functions in module {}", functions.len(), module);
    Ok(Some(functions))
}
