use crate::symbols::{
    custommetadata::{ASYNC_METHOD_INFO_NAME, MD2_NAME, MSIL_METADATA_GUID},
    kind::{
        S_BLOCK32, S_END, S_GMANPROC, S_LMANPROC, S_MANCONSTANT, S_MANSLOT, S_OEM, S_UNAMESPACE,
    },
};

/// A GUID no decoder knows, for `S_OEM` rejection tests
pub const UNKNOWN_OEM_GUID: [u8; 16] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF,
];

/// Lays out well-formed module symbol streams.
///
/// Procedures and blocks are opened by [`SymbolStreamBuilder::procedure`] and
/// [`SymbolStreamBuilder::block`] and closed by [`SymbolStreamBuilder::end`], which writes the
/// `S_END` record and patches the opener's `end` field to point at it.
#[derive(Default)]
pub struct SymbolStreamBuilder {
    data: Vec<u8>,
    /// Positions of the `end` fields of currently open procedures and blocks
    open: Vec<usize>,
}

impl SymbolStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an `S_LMANPROC` in segment 1 with no links
    pub fn procedure(&mut self, token: u32, address: u32, length: u32, name: &str) -> &mut Self {
        self.procedure_record(S_LMANPROC, 0, 0, token, address, length, 1, name)
    }

    /// Opens an `S_GMANPROC` in segment 1 with no links
    pub fn global_procedure(
        &mut self,
        token: u32,
        address: u32,
        length: u32,
        name: &str,
    ) -> &mut Self {
        self.procedure_record(S_GMANPROC, 0, 0, token, address, length, 1, name)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn procedure_record(
        &mut self,
        kind: u16,
        parent: u32,
        next: u32,
        token: u32,
        address: u32,
        length: u32,
        segment: u16,
        name: &str,
    ) -> &mut Self {
        let start = self.begin(kind);
        self.u32(parent);
        self.open.push(self.data.len());
        self.u32(0); // end, patched by `end()`
        self.u32(next);
        self.u32(length);
        self.u32(0); // debug start
        self.u32(0); // debug end
        self.u32(token);
        self.u32(address);
        self.u16(segment);
        self.data.push(0); // flags
        self.u16(0); // return register
        self.cstring(name);
        self.close(start)
    }

    /// Opens an `S_BLOCK32` in segment 1
    pub fn block(&mut self, address: u32, length: u32) -> &mut Self {
        let start = self.begin(S_BLOCK32);
        self.u32(0); // parent
        self.open.push(self.data.len());
        self.u32(0);
        self.u32(length);
        self.u32(address);
        self.u16(1);
        self.data.push(0); // empty name
        self.close(start)
    }

    pub fn slot(&mut self, index: u32, type_token: u32, name: &str) -> &mut Self {
        let start = self.begin(S_MANSLOT);
        self.u32(index);
        self.u32(type_token);
        self.u32(0); // code offset
        self.u16(1); // code segment
        self.u16(0); // flags
        self.cstring(name);
        self.close(start)
    }

    /// `S_MANCONSTANT` with an inline numeric leaf, `value` must stay below 0x8000
    pub fn constant(&mut self, type_token: u32, value: u16, name: &str) -> &mut Self {
        assert!(value < 0x8000);
        let start = self.begin(S_MANCONSTANT);
        self.u32(type_token);
        self.u16(value);
        self.cstring(name);
        self.close(start)
    }

    pub fn using_namespace(&mut self, name: &str) -> &mut Self {
        let start = self.begin(S_UNAMESPACE);
        self.cstring(name);
        self.close(start)
    }

    /// `S_OEM` with an arbitrary GUID, payload name and raw payload
    pub fn oem(&mut self, guid: [u8; 16], name: &str, payload: &[u8]) -> &mut Self {
        let start = self.oem_header(guid, name);
        self.data.extend_from_slice(payload);
        self.close(start)
    }

    /// `S_OEM` carrying a version 4 `MD2` blob made of `(version, kind, content)` items
    pub fn md2(&mut self, items: &[(u8, u8, Vec<u8>)]) -> &mut Self {
        let start = self.oem_header(MSIL_METADATA_GUID.to_bytes(), MD2_NAME);
        self.data.push(4);
        self.data.push(items.len() as u8);
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        for (version, kind, content) in items {
            self.data.extend_from_slice(&[*version, *kind, 0, 0]);
            self.u32(8 + content.len() as u32);
            self.data.extend_from_slice(content);
        }
        self.close(start)
    }

    /// `S_OEM` carrying `asyncMethodInfo` with `(yield, continuation token, resume)` points
    pub fn async_method_info(
        &mut self,
        kickoff: u32,
        catch_handler: u32,
        points: &[(u32, u32, u32)],
    ) -> &mut Self {
        let start = self.oem_header(MSIL_METADATA_GUID.to_bytes(), ASYNC_METHOD_INFO_NAME);
        self.u32(kickoff);
        self.u32(catch_handler);
        self.u32(points.len() as u32);
        for &(synchronize, continuation, resume) in points {
            self.u32(synchronize);
            self.u32(continuation);
            self.u32(resume);
        }
        self.close(start)
    }

    /// Any record, body given verbatim after the kind tag
    pub fn record(&mut self, kind: u16, body: &[u8]) -> &mut Self {
        let start = self.begin(kind);
        self.data.extend_from_slice(body);
        self.close(start)
    }

    /// Closes the innermost open procedure or block
    pub fn end(&mut self) -> &mut Self {
        let field = self.open.pop().expect("no open procedure or block");
        let position = self.data.len() as u32;
        self.data[field..field + 4].copy_from_slice(&position.to_le_bytes());

        let start = self.begin(S_END);
        self.close(start)
    }

    pub fn finish(&self) -> Vec<u8> {
        assert!(self.open.is_empty(), "unclosed procedure or block");
        self.data.clone()
    }

    fn oem_header(&mut self, guid: [u8; 16], name: &str) -> usize {
        let start = self.begin(S_OEM);
        self.data.extend_from_slice(&guid);
        self.u32(0); // type index
        for unit in name.encode_utf16().chain(Some(0)) {
            self.u16(unit);
        }
        start
    }

    fn begin(&mut self, kind: u16) -> usize {
        let start = self.data.len();
        self.u16(0);
        self.u16(kind);
        start
    }

    fn close(&mut self, start: usize) -> &mut Self {
        let length = (self.data.len() - start - 2) as u16;
        self.data[start..start + 2].copy_from_slice(&length.to_le_bytes());
        self
    }

    fn u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    fn cstring(&mut self, value: &str) {
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
    }
}
