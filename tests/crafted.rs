/*
Hand-laid module symbol streams, modelled on what the C# compiler emits for:

class Program
{
    static void Main() { }                          // empty body

    static void Slot() { int i = 0; }               // one local, synthesized root scope

    static void Block()
    {
        { int a = 0; int b = 1; }                   // one nested block, no root scope
    }

    static async Task Run() { await Task.Yield(); } // asyncMethodInfo on MoveNext
}
*/

use pdbscope::prelude::*;

const S_END_RECORD: [u8; 4] = [0x02, 0x00, 0x06, 0x00];

#[rustfmt::skip]
const MSIL_GUID_BYTES: [u8; 16] = [
    0xC9, 0x3F, 0xEA, 0xC6, 0xB3, 0x59, 0xD6, 0x49, 0xBC, 0x25, 0x09, 0x02, 0xBB, 0xAB, 0xB4, 0x60,
];

fn decode(data: &[u8]) -> Result<Option<Vec<PdbFunction>>> {
    let mut parser = Parser::new(data);
    decode_module_functions("Program", &mut parser, data.len(), DecodeOptions::default())
}

fn decode_single(data: &[u8]) -> PdbFunction {
    let functions = decode(data).unwrap().unwrap();
    assert_eq!(functions.len(), 1);
    functions.into_iter().next().unwrap()
}

/// `S_LMANPROC` in segment 1 with zero links
fn procedure(end: u32, token: u32, address: u32, length: u32, name: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_le_bytes()); // parent
    body.extend_from_slice(&end.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes()); // next
    body.extend_from_slice(&length.to_le_bytes());
    body.extend_from_slice(&[0x00; 8]); // debug start / end
    body.extend_from_slice(&token.to_le_bytes());
    body.extend_from_slice(&address.to_le_bytes());
    body.extend_from_slice(&[0x01, 0x00, 0x00, 0x00, 0x00]); // segment, flags, return register
    body.extend_from_slice(name.as_bytes());
    body.push(0);
    record(0x112B, &body)
}

fn record(kind: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(body.len() + 4);
    bytes.extend_from_slice(&(body.len() as u16 + 2).to_le_bytes());
    bytes.extend_from_slice(&kind.to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn oem(guid: [u8; 16], name: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = guid.to_vec();
    body.extend_from_slice(&0u32.to_le_bytes());
    for unit in name.encode_utf16().chain(Some(0)) {
        body.extend_from_slice(&unit.to_le_bytes());
    }
    body.extend_from_slice(payload);
    record(0x0404, &body)
}

#[test]
fn empty_procedure() {
    #[rustfmt::skip]
    let data = [
        // S_LMANPROC "Main", end = 0x2E
        0x2C, 0x00, 0x2B, 0x11,
        0x00, 0x00, 0x00, 0x00,     // parent
        0x2E, 0x00, 0x00, 0x00,     // end
        0x00, 0x00, 0x00, 0x00,     // next
        0x20, 0x00, 0x00, 0x00,     // length
        0x00, 0x00, 0x00, 0x00,     // debug start
        0x00, 0x00, 0x00, 0x00,     // debug end
        0x01, 0x00, 0x00, 0x06,     // token
        0x00, 0x01, 0x00, 0x00,     // offset
        0x01, 0x00,                 // segment
        0x00,                       // flags
        0x00, 0x00,                 // return register
        b'M', b'a', b'i', b'n', 0x00,
        // S_END
        0x02, 0x00, 0x06, 0x00,
    ];

    let function = decode_single(&data);
    assert_eq!(function.token, Token::new(0x0600_0001));
    assert_eq!(function.segment, 1);
    assert_eq!(function.address, 0x100);
    assert_eq!(function.length, 0x20);
    assert_eq!(function.name.as_deref(), Some("Main"));
    assert!(function.scopes.is_empty());
    assert!(function.slots.is_empty());
    assert!(function.constants.is_empty());
    assert!(function.used_namespaces.is_empty());
    assert!(function.synchronization.is_none());
}

#[test]
fn single_slot_gets_root_scope() {
    #[rustfmt::skip]
    let slot = [
        // S_MANSLOT "i"
        0x14, 0x00, 0x20, 0x11,
        0x00, 0x00, 0x00, 0x00,     // slot
        0x01, 0x00, 0x00, 0x11,     // type token
        0x00, 0x00, 0x00, 0x00,     // code offset
        0x01, 0x00,                 // code segment
        0x00, 0x00,                 // flags
        b'i', 0x00,
    ];
    let mut data = procedure(0x2E + slot.len() as u32, 0x0600_0002, 0x100, 0x20, "Slot");
    assert_eq!(data.len(), 0x2E);
    data.extend_from_slice(&slot);
    data.extend_from_slice(&S_END_RECORD);

    let function = decode_single(&data);
    assert_eq!(function.slots.len(), 1);
    assert_eq!(function.slots[0].name, "i");
    assert_eq!(function.slot_token, Some(Token::new(0x1100_0001)));

    assert_eq!(function.scopes.len(), 1);
    let root = &function.scopes[0];
    assert_eq!(root.address, 0);
    assert_eq!(root.length, 0x20);
    assert_eq!(root.slots, function.slots);
    assert!(root.scopes.is_empty());
}

#[test]
fn block_with_two_slots_has_no_root() {
    #[rustfmt::skip]
    let data = [
        // 0x00: S_LMANPROC "Main", end = 0x75
        0x2C, 0x00, 0x2B, 0x11,
        0x00, 0x00, 0x00, 0x00, 0x75, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x03, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        b'M', b'a', b'i', b'n', 0x00,
        // 0x2E: S_BLOCK32, end = 0x71, length 0x10, offset 0x108
        0x15, 0x00, 0x03, 0x11,
        0x00, 0x00, 0x00, 0x00, 0x71, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00,
        0x08, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00,
        // 0x45: S_MANSLOT "a"
        0x14, 0x00, 0x20, 0x11,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, b'a', 0x00,
        // 0x5B: S_MANSLOT "b"
        0x14, 0x00, 0x20, 0x11,
        0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, b'b', 0x00,
        // 0x71: S_END (block)
        0x02, 0x00, 0x06, 0x00,
        // 0x75: S_END (procedure)
        0x02, 0x00, 0x06, 0x00,
    ];

    let function = decode_single(&data);
    assert!(function.slots.is_empty());
    assert_eq!(function.scopes.len(), 1);

    let block = &function.scopes[0];
    assert_eq!(block.address, 0x08);
    assert_eq!(block.length, 0x10);
    assert_eq!(block.segment, 1);
    let names: Vec<&str> = block.slots.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(function.slot_token, Some(Token::new(0x1100_0001)));

    // Without a synthesized root every scope is a block and grows under the VB fix
    let mut parser = Parser::new(&data);
    let adjusted =
        decode_module_functions("Program", &mut parser, data.len(), DecodeOptions::visual_basic())
            .unwrap()
            .unwrap();
    assert!(adjusted[0].root_scope().is_none());
    assert_eq!(adjusted[0].scopes[0].length, 0x11);
}

#[test]
fn async_method_info() {
    #[rustfmt::skip]
    let payload = [
        0x05, 0x00, 0x00, 0x06,     // kickoff method
        0x40, 0x00, 0x00, 0x00,     // catch handler offset
        0x01, 0x00, 0x00, 0x00,     // point count
        0x10, 0x00, 0x00, 0x00,     // suspend offset
        0x06, 0x00, 0x00, 0x06,     // continuation method
        0x20, 0x00, 0x00, 0x00,     // continuation offset
    ];
    let oem = oem(MSIL_GUID_BYTES, "asyncMethodInfo", &payload);
    let end = 0x2E + oem.len() as u32;

    let mut data = procedure(end, 0x0600_0006, 0x200, 0x60, "Main");
    data.extend_from_slice(&oem);
    data.extend_from_slice(&S_END_RECORD);

    let function = decode_single(&data);
    let info = function.synchronization.expect("asyncMethodInfo is decoded");
    assert_eq!(info.kickoff_method, Token::new(0x0600_0005));
    assert_eq!(info.catch_handler_offset, 0x40);
    assert_eq!(
        info.points,
        vec![SynchronizationPoint {
            synchronize_offset: 0x10,
            continuation_method: Token::new(0x0600_0006),
            continuation_offset: 0x20,
        }]
    );
    assert!(function.scopes.is_empty());
}

#[test]
fn unknown_oem_guid_is_fatal() {
    let guid = [0xAB; 16];
    let oem = oem(guid, "MD2", &[0x04, 0x00]);
    let end = 0x2E + oem.len() as u32;

    let mut data = procedure(end, 0x0600_0001, 0x100, 0x20, "Main");
    data.extend_from_slice(&oem);
    data.extend_from_slice(&S_END_RECORD);

    match decode(&data) {
        Err(Error::UnknownOemGuid { guid: found, offset, .. }) => {
            assert_eq!(found.to_bytes(), guid);
            assert_eq!(offset, 0x2E);
        }
        other => panic!("expected UnknownOemGuid, got {other:?}"),
    }
}

#[test]
fn md2_metadata_and_offset_stream() {
    // Module streams start with a 4 byte signature, record offsets stay absolute
    let mut data = vec![0x04, 0x00, 0x00, 0x00];

    #[rustfmt::skip]
    let items = [
        // using info: two levels
        0x04, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00,
        0x02, 0x00, 0x01, 0x00, 0x03, 0x00, 0x00, 0x00,
        // forward info
        0x04, 0x01, 0x00, 0x00, 0x0C, 0x00, 0x00, 0x00,
        0x02, 0x00, 0x00, 0x06,
    ];
    // procedure at 0x04, S_OEM at 0x32; "MD2\0" ends at 0x52, version and count
    // bring the cursor to 0x54, which is already aligned
    let mut payload = vec![0x04, 0x02];
    payload.extend_from_slice(&items);
    let oem = oem(MSIL_GUID_BYTES, "MD2", &payload);
    let end = 0x32 + oem.len() as u32;

    data.extend_from_slice(&procedure(end, 0x0600_0003, 0x300, 0x40, "Main"));
    data.extend_from_slice(&oem);
    data.extend_from_slice(&S_END_RECORD);

    let mut parser = Parser::new(&data);
    parser.seek(4).unwrap();
    let functions = decode_module_functions("Program", &mut parser, data.len(), DecodeOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(functions[0].using_counts, vec![1, 3]);
    assert_eq!(functions[0].forward_token, Some(Token::new(0x0600_0002)));
    assert_eq!(parser.pos(), data.len());
}

#[test]
fn block_ending_past_procedure() {
    // The block claims to end past the procedure's S_END
    let block = record(
        0x1103,
        &[
            0x00, 0x00, 0x00, 0x00, 0x49, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x01, 0x00, 0x00,
        ],
    );
    let mut data = procedure(0x45, 0x0600_0001, 0x100, 0x20, "Main");
    data.extend_from_slice(&block);
    assert_eq!(data.len(), 0x45);
    data.extend_from_slice(&S_END_RECORD);
    data.extend_from_slice(&S_END_RECORD);

    assert!(matches!(
        decode(&data),
        Err(Error::EndOutOfRange {
            kind: SymbolKind::Block32,
            end: 0x49,
            limit: 0x45,
            offset: 0x2E,
        })
    ));
}

#[test]
fn body_outside_module_range() {
    #[rustfmt::skip]
    let slot = [
        0x14, 0x00, 0x20, 0x11,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00, b'i', 0x00,
    ];
    let mut data = procedure(0x44, 0x0600_0001, 0x100, 0x20, "Main");
    data.extend_from_slice(&slot);
    data.extend_from_slice(&S_END_RECORD);
    assert_eq!(data.len(), 72);

    // Only the procedure record belongs to the module, its body lies beyond
    let mut parser = Parser::new(&data);
    let result = decode_module_functions("Program", &mut parser, 0x2E, DecodeOptions::default());
    assert!(matches!(
        result,
        Err(Error::EndOutOfRange {
            end: 0x44,
            limit: 0x2E,
            ..
        })
    ));
}

#[test]
fn missing_end() {
    let mut data = procedure(0x2E, 0x0600_0001, 0x100, 0x20, "Main");
    data.extend_from_slice(&record(0x1124, b"System\0"));

    assert!(matches!(
        decode(&data),
        Err(Error::MissingEnd {
            found: SymbolKind::UsingNamespace,
            offset: 0x2E,
        })
    ));
}

#[test]
fn truncated_procedure_record() {
    let mut data = record(0x112A, &[0x00; 14]);
    data.extend_from_slice(&S_END_RECORD);

    assert!(matches!(
        decode(&data),
        Err(Error::RecordTooShort {
            kind: SymbolKind::GlobalManagedProc,
            length: 16,
            minimum: 39,
            offset: 0,
        })
    ));
}

#[test]
fn record_overrunning_module() {
    let mut data = procedure(0x2E, 0x0600_0001, 0x100, 0x20, "Main");
    data.extend_from_slice(&S_END_RECORD);

    let mut parser = Parser::new(&data);
    let result = decode_module_functions("Program", &mut parser, 0x20, DecodeOptions::default());
    assert!(matches!(result, Err(Error::RecordOverrun { limit: 0x20, .. })));
}

#[test]
fn decoding_is_repeatable() {
    let slot = record(
        0x1120,
        &[
            0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
            0x00, 0x00, b'x', 0x00,
        ],
    );
    let mut data = procedure(0x2E + slot.len() as u32, 0x0600_0001, 0x100, 0x20, "Main");
    data.extend_from_slice(&slot);
    data.extend_from_slice(&S_END_RECORD);

    let first = decode(&data).unwrap().unwrap();
    let second = decode(&data).unwrap().unwrap();
    assert_eq!(first, second);

    let vb = first.into_iter().next().unwrap().with_visual_basic_scopes();
    assert_eq!(vb.scopes[0].length, 0x20);
    assert_eq!(vb.clone().with_visual_basic_scopes(), vb);
}
