#![no_main]

use libfuzzer_sys::fuzz_target;
use pdbscope::{
    symbols::{custommetadata::parse_custom_metadata, decode_module_functions, DecodeOptions},
    Parser,
};

fuzz_target!(|data: &[u8]| {
    let mut parser = Parser::new(data);
    let _ = decode_module_functions("fuzz", &mut parser, data.len(), DecodeOptions::visual_basic());

    let mut parser = Parser::new(data);
    let _ = decode_module_functions("fuzz", &mut parser, data.len(), DecodeOptions::names_skipped());

    let _ = parse_custom_metadata(data);
});
