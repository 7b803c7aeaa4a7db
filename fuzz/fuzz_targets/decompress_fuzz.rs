#![no_main]
use libfuzzer_sys::fuzz_target;
use savepatch::compress::{self, SaveDecompressor, Type1};

fuzz_target!(|data: &[u8]| {
    // Malformed streams must fail cleanly; the fallback returns the input.
    let _ = Type1.decompress(data);
    let out = compress::decompress_savedata(data.to_vec());
    if !Type1.detect(data) && !data.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
        assert_eq!(out, data);
    }
});
