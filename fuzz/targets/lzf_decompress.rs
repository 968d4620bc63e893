#![no_main]

use libfuzzer_sys::fuzz_target;
use rdb_stream::engine::rdb::lzf;

fuzz_target!(|input: (u16, Vec<u8>)| {
    let (expected, data) = input;

    // Успешный результат всегда имеет заявленную длину.
    if let Ok(out) = lzf::decompress(&data, expected as usize) {
        assert_eq!(out.len(), expected as usize);
    }

    let packed = lzf::compress(&data);
    let restored = lzf::decompress(&packed, data.len()).expect("roundtrip must succeed");
    assert_eq!(restored, data);
});
