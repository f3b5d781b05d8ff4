#![no_main]
use libfuzzer_sys::fuzz_target;
use keyring_rewrite::keyring::{Key, KeyringHeader, decode_memory, encode_memory};

fuzz_target!(|data: &[u8]| {
    // Carve the input into four fields per key using the leading bytes as lengths.
    let mut keys = Vec::new();
    let mut rest = data;
    while rest.len() >= 4 && keys.len() < 16 {
        let lens = [rest[0], rest[1], rest[2], rest[3]].map(usize::from);
        rest = &rest[4..];
        let mut fields: [Vec<u8>; 4] = Default::default();
        for (field, len) in fields.iter_mut().zip(lens) {
            let take = len.min(rest.len());
            *field = rest[..take].to_vec();
            rest = &rest[take..];
        }
        let [id, ty, owner, payload] = fields;
        keys.push(Key::new(id, ty, owner, payload).unwrap());
    }

    let bytes = encode_memory(&KeyringHeader::with_version(b"1.0"), &keys).unwrap();
    let decoded = decode_memory(&bytes).expect("encoded keyring must decode");
    assert_eq!(decoded.keys, keys);
    assert!(decoded.has_sentinel());
});
