#![no_main]
use libfuzzer_sys::fuzz_target;
use keyring_rewrite::keyring::decode_memory;
use keyring_rewrite::rewrite::{RewriteOptions, rewrite};

fuzz_target!(|data: &[u8]| {
    // The decoder must never panic — only return errors.
    let _ = decode_memory(data);

    // Also fuzz record parsing behind a valid header.
    let mut input = b"Keyring file version:1.0".to_vec();
    input.extend_from_slice(data);
    let _ = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::with_fix(true));
});
