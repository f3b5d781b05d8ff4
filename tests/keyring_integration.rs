use keyring_rewrite::keyring::{
    Key, KeyringDecoder, KeyringError, KeyringHeader, PositionedReader, decode_memory,
    encode_memory,
};
use keyring_rewrite::rewrite::{RewriteOptions, rewrite};

fn u64_at(buf: &[u8], at: usize) -> u64 {
    u64::from_ne_bytes(buf[at..at + 8].try_into().unwrap())
}

/// Hand-assembled keyring with a single percona_binlog system key.
fn legacy_keyring() -> Vec<u8> {
    let mut buf = b"Keyring file version:1.0".to_vec();
    for v in [61u64, 14, 3, 0, 4] {
        buf.extend_from_slice(&v.to_ne_bytes());
    }
    buf.extend_from_slice(b"percona_binlog");
    buf.extend_from_slice(b"AES");
    buf.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
    buf.extend_from_slice(&[0, 0, 0]);
    buf.extend_from_slice(b"EOF");
    buf
}

#[test]
fn hand_built_keyring_decodes() {
    let decoded = decode_memory(&legacy_keyring()).unwrap();
    assert_eq!(decoded.header.raw(), b"Keyring file version:1.0");
    assert_eq!(decoded.keys.len(), 1);
    let key = &decoded.keys[0];
    assert_eq!(key.key_id(), b"percona_binlog");
    assert_eq!(key.key_type(), b"AES");
    assert!(key.is_system());
    assert_eq!(key.payload(), &[1, 2, 3, 4]);
}

#[test]
fn fix_renames_binlog_key_byte_exact() {
    let (out, report) = rewrite(
        legacy_keyring().as_slice(),
        Vec::new(),
        &RewriteOptions::with_fix(true),
    )
    .unwrap();
    assert_eq!(report.renamed, 1);

    assert_eq!(&out[..24], b"Keyring file version:1.0");
    // Record header: size recomputed for the 2-byte-longer id.
    assert_eq!(u64_at(&out, 24), 63);
    assert_eq!(u64_at(&out, 32), 16);
    assert_eq!(u64_at(&out, 40), 3);
    assert_eq!(u64_at(&out, 48), 0);
    assert_eq!(u64_at(&out, 56), 4);
    assert_eq!(&out[64..80], b"percona_binlog:0");
    assert_eq!(&out[80..83], b"AES");
    assert_eq!(&out[83..87], &[1, 2, 3, 4]);
    // 24 + 63 = 87, padded to 88.
    assert_eq!(out[87], 0);
    assert_eq!(&out[88..], b"EOF");
    assert_eq!(out.len(), 91);
}

#[test]
fn no_fix_reproduces_input() {
    let input = legacy_keyring();
    let (out, report) = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::default()).unwrap();
    assert_eq!(out, input);
    assert_eq!(report.unversioned, 1);
    assert_eq!(report.renamed, 0);
}

#[test]
fn stale_size_field_is_recomputed() {
    let mut input = legacy_keyring();
    input[24..32].copy_from_slice(&12345u64.to_ne_bytes());
    let (out, _) = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::default()).unwrap();
    assert_eq!(out, legacy_keyring());
}

#[test]
fn sentinel_appears_once_at_end() {
    let keys: Vec<Key> = (0..5)
        .map(|i| Key::new(format!("key-{i}"), "AES", "", vec![b'E'; i * 3]).unwrap())
        .collect();
    let out = encode_memory(&KeyringHeader::with_version(b"1.0"), &keys).unwrap();
    let hits = out.windows(3).filter(|w| *w == b"EOF").count();
    assert_eq!(hits, 1);
    assert!(out.ends_with(b"EOF"));
    assert_eq!((out.len() - 3) % 8, 0);
}

#[test]
fn mixed_keyring_keeps_order_and_other_keys() {
    let keys = vec![
        Key::new("INNODBKey-7c1e-1", "AES", "", vec![0x11u8; 32]).unwrap(),
        Key::new("percona_binlog", "AES", "", vec![0x22u8; 16]).unwrap(),
        Key::new("app_key", "RSA", "app@localhost", vec![0x33u8; 256]).unwrap(),
        Key::new("percona_binlog:1", "AES", "", vec![0x44u8; 16]).unwrap(),
    ];
    let input = encode_memory(&KeyringHeader::with_version(b"1.0"), &keys).unwrap();
    let (out, _) = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::with_fix(true)).unwrap();
    let decoded = decode_memory(&out).unwrap();

    assert_eq!(decoded.keys.len(), 4);
    assert_eq!(decoded.keys[0], keys[0]);
    assert_eq!(decoded.keys[1].key_id(), b"percona_binlog:0");
    assert_eq!(decoded.keys[1].payload(), keys[1].payload());
    assert_eq!(decoded.keys[2], keys[2]);
    assert_eq!(decoded.keys[3], keys[3]);
}

#[test]
fn nonstandard_header_is_replayed_verbatim() {
    let keys = [
        Key::new("k", "AES", "", vec![1u8]).unwrap(),
        Key::new("percona_binlog", "AES", "", vec![2u8; 16]).unwrap(),
    ];
    let mut reader = PositionedReader::new(&b"Other keyring:2.0"[..]);
    let header = KeyringHeader::decode(&mut reader).unwrap();
    assert!(!header.has_signature());
    assert_eq!(header.raw(), b"Other keyring:2.0");

    let input = encode_memory(&header, &keys).unwrap();
    assert!(input.starts_with(b"Other keyring:2.0"));
    let (out, report) = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::default()).unwrap();
    assert_eq!(report.version, "2.0");
    assert_eq!(report.keys, 2);
    assert!(report.sentinel_present);
    assert_eq!(out, input);

    // The odd header length shifts padding; the fixed output must still decode.
    let (fixed, _) = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::with_fix(true)).unwrap();
    assert!(fixed.starts_with(b"Other keyring:2.0"));
    let decoded = decode_memory(&fixed).unwrap();
    assert_eq!(decoded.keys[1].key_id(), b"percona_binlog:0");
    assert!(decoded.has_sentinel());
}

#[test]
fn truncation_anywhere_inside_a_record_fails() {
    let input = legacy_keyring();
    // Header ends at 24, record header at 64, fields at 85, padding at 88.
    for cut in 64..88 {
        let err = decode_memory(&input[..cut]).unwrap_err();
        assert!(
            matches!(err, KeyringError::TruncatedRecord { .. }),
            "cut at {cut}: {err:?}"
        );
    }
}

#[test]
fn short_tail_after_header_is_end_of_stream() {
    let input = legacy_keyring();
    // Fewer than 40 bytes after the header: nothing to decode, not an error.
    for cut in 24..64 {
        let decoded = decode_memory(&input[..cut]).unwrap();
        assert!(decoded.keys.is_empty());
        assert_eq!(decoded.trailer, &input[24..cut]);
    }
}

#[test]
fn decoder_streams_from_reader() {
    let mut decoder = KeyringDecoder::new(std::io::Cursor::new(legacy_keyring())).unwrap();
    let first = decoder.next().unwrap().unwrap();
    assert_eq!(first.key_id(), b"percona_binlog");
    assert!(decoder.next().is_none());
    assert!(decoder.has_sentinel());
}
