use std::process::Command;

use keyring_rewrite::keyring::{Key, KeyringHeader, decode_memory, encode_memory};
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_keyring-rewrite").to_string()
}

fn sample_keyring() -> Vec<u8> {
    let keys = [
        Key::new("percona_binlog", "AES", "", vec![1u8, 2, 3, 4]).unwrap(),
        Key::new("INNODBKey-1", "AES", "", vec![9u8; 32]).unwrap(),
    ];
    encode_memory(&KeyringHeader::with_version(b"1.0"), &keys).unwrap()
}

#[test]
fn cli_rewrite_with_fix() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("keyring");
    let output = dir.path().join("keyring.fixed");
    std::fs::write(&input, sample_keyring()).unwrap();

    let out = Command::new(bin())
        .arg("rewrite")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--fix-percona-binlog")
        .output()
        .unwrap();
    assert!(out.status.success());

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Loaded Key: percona_binlog"));
    assert!(stderr.contains("Wrote Key: percona_binlog:0"));

    let decoded = decode_memory(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(decoded.keys[0].key_id(), b"percona_binlog:0");
    assert_eq!(decoded.keys[1].key_id(), b"INNODBKey-1");
}

#[test]
fn cli_rewrite_without_fix_warns() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("keyring");
    let output = dir.path().join("copy");
    std::fs::write(&input, sample_keyring()).unwrap();

    let out = Command::new(bin())
        .arg("rewrite")
        .arg("--input-keyring")
        .arg(&input)
        .arg("--output-keyring")
        .arg(&output)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("un-versioned"));
    assert_eq!(
        std::fs::read(&output).unwrap(),
        std::fs::read(&input).unwrap()
    );
}

#[test]
fn cli_refuses_existing_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("keyring");
    let output = dir.path().join("taken");
    std::fs::write(&input, sample_keyring()).unwrap();
    std::fs::write(&output, b"keep me").unwrap();

    let out = Command::new(bin())
        .arg("rewrite")
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-f")
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("already exists"));
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");
}

#[test]
fn cli_missing_input_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let st = Command::new(bin())
        .arg("rewrite")
        .arg("-i")
        .arg(dir.path().join("nope"))
        .arg("-o")
        .arg(&output)
        .status()
        .unwrap();
    assert!(!st.success());
    assert!(!output.exists());
}

#[test]
fn cli_list_json() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("keyring");
    std::fs::write(&input, sample_keyring()).unwrap();

    let out = Command::new(bin())
        .args(["--quiet", "--json", "list"])
        .arg(&input)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["keys"][0]["key_id"], "percona_binlog");
    assert_eq!(json["keys"][0]["owner_id"], serde_json::Value::Null);
    assert_eq!(json["keys"][1]["payload_len"], 32);
    assert_eq!(json["sentinel_present"], true);
}
