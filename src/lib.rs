//! Keyring-rewrite: MySQL `keyring_file` container reading and rewriting.
//!
//! The crate provides:
//! - A byte-exact codec for the keyring container format (`keyring`)
//! - The whole-keyring rewrite with the percona_binlog key rename (`rewrite`)
//! - File-oriented helpers with atomic output (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use keyring_rewrite::keyring::{Key, KeyringHeader, decode_memory, encode_memory};
//! use keyring_rewrite::rewrite::{RewriteOptions, rewrite};
//!
//! let key = Key::new("percona_binlog", "AES", "", vec![1u8, 2, 3, 4]).unwrap();
//! let input = encode_memory(&KeyringHeader::with_version(b"1.0"), &[key]).unwrap();
//!
//! let (output, report) = rewrite(input.as_slice(), Vec::new(), &RewriteOptions::with_fix(true)).unwrap();
//! assert_eq!(report.renamed, 1);
//! let keys = decode_memory(&output).unwrap().keys;
//! assert_eq!(keys[0].key_id(), b"percona_binlog:0");
//! ```

pub mod io;
pub mod keyring;
pub mod rewrite;

#[cfg(feature = "cli")]
pub mod cli;
