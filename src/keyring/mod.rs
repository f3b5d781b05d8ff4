// Keyring file format (MySQL `keyring_file` plugin container).
//
// A keyring is a textual version header, a sequence of length-prefixed
// 8-byte-aligned key records, and the literal `EOF` sentinel.
//
// # Modules
//
// - `stream`  — Offset-tracking reader/writer and alignment padding
// - `header`  — `Keyring file version:X.Y` header decoding/encoding
// - `record`  — Single key record layout
// - `decoder` — Header + record sequence decoding up to the sentinel
// - `encoder` — Header + record sequence + sentinel emission
// - `error`   — Codec error type

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod record;
pub mod stream;

// Re-export key types for convenience.
pub use decoder::{DecodedKeyring, KeyringDecoder, SENTINEL, decode_memory};
pub use encoder::{KeyringEncoder, encode_memory};
pub use error::KeyringError;
pub use header::{FILE_SIGNATURE, KeyringHeader, MAX_HEADER_LEN};
pub use record::{Key, RECORD_HEADER_SIZE};
pub use stream::{PositionedReader, PositionedWriter, StreamPosition, padding_len};
