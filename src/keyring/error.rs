// Codec error type shared by the header, record, decoder and encoder.

use std::io;

/// Error raised while decoding or encoding a keyring stream.
///
/// Reaching the end of the record sequence is not an error: record decode
/// reports it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    /// No colon terminator within the scan window, or the version text
    /// after it is cut short.
    #[error("malformed keyring header after {scanned} bytes: {reason}")]
    MalformedHeader { scanned: usize, reason: &'static str },

    /// A declared field length runs past the end of the input.
    #[error(
        "truncated record at offset {offset}: {field} declares {declared} bytes, only {available} available"
    )]
    TruncatedRecord {
        field: &'static str,
        offset: u64,
        declared: u64,
        available: u64,
    },

    /// The record's total size does not fit in a `u64`.
    #[error("record too large: total size overflows u64 ({total} bytes of fields)")]
    RecordTooLarge { total: u128 },

    /// Underlying read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
