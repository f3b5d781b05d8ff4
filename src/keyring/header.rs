// Keyring file header: the textual version prefix at offset 0.
//
// The header is `Keyring file version:` followed by exactly three bytes of
// version text. It has no length prefix; the colon terminates the prefix.
// Bytes are kept verbatim so a rewrite reproduces the header exactly.

use std::io::{self, Read, Write};

use super::error::KeyringError;
use super::stream::PositionedReader;

/// Expected header prefix, up to and including the colon.
pub const FILE_SIGNATURE: &[u8] = b"Keyring file version:";

/// Number of version bytes following the colon.
pub const VERSION_LEN: usize = 3;

/// Maximum number of bytes scanned while looking for the colon.
pub const MAX_HEADER_LEN: usize = 64;

/// Parsed keyring header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyringHeader {
    raw: Vec<u8>,
    version: String,
}

impl KeyringHeader {
    /// Build a standard header for the given version text, e.g. `b"1.0"`.
    pub fn with_version(version: &[u8; VERSION_LEN]) -> Self {
        let mut raw = FILE_SIGNATURE.to_vec();
        raw.extend_from_slice(version);
        Self {
            raw,
            version: String::from_utf8_lossy(version).into_owned(),
        }
    }

    /// All header bytes as read, prefix, colon and version included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Version text, lossily decoded for display.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Length of the header in bytes.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Whether the prefix is the standard `Keyring file version:` text.
    pub fn has_signature(&self) -> bool {
        self.raw.starts_with(FILE_SIGNATURE) && self.raw.len() == FILE_SIGNATURE.len() + VERSION_LEN
    }

    /// Decode the header from the start of a stream.
    ///
    /// Scans byte-by-byte for the colon, giving up after `MAX_HEADER_LEN`
    /// bytes, then reads exactly `VERSION_LEN` version bytes.
    pub fn decode<R: Read>(r: &mut PositionedReader<R>) -> Result<Self, KeyringError> {
        let mut raw = Vec::with_capacity(FILE_SIGNATURE.len() + VERSION_LEN);
        let mut byte = [0u8; 1];

        loop {
            if raw.len() >= MAX_HEADER_LEN {
                return Err(KeyringError::MalformedHeader {
                    scanned: raw.len(),
                    reason: "no ':' terminator within scan window",
                });
            }
            if r.read_up_to(&mut byte)? == 0 {
                return Err(KeyringError::MalformedHeader {
                    scanned: raw.len(),
                    reason: "input ended before ':' terminator",
                });
            }
            raw.push(byte[0]);
            if byte[0] == b':' {
                break;
            }
        }

        let mut version = [0u8; VERSION_LEN];
        let n = r.read_up_to(&mut version)?;
        raw.extend_from_slice(&version[..n]);
        if n < VERSION_LEN {
            return Err(KeyringError::MalformedHeader {
                scanned: raw.len(),
                reason: "version text shorter than 3 bytes",
            });
        }

        let header = Self {
            raw,
            version: String::from_utf8_lossy(&version).into_owned(),
        };
        if !header.has_signature() {
            log::warn!(
                "unexpected keyring header prefix {:?}; copying it verbatim",
                String::from_utf8_lossy(&header.raw)
            );
        }
        Ok(header)
    }

    /// Write the header bytes verbatim.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
