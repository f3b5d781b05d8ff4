// Keyring decoder: header, then records until the end-of-stream sentinel.
//
// Decoding stops at the first position where fewer than one record header
// (40 bytes) remain. Those remaining bytes are the trailer, normally the
// literal `EOF`. The trailer is kept for inspection but plays no part in
// deciding where the record sequence ends.

use std::io::Read;

use super::error::KeyringError;
use super::header::KeyringHeader;
use super::record::{Key, RECORD_HEADER_SIZE};
use super::stream::{PositionedReader, StreamPosition};

/// End-of-stream sentinel written after the last record.
pub const SENTINEL: &[u8] = b"EOF";

/// Streaming keyring decoder.
///
/// Yields keys in file order, one at a time.
pub struct KeyringDecoder<R> {
    reader: PositionedReader<R>,
    header: KeyringHeader,
    keys_decoded: u64,
    trailer: Option<Vec<u8>>,
    failed: bool,
}

impl<R: Read> KeyringDecoder<R> {
    /// Read the header and position the decoder at the first record.
    pub fn new(reader: R) -> Result<Self, KeyringError> {
        let mut reader = PositionedReader::new(reader);
        let header = KeyringHeader::decode(&mut reader)?;
        log::info!("Keyring file version: {}", header.version());
        Ok(Self {
            reader,
            header,
            keys_decoded: 0,
            trailer: None,
            failed: false,
        })
    }

    pub fn header(&self) -> &KeyringHeader {
        &self.header
    }

    /// Decode the next key, or `Ok(None)` once the sentinel is reached.
    ///
    /// After `Ok(None)` or an error, further calls return `Ok(None)`.
    pub fn next_key(&mut self) -> Result<Option<Key>, KeyringError> {
        if self.trailer.is_some() || self.failed {
            return Ok(None);
        }
        match Key::decode(&mut self.reader) {
            Ok(Some(key)) => {
                self.keys_decoded += 1;
                log::info!("Loaded Key: {key}");
                Ok(Some(key))
            }
            Ok(None) => {
                self.finish_trailer()?;
                Ok(None)
            }
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }

    /// Capture the trailer without moving the reader past it.
    fn finish_trailer(&mut self) -> Result<(), KeyringError> {
        let mut probe = [0u8; RECORD_HEADER_SIZE];
        let n = self.reader.read_up_to(&mut probe)?;
        self.reader.unread(&probe[..n]);
        let trailer = probe[..n].to_vec();
        if trailer != SENTINEL {
            log::warn!(
                "keyring ends with {:?} instead of the EOF sentinel",
                String::from_utf8_lossy(&trailer)
            );
        }
        self.trailer = Some(trailer);
        Ok(())
    }

    /// Number of keys decoded so far.
    pub fn keys_decoded(&self) -> u64 {
        self.keys_decoded
    }

    /// Bytes consumed from the input, excluding an unconsumed trailer.
    pub fn bytes_read(&self) -> u64 {
        self.reader.position()
    }

    /// Bytes left after the last record, once decoding has finished.
    pub fn trailer(&self) -> Option<&[u8]> {
        self.trailer.as_deref()
    }

    /// Whether the record sequence ended with exactly the `EOF` sentinel.
    pub fn has_sentinel(&self) -> bool {
        self.trailer.as_deref() == Some(SENTINEL)
    }

    /// Decode every remaining key.
    pub fn read_all(&mut self) -> Result<Vec<Key>, KeyringError> {
        let mut keys = Vec::new();
        while let Some(key) = self.next_key()? {
            keys.push(key);
        }
        Ok(keys)
    }
}

impl<R: Read> Iterator for KeyringDecoder<R> {
    type Item = Result<Key, KeyringError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_key().transpose()
    }
}

// ---------------------------------------------------------------------------
// In-memory convenience
// ---------------------------------------------------------------------------

/// A fully decoded keyring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKeyring {
    pub header: KeyringHeader,
    pub keys: Vec<Key>,
    /// Bytes after the last record (normally `EOF`).
    pub trailer: Vec<u8>,
}

impl DecodedKeyring {
    pub fn has_sentinel(&self) -> bool {
        self.trailer == SENTINEL
    }
}

/// Decode a complete keyring held in memory.
pub fn decode_memory(data: &[u8]) -> Result<DecodedKeyring, KeyringError> {
    let mut decoder = KeyringDecoder::new(data)?;
    let keys = decoder.read_all()?;
    let trailer = decoder.trailer().unwrap_or_default().to_vec();
    Ok(DecodedKeyring {
        header: decoder.header,
        keys,
        trailer,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
