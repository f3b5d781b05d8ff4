// Keyring encoder: header, records, then the `EOF` sentinel.
//
// Each record's size field is recomputed from its current fields and its
// padding is computed from the absolute output offset, so the encoder
// produces the same bytes for the same keys regardless of where they came
// from.

use std::io::Write;

use super::decoder::SENTINEL;
use super::error::KeyringError;
use super::header::KeyringHeader;
use super::record::Key;
use super::stream::{PositionedWriter, StreamPosition};

/// Streaming keyring encoder.
///
/// The header is written on construction; `finish` appends the sentinel.
/// Dropping the encoder without `finish` leaves an unsealed stream.
pub struct KeyringEncoder<W: Write> {
    writer: PositionedWriter<W>,
    keys_written: u64,
}

impl<W: Write> KeyringEncoder<W> {
    /// Start a keyring by writing `header` verbatim.
    pub fn new(writer: W, header: &KeyringHeader) -> Result<Self, KeyringError> {
        let mut writer = PositionedWriter::new(writer);
        header.encode(&mut writer)?;
        Ok(Self {
            writer,
            keys_written: 0,
        })
    }

    /// Append one key with its padding.
    pub fn write_key(&mut self, key: &Key) -> Result<(), KeyringError> {
        key.encode(&mut self.writer)?;
        self.keys_written += 1;
        Ok(())
    }

    /// Number of keys written so far.
    pub fn keys_written(&self) -> u64 {
        self.keys_written
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.writer.position()
    }

    /// Write the sentinel, flush, and return the inner writer with the
    /// final byte count.
    pub fn finish(mut self) -> Result<(W, u64), KeyringError> {
        self.writer.write_all(SENTINEL)?;
        self.writer.flush()?;
        let total = self.writer.position();
        Ok((self.writer.into_inner(), total))
    }
}

/// Encode a complete keyring into memory.
pub fn encode_memory(header: &KeyringHeader, keys: &[Key]) -> Result<Vec<u8>, KeyringError> {
    let mut encoder = KeyringEncoder::new(Vec::new(), header)?;
    for key in keys {
        encoder.write_key(key)?;
    }
    let (out, _) = encoder.finish()?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
