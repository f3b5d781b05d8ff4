// Keyring record ("key") encoding/decoding.
//
// Layout, all integers u64 in native byte order:
//
//   [pod_size][key_id_len][key_type_len][owner_id_len][payload_len]
//   [key_id][key_type][owner_id][payload][zero padding]
//
// `pod_size` covers the whole record including the five length fields but
// excluding padding. Padding brings the absolute file offset to a multiple
// of 8.

use std::fmt;
use std::io::{self, Read, Write};

use super::error::KeyringError;
use super::stream::{PositionedReader, PositionedWriter, StreamPosition, padding_len};

/// Size of one length field.
pub const LEN_FIELD_SIZE: usize = 8;

/// Number of length fields in a record header.
pub const LEN_FIELD_COUNT: usize = 5;

/// Size of the record header (`pod_size` plus four field lengths).
pub const RECORD_HEADER_SIZE: usize = LEN_FIELD_SIZE * LEN_FIELD_COUNT;

const FIELD_NAMES: [&str; 4] = ["key_id", "key_type", "owner_id", "payload"];

/// One keyring entry.
///
/// Fields are opaque bytes. An empty `owner_id` marks a system key.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    key_id: Vec<u8>,
    key_type: Vec<u8>,
    owner_id: Vec<u8>,
    payload: Vec<u8>,
}

impl Key {
    /// Construct a key, rejecting field sets whose total size overflows `u64`.
    pub fn new(
        key_id: impl Into<Vec<u8>>,
        key_type: impl Into<Vec<u8>>,
        owner_id: impl Into<Vec<u8>>,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, KeyringError> {
        let key = Self {
            key_id: key_id.into(),
            key_type: key_type.into(),
            owner_id: owner_id.into(),
            payload: payload.into(),
        };
        key.checked_pod_size()?;
        Ok(key)
    }

    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }

    pub fn key_type(&self) -> &[u8] {
        &self.key_type
    }

    pub fn owner_id(&self) -> &[u8] {
        &self.owner_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True for keys with no owning user.
    pub fn is_system(&self) -> bool {
        self.owner_id.is_empty()
    }

    /// Return a copy of this key under a new identifier.
    pub fn with_key_id(&self, key_id: impl Into<Vec<u8>>) -> Result<Self, KeyringError> {
        Self::new(
            key_id,
            self.key_type.clone(),
            self.owner_id.clone(),
            self.payload.clone(),
        )
    }

    /// Record size including the length header, excluding padding.
    ///
    /// Always derived from the current field lengths.
    pub fn pod_size(&self) -> u64 {
        // Construction guarantees this fits.
        self.field_lens().iter().sum::<u64>() + RECORD_HEADER_SIZE as u64
    }

    fn checked_pod_size(&self) -> Result<u64, KeyringError> {
        let total: u128 = self.field_lens().iter().map(|&l| u128::from(l)).sum::<u128>()
            + RECORD_HEADER_SIZE as u128;
        u64::try_from(total).map_err(|_| KeyringError::RecordTooLarge { total })
    }

    fn field_lens(&self) -> [u64; 4] {
        [
            self.key_id.len() as u64,
            self.key_type.len() as u64,
            self.owner_id.len() as u64,
            self.payload.len() as u64,
        ]
    }

    /// Encode this key at the writer's current offset, padding included.
    ///
    /// Returns the number of bytes written.
    pub fn encode<W: Write>(&self, w: &mut PositionedWriter<W>) -> io::Result<u64> {
        let start = w.position();

        let mut header = [0u8; RECORD_HEADER_SIZE];
        let lens = self.field_lens();
        header[..LEN_FIELD_SIZE].copy_from_slice(&self.pod_size().to_ne_bytes());
        for (i, len) in lens.iter().enumerate() {
            let at = (i + 1) * LEN_FIELD_SIZE;
            header[at..at + LEN_FIELD_SIZE].copy_from_slice(&len.to_ne_bytes());
        }
        w.write_all(&header)?;

        w.write_all(&self.key_id)?;
        w.write_all(&self.key_type)?;
        w.write_all(&self.owner_id)?;
        w.write_all(&self.payload)?;
        w.write_padding()?;

        Ok(w.position() - start)
    }

    /// Decode one key from the reader's current offset.
    ///
    /// Returns `Ok(None)` when fewer than `RECORD_HEADER_SIZE` bytes remain;
    /// those bytes are pushed back so the reader stays at the sentinel.
    /// A field cut short by end of input is `TruncatedRecord`.
    pub fn decode<R: Read>(r: &mut PositionedReader<R>) -> Result<Option<Self>, KeyringError> {
        let mut header = [0u8; RECORD_HEADER_SIZE];
        let n = r.read_up_to(&mut header)?;
        if n < RECORD_HEADER_SIZE {
            r.unread(&header[..n]);
            return Ok(None);
        }

        let word = |i: usize| {
            let mut b = [0u8; LEN_FIELD_SIZE];
            b.copy_from_slice(&header[i * LEN_FIELD_SIZE..(i + 1) * LEN_FIELD_SIZE]);
            u64::from_ne_bytes(b)
        };
        let declared_size = word(0);

        let mut fields: [Vec<u8>; 4] = Default::default();
        for (i, field) in fields.iter_mut().enumerate() {
            let declared = word(i + 1);
            let offset = r.position();
            let bytes = r.read_bounded(declared)?;
            if (bytes.len() as u64) < declared {
                return Err(KeyringError::TruncatedRecord {
                    field: FIELD_NAMES[i],
                    offset,
                    declared,
                    available: bytes.len() as u64,
                });
            }
            *field = bytes;
        }

        let mut padding = [0u8; 8];
        let pad = padding_len(r.position());
        let got = r.read_up_to(&mut padding[..pad])?;
        if got < pad {
            return Err(KeyringError::TruncatedRecord {
                field: "padding",
                offset: r.position() - got as u64,
                declared: pad as u64,
                available: got as u64,
            });
        }

        let [key_id, key_type, owner_id, payload] = fields;
        let key = Self::new(key_id, key_type, owner_id, payload)?;
        if declared_size != key.pod_size() {
            log::warn!(
                "key {}: stored size {declared_size} differs from computed {}; recomputing",
                String::from_utf8_lossy(&key.key_id),
                key.pod_size()
            );
        }
        Ok(Some(key))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payload bytes are key material; only the length is shown.
        f.debug_struct("Key")
            .field("key_id", &String::from_utf8_lossy(&self.key_id))
            .field("key_type", &String::from_utf8_lossy(&self.key_type))
            .field("owner_id", &String::from_utf8_lossy(&self.owner_id))
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = if self.is_system() {
            "SYSTEM".into()
        } else {
            String::from_utf8_lossy(&self.owner_id)
        };
        write!(
            f,
            "{} Type: {}, User: {}",
            String::from_utf8_lossy(&self.key_id),
            String::from_utf8_lossy(&self.key_type),
            owner
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
