// Position-tracking stream adapters.
//
// Record padding is computed against the absolute offset from the start of
// the file, so both directions need to know how many bytes have crossed the
// stream so far. The reader also supports pushing bytes back, which lets the
// decoder probe for a record header and leave the sentinel unconsumed.

use std::io::{self, Read, Write};

/// Record alignment in bytes.
pub const ALIGNMENT: u64 = 8;

/// Chunk size for incremental field reads.
const READ_CHUNK: usize = 64 * 1024;

/// Number of zero bytes needed after `offset` to reach the next 8-byte boundary.
#[inline]
pub fn padding_len(offset: u64) -> usize {
    ((ALIGNMENT - offset % ALIGNMENT) % ALIGNMENT) as usize
}

/// Absolute byte offset of a stream from its start.
pub trait StreamPosition {
    fn position(&self) -> u64;
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reader that counts consumed bytes and can un-read a short probe.
#[derive(Debug)]
pub struct PositionedReader<R> {
    inner: R,
    /// Bytes pushed back by `unread`, served before `inner`.
    pending: Vec<u8>,
    position: u64,
}

impl<R: Read> PositionedReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            position: 0,
        }
    }

    /// Fill as much of `buf` as the input allows.
    ///
    /// Returns fewer than `buf.len()` bytes only at end of input.
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Read up to `len` bytes without allocating `len` upfront.
    ///
    /// A result shorter than `len` means the input ended first.
    pub fn read_bounded(&mut self, len: u64) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(READ_CHUNK as u64) as usize);
        let mut chunk = [0u8; 4096];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(chunk.len() as u64) as usize;
            let n = self.read_up_to(&mut chunk[..want])?;
            out.extend_from_slice(&chunk[..n]);
            if n < want {
                break;
            }
            remaining -= n as u64;
        }
        Ok(out)
    }

    /// Push `bytes` back so the next read returns them first.
    ///
    /// `bytes` must be the most recently read bytes, in order.
    pub(crate) fn unread(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() as u64 <= self.position, "unread past start of stream");
        let mut restored = bytes.to_vec();
        restored.append(&mut self.pending);
        self.pending = restored;
        self.position -= bytes.len() as u64;
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for PositionedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = if self.pending.is_empty() {
            self.inner.read(buf)?
        } else {
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            n
        };
        self.position += n as u64;
        Ok(n)
    }
}

impl<R> StreamPosition for PositionedReader<R> {
    fn position(&self) -> u64 {
        self.position
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writer that counts bytes accepted by the inner sink.
#[derive(Debug)]
pub struct PositionedWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> PositionedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, position: 0 }
    }

    /// Write zero bytes up to the next 8-byte boundary.
    pub fn write_padding(&mut self) -> io::Result<usize> {
        const ZEROES: [u8; ALIGNMENT as usize] = [0; ALIGNMENT as usize];
        let pad = padding_len(self.position);
        self.write_all(&ZEROES[..pad])?;
        Ok(pad)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PositionedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W> StreamPosition for PositionedWriter<W> {
    fn position(&self) -> u64 {
        self.position
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
