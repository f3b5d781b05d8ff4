// File-level keyring rewrite and inspection.
//
// `rewrite_file()` checks both paths before touching anything, writes the
// new keyring to a temporary file beside the output, fsyncs it, and only
// then links it into place without replacing an existing file. A failed
// run leaves nothing at the output path. Optionally computes streaming
// SHA-256 checksums of input and output (feature-gated behind `file-io`).

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[cfg(feature = "file-io")]
use sha2::Digest;
#[cfg(feature = "file-io")]
use std::io::{Read, Write};
use tempfile::NamedTempFile;

use crate::keyring::{DecodedKeyring, KeyringDecoder, KeyringError};
use crate::rewrite::{RewriteOptions, RewriteReport, rewrite};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `rewrite_file()`.
#[derive(Debug, Clone)]
pub struct RewriteStats {
    /// Counts and sizes from the rewrite itself.
    pub report: RewriteReport,
    /// SHA-256 of the input keyring (if `file-io` feature is enabled).
    pub input_sha256: Option<[u8; 32]>,
    /// SHA-256 of the output keyring (if `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Input path is missing or not a regular file.
    #[error("input keyring {} does not exist", .0.display())]
    InputNotFound(PathBuf),
    /// Output path is already taken.
    #[error("output keyring {} already exists", .0.display())]
    OutputAlreadyExists(PathBuf),
    /// Keyring decode/encode error.
    #[error(transparent)]
    Keyring(#[from] KeyringError),
    /// I/O error (file open, read, write, rename).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

fn check_input(path: &Path) -> Result<(), IoError> {
    if !path.is_file() {
        return Err(IoError::InputNotFound(path.to_path_buf()));
    }
    Ok(())
}

fn check_output(path: &Path) -> Result<(), IoError> {
    // symlink_metadata also catches dangling symlinks.
    if path.symlink_metadata().is_ok() {
        return Err(IoError::OutputAlreadyExists(path.to_path_buf()));
    }
    Ok(())
}

fn output_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

// ---------------------------------------------------------------------------
// rewrite_file
// ---------------------------------------------------------------------------

/// Rewrite the keyring at `input_path` into a new file at `output_path`.
///
/// Fails with `InputNotFound` or `OutputAlreadyExists` before any bytes are
/// read or written. The output appears only once the whole keyring, sentinel
/// included, has been written and synced.
pub fn rewrite_file(
    input_path: &Path,
    output_path: &Path,
    opts: &RewriteOptions,
) -> Result<RewriteStats, IoError> {
    check_input(input_path)?;
    check_output(output_path)?;

    let input_file = File::open(input_path)?;
    let reader = BufReader::with_capacity(BUF_SIZE, input_file);

    let temp = NamedTempFile::new_in(output_dir(output_path))?;
    log::debug!("writing keyring to temporary file {}", temp.path().display());
    let writer = BufWriter::with_capacity(BUF_SIZE, temp);

    #[cfg(feature = "file-io")]
    let (report, temp, input_sha256, output_sha256) = {
        let mut input_hasher = sha2::Sha256::new();
        let mut output_hasher = sha2::Sha256::new();
        let hashing_reader = HashingReader {
            inner: reader,
            hasher: &mut input_hasher,
        };
        let hashing_writer = HashingWriter {
            inner: writer,
            hasher: &mut output_hasher,
        };
        let (hashing_writer, report) = rewrite(hashing_reader, hashing_writer, opts)?;
        let temp = hashing_writer
            .inner
            .into_inner()
            .map_err(|e| e.into_error())?;
        let input_sha256: Option<[u8; 32]> = Some(input_hasher.finalize().into());
        let output_sha256: Option<[u8; 32]> = Some(output_hasher.finalize().into());
        (report, temp, input_sha256, output_sha256)
    };

    #[cfg(not(feature = "file-io"))]
    let (report, temp, input_sha256, output_sha256) = {
        let (writer, report) = rewrite(reader, writer, opts)?;
        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        (report, temp, None::<[u8; 32]>, None::<[u8; 32]>)
    };

    temp.as_file().sync_all()?;
    temp.persist_noclobber(output_path).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            IoError::OutputAlreadyExists(output_path.to_path_buf())
        } else {
            IoError::Io(e.error)
        }
    })?;
    log::debug!("sealed keyring at {}", output_path.display());

    Ok(RewriteStats {
        report,
        input_sha256,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// inspect_file
// ---------------------------------------------------------------------------

/// Decode the keyring at `path` without writing anything.
pub fn inspect_file(path: &Path) -> Result<DecodedKeyring, IoError> {
    check_input(path)?;
    let reader = BufReader::with_capacity(BUF_SIZE, File::open(path)?);
    let mut decoder = KeyringDecoder::new(reader)?;
    let keys = decoder.read_all()?;
    Ok(DecodedKeyring {
        header: decoder.header().clone(),
        keys,
        trailer: decoder.trailer().unwrap_or_default().to_vec(),
    })
}

/// Lowercase hex rendering of a digest.
pub fn hex_digest(digest: &[u8]) -> String {
    use std::fmt::Write as _;
    digest.iter().fold(String::with_capacity(digest.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

// ---------------------------------------------------------------------------
// Hashing adapters (used with file-io feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "file-io")]
struct HashingReader<'a, R: Read> {
    inner: R,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<R: Read> Read for HashingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

#[cfg(feature = "file-io")]
struct HashingWriter<'a, W: Write> {
    inner: W,
    hasher: &'a mut sha2::Sha256,
}

#[cfg(feature = "file-io")]
impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
