// Whole-keyring rewrite with the optional percona_binlog key rename.
//
// A run loads every key, applies the rename to matching identifiers, and
// re-encodes header, keys and sentinel in the original order:
//
//   Idle -> HeaderRead -> Loaded -> HeaderWritten -> RecordsWritten -> Sealed
//
// Any decode or write failure moves the run to `Failed`.

use std::io::{Read, Write};

use crate::keyring::{Key, KeyringDecoder, KeyringEncoder, KeyringError};

/// Key id written by servers before binlog key versioning.
pub const UNVERSIONED_BINLOG_KEY_ID: &[u8] = b"percona_binlog";

/// Key id expected by servers with binlog key versioning.
pub const VERSIONED_BINLOG_KEY_ID: &[u8] = b"percona_binlog:0";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Rename keys whose id equals `target`.
    pub fix: bool,
    /// Key id to look for.
    pub target: Vec<u8>,
    /// Key id written in place of `target` when `fix` is set.
    pub replacement: Vec<u8>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            fix: false,
            target: UNVERSIONED_BINLOG_KEY_ID.to_vec(),
            replacement: VERSIONED_BINLOG_KEY_ID.to_vec(),
        }
    }
}

impl RewriteOptions {
    /// Default target and replacement with the given `fix` flag.
    pub fn with_fix(fix: bool) -> Self {
        Self {
            fix,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Per-key transform
// ---------------------------------------------------------------------------

/// What the transform did to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Key id did not match.
    Unchanged,
    /// Key id matched and was replaced.
    Renamed,
    /// Key id matched but `fix` was off; the key was left alone.
    Unversioned,
}

/// Apply the rename to a single key.
pub fn rewrite_key(key: Key, opts: &RewriteOptions) -> Result<(Key, KeyAction), KeyringError> {
    if key.key_id() != opts.target.as_slice() {
        return Ok((key, KeyAction::Unchanged));
    }
    if opts.fix {
        log::info!("Fixing {} key", String::from_utf8_lossy(&opts.target));
        let renamed = key.with_key_id(opts.replacement.clone())?;
        Ok((renamed, KeyAction::Renamed))
    } else {
        log::warn!(
            "You have an un-versioned {} key, consider using --fix-percona-binlog to fix it.",
            String::from_utf8_lossy(&opts.target)
        );
        Ok((key, KeyAction::Unversioned))
    }
}

/// Keys after the transform, with one action per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub keys: Vec<Key>,
    pub actions: Vec<KeyAction>,
}

impl Rewritten {
    pub fn renamed(&self) -> usize {
        self.count(KeyAction::Renamed)
    }

    pub fn unversioned(&self) -> usize {
        self.count(KeyAction::Unversioned)
    }

    fn count(&self, action: KeyAction) -> usize {
        self.actions.iter().filter(|&&a| a == action).count()
    }
}

/// Apply the rename to every key, keeping order and count.
pub fn rewrite_keys(keys: Vec<Key>, opts: &RewriteOptions) -> Result<Rewritten, KeyringError> {
    let mut out = Rewritten {
        keys: Vec::with_capacity(keys.len()),
        actions: Vec::with_capacity(keys.len()),
    };
    for key in keys {
        let (key, action) = rewrite_key(key, opts)?;
        out.keys.push(key);
        out.actions.push(action);
    }
    if out.renamed() > 1 {
        log::warn!(
            "renamed {} keys to {}; the keyring now holds duplicate ids",
            out.renamed(),
            String::from_utf8_lossy(&opts.replacement)
        );
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Progress of a rewrite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    HeaderRead,
    Loaded,
    HeaderWritten,
    RecordsWritten,
    Sealed,
    Failed,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    /// Version text from the input header.
    pub version: String,
    /// Keys read and written.
    pub keys: u64,
    /// Keys whose id was replaced.
    pub renamed: u64,
    /// Matching keys left alone because `fix` was off.
    pub unversioned: u64,
    /// Whether the input ended with the `EOF` sentinel.
    pub sentinel_present: bool,
    /// Input bytes, trailer included.
    pub bytes_in: u64,
    /// Output bytes, sentinel included.
    pub bytes_out: u64,
}

/// Drives one input keyring to one output keyring.
#[derive(Debug)]
pub struct Rewriter {
    opts: RewriteOptions,
    state: RunState,
}

impl Rewriter {
    pub fn new(opts: RewriteOptions) -> Self {
        Self {
            opts,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.opts
    }

    fn advance(&mut self, next: RunState) {
        log::debug!("rewrite: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Rewrite `input` into `output`, returning the output writer.
    ///
    /// Nothing past the header is written until every key has been decoded,
    /// so a corrupt input leaves at most the header in `output`.
    pub fn run<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<(W, RewriteReport), KeyringError> {
        self.state = RunState::Idle;
        let result = self.drive(input, output);
        if let Err(e) = &result {
            log::debug!("rewrite failed in state {:?}: {e}", self.state);
            self.advance(RunState::Failed);
        }
        result
    }

    fn drive<R: Read, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<(W, RewriteReport), KeyringError> {
        let mut decoder = KeyringDecoder::new(input)?;
        self.advance(RunState::HeaderRead);

        let keys = decoder.read_all()?;
        self.advance(RunState::Loaded);

        let rewritten = rewrite_keys(keys, &self.opts)?;

        let mut encoder = KeyringEncoder::new(output, decoder.header())?;
        log::info!("Wrote new keyring header");
        self.advance(RunState::HeaderWritten);

        for key in &rewritten.keys {
            encoder.write_key(key)?;
            log::info!("Wrote Key: {key}");
        }
        self.advance(RunState::RecordsWritten);

        let keys = encoder.keys_written();
        let (output, bytes_out) = encoder.finish()?;
        self.advance(RunState::Sealed);

        let trailer_len = decoder.trailer().map_or(0, <[u8]>::len) as u64;
        let report = RewriteReport {
            version: decoder.header().version().to_string(),
            keys,
            renamed: rewritten.renamed() as u64,
            unversioned: rewritten.unversioned() as u64,
            sentinel_present: decoder.has_sentinel(),
            bytes_in: decoder.bytes_read() + trailer_len,
            bytes_out,
        };
        Ok((output, report))
    }
}

/// Rewrite `input` into `output` with `opts`.
pub fn rewrite<R: Read, W: Write>(
    input: R,
    output: W,
    opts: &RewriteOptions,
) -> Result<(W, RewriteReport), KeyringError> {
    Rewriter::new(opts.clone()).run(input, output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
