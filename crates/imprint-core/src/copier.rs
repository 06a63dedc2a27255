//! Single-pass block copier with integrity digests
//!
//! This module moves a source stream into a destination sink:
//! - Fixed 4 MiB blocks for every read, write and digest update
//! - Two MD5 accumulators fed from the same in-memory block
//! - A progress callback after each block
//! - Cooperative cancellation checked at block boundaries
//!
//! There are no retries. A failed read or write aborts the copy with the
//! number of bytes that reached the destination, and the destination is
//! left as-is.

use crate::config::BLOCK_SIZE;
use crate::error::{Error, Result};
use md5::{Digest as _, Md5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// 128-bit MD5 value
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest([u8; 16]);

impl Digest {
    /// Wrap raw digest bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Parse a 32-character hex string
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if hex.len() != 32 || !hex.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    fn from_hasher(hasher: Md5) -> Self {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hasher.finalize());
        Self(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

impl TryFrom<String> for Digest {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Digest::from_hex(&value).ok_or_else(|| format!("invalid MD5 hex digest: {value}"))
    }
}

/// Shared cancellation flag checked between blocks
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Transfer state reported after each block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyProgress {
    /// Bytes written so far
    pub bytes_done: u64,

    /// Declared total size
    pub bytes_total: u64,

    /// Seconds since the copy started
    pub elapsed_seconds: f64,
}

/// Outcome of one copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Sum of all block lengths written to the destination
    pub bytes_written: u64,

    /// Wall-clock duration of the copy
    pub elapsed_seconds: f64,

    /// First digest of the source blocks, reported as the image hash
    pub digest_a: Option<Digest>,

    /// Second digest of the same in-memory blocks, reported as the source hash
    pub digest_b: Option<Digest>,

    /// Whether the copy reached end of stream
    pub success: bool,

    /// Failure description when the copy aborted
    pub error: Option<String>,
}

impl TransferResult {
    /// Record an aborted copy
    pub fn failed(error: &Error, elapsed_seconds: f64) -> Self {
        Self {
            bytes_written: error.bytes_written().unwrap_or(0),
            elapsed_seconds,
            digest_a: None,
            digest_b: None,
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// `Some(true)` when both digests exist and agree, `None` when either is absent
    pub fn digests_match(&self) -> Option<bool> {
        match (self.digest_a, self.digest_b) {
            (Some(a), Some(b)) => Some(a == b),
            _ => None,
        }
    }
}

type ProgressCallback = Box<dyn Fn(&CopyProgress) + Send + Sync>;

/// Block copier from a source stream to a destination sink
pub struct StreamCopier {
    progress_callback: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl StreamCopier {
    /// Create a copier with its own cancellation token
    pub fn new() -> Self {
        Self {
            progress_callback: None,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Set a progress callback, invoked once per block
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CopyProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Get a handle to cancel the copy
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Copy `source` into `destination` until end of stream
    ///
    /// `total_size` is the declared size used for progress reporting; the
    /// loop itself only ends on a zero-length read.
    pub fn copy<R, W>(&self, mut source: R, mut destination: W, total_size: u64) -> Result<TransferResult>
    where
        R: Read,
        W: Write,
    {
        let start = Instant::now();
        let mut buffer = vec![0u8; BLOCK_SIZE];
        let mut image_hasher = Md5::new();
        let mut source_hasher = Md5::new();
        let mut bytes_written = 0u64;

        tracing::debug!("Starting copy of {} bytes in {} byte blocks", total_size, BLOCK_SIZE);

        loop {
            if self.cancel.is_cancelled() {
                tracing::warn!("Copy cancelled after {} bytes", bytes_written);
                return Err(Error::Interrupted { bytes_written });
            }

            let bytes_read = read_block(&mut source, &mut buffer).map_err(|e| Error::ReadFailure {
                bytes_written,
                source: e,
            })?;

            if bytes_read == 0 {
                break;
            }

            let block = &buffer[..bytes_read];
            destination.write_all(block).map_err(|e| Error::WriteFailure {
                bytes_written,
                source: e,
            })?;

            image_hasher.update(block);
            source_hasher.update(block);
            bytes_written += bytes_read as u64;

            if let Some(ref callback) = self.progress_callback {
                callback(&CopyProgress {
                    bytes_done: bytes_written,
                    bytes_total: total_size,
                    elapsed_seconds: start.elapsed().as_secs_f64(),
                });
            }
        }

        destination.flush().map_err(|e| Error::WriteFailure {
            bytes_written,
            source: e,
        })?;

        let elapsed_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            "Copied {} bytes in {:.2}s",
            bytes_written,
            elapsed_seconds
        );

        Ok(TransferResult {
            bytes_written,
            elapsed_seconds,
            digest_a: Some(Digest::from_hasher(image_hasher)),
            digest_b: Some(Digest::from_hasher(source_hasher)),
            success: true,
            error: None,
        })
    }
}

impl Default for StreamCopier {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill the buffer or stop at EOF; interrupted reads are resumed
fn read_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut total_read = 0;

    while total_read < buffer.len() {
        match reader.read(&mut buffer[total_read..]) {
            Ok(0) => break,
            Ok(n) => total_read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(total_read)
}

// ============================================================================
// UNIT TESTS
// ============================================================================
