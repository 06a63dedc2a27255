//! Error types for the Imprint core library

use std::path::PathBuf;
use thiserror::Error;

/// Process exit statuses reported by the `imprint` binary
pub mod exit_code {
    /// Run completed and both digests agree
    pub const SUCCESS: i32 = 0;
    /// Fatal failure: source, destination, privilege or overwrite refusal
    pub const FAILURE: i32 = 1;
    /// Image produced but the integrity digests disagree
    pub const INTEGRITY_MISMATCH: i32 = 2;
    /// Operator interrupted the copy
    pub const INTERRUPTED: i32 = 130;
}

/// Main error type for Imprint operations
#[derive(Error, Debug)]
pub enum Error {
    /// Source device could not be opened or stat'd
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        /// Path of the source stream
        path: PathBuf,
        /// Underlying cause
        source: std::io::Error,
    },

    /// Reading from the source failed mid-stream
    #[error("Read failed after {bytes_written} bytes: {source}")]
    ReadFailure {
        /// Bytes written to the destination before the failure
        bytes_written: u64,
        /// Underlying cause
        source: std::io::Error,
    },

    /// Creating or writing the destination failed (including disk full)
    #[error("Write failed after {bytes_written} bytes: {source}")]
    WriteFailure {
        /// Bytes written to the destination before the failure
        bytes_written: u64,
        /// Underlying cause
        source: std::io::Error,
    },

    /// Copy stopped at a block boundary after a cancellation request
    #[error("Interrupted after {bytes_written} bytes")]
    Interrupted {
        /// Bytes written before the interruption
        bytes_written: u64,
    },

    /// Structural validator executable is not installed
    #[error("Structural validator not found: {0}")]
    ValidatorMissing(String),

    /// Structural validator ran but failed
    #[error("Structural validator failed: {0}")]
    ValidatorExecutionFailed(String),

    /// Structural validator output could not be parsed
    #[error("Could not parse structural validator output: {0}")]
    ValidatorParseFailed(String),

    /// Destination image exists and the operator declined to replace it
    #[error("Refusing to overwrite existing image: {}", .0.display())]
    OverwriteDeclined(PathBuf),

    /// Root privileges are needed to access raw devices
    #[error("Root privileges required: {0}")]
    PrivilegeRequired(String),

    /// Run configuration is incomplete or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Manifest could not be serialized or parsed
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// IO error outside the copy loop (log, manifest, directories)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit status the process should report for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Interrupted { .. } => exit_code::INTERRUPTED,
            _ => exit_code::FAILURE,
        }
    }

    /// Bytes that reached the destination before a copy failure, if any
    pub fn bytes_written(&self) -> Option<u64> {
        match self {
            Error::ReadFailure { bytes_written, .. }
            | Error::WriteFailure { bytes_written, .. }
            | Error::Interrupted { bytes_written } => Some(*bytes_written),
            _ => None,
        }
    }
}

/// Result type alias using the Imprint error type
pub type Result<T> = std::result::Result<T, Error>;
