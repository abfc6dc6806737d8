//! Error types for the fileconv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the batch cannot start at all (unknown
//!   conversion key, empty batch, bad scale, unreadable input path). Returned
//!   as `Err(ConvertError)` from the top-level `run`/`convert*` functions.
//!
//! * [`JobError`] — **Non-fatal**: a single file failed to decode, encode or
//!   be delivered, but every other file in the batch is unaffected. Stored in
//!   [`crate::output::JobResult`] so callers can inspect partial success.

use crate::job::JobStatus;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the fileconv library.
///
/// Per-file failures use [`JobError`] and are stored in
/// [`crate::output::JobResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Pre-flight errors ─────────────────────────────────────────────────
    /// The conversion key has no registered converter.
    #[error("Conversion type '{key}' is not supported")]
    UnsupportedConversion { key: String },

    /// `run` was called without any input file.
    #[error("No input files were given")]
    EmptyBatch,

    /// Scale factor outside `0.5..=64`.
    #[error("Scale must be between 0.5 and 64, got {value}")]
    InvalidScale { value: f32 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A job was asked to make a transition its state machine forbids.
    #[error("Invalid job transition: {from} → {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to prepare output location '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Some files converted but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any per-file failure as an error.
    #[error("{failed}/{total} files failed during conversion")]
    PartialFailure {
        completed: usize,
        failed: usize,
        total: usize,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single file.
///
/// Recorded on the file's job when it ends in the `Error` state. The rest of
/// the batch keeps running.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum JobError {
    /// Source bytes could not be parsed as the declared media type.
    #[error("could not decode input: {detail}")]
    Decode { detail: String },

    /// The target encoder rejected the decoded content or produced nothing.
    #[error("could not encode output: {detail}")]
    Encode { detail: String },

    /// A drawing surface could not be allocated.
    #[error("could not allocate drawing surface: {detail}")]
    ResourceInit { detail: String },

    /// The output sink refused the converted artifact.
    #[error("could not deliver '{name}': {detail}")]
    Delivery { name: String, detail: String },

    /// The converter task died before returning.
    #[error("converter crashed: {detail}")]
    Internal { detail: String },
}

impl JobError {
    pub fn decode(detail: impl Into<String>) -> Self {
        JobError::Decode {
            detail: detail.into(),
        }
    }

    pub fn encode(detail: impl Into<String>) -> Self {
        JobError::Encode {
            detail: detail.into(),
        }
    }

    pub fn resource(detail: impl Into<String>) -> Self {
        JobError::ResourceInit {
            detail: detail.into(),
        }
    }
}
