//! Error types for the ordertally library.
//!
//! The scan pipeline itself has no error channel. An unrecognised line is
//! skipped, an unresolvable vendor becomes `"Unknown Store"`, and a document
//! that never stops growing is parsed as far as it got. None of those reach
//! the caller as an `Err`.
//!
//! [`OrderTallyError`] therefore only covers the surfaces around the
//! pipeline: configuration validation, reading recorded fixtures, and the
//! job-state store. A failed store write means the host environment is
//! broken, not that the scan went wrong.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the ordertally library.
#[derive(Debug, Error)]
pub enum OrderTallyError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Fixture file was not found at the given path.
    #[error("Fixture file not found: '{path}'\nCheck the path exists and is readable.")]
    FixtureNotFound { path: PathBuf },

    /// Fixture file exists but could not be read as UTF-8 text.
    #[error("Failed to read fixture '{path}': {source}")]
    FixtureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Job store errors ──────────────────────────────────────────────────
    /// Persisting a job state failed.
    #[error("Failed to write job state for target '{target}': {detail}")]
    StoreWrite { target: String, detail: String },

    /// Loading a persisted job state failed.
    #[error("Failed to read job state for target '{target}': {detail}")]
    StoreRead { target: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a report file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
