//! Error types for the gallery publisher.
//!
//! [`PublisherError`] covers the fatal class of failures: configuration and
//! input problems that abort a run immediately. Per-package problems never
//! surface here; stages record them as [`crate::report::StageFailure`]s and
//! carry on with the rest of the batch.

use crate::align::AlignError;
use crate::manifest::ManifestError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Fatal errors that abort a publisher run.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The package root directory does not exist or is not a directory.
    #[error("input directory {path} does not exist or is not a directory")]
    InputDirNotFound {
        /// The configured input directory.
        path: Utf8PathBuf,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration file {path}: {reason}")]
    InvalidConfig {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the read or parse failure.
        reason: String,
    },

    /// The whitelist file could not be read or parsed.
    #[error("invalid whitelist file {path}: {reason}")]
    InvalidWhitelist {
        /// Path to the whitelist file.
        path: Utf8PathBuf,
        /// Description of the read or parse failure.
        reason: String,
    },

    /// The baseline manifest could not be read or parsed.
    #[error("invalid baseline manifest {path}: {reason}")]
    InvalidBaseline {
        /// Path to the baseline manifest.
        path: Utf8PathBuf,
        /// Description of the read or parse failure.
        reason: String,
    },

    /// A descriptor could not be aligned.
    #[error("failed to align {path}: {source}")]
    Align {
        /// The descriptor being rewritten.
        path: Utf8PathBuf,
        /// The underlying alignment error.
        #[source]
        source: AlignError,
    },

    /// Writing a manifest failed.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// A path on disk is not valid UTF-8.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(String),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`PublisherError`].
pub type Result<T> = std::result::Result<T, PublisherError>;
