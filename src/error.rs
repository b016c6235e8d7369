//! Error types for planbench

use std::path::PathBuf;

use thiserror::Error;

/// Core error type
///
/// Only `Config` is batch-aborting. `NamespaceCollision` fails a single
/// trial's submission and is surfaced in the batch report; everything the
/// planner process itself does wrong is contained inside the trial runner
/// and never appears here.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing folders, input files, or invalid keys)
    #[error("configuration error: {0}")]
    Config(String),

    /// A trial's output directory already exists
    #[error("output namespace collision: {} already exists", .path.display())]
    NamespaceCollision {
        /// The raw-log directory that was found pre-existing
        path: PathBuf,
    },

    /// A merged entry violates the planner output contract
    #[error("malformed planner result in {}: {reason}", .path.display())]
    MalformedResult {
        /// File containing the offending entry
        path: PathBuf,
        /// What was missing or wrong
        reason: String,
    },

    /// Filesystem error, with the path it occurred on
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        /// Path the operation failed on
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// JSON (de)serialization error, with the file it occurred on
    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        /// File being read or written
        path: PathBuf,
        /// Underlying serde_json error
        source: serde_json::Error,
    },
}

impl Error {
    /// Build a `Config` error from anything stringly
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Build an `Io` error carrying the offending path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a `Json` error carrying the offending file
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }

    /// Build a `MalformedResult` error
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MalformedResult {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
