//! Error types for InternScout.
//!
//! Library crates use [`InternScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all InternScout operations.
#[derive(Debug, thiserror::Error)]
pub enum InternScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The posting feed could not be fetched or decoded. Fatal to a run.
    #[error("feed unavailable: {0}")]
    FeedUnavailable(String),

    /// A browser session could not be created or driven.
    #[error("browser error: {0}")]
    Browser(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The progress checkpoint could not be read or written.
    #[error("checkpoint error at {path:?}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad record, invalid argument, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, InternScoutError>;

impl InternScoutError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a checkpoint error for the given file.
    pub fn checkpoint(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Checkpoint {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = InternScoutError::config("worker_count must be at least 1");
        assert_eq!(err.to_string(), "config error: worker_count must be at least 1");

        let err = InternScoutError::FeedUnavailable("HTTP 503".into());
        assert!(err.to_string().contains("HTTP 503"));

        let err = InternScoutError::checkpoint("progress.json", "disk full");
        assert!(err.to_string().contains("progress.json"));
        assert!(err.to_string().contains("disk full"));
    }
}
