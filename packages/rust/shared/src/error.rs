//! Error types for mediaqueue.
//!
//! Library crates use [`MediaQueueError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all mediaqueue operations.
#[derive(Debug, thiserror::Error)]
pub enum MediaQueueError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The target document has no element carrying the marker id.
    #[error("marker element with id \"{marker_id}\" not found")]
    MarkerNotFound { marker_id: String },

    /// A record cannot be rendered into a fragment.
    #[error("render error: {0}")]
    Render(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MediaQueueError>;

impl MediaQueueError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a marker-not-found error for the given marker id.
    pub fn marker_not_found(marker_id: impl Into<String>) -> Self {
        Self::MarkerNotFound {
            marker_id: marker_id.into(),
        }
    }
}

impl From<serde_json::Error> for MediaQueueError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MediaQueueError::config("max_per_run must be at least 1");
        assert_eq!(err.to_string(), "config error: max_per_run must be at least 1");

        let err = MediaQueueError::marker_not_found("submissions");
        assert!(err.to_string().contains("\"submissions\""));
    }

    #[test]
    fn json_failure_maps_to_serialization() {
        let err: MediaQueueError = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err().into();
        assert!(matches!(err, MediaQueueError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error:"));
    }

    #[test]
    fn io_error_keeps_path() {
        let err = MediaQueueError::io(
            "data/queue.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("data/queue.json"));
    }
}
