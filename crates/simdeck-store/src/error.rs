//! Error types for the storage layer.
//!
//! [`StoreError`] separates durable-storage failures (the document or
//! store directory cannot be read or written) from lookups that simply
//! found nothing, so callers can map each to its own outcome.

use std::path::PathBuf;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Durable storage could not be read or written.
    #[error("storage unavailable at {}: {source}", .path.display())]
    StorageUnavailable {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The registry document exists but does not parse.
    #[error("malformed registry document {}: {source}", .path.display())]
    MalformedDocument {
        /// Path of the document.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// The registry could not be serialized.
    #[error("failed to encode registry document: {0}")]
    Encode(#[source] serde_json::Error),

    /// No file of that name exists in the store.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// The name is not a bare file name (empty, `.`/`..`, or contains a
    /// path separator).
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    /// The file exists but could not be read as text.
    #[error("failed to read file {file_name}: {source}")]
    Unreadable {
        /// Name of the file in the store.
        file_name: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl StoreError {
    /// Build a [`StoreError::StorageUnavailable`] for `path`.
    pub fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source,
        }
    }

    /// Whether this error reflects a durable storage failure, as opposed
    /// to a missing or invalid item.
    pub const fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. } | Self::MalformedDocument { .. }
        )
    }
}
