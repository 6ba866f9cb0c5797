//! Error types for the server binary.
//!
//! [`StartupError`] wraps every failure that can stop the server from
//! coming up, so `main` can propagate with `?`.

use std::path::PathBuf;

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error in {}: {source}", .path.display())]
    Config {
        /// The configuration file being loaded.
        path: PathBuf,
        /// The underlying config error.
        source: simdeck_core::ConfigError,
    },

    /// The registry document or file store could not be prepared.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: simdeck_store::StoreError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: simdeck_api::ServerError,
    },
}
