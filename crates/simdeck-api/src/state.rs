//! Shared application state for the registry API server.
//!
//! [`AppState`] carries no registry data of its own: every request
//! reloads the document through [`DocumentStore`]. It only holds the
//! storage handles, the write rules, and the lock that serializes
//! mutations.

use simdeck_core::{RegistryOptions, SimdeckConfig};
use simdeck_store::{DocumentStore, FileStore};
use tokio::sync::{Mutex, MutexGuard};

/// Shared state for all route handlers, wrapped in `Arc` by the router.
#[derive(Debug)]
pub struct AppState {
    /// The registry document.
    pub documents: DocumentStore,
    /// The simulation data file store.
    pub files: FileStore,
    /// Registry write rules.
    pub options: RegistryOptions,
    /// Maximum concurrent file reads for one range.
    pub fetch_concurrency: usize,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    writes: Mutex<()>,
}

impl AppState {
    /// Create state over the given stores with default rules and limits.
    pub fn new(documents: DocumentStore, files: FileStore) -> Self {
        let defaults = SimdeckConfig::default();
        Self {
            documents,
            files,
            options: RegistryOptions::default(),
            fetch_concurrency: defaults.files.fetch_concurrency,
            max_body_bytes: defaults.server.max_upload_bytes,
            writes: Mutex::new(()),
        }
    }

    /// Build state from a loaded configuration.
    pub fn from_config(config: &SimdeckConfig) -> Self {
        let documents = DocumentStore::new(&config.storage.db_path)
            .with_save_retries(config.storage.save_retries);
        let files = FileStore::new(&config.storage.uploads_dir, config.storage.staging_dir());

        Self {
            options: config.registry.into(),
            fetch_concurrency: config.files.fetch_concurrency,
            max_body_bytes: config.server.max_upload_bytes,
            ..Self::new(documents, files)
        }
    }

    /// Replace the registry write rules.
    #[must_use]
    pub const fn with_options(mut self, options: RegistryOptions) -> Self {
        self.options = options;
        self
    }

    /// Wait for exclusive access to the registry document.
    ///
    /// Every load, mutate, save sequence must hold this guard throughout.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }
}
