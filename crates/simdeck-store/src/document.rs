//! The persisted registry document.
//!
//! The document is a single pretty-printed JSON object. The registry
//! lives under `simulationsRunning`, keyed by type; any other top-level
//! keys are carried through untouched:
//!
//! ```json
//! {
//!   "simulationsRunning": {
//!     "temp": [
//!       {
//!         "simulation": { "name": "heat-run", "description": "", "startFileName": "temp-1.json", "endFileName": "temp-9.json", "type": "temp" },
//!         "isRunning": false
//!       }
//!     ]
//!   }
//! }
//! ```
//!
//! Saves go through a temporary file in the same directory followed by a
//! rename, so a failed save never leaves a truncated document behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use simdeck_core::Registry;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Top-level key holding the registry.
const REGISTRY_KEY: &str = "simulationsRunning";

/// Where the registry key sits among the top-level keys.
#[derive(Debug, Clone, Copy, Default)]
enum Placement {
    /// First key; the layout of a newly built document.
    #[default]
    Leading,
    /// Before the `other` key at this index, or last when past the end.
    At(usize),
    /// The loaded document had no registry key.
    Absent,
}

/// The full registry document.
///
/// A loaded document remembers where `simulationsRunning` sat among the
/// other top-level keys and writes it back at that position. A document
/// that had no registry key gains one, at the end, only once it has a
/// type bucket. Equality ignores key position.
#[derive(Debug, Clone, Default)]
pub struct RegistryDocument {
    /// Type buckets of simulation entries.
    pub registry: Registry,

    /// Other top-level collections, preserved in their original order.
    pub other: Map<String, Value>,

    placement: Placement,
}

impl RegistryDocument {
    /// A document holding only the given registry.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// Serialize with two-space indentation, the document's on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if serialization fails.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(self).map_err(StoreError::Encode)
    }

    fn registry_index(&self) -> Option<usize> {
        match self.placement {
            Placement::Leading => Some(0),
            Placement::At(index) => Some(index),
            Placement::Absent => self
                .registry
                .types()
                .next()
                .is_some()
                .then_some(self.other.len()),
        }
    }

    fn to_object(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let index = self.registry_index();
        let mut registry = index
            .map(|_| serde_json::to_value(&self.registry))
            .transpose()?;

        let mut object = Map::new();
        let others = self.other.iter().filter(|(key, _)| key.as_str() != REGISTRY_KEY);
        for (position, (key, value)) in others.enumerate() {
            if index == Some(position) {
                object.extend(registry.take().map(|r| (REGISTRY_KEY.to_owned(), r)));
            }
            object.insert(key.clone(), value.clone());
        }
        object.extend(registry.map(|r| (REGISTRY_KEY.to_owned(), r)));
        Ok(object)
    }
}

impl PartialEq for RegistryDocument {
    fn eq(&self, other: &Self) -> bool {
        self.registry == other.registry && self.other == other.other
    }
}

impl Eq for RegistryDocument {}

impl Serialize for RegistryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RegistryDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::deserialize(deserializer)?;
        let mut document = Self {
            placement: Placement::Absent,
            ..Self::default()
        };
        for (key, value) in object {
            if key == REGISTRY_KEY {
                document.placement = Placement::At(document.other.len());
                document.registry = serde_json::from_value(value).map_err(D::Error::custom)?;
            } else {
                document.other.insert(key, value);
            }
        }
        Ok(document)
    }
}

/// Loads and saves the registry document at a fixed path.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    path: PathBuf,
    save_retries: u32,
}

impl DocumentStore {
    /// Create a store for the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            save_retries: 0,
        }
    }

    /// Retry a failed save up to `retries` extra times.
    #[must_use]
    pub const fn with_save_retries(mut self, retries: u32) -> Self {
        self.save_retries = retries;
        self
    }

    /// Path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole document.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if the file cannot be read,
    /// [`StoreError::MalformedDocument`] if it does not parse.
    pub async fn load(&self) -> Result<RegistryDocument, StoreError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| StoreError::unavailable(&self.path, source))?;

        let document: RegistryDocument =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::MalformedDocument {
                path: self.path.clone(),
                source,
            })?;

        debug!(
            path = %self.path.display(),
            types = document.registry.types().count(),
            entries = document.registry.len(),
            "Registry document loaded"
        );
        Ok(document)
    }

    /// Replace the document with `document`.
    ///
    /// The write is atomic: readers see either the old or the new
    /// document, never a partial one. Storage failures are retried up to
    /// the configured number of extra attempts.
    ///
    /// # Errors
    ///
    /// [`StoreError::Encode`] if serialization fails, otherwise the last
    /// [`StoreError::StorageUnavailable`] once retries are exhausted.
    pub async fn save(&self, document: &RegistryDocument) -> Result<(), StoreError> {
        let body = document.to_pretty_json()?;
        let mut attempt: u32 = 0;
        loop {
            match self.write_atomic(body.clone()).await {
                Ok(()) => {
                    debug!(
                        path = %self.path.display(),
                        bytes = body.len(),
                        "Registry document saved"
                    );
                    return Ok(());
                }
                Err(e) if attempt < self.save_retries => {
                    attempt = attempt.saturating_add(1);
                    warn!(
                        path = %self.path.display(),
                        attempt,
                        error = %e,
                        "Registry save failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether the document exists on disk.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if existence cannot be checked.
    pub async fn exists(&self) -> Result<bool, StoreError> {
        tokio::fs::try_exists(&self.path)
            .await
            .map_err(|source| StoreError::unavailable(&self.path, source))
    }

    /// Write a fresh document with one empty bucket per type, unless a
    /// document already exists. Returns whether a document was written.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if the check or write fails.
    pub async fn seed(&self, types: &[String]) -> Result<bool, StoreError> {
        if types.is_empty() || self.exists().await? {
            return Ok(false);
        }
        let document = RegistryDocument::new(Registry::with_types(types.iter().cloned()));
        self.save(&document).await?;
        info!(
            path = %self.path.display(),
            types = types.len(),
            "Seeded empty registry document"
        );
        Ok(true)
    }

    async fn write_atomic(&self, body: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &body))
            .await
            .map_err(|e| StoreError::unavailable(&self.path, std::io::Error::other(e)))?
    }
}

fn write_atomic_blocking(path: &Path, body: &[u8]) -> Result<(), StoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let unavailable = |source: std::io::Error| StoreError::unavailable(path, source);

    let mut tmp = NamedTempFile::new_in(parent).map_err(unavailable)?;
    tmp.write_all(body).map_err(unavailable)?;
    tmp.flush().map_err(unavailable)?;
    tmp.as_file().sync_all().map_err(unavailable)?;
    tmp.persist(path).map_err(|e| unavailable(e.error))?;
    Ok(())
}
