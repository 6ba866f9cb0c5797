//! Storage layer for the Simdeck simulation registry.
//!
//! Two stores live here:
//!
//! - [`DocumentStore`] loads and atomically saves the single registry
//!   document (`db.json`). Every request reloads it; nothing is cached.
//! - [`FileStore`] serves simulation data files by name, classifies their
//!   content type, and places staged uploads into the store.
//!
//! All file system access goes through `tokio::fs` or
//! `tokio::task::spawn_blocking`, so callers never block the runtime.

pub mod document;
pub mod error;
pub mod files;

pub use document::{DocumentStore, RegistryDocument};
pub use error::StoreError;
pub use files::{FileStore, StagedUpload, StagingWriter, classify, validate_file_name};
