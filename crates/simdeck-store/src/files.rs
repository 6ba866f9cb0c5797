//! The simulation data file store.
//!
//! Files live flat in one directory and are addressed by bare file name.
//! Uploads are first streamed into a staging directory through a
//! [`StagingWriter`], then moved into the store with [`FileStore::place`].
//! A staged file that is never placed is deleted when dropped.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use futures::{StreamExt, TryStreamExt};
use simdeck_core::FileRange;
use simdeck_types::{FileRecord, MimeType};
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StoreError;

/// Classify a file by extension: `.txt` is plain text, anything else is
/// generic binary.
pub fn classify(file_name: &str) -> MimeType {
    match Path::new(file_name).extension().and_then(OsStr::to_str) {
        Some("txt") => MimeType::TextPlain,
        _ => MimeType::OctetStream,
    }
}

/// Check that `file_name` is a bare file name that stays inside the store.
///
/// # Errors
///
/// [`StoreError::InvalidFileName`] if the name is empty, `.` or `..`, or
/// contains a path separator or NUL byte.
pub fn validate_file_name(file_name: &str) -> Result<(), StoreError> {
    let bad = file_name.is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidFileName(file_name.to_owned()));
    }
    Ok(())
}

/// A directory of simulation data files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    staging: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`, staging uploads in `staging`.
    ///
    /// `staging` must be on the same filesystem as `root` so that placing
    /// an upload is a rename.
    pub fn new(root: impl Into<PathBuf>, staging: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging: staging.into(),
        }
    }

    /// The store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The staging directory.
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Create the store and staging directories if they are missing.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if a directory cannot be created.
    pub async fn ensure_dirs(&self) -> Result<(), StoreError> {
        for dir in [&self.root, &self.staging] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::unavailable(dir, source))?;
        }
        Ok(())
    }

    /// Read one file with its content-type classification.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidFileName`] if the name is not a bare file name
    /// - [`StoreError::FileNotFound`] if no such file exists
    /// - [`StoreError::Unreadable`] if it exists but cannot be read as text
    pub async fn fetch(&self, file_name: &str) -> Result<FileRecord, StoreError> {
        validate_file_name(file_name)?;
        let path = self.root.join(file_name);

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(FileRecord {
                file_name: file_name.to_owned(),
                content,
                mime_type: classify(file_name),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::FileNotFound(file_name.to_owned()))
            }
            Err(source) => Err(StoreError::Unreadable {
                file_name: file_name.to_owned(),
                source,
            }),
        }
    }

    /// Read every file of `range` in ascending index order.
    ///
    /// Up to `concurrency` reads run at once; results keep range order.
    /// The first failure aborts the whole retrieval.
    ///
    /// # Errors
    ///
    /// The first error returned by [`FileStore::fetch`].
    pub async fn fetch_range(
        &self,
        range: &FileRange,
        concurrency: usize,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let records: Vec<FileRecord> = futures::stream::iter(range.iter())
            .map(|file_name| async move { self.fetch(&file_name).await })
            .buffered(concurrency.max(1))
            .try_collect()
            .await?;

        debug!(
            start = range.start(),
            end = range.end(),
            files = records.len(),
            "File range fetched"
        );
        Ok(records)
    }

    /// Open a staging file for an upload called `original_name`.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidFileName`] if `original_name` is not a bare
    /// file name, [`StoreError::StorageUnavailable`] if the staging file
    /// cannot be created.
    pub async fn begin_upload(&self, original_name: &str) -> Result<StagingWriter, StoreError> {
        validate_file_name(original_name)?;
        let staging = self.staging.clone();
        let created = tokio::task::spawn_blocking(move || NamedTempFile::new_in(&staging))
            .await
            .map_err(|e| StoreError::unavailable(&self.staging, std::io::Error::other(e)))?
            .map_err(|source| StoreError::unavailable(&self.staging, source))?;

        let (file, path) = created.into_parts();
        Ok(StagingWriter {
            original_name: original_name.to_owned(),
            file: tokio::fs::File::from_std(file),
            path,
        })
    }

    /// Move a staged upload into the store under its original name,
    /// replacing any file already there. Returns the stored file name.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if the rename fails.
    pub async fn place(&self, upload: StagedUpload) -> Result<String, StoreError> {
        let StagedUpload {
            original_name,
            path,
        } = upload;
        let target = self.root.join(&original_name);
        let destination = target.clone();

        tokio::task::spawn_blocking(move || path.persist(&destination))
            .await
            .map_err(|e| StoreError::unavailable(&target, std::io::Error::other(e)))?
            .map_err(|e| StoreError::unavailable(&target, e.error))?;

        debug!(file_name = %original_name, "Upload placed in file store");
        Ok(original_name)
    }
}

/// An upload being streamed into the staging directory.
#[derive(Debug)]
pub struct StagingWriter {
    original_name: String,
    file: tokio::fs::File,
    path: TempPath,
}

impl StagingWriter {
    /// The client-supplied file name.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Append a chunk of upload data.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if the write fails.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), StoreError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| StoreError::unavailable(&*self.path, source))
    }

    /// Flush and close the staging file.
    ///
    /// # Errors
    ///
    /// [`StoreError::StorageUnavailable`] if flushing fails.
    pub async fn finish(mut self) -> Result<StagedUpload, StoreError> {
        self.file
            .flush()
            .await
            .map_err(|source| StoreError::unavailable(&*self.path, source))?;
        self.file
            .sync_all()
            .await
            .map_err(|source| StoreError::unavailable(&*self.path, source))?;
        Ok(StagedUpload {
            original_name: self.original_name,
            path: self.path,
        })
    }
}

/// A fully received upload waiting in the staging directory.
///
/// Dropping it without calling [`FileStore::place`] deletes the file.
#[derive(Debug)]
pub struct StagedUpload {
    original_name: String,
    path: TempPath,
}

impl StagedUpload {
    /// The client-supplied file name.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use simdeck_core::build_range;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: FileStore,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let store = FileStore::new(&uploads, uploads.join(".staging"));
        store.ensure_dirs().await.unwrap();
        Fixture { _dir: dir, store }
    }

    async fn put(store: &FileStore, name: &str, content: &str) {
        tokio::fs::write(store.root().join(name), content).await.unwrap();
    }

    #[test]
    fn classify_is_two_way() {
        assert_eq!(classify("notes.txt"), MimeType::TextPlain);
        assert_eq!(classify("temp-1.json"), MimeType::OctetStream);
        assert_eq!(classify("README"), MimeType::OctetStream);
        assert_eq!(classify("archive.txt.gz"), MimeType::OctetStream);
        assert_eq!(classify("NOTES.TXT"), MimeType::OctetStream);
    }

    #[test]
    fn validate_file_name_rejects_paths() {
        assert!(validate_file_name("temp-1.json").is_ok());
        for bad in ["", ".", "..", "../db.json", "a/b.json", "a\\b.json"] {
            assert!(
                matches!(validate_file_name(bad), Err(StoreError::InvalidFileName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn fetch_returns_content_and_mime() {
        let fx = fixture().await;
        put(&fx.store, "temp-1.json", r#"{"t":20}"#).await;
        put(&fx.store, "notes.txt", "hello").await;

        let json = fx.store.fetch("temp-1.json").await.unwrap();
        assert_eq!(json.content, r#"{"t":20}"#);
        assert_eq!(json.mime_type, MimeType::OctetStream);

        let text = fx.store.fetch("notes.txt").await.unwrap();
        assert_eq!(text.mime_type, MimeType::TextPlain);
    }

    #[tokio::test]
    async fn fetch_missing_file_is_not_found() {
        let fx = fixture().await;
        let result = fx.store.fetch("temp-9.json").await;
        assert!(matches!(result, Err(StoreError::FileNotFound(name)) if name == "temp-9.json"));
    }

    #[tokio::test]
    async fn fetch_range_preserves_index_order() {
        let fx = fixture().await;
        for i in 1..=12 {
            put(&fx.store, &format!("temp-{i}.json"), &i.to_string()).await;
        }
        let range = build_range("temp", "temp-3.json", "temp-11.json").unwrap();

        let records = fx.store.fetch_range(&range, 4).await.unwrap();
        let contents: Vec<&str> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["3", "4", "5", "6", "7", "8", "9", "10", "11"]);
        assert_eq!(records[0].file_name, "temp-3.json");
    }

    #[tokio::test]
    async fn fetch_range_fails_on_any_gap() {
        let fx = fixture().await;
        put(&fx.store, "temp-1.json", "1").await;
        put(&fx.store, "temp-3.json", "3").await;
        let range = build_range("temp", "temp-1.json", "temp-3.json").unwrap();

        let result = fx.store.fetch_range(&range, 8).await;
        assert!(matches!(result, Err(StoreError::FileNotFound(name)) if name == "temp-2.json"));
    }

    #[tokio::test]
    async fn staged_upload_is_placed_under_original_name() {
        let fx = fixture().await;
        let mut writer = fx.store.begin_upload("temp-1.json").await.unwrap();
        writer.write(b"{\"t\":").await.unwrap();
        writer.write(b"21}").await.unwrap();
        let staged = writer.finish().await.unwrap();
        assert_eq!(staged.original_name(), "temp-1.json");

        let name = fx.store.place(staged).await.unwrap();
        assert_eq!(name, "temp-1.json");
        let record = fx.store.fetch("temp-1.json").await.unwrap();
        assert_eq!(record.content, "{\"t\":21}");
    }

    #[tokio::test]
    async fn place_overwrites_existing_file() {
        let fx = fixture().await;
        put(&fx.store, "temp-1.json", "old").await;
        let mut writer = fx.store.begin_upload("temp-1.json").await.unwrap();
        writer.write(b"new").await.unwrap();
        fx.store.place(writer.finish().await.unwrap()).await.unwrap();
        assert_eq!(fx.store.fetch("temp-1.json").await.unwrap().content, "new");
    }

    #[tokio::test]
    async fn dropped_upload_leaves_staging_empty() {
        let fx = fixture().await;
        let mut writer = fx.store.begin_upload("temp-1.json").await.unwrap();
        writer.write(b"partial").await.unwrap();
        drop(writer.finish().await.unwrap());

        let mut entries = tokio::fs::read_dir(fx.store.staging_dir()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
        assert!(matches!(
            fx.store.fetch("temp-1.json").await,
            Err(StoreError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn begin_upload_rejects_path_names() {
        let fx = fixture().await;
        let result = fx.store.begin_upload("../escape.json").await;
        assert!(matches!(result, Err(StoreError::InvalidFileName(_))));
    }
}
