//! Configuration loading and typed config structures.
//!
//! The configuration lives in `simdeck-config.yaml` next to the binary's
//! working directory. Every field has a default, so a missing section, an
//! empty file, or no file at all still produces a usable configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::registry::RegistryOptions;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "simdeck-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value (usually from an environment override) is invalid.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Simdeck configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimdeckConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Registry document and file store locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Registry write rules.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// File range retrieval settings.
    #[serde(default)]
    pub files: FilesConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimdeckConfig {
    /// Load configuration from a YAML file at the given path, then apply
    /// environment overrides.
    ///
    /// Environment variables override YAML values:
    /// - `SIMDECK_DB_PATH` overrides `storage.db_path`
    /// - `SIMDECK_UPLOADS_DIR` overrides `storage.uploads_dir`
    /// - `SIMDECK_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_file_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`from_file`](Self::from_file), reading overrides through
    /// `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// As for [`from_file`](Self::from_file).
    pub fn from_file_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides read through `lookup` (normally the process
    /// environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `SIMDECK_PORT` is not a port.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SIMDECK_DB_PATH") {
            self.storage.db_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("SIMDECK_UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("SIMDECK_PORT") {
            self.server.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("SIMDECK_PORT={val}: {e}")))?;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size, uploads included.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Registry document and file store locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the registry document.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory holding simulation data files.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// Directory for uploads still being received. Must be on the same
    /// filesystem as `uploads_dir`; defaults to `<uploads_dir>/.staging`.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Type buckets written into a fresh document when none exists.
    #[serde(default)]
    pub seed_types: Vec<String>,

    /// Extra attempts for a registry save that hits a storage failure.
    #[serde(default)]
    pub save_retries: u32,
}

impl StorageConfig {
    /// The effective staging directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.uploads_dir.join(".staging"))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            uploads_dir: default_uploads_dir(),
            staging_dir: None,
            seed_types: Vec::new(),
            save_retries: 0,
        }
    }
}

/// Registry write rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegistryConfig {
    /// Reject creates and renames that would duplicate a name.
    #[serde(default = "default_true")]
    pub unique_names: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { unique_names: true }
    }
}

impl From<RegistryConfig> for RegistryOptions {
    fn from(config: RegistryConfig) -> Self {
        Self {
            unique_names: config.unique_names,
        }
    }
}

/// File range retrieval settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FilesConfig {
    /// Maximum number of files read concurrently for one range.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: default_fetch_concurrency(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3030
}

const fn default_max_upload_bytes() -> usize {
    52_428_800
}

fn default_db_path() -> PathBuf {
    PathBuf::from("db.json")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

const fn default_fetch_concurrency() -> usize {
    8
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
