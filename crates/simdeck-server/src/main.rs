//! Simulation registry server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `SIMDECK_CONFIG` or `simdeck-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the file store and staging directories
//! 4. Seed an empty registry document if one is configured and absent
//! 5. Serve the registry API until `Ctrl-C`

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use simdeck_api::{AppState, start_server};
use simdeck_core::SimdeckConfig;
use simdeck_core::config::DEFAULT_CONFIG_FILE;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::StartupError;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "SIMDECK_CONFIG";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, storage setup or the server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, source) = load_config(std::env::var_os(CONFIG_ENV).map(PathBuf::from))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("simdeck-server starting");
    match &source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        db_path = %config.storage.db_path.display(),
        uploads_dir = %config.storage.uploads_dir.display(),
        unique_names = config.registry.unique_names,
        fetch_concurrency = config.files.fetch_concurrency,
        "Storage configuration"
    );

    let state = Arc::new(AppState::from_config(&config));
    prepare_storage(&state, &config.storage.seed_types)
        .await
        .context("preparing storage")?;

    start_server(&config.server, state)
        .await
        .map_err(StartupError::from)?;

    info!("simdeck-server stopped");
    Ok(())
}

/// Load configuration from `explicit`, else the default file, else
/// defaults. Returns the file actually read, if any.
///
/// An explicitly named file must exist.
fn load_config(
    explicit: Option<PathBuf>,
) -> Result<(SimdeckConfig, Option<PathBuf>), StartupError> {
    let (path, required) = match explicit {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !required && !path.exists() {
        let mut config = SimdeckConfig::default();
        config
            .apply_overrides(|key| std::env::var(key).ok())
            .map_err(|source| StartupError::Config {
                path: path.clone(),
                source,
            })?;
        return Ok((config, None));
    }

    let config = read_config(&path)?;
    Ok((config, Some(path)))
}

fn read_config(path: &Path) -> Result<SimdeckConfig, StartupError> {
    SimdeckConfig::from_file(path).map_err(|source| StartupError::Config {
        path: path.to_path_buf(),
        source,
    })
}

async fn prepare_storage(state: &AppState, seed_types: &[String]) -> Result<(), StartupError> {
    state.files.ensure_dirs().await?;
    if state.documents.seed(seed_types).await? {
        info!(types = seed_types.len(), "Registry document created");
    }
    Ok(())
}
