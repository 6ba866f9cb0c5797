//! Request orchestrators.
//!
//! Each mutating orchestration runs as one unit under
//! [`AppState::lock_writes`]: load the document, apply one registry
//! operation in memory, place any staged uploads, then save. A failure
//! at any step before the save leaves the persisted document untouched.
//!
//! Reads load the document without taking the lock; saves replace the
//! document atomically, so a reader always sees a complete version.

use simdeck_core::{Registry, RegistryError, build_range, sort_natural};
use simdeck_store::StagedUpload;
use simdeck_types::{FileRecord, NewSimulation, Simulation, SimulationEntry, SimulationPatch};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Message reported when a simulation has no file range to list.
pub const MISSING_RANGE: &str = "Simulation is missing startFileName or endFileName.";

async fn commit<T, F>(state: &AppState, uploads: Vec<StagedUpload>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Registry) -> Result<T, RegistryError>,
{
    let _guard = state.lock_writes().await;
    let mut document = state.documents.load().await?;
    let outcome = op(&mut document.registry)?;

    let placed = uploads.len();
    for upload in uploads {
        state.files.place(upload).await?;
    }
    state.documents.save(&document).await?;

    debug!(placed, "Registry mutation committed");
    Ok(outcome)
}

/// Flip the run state of the simulation called `name`, stopping every
/// other simulation of its type. Returns the new run state.
pub async fn toggle(state: &AppState, name: &str) -> Result<bool, ApiError> {
    let is_running = commit(state, Vec::new(), |registry| registry.toggle(name)).await?;
    info!(name, is_running, "Simulation status toggled");
    Ok(is_running)
}

/// Remove every simulation called `name`. Returns how many were removed.
pub async fn delete(state: &AppState, name: &str) -> Result<usize, ApiError> {
    let removed = commit(state, Vec::new(), |registry| registry.delete(name)).await?;
    info!(name, removed, "Simulation deleted");
    Ok(removed)
}

/// Merge `patch` into the first simulation called `name`.
///
/// When `uploads` is non-empty the files are placed in the store and
/// their sorted names become the simulation's start and end file.
pub async fn update(
    state: &AppState,
    name: &str,
    patch: &SimulationPatch,
    uploads: Vec<StagedUpload>,
) -> Result<Simulation, ApiError> {
    let file_names: Vec<String> = uploads
        .iter()
        .map(|upload| upload.original_name().to_owned())
        .collect();
    let options = state.options;

    let simulation = commit(state, uploads, |registry| {
        registry
            .update(name, patch, &file_names, options)
            .cloned()
    })
    .await?;

    info!(name, new_name = %simulation.name, files = file_names.len(), "Simulation updated");
    Ok(simulation)
}

/// Create a stopped simulation in the bucket of its type.
///
/// Uploaded files are placed in the store. If the request names neither
/// a start nor an end file, the sorted upload names supply both.
pub async fn create(
    state: &AppState,
    mut request: NewSimulation,
    uploads: Vec<StagedUpload>,
) -> Result<SimulationEntry, ApiError> {
    let unset = |value: Option<&str>| value.is_none_or(str::is_empty);
    if unset(request.start_file_name.as_deref()) && unset(request.end_file_name.as_deref()) {
        let mut names: Vec<&str> = uploads.iter().map(StagedUpload::original_name).collect();
        sort_natural(&mut names);
        if let (Some(first), Some(last)) = (names.first(), names.last()) {
            request.start_file_name = Some((*first).to_owned());
            request.end_file_name = Some((*last).to_owned());
        }
    }
    let options = state.options;

    let entry = commit(state, uploads, |registry| registry.create(request, options)).await?;
    info!(
        name = %entry.simulation.name,
        sim_type = %entry.simulation.sim_type,
        "Simulation created"
    );
    Ok(entry)
}

/// The first simulation called `name`.
pub async fn find(state: &AppState, name: &str) -> Result<SimulationEntry, ApiError> {
    let document = state.documents.load().await?;
    document
        .registry
        .find(name)
        .cloned()
        .ok_or_else(|| RegistryError::NotFound(name.to_owned()).into())
}

/// The whole registry in bucket order.
pub async fn registry(state: &AppState) -> Result<Registry, ApiError> {
    Ok(state.documents.load().await?.registry)
}

/// Every data file of the simulation called `name`, in index order.
///
/// Fails as a whole if any file in the range is missing.
pub async fn list_files(state: &AppState, name: &str) -> Result<Vec<FileRecord>, ApiError> {
    let entry = find(state, name).await?;
    let simulation = &entry.simulation;
    let (start, end) = simulation
        .file_range()
        .ok_or_else(|| ApiError::Validation(MISSING_RANGE.to_owned()))?;

    let range = build_range(&simulation.sim_type, start, end)?;
    let records = state.files.fetch_range(&range, state.fetch_concurrency).await?;
    debug!(name, files = records.len(), "Simulation files listed");
    Ok(records)
}
