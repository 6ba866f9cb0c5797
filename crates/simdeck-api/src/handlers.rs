//! REST API endpoint handlers for the registry server.
//!
//! Handlers validate the request shape, call one orchestrator from
//! [`crate::service`], and wrap the outcome in a JSON response.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/toggle-simulation-status` | Toggle run status |
//! | `DELETE` | `/api/simulation` | Delete every simulation with a name |
//! | `PUT` | `/api/simulation/{simulationName}` | Update, optionally with files |
//! | `POST` | `/api/simulation` | Create, optionally with files |
//! | `GET` | `/api/files?simulationName=` | Ordered data files of a simulation |
//! | `GET` | `/api/simulations` | Full registry |
//! | `GET` | `/api/simulation/{simulationName}` | Single simulation |
//! | `GET` | `/simulationsRunning` | Full registry (document path) |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use simdeck_types::{NewSimulation, SimulationPatch};

use crate::error::ApiError;
use crate::extract::SimulationForm;
use crate::service;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request structs
// ---------------------------------------------------------------------------

/// Body of the toggle and delete endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationNameBody {
    /// Name of the target simulation.
    pub simulation_name: Option<String>,
}

/// Query parameters for `GET /api/files`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesQuery {
    /// Name of the simulation whose files to list.
    pub simulation_name: Option<String>,
}

fn required_name(name: Option<String>, message: &str) -> Result<String, ApiError> {
    name.filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_owned()))
}

fn name_from_body(
    payload: Result<Json<SimulationNameBody>, JsonRejection>,
    message: &str,
) -> Result<String, ApiError> {
    let body = payload.map(|Json(body)| body).unwrap_or_default();
    required_name(body.simulation_name, message)
}

// ---------------------------------------------------------------------------
// POST /toggle-simulation-status
// ---------------------------------------------------------------------------

/// Flip a simulation's run status, stopping the rest of its type.
pub async fn toggle_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulationNameBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let name = name_from_body(
        payload,
        "Invalid request body. Please provide simulationName.",
    )?;
    let is_running = service::toggle(&state, &name).await?;

    Ok(Json(serde_json::json!({
        "message": "Simulation status toggled successfully",
        "isRunning": is_running,
    })))
}

// ---------------------------------------------------------------------------
// DELETE /api/simulation
// ---------------------------------------------------------------------------

/// Delete every simulation carrying the given name.
pub async fn delete_simulation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SimulationNameBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let name = name_from_body(payload, "Simulation name is required.")?;
    let removed = service::delete(&state, &name).await?;

    Ok(Json(serde_json::json!({
        "message": format!("Simulation '{name}' deleted successfully."),
        "removed": removed,
    })))
}

// ---------------------------------------------------------------------------
// PUT /api/simulation/{simulationName}
// ---------------------------------------------------------------------------

/// Update a simulation, attaching any uploaded files as its new range.
pub async fn update_simulation(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    form: SimulationForm<SimulationPatch>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required_name(Some(name), "Simulation name is required in the path.")?;
    let simulation = service::update(&state, &name, &form.body, form.uploads).await?;

    Ok(Json(serde_json::json!({
        "message": "Simulation updated successfully.",
        "simulation": simulation,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/simulation
// ---------------------------------------------------------------------------

/// Create a simulation, optionally with uploaded files.
pub async fn create_simulation(
    State(state): State<Arc<AppState>>,
    form: SimulationForm<NewSimulation>,
) -> Result<impl IntoResponse, ApiError> {
    let body = form.body;
    let present = |v: Option<&str>| v.is_some_and(|v| !v.is_empty());
    if !present(body.name.as_deref()) || !present(body.sim_type.as_deref()) {
        return Err(ApiError::Validation(
            "Simulation name and type are required.".to_owned(),
        ));
    }
    let entry = service::create(&state, body, form.uploads).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Simulation added successfully.",
            "simulation": entry.simulation,
        })),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/files
// ---------------------------------------------------------------------------

/// List the data files of a simulation in index order.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FilesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let name = required_name(query.simulation_name, "Missing simulationName in request.")?;
    let records = service::list_files(&state, &name).await?;
    Ok(Json(records))
}

// ---------------------------------------------------------------------------
// GET /api/simulations, GET /simulationsRunning
// ---------------------------------------------------------------------------

/// Return the full registry keyed by type, in bucket order.
pub async fn list_simulations(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service::registry(&state).await?))
}

// ---------------------------------------------------------------------------
// GET /api/simulation/{simulationName}
// ---------------------------------------------------------------------------

/// Return the first simulation with the given name.
pub async fn get_simulation(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service::find(&state, &name).await?))
}
