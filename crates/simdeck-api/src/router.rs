//! Axum router construction for the registry API.
//!
//! Assembles all routes into a single [`Router`] with CORS open to any
//! origin, a request body limit for uploads, and HTTP tracing.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the registry server.
///
/// The router includes:
/// - `POST /toggle-simulation-status` -- toggle run status
/// - `POST /api/simulation` -- create
/// - `DELETE /api/simulation` -- delete all matches
/// - `GET /api/simulation/{simulationName}` -- single simulation
/// - `PUT /api/simulation/{simulationName}` -- update
/// - `GET /api/files` -- ordered file range of a simulation
/// - `GET /api/simulations` -- full registry
/// - `GET /simulationsRunning` -- full registry under its document key
///
/// Request bodies are capped at [`AppState::max_body_bytes`].
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ]);

    Router::new()
        .route("/toggle-simulation-status", post(handlers::toggle_status))
        .route(
            "/api/simulation",
            post(handlers::create_simulation).delete(handlers::delete_simulation),
        )
        .route(
            "/api/simulation/{simulationName}",
            get(handlers::get_simulation).put(handlers::update_simulation),
        )
        .route("/api/files", get(handlers::list_files))
        .route("/api/simulations", get(handlers::list_simulations))
        .route("/simulationsRunning", get(handlers::list_simulations))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
