//! Registry API server for Simdeck.
//!
//! This crate provides an Axum HTTP server over the simulation registry:
//!
//! - **Orchestrators** ([`service`]) that load the registry document,
//!   apply one registry operation, place uploaded files, and save
//! - **REST endpoints** ([`handlers`]) for toggling, creating, updating,
//!   deleting and listing simulations, and for reading a simulation's
//!   ordered data files
//! - **Upload extraction** ([`extract`]) that streams multipart file
//!   parts into a staging directory
//!
//! # Architecture
//!
//! Nothing is cached between requests. Every request reloads the
//! document; mutations are serialized through one async lock held in
//! [`AppState`] across load, mutate and save.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod service;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
