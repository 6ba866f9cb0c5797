//! Shared record types for the Simdeck simulation registry.
//!
//! These are the shapes that live in the persisted registry document and
//! cross the API boundary. Field names follow the document's camelCase
//! convention (`startFileName`, `isRunning`, ...). Types flow downstream
//! to `TypeScript` via `ts-rs` for the dashboard client.
//!
//! # Modules
//!
//! - [`simulation`] -- Simulations, registry entries, create/update payloads
//! - [`files`] -- Retrieved file records and their MIME classification

pub mod files;
pub mod simulation;

pub use files::{FileRecord, MimeType};
pub use simulation::{NewSimulation, Simulation, SimulationEntry, SimulationPatch};
