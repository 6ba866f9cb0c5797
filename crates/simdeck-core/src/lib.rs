//! Core logic for the Simdeck simulation registry.
//!
//! This crate is pure and synchronous: it never touches the registry
//! document or the file store itself. Callers load a [`Registry`], run one
//! operation against it, and persist the result.
//!
//! # Modules
//!
//! - [`registry`] -- Type buckets of simulation entries and the
//!   create/update/delete/toggle/find operations with their invariants
//! - [`sequence`] -- Numeric index extraction, range building, and the
//!   numeric-aware filename comparator
//! - [`config`] -- Typed YAML configuration with environment overrides
//! - [`error`] -- Registry and sequencing error types

pub mod config;
pub mod error;
pub mod registry;
pub mod sequence;

pub use config::{ConfigError, SimdeckConfig};
pub use error::{RegistryError, SequenceError};
pub use registry::{Registry, RegistryOptions};
pub use sequence::{
    FileNames, FileRange, build_range, check_order, extract_index, natural_cmp, sort_natural,
};
