//! The simulation registry: type buckets of simulation entries.
//!
//! A [`Registry`] maps each simulation type to an ordered list of
//! [`SimulationEntry`] values. Buckets are fixed by the persisted
//! document; operations never invent a new type.
//!
//! # Invariants
//!
//! After every completed operation:
//!
//! - at most one entry per type has `is_running` set,
//! - with [`RegistryOptions::unique_names`], no two entries share a name,
//! - an entry with both file names has `start index <= end index`,
//! - an entry never changes type.
//!
//! A failed operation leaves the registry untouched.
//!
//! # Match order
//!
//! "First match" means bucket insertion order, then list order within
//! the bucket. [`Registry::update`] and [`Registry::toggle`] act on the
//! first match only, while [`Registry::delete`] removes every match.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use simdeck_types::{NewSimulation, Simulation, SimulationEntry, SimulationPatch};
use tracing::debug;

use crate::error::RegistryError;
use crate::sequence;

/// Behavior switches for registry writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Reject a create or rename that would duplicate an existing name.
    pub unique_names: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self { unique_names: true }
    }
}

/// Position of an entry: bucket index, then index within the bucket.
type Slot = (usize, usize);

/// Type buckets of simulation entries, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    buckets: IndexMap<String, Vec<SimulationEntry>>,
}

impl Registry {
    /// Create a registry with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with one empty bucket per given type.
    ///
    /// Duplicate types collapse into a single bucket.
    pub fn with_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets = types
            .into_iter()
            .map(|t| (t.into(), Vec::new()))
            .collect();
        Self { buckets }
    }

    /// Type names in bucket order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Whether a bucket exists for `sim_type`.
    pub fn has_type(&self, sim_type: &str) -> bool {
        self.buckets.contains_key(sim_type)
    }

    /// The entries of one bucket.
    pub fn bucket(&self, sim_type: &str) -> Option<&[SimulationEntry]> {
        self.buckets.get(sim_type).map(Vec::as_slice)
    }

    /// All `(type, entry)` pairs in match order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SimulationEntry)> {
        self.buckets
            .iter()
            .flat_map(|(t, list)| list.iter().map(move |e| (t.as_str(), e)))
    }

    /// Total number of entries across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the registry holds no entries (buckets may still exist).
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// The first entry whose simulation is called `name`.
    pub fn find(&self, name: &str) -> Option<&SimulationEntry> {
        self.entries()
            .map(|(_, e)| e)
            .find(|e| e.simulation.name == name)
    }

    /// The running entry of `sim_type`, if any.
    pub fn running(&self, sim_type: &str) -> Option<&SimulationEntry> {
        self.buckets.get(sim_type)?.iter().find(|e| e.is_running)
    }

    fn position(&self, name: &str) -> Option<Slot> {
        self.buckets.values().enumerate().find_map(|(b, list)| {
            list.iter()
                .position(|e| e.simulation.name == name)
                .map(|i| (b, i))
        })
    }

    fn entry_at(&self, (b, i): Slot) -> Option<&SimulationEntry> {
        self.buckets.get_index(b).and_then(|(_, list)| list.get(i))
    }

    fn entry_at_mut(&mut self, (b, i): Slot) -> Option<&mut SimulationEntry> {
        self.buckets
            .get_index_mut(b)
            .and_then(|(_, list)| list.get_mut(i))
    }

    fn name_taken(&self, name: &str, except: Option<Slot>) -> bool {
        self.buckets.values().enumerate().any(|(b, list)| {
            list.iter()
                .enumerate()
                .any(|(i, e)| e.simulation.name == name && except != Some((b, i)))
        })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Append a new, stopped simulation to the bucket of its type.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::MissingField`] if `name` or `type` is absent or empty
    /// - [`RegistryError::TypeNotFound`] if no bucket exists for the type
    /// - [`RegistryError::DuplicateName`] if names must be unique and the
    ///   name is taken
    /// - [`RegistryError::Sequence`] if both file names are given but do
    ///   not form a valid range
    pub fn create(
        &mut self,
        request: NewSimulation,
        options: RegistryOptions,
    ) -> Result<SimulationEntry, RegistryError> {
        let name = required(request.name, "name")?;
        let sim_type = required(request.sim_type, "type")?;

        if !self.has_type(&sim_type) {
            return Err(RegistryError::TypeNotFound(sim_type));
        }
        if options.unique_names && self.name_taken(&name, None) {
            return Err(RegistryError::DuplicateName(name));
        }

        let mut simulation = Simulation::new(name, sim_type);
        simulation.description = request.description.unwrap_or_default();
        simulation.start_file_name = request.start_file_name.unwrap_or_default();
        simulation.end_file_name = request.end_file_name.unwrap_or_default();
        check_file_range(&simulation)?;

        let entry = SimulationEntry::stopped(simulation);
        let bucket = self
            .buckets
            .get_mut(&entry.simulation.sim_type)
            .ok_or_else(|| RegistryError::TypeNotFound(entry.simulation.sim_type.clone()))?;
        bucket.push(entry.clone());

        debug!(
            name = %entry.simulation.name,
            sim_type = %entry.simulation.sim_type,
            "Simulation created"
        );
        Ok(entry)
    }

    /// Merge `patch` into the first simulation called `name`.
    ///
    /// When `file_names` is non-empty it is sorted with
    /// [`sort_natural`](crate::sort_natural) and its first and last
    /// elements become the new start and end file names, overriding any
    /// file names in the patch.
    ///
    /// Only the first match is touched, even if later entries carry the
    /// same name.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotFound`] if no entry is called `name`
    /// - [`RegistryError::MissingField`] if the patch empties the name
    /// - [`RegistryError::DuplicateName`] if names must be unique and the
    ///   patch renames onto a taken name
    /// - [`RegistryError::Sequence`] if the update sets file names that do
    ///   not form a valid range
    pub fn update<S: AsRef<str>>(
        &mut self,
        name: &str,
        patch: &SimulationPatch,
        file_names: &[S],
        options: RegistryOptions,
    ) -> Result<&Simulation, RegistryError> {
        let not_found = || RegistryError::NotFound(name.to_owned());
        let slot = self.position(name).ok_or_else(not_found)?;
        let current = self.entry_at(slot).ok_or_else(not_found)?;

        let mut updated = current.simulation.clone();
        patch.apply_to(&mut updated);
        updated.sim_type.clone_from(&current.simulation.sim_type);

        if updated.name.is_empty() {
            return Err(RegistryError::MissingField("name"));
        }

        let mut sorted: Vec<&str> = file_names.iter().map(AsRef::as_ref).collect();
        sequence::sort_natural(&mut sorted);
        if let (Some(first), Some(last)) = (sorted.first(), sorted.last()) {
            (*first).clone_into(&mut updated.start_file_name);
            (*last).clone_into(&mut updated.end_file_name);
        }
        // A stored range is only re-checked when this update changes it.
        let touches_range = !sorted.is_empty()
            || patch.start_file_name.is_some()
            || patch.end_file_name.is_some();
        if touches_range {
            check_file_range(&updated)?;
        }

        if options.unique_names
            && updated.name != name
            && self.name_taken(&updated.name, Some(slot))
        {
            return Err(RegistryError::DuplicateName(updated.name));
        }

        let entry = self.entry_at_mut(slot).ok_or_else(not_found)?;
        entry.simulation = updated;

        debug!(
            name,
            new_name = %entry.simulation.name,
            start = %entry.simulation.start_file_name,
            end = %entry.simulation.end_file_name,
            "Simulation updated"
        );
        Ok(&entry.simulation)
    }

    /// Remove every entry, in every bucket, whose simulation is called
    /// `name`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if nothing matched.
    pub fn delete(&mut self, name: &str) -> Result<usize, RegistryError> {
        let mut removed: usize = 0;
        for list in self.buckets.values_mut() {
            let before = list.len();
            list.retain(|e| e.simulation.name != name);
            removed = removed.saturating_add(before.saturating_sub(list.len()));
        }

        if removed == 0 {
            return Err(RegistryError::NotFound(name.to_owned()));
        }
        debug!(name, removed, "Simulations deleted");
        Ok(removed)
    }

    /// Flip the run state of the first simulation called `name` and stop
    /// every other entry of its type. Returns the new run state.
    ///
    /// Toggling a running simulation off leaves its whole type with
    /// nothing running.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no entry is called `name`.
    pub fn toggle(&mut self, name: &str) -> Result<bool, RegistryError> {
        let not_found = || RegistryError::NotFound(name.to_owned());
        let slot = self.position(name).ok_or_else(not_found)?;
        let target = self.entry_at_mut(slot).ok_or_else(not_found)?;

        target.is_running = !target.is_running;
        let is_running = target.is_running;
        let sim_type = target.simulation.sim_type.clone();

        for (b, (bucket_type, list)) in self.buckets.iter_mut().enumerate() {
            if *bucket_type != sim_type {
                continue;
            }
            for (i, entry) in list.iter_mut().enumerate() {
                if (b, i) != slot {
                    entry.is_running = false;
                }
            }
        }

        debug!(name, %sim_type, is_running, "Simulation toggled");
        Ok(is_running)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RegistryError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(RegistryError::MissingField(field))
}

fn check_file_range(simulation: &Simulation) -> Result<(), RegistryError> {
    if let Some((start, end)) = simulation.file_range() {
        sequence::check_order(start, end)?;
    }
    Ok(())
}
