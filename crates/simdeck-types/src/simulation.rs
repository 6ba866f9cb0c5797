//! Simulation records as stored in the registry document.
//!
//! Absent optional text fields are stored as empty strings, matching the
//! document format written by earlier deployments. Use the accessor
//! methods ([`Simulation::file_range`], [`Simulation::description`]) when
//! "absent" matters.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use ts_rs::TS;

const NAME: &str = "name";
const DESCRIPTION: &str = "description";
const START_FILE_NAME: &str = "startFileName";
const END_FILE_NAME: &str = "endFileName";
const TYPE: &str = "type";
const KNOWN_FIELDS: [&str; 5] = [NAME, DESCRIPTION, START_FILE_NAME, END_FILE_NAME, TYPE];

const SIMULATION: &str = "simulation";
const IS_RUNNING: &str = "isRunning";

/// A named simulation belonging to exactly one type bucket.
///
/// `name` is the de facto identifier; `sim_type` selects the bucket and
/// never changes after creation.
///
/// A simulation read from a document remembers the object it came from.
/// Writing it back lays the typed fields over that object, so keys keep
/// their order and fields that were absent stay absent unless they now
/// hold a value. Equality only looks at the typed fields and `extra`.
#[derive(Debug, Clone, Default, TS)]
#[ts(export, export_to = "bindings/", rename_all = "camelCase")]
pub struct Simulation {
    /// Unique simulation name.
    pub name: String,
    /// Free-form description (empty when not given).
    pub description: String,
    /// First data file of the simulation's range (empty until attached).
    pub start_file_name: String,
    /// Last data file of the simulation's range (empty until attached).
    pub end_file_name: String,
    /// The type bucket this simulation lives in.
    #[ts(rename = "type")]
    pub sim_type: String,
    /// Fields not known to this schema, carried through load and save.
    #[ts(skip)]
    pub extra: Map<String, Value>,
    #[ts(skip)]
    source: Option<Map<String, Value>>,
}

impl Simulation {
    /// A new simulation with only a name and a type.
    pub fn new(name: impl Into<String>, sim_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sim_type: sim_type.into(),
            ..Self::default()
        }
    }

    /// Start and end file names, or `None` if either is missing.
    pub fn file_range(&self) -> Option<(&str, &str)> {
        if self.start_file_name.is_empty() || self.end_file_name.is_empty() {
            None
        } else {
            Some((&self.start_file_name, &self.end_file_name))
        }
    }

    /// The description, or `None` when it is empty.
    pub fn description(&self) -> Option<&str> {
        (!self.description.is_empty()).then_some(self.description.as_str())
    }

    /// The JSON object this simulation is written as.
    pub fn to_object(&self) -> Map<String, Value> {
        let Some(source) = &self.source else {
            let mut object = Map::new();
            object.insert(NAME.to_owned(), Value::from(self.name.as_str()));
            object.insert(DESCRIPTION.to_owned(), Value::from(self.description.as_str()));
            object.insert(START_FILE_NAME.to_owned(), Value::from(self.start_file_name.as_str()));
            object.insert(END_FILE_NAME.to_owned(), Value::from(self.end_file_name.as_str()));
            object.insert(TYPE.to_owned(), Value::from(self.sim_type.as_str()));
            for (key, value) in &self.extra {
                if !KNOWN_FIELDS.contains(&key.as_str()) {
                    object.insert(key.clone(), value.clone());
                }
            }
            return object;
        };

        let mut object = source.clone();
        object.retain(|key, _| {
            KNOWN_FIELDS.contains(&key.as_str()) || self.extra.contains_key(key)
        });
        overlay_text(&mut object, NAME, &self.name, true);
        overlay_text(&mut object, DESCRIPTION, &self.description, false);
        overlay_text(&mut object, START_FILE_NAME, &self.start_file_name, false);
        overlay_text(&mut object, END_FILE_NAME, &self.end_file_name, false);
        overlay_text(&mut object, TYPE, &self.sim_type, true);
        for (key, value) in &self.extra {
            if KNOWN_FIELDS.contains(&key.as_str()) {
                continue;
            }
            match object.get_mut(key) {
                Some(slot) if *slot == *value => {}
                Some(slot) => *slot = value.clone(),
                None => {
                    object.insert(key.clone(), value.clone());
                }
            }
        }
        object
    }

    fn from_object(object: Map<String, Value>) -> Result<Self, String> {
        let extra = object
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(Self {
            name: read_text(&object, NAME, true)?,
            description: read_text(&object, DESCRIPTION, false)?,
            start_file_name: read_text(&object, START_FILE_NAME, false)?,
            end_file_name: read_text(&object, END_FILE_NAME, false)?,
            sim_type: read_text(&object, TYPE, true)?,
            extra,
            source: Some(object),
        })
    }
}

impl PartialEq for Simulation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.start_file_name == other.start_file_name
            && self.end_file_name == other.end_file_name
            && self.sim_type == other.sim_type
            && self.extra == other.extra
    }
}

impl Eq for Simulation {}

impl Serialize for Simulation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Simulation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::deserialize(deserializer)?;
        Self::from_object(object).map_err(D::Error::custom)
    }
}

/// A simulation together with its run state.
///
/// Like [`Simulation`], an entry read from a document keeps its key order
/// and any keys this schema does not know.
#[derive(Debug, Clone, TS)]
#[ts(export, export_to = "bindings/", rename_all = "camelCase")]
pub struct SimulationEntry {
    /// The simulation record.
    pub simulation: Simulation,
    /// Whether this is the running simulation of its type.
    pub is_running: bool,
    #[ts(skip)]
    source: Option<Map<String, Value>>,
}

impl SimulationEntry {
    /// Wrap a simulation in a stopped entry.
    pub const fn stopped(simulation: Simulation) -> Self {
        Self {
            simulation,
            is_running: false,
            source: None,
        }
    }

    /// The JSON object this entry is written as.
    pub fn to_object(&self) -> Map<String, Value> {
        let simulation = Value::Object(self.simulation.to_object());
        let Some(source) = &self.source else {
            let mut object = Map::new();
            object.insert(SIMULATION.to_owned(), simulation);
            object.insert(IS_RUNNING.to_owned(), Value::Bool(self.is_running));
            return object;
        };

        let mut object = source.clone();
        match object.get_mut(SIMULATION) {
            Some(slot) => *slot = simulation,
            None => {
                object.insert(SIMULATION.to_owned(), simulation);
            }
        }
        match object.get_mut(IS_RUNNING) {
            Some(slot) if slot.as_bool().unwrap_or(false) == self.is_running => {}
            Some(slot) => *slot = Value::Bool(self.is_running),
            None if self.is_running => {
                object.insert(IS_RUNNING.to_owned(), Value::Bool(true));
            }
            None => {}
        }
        object
    }
}

impl PartialEq for SimulationEntry {
    fn eq(&self, other: &Self) -> bool {
        self.simulation == other.simulation && self.is_running == other.is_running
    }
}

impl Eq for SimulationEntry {}

impl Serialize for SimulationEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SimulationEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::deserialize(deserializer)?;
        let simulation = match object.get(SIMULATION) {
            Some(Value::Object(inner)) => {
                Simulation::from_object(inner.clone()).map_err(D::Error::custom)?
            }
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "invalid type for `{SIMULATION}`: expected an object, found {other}"
                )));
            }
            None => return Err(D::Error::missing_field(SIMULATION)),
        };
        let is_running = match object.get(IS_RUNNING) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "invalid type for `{IS_RUNNING}`: expected a boolean, found {other}"
                )));
            }
        };
        Ok(Self {
            simulation,
            is_running,
            source: Some(object),
        })
    }
}

/// Read a text field; optional fields treat absent and `null` as empty.
fn read_text(object: &Map<String, Value>, key: &str, required: bool) -> Result<String, String> {
    match object.get(key) {
        Some(Value::String(text)) => Ok(text.clone()),
        None | Some(Value::Null) if !required => Ok(String::new()),
        None | Some(Value::Null) => Err(format!("missing field `{key}`")),
        Some(other) => Err(format!(
            "invalid type for `{key}`: expected a string, found {other}"
        )),
    }
}

/// Write `value` under `key`, leaving an equivalent stored value alone.
///
/// An absent optional field is only added once it holds text.
fn overlay_text(object: &mut Map<String, Value>, key: &str, value: &str, required: bool) {
    match object.get_mut(key) {
        Some(Value::String(text)) if text.as_str() == value => {}
        Some(Value::Null) if value.is_empty() => {}
        Some(slot) => *slot = Value::from(value),
        None if required || !value.is_empty() => {
            object.insert(key.to_owned(), Value::from(value));
        }
        None => {}
    }
}

/// Input for creating a simulation.
///
/// `name` and `sim_type` are optional here so that a missing value can be
/// reported as a validation failure instead of a deserialization error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewSimulation {
    /// Simulation name (required).
    pub name: Option<String>,
    /// Type bucket (required, must already exist).
    #[serde(rename = "type")]
    pub sim_type: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional first file of the range.
    pub start_file_name: Option<String>,
    /// Optional last file of the range.
    pub end_file_name: Option<String>,
}

/// Shallow field overwrite applied by an update.
///
/// `None` leaves the current value in place. There is deliberately no
/// `type` field: a simulation never moves between buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationPatch {
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New first file of the range.
    pub start_file_name: Option<String>,
    /// New last file of the range.
    pub end_file_name: Option<String>,
}

impl SimulationPatch {
    /// Whether applying this patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.start_file_name.is_none()
            && self.end_file_name.is_none()
    }

    /// Overwrite the fields of `simulation` that this patch sets.
    pub fn apply_to(&self, simulation: &mut Simulation) {
        if let Some(name) = &self.name {
            simulation.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            simulation.description.clone_from(description);
        }
        if let Some(start) = &self.start_file_name {
            simulation.start_file_name.clone_from(start);
        }
        if let Some(end) = &self.end_file_name {
            simulation.end_file_name.clone_from(end);
        }
    }
}
