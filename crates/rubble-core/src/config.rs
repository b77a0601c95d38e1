// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Solver configuration and the storage port it is persisted through.
//!
//! Every section deserializes with `#[serde(default)]`, so a stored document
//! only needs the keys it changes. Documents are checked on the way in and on
//! the way out; a config that fails [`SolverConfig::validate`] never reaches
//! the solver.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Clustering policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Margin added around a contact point when deciding which children of
    /// a struck cluster receive its impulse.
    pub cluster_distance_threshold: f32,
    /// Margin added to child bounds when linking neighbours.
    ///
    /// Lengths are in metres, so the default links children whose bounds
    /// come within a centimetre of each other. Children farther apart than
    /// this share no edge, and once their cluster breaks each of them
    /// becomes a separate piece regardless of its own strain. Raise it to
    /// keep loosely packed children together.
    pub connectivity_thickness: f32,
    /// Split broken clusters into connected pieces.
    pub use_connectivity: bool,
    /// Released children continue with the parent's motion at their point.
    pub children_inherit_velocity: bool,
    /// Dissolve a cluster left holding exactly one child.
    pub dissolve_single_child_clusters: bool,
    /// After a break, rewind the islands it touched to the start of the step
    /// and resolve their contacts again, so released pieces collide on their
    /// own in the same step.
    pub rewind_on_decluster: bool,
    /// Strain given to particles that were never assigned one.
    pub default_strain: f32,
    /// Queue a breaking event for every released child.
    pub emit_breaking_events: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            cluster_distance_threshold: 1.0,
            connectivity_thickness: 0.01,
            use_connectivity: true,
            children_inherit_velocity: true,
            dissolve_single_child_clusters: false,
            rewind_on_decluster: true,
            default_strain: f32::MAX,
            emit_breaking_events: true,
        }
    }
}

impl ClusteringConfig {
    /// Rejects negative or NaN margins and a NaN default strain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("clustering.cluster_distance_threshold", self.cluster_distance_threshold)?;
        non_negative("clustering.connectivity_thickness", self.connectivity_thickness)?;
        if self.default_strain.is_nan() {
            return Err(ConfigError::Invalid { field: "clustering.default_strain", reason: "must be a number" });
        }
        Ok(())
    }
}

/// Integration and event policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Gravity acceleration applied to dynamic particles.
    pub gravity: [f32; 3],
    /// Contacts with an impulse at least this large become collision
    /// events; `None` disables them.
    pub collision_event_min_impulse: Option<f32>,
    /// Particles at least this fast become trailing events; `None` disables
    /// them.
    pub trailing_event_min_speed: Option<f32>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self { gravity: [0.0, 0.0, -9.81], collision_event_min_impulse: Some(0.0), trailing_event_min_speed: None }
    }
}

impl EvolutionConfig {
    /// Rejects non-finite gravity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gravity.iter().all(|g| g.is_finite()) {
            Ok(())
        } else {
            Err(ConfigError::Invalid { field: "evolution.gravity", reason: "must be finite" })
        }
    }
}

/// Ground contact settings for hosts that use the built-in plane rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Height of the ground plane.
    pub ground_height: f32,
    /// Coefficient of restitution.
    pub restitution: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { ground_height: 0.0, restitution: 0.2 }
    }
}

impl CollisionConfig {
    /// Rejects a non-finite ground height and restitution outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ground_height.is_finite() {
            return Err(ConfigError::Invalid { field: "collision.ground_height", reason: "must be finite" });
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Invalid { field: "collision.restitution", reason: "must lie within [0, 1]" });
        }
        Ok(())
    }
}

/// Complete solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Integration and events.
    pub evolution: EvolutionConfig,
    /// Clustering policy.
    pub clustering: ClusteringConfig,
    /// Ground contact.
    pub collision: CollisionConfig,
}

impl SolverConfig {
    /// Checks every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()?;
        self.clustering.validate()?;
        self.collision.validate()
    }

    /// Parses and validates a JSON document.
    pub fn from_json(document: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates and renders the config as pretty JSON.
    pub fn to_json(&self) -> Result<Vec<u8>, ConfigError> {
        self.validate()?;
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Reads the document stored under `key`. A missing or empty document
    /// yields the defaults.
    pub fn load<S>(store: &S, key: &str) -> Result<Self, ConfigError>
    where
        S: ConfigStore + ?Sized,
    {
        match store.read(key)? {
            Some(document) if !document.is_empty() => Self::from_json(&document),
            _ => Ok(Self::default()),
        }
    }

    /// Writes the config under `key`.
    pub fn save<S>(&self, store: &S, key: &str) -> Result<(), ConfigError>
    where
        S: ConfigStore + ?Sized,
    {
        store.write(key, &self.to_json()?)
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_nan() || value < 0.0 {
        Err(ConfigError::Invalid { field, reason: "must be >= 0" })
    } else {
        Ok(())
    }
}

/// Storage port for raw config documents, keyed by logical name.
pub trait ConfigStore {
    /// The document stored under `key`, or `None` if there is none.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError>;
    /// Replaces the document stored under `key`.
    fn write(&self, key: &str, document: &[u8]) -> Result<(), ConfigError>;
}

/// Failure to read, parse or accept a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backing store failed.
    #[error("config i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The document is not valid JSON for the target type.
    #[error("config document: {0}")]
    Serde(#[from] serde_json::Error),
    /// A value parsed but the solver cannot run with it.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What the field must satisfy.
        reason: &'static str,
    },
    /// The platform exposes no per-user config directory.
    #[error("no per-user config directory on this platform")]
    NoConfigDir,
}

/// In-memory [`ConfigStore`], used by tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    documents: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.documents.borrow().get(key).cloned())
    }

    fn write(&self, key: &str, document: &[u8]) -> Result<(), ConfigError> {
        self.documents.borrow_mut().insert(key.to_owned(), document.to_vec());
        Ok(())
    }
}
