// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Solver configuration through the storage port.

use rubble_core::{ConfigError, ConfigStore, MemoryConfigStore, SolverConfig};

#[test]
fn missing_config_falls_back_to_defaults() {
    let config = SolverConfig::load(&MemoryConfigStore::new(), "solver").unwrap();
    assert_eq!(config, SolverConfig::default());
    assert_eq!(config.clustering.default_strain, f32::MAX);
    assert!(config.clustering.use_connectivity);
    assert!(config.clustering.rewind_on_decluster);
    assert!(!config.clustering.dissolve_single_child_clusters);
}

#[test]
fn saved_config_loads_back() {
    let store = MemoryConfigStore::new();
    let mut config = SolverConfig::default();
    config.clustering.cluster_distance_threshold = 0.25;
    config.evolution.trailing_event_min_speed = Some(3.0);
    config.save(&store, "solver").unwrap();
    assert_eq!(SolverConfig::load(&store, "solver").unwrap(), config);
}

#[test]
fn partial_documents_keep_defaults_elsewhere() {
    let store = MemoryConfigStore::new();
    store.write("solver", br#"{"clustering":{"use_connectivity":false}}"#).unwrap();
    let config = SolverConfig::load(&store, "solver").unwrap();
    assert!(!config.clustering.use_connectivity);
    assert_eq!(config.clustering.connectivity_thickness, 0.01);
    assert_eq!(config.evolution.gravity, [0.0, 0.0, -9.81]);
}

#[test]
fn empty_documents_mean_defaults() {
    let store = MemoryConfigStore::new();
    store.write("solver", b"").unwrap();
    assert_eq!(SolverConfig::load(&store, "solver").unwrap(), SolverConfig::default());
}

#[test]
fn out_of_range_values_are_rejected() {
    let store = MemoryConfigStore::new();
    store.write("solver", br#"{"collision":{"restitution":1.5}}"#).unwrap();
    let err = SolverConfig::load(&store, "solver").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "collision.restitution", .. }), "{err}");
}

#[test]
fn invalid_configs_are_not_saved() {
    let store = MemoryConfigStore::new();
    let mut config = SolverConfig::default();
    config.clustering.connectivity_thickness = -1.0;
    let err = config.save(&store, "solver").unwrap_err();
    assert_eq!(err.to_string(), "invalid clustering.connectivity_thickness: must be >= 0");
    assert!(store.read("solver").unwrap().is_none());
}

#[test]
fn malformed_documents_surface_serde_errors() {
    let err = SolverConfig::from_json(b"{ not json").unwrap_err();
    assert!(matches!(err, ConfigError::Serde(_)));
}
