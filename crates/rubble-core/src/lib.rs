// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Rubble core: rigid particles, position-based evolution, and
strain-driven rigid-body clustering.

This crate provides:
- A structure-of-arrays container (`ArrayCollection`) whose registered
  arrays always share one length.
- Layered particle sets built on it, up to `PbdRigidParticles`.
- Cluster bookkeeping (`PbdRigidClustering`): building parents from
  children, mapping contact impulses to strain, and breaking clusters apart.
- A small evolution loop (`PbdRigidsEvolution`) and the collision rule seam
  it drives.
- Serde-backed solver configuration and plain event records.

Design notes:
- Deterministic: ordered containers wherever iteration order is observable,
  no ambient RNG, float32 throughout.
- Particles are dense indices. Appending never moves existing indices.
- Operations log through `tracing`; install a subscriber to see them.
"]

/// Structure-of-arrays storage.
pub mod array_collection;
/// Rigid clustering with strain-based breaking.
pub mod clustering;
/// Collision rule seam and built-in rules.
pub mod collision;
/// Solver configuration and its storage port.
pub mod config;
/// Event records for effects consumers.
pub mod events;
/// Position-based evolution.
pub mod evolution;
/// Layered particle arrays.
pub mod particles;

pub use array_collection::{ArrayCollection, ArrayCollectionArray, ArrayIndex};
pub use clustering::{ConnectivityEdge, PbdRigidClustering};
pub use collision::{
    CollisionConstraintRule, PlaneCollisionRule, RigidBodyContactConstraint, ScriptedCollisionRule,
};
pub use config::{
    ClusteringConfig, CollisionConfig, ConfigError, ConfigStore, EvolutionConfig, MemoryConfigStore,
    SolverConfig,
};
pub use events::{BreakingData, CollisionData, PhysicsEvents, TrailingData, Vec3Data};
pub use evolution::{EvolutionState, PbdRigidsEvolution, RigidBodyDesc};
pub use particles::{
    GeometryParticles, KinematicGeometryParticles, Particles, PbdRigidParticles, RigidParticles,
};
