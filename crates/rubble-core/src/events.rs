// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Plain event records handed to effects consumers by value.

use rubble_math::Vec3;
use serde::{Deserialize, Serialize};

/// A resolved contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionData {
    /// Simulation time of the step that produced the contact.
    pub time: f32,
    /// World-space contact point.
    pub location: Vec3Data,
    /// Total impulse applied at the contact this step.
    pub accumulated_impulse: Vec3Data,
    /// Contact normal, pointing toward the first particle.
    pub normal: Vec3Data,
    /// Velocity of the first particle.
    pub velocity1: Vec3Data,
    /// Velocity of the second particle (zero for static geometry).
    pub velocity2: Vec3Data,
    /// Mass of the first particle.
    pub mass1: f32,
    /// Mass of the second particle (zero for static geometry).
    pub mass2: f32,
    /// First particle.
    pub particle_index: usize,
    /// Second particle, `None` for static geometry.
    pub levelset_index: Option<usize>,
}

/// A piece leaving a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakingData {
    /// Simulation time of the break.
    pub time: f32,
    /// World-space center of the released piece.
    pub breaking_region_centroid: Vec3Data,
    /// Direction of the impulse that broke the bond (zero if not strain-driven).
    pub breaking_region_normal: Vec3Data,
    /// Radius of a sphere bounding the released piece.
    pub breaking_region_radius: f32,
    /// Velocity of the released piece.
    pub velocity: Vec3Data,
    /// Mass of the released piece.
    pub mass: f32,
    /// Released particle.
    pub particle_index: usize,
}

/// A moving piece worth trailing debris effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingData {
    /// Simulation time of the sample.
    pub time: f32,
    /// World position.
    pub location: Vec3Data,
    /// Minimum corner of the world bound.
    pub extent_min: Vec3Data,
    /// Maximum corner of the world bound.
    pub extent_max: Vec3Data,
    /// Linear velocity.
    pub velocity: Vec3Data,
    /// Angular velocity.
    pub angular_velocity: Vec3Data,
    /// Mass.
    pub mass: f32,
    /// Sampled particle.
    pub particle_index: usize,
}

/// Serializable `[x, y, z]` triple used inside event records.
pub type Vec3Data = [f32; 3];

/// Converts a vector into its event representation.
pub(crate) fn vdata(v: Vec3) -> Vec3Data {
    v.to_array()
}

/// Event queue owned by the evolution and drained by the consumer.
#[derive(Debug, Default, Clone)]
pub struct PhysicsEvents {
    collisions: Vec<CollisionData>,
    breakings: Vec<BreakingData>,
    trailings: Vec<TrailingData>,
}

impl PhysicsEvents {
    /// Queues a collision record.
    pub fn push_collision(&mut self, event: CollisionData) {
        self.collisions.push(event);
    }

    /// Queues a breaking record.
    pub fn push_breaking(&mut self, event: BreakingData) {
        self.breakings.push(event);
    }

    /// Queues a trailing record.
    pub fn push_trailing(&mut self, event: TrailingData) {
        self.trailings.push(event);
    }

    /// Pending collision records.
    pub fn collisions(&self) -> &[CollisionData] {
        &self.collisions
    }

    /// Pending breaking records.
    pub fn breakings(&self) -> &[BreakingData] {
        &self.breakings
    }

    /// Pending trailing records.
    pub fn trailings(&self) -> &[TrailingData] {
        &self.trailings
    }

    /// Takes every pending collision record.
    pub fn drain_collisions(&mut self) -> Vec<CollisionData> {
        core::mem::take(&mut self.collisions)
    }

    /// Takes every pending breaking record.
    pub fn drain_breakings(&mut self) -> Vec<BreakingData> {
        core::mem::take(&mut self.breakings)
    }

    /// Takes every pending trailing record.
    pub fn drain_trailings(&mut self) -> Vec<TrailingData> {
        core::mem::take(&mut self.trailings)
    }

    /// Drops everything pending.
    pub fn clear(&mut self) {
        self.collisions.clear();
        self.breakings.clear();
        self.trailings.clear();
    }

    /// `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty() && self.breakings.is_empty() && self.trailings.is_empty()
    }
}
