// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collision rule seam consumed by the evolution and the clustering pass.
//!
//! A rule runs once per step against the predicted poses, resolves its
//! contacts, and keeps them (with the impulse it applied) until the next run
//! so clustering can read impulses back as strain.

use std::collections::BTreeSet;

use rubble_math::Vec3;

use crate::particles::PbdRigidParticles;

mod plane;

pub use plane::PlaneCollisionRule;

/// One contact produced by a collision rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBodyContactConstraint {
    /// Particle whose geometry touched.
    pub particle_index: usize,
    /// Other particle, or `None` for static environment geometry.
    pub levelset_index: Option<usize>,
    /// World-space contact point.
    pub location: Vec3,
    /// Contact normal, pointing toward `particle_index`.
    pub normal: Vec3,
    /// Penetration depth as a signed distance (negative when overlapping).
    pub phi: f32,
    /// Impulse applied to `particle_index` at this contact this step.
    pub accumulated_impulse: Vec3,
}

impl RigidBodyContactConstraint {
    /// `true` if the contact involves `index` on either side.
    pub fn touches(&self, index: usize) -> bool {
        self.particle_index == index || self.levelset_index == Some(index)
    }
}

/// Collision pass driven once per step.
pub trait CollisionConstraintRule {
    /// Generates and resolves this step's contacts for the `active` particles.
    fn apply(&mut self, particles: &mut PbdRigidParticles, active: &BTreeSet<usize>, dt: f32);

    /// Contacts from the most recent [`CollisionConstraintRule::apply`].
    fn constraints(&self) -> &[RigidBodyContactConstraint];

    /// Drops contacts that touch any of `indices`.
    fn remove_constraints(&mut self, indices: &BTreeSet<usize>);

    /// Resolves contacts again for `indices` after their predicted poses
    /// were rewound and re-integrated. Contacts of every other particle are
    /// kept as they are.
    fn update_constraints(&mut self, particles: &mut PbdRigidParticles, indices: &BTreeSet<usize>, dt: f32);
}

/// Rule that reports host-supplied contacts verbatim and leaves particle
/// state untouched. Queued contacts are reported by the next `apply` only.
#[derive(Debug, Default, Clone)]
pub struct ScriptedCollisionRule {
    pending: Vec<RigidBodyContactConstraint>,
    constraints: Vec<RigidBodyContactConstraint>,
}

impl ScriptedCollisionRule {
    /// Empty rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a contact for the next step.
    pub fn push_contact(&mut self, contact: RigidBodyContactConstraint) {
        self.pending.push(contact);
    }

    /// Queues an impulse of `impulse` on `particle_index` at `location`
    /// against static geometry.
    pub fn push_impulse(&mut self, particle_index: usize, location: Vec3, impulse: Vec3) {
        self.push_contact(RigidBodyContactConstraint {
            particle_index,
            levelset_index: None,
            location,
            normal: impulse.normalize(),
            phi: 0.0,
            accumulated_impulse: impulse,
        });
    }
}

impl CollisionConstraintRule for ScriptedCollisionRule {
    fn apply(&mut self, _particles: &mut PbdRigidParticles, _active: &BTreeSet<usize>, _dt: f32) {
        self.constraints = core::mem::take(&mut self.pending);
    }

    fn constraints(&self) -> &[RigidBodyContactConstraint] {
        &self.constraints
    }

    fn remove_constraints(&mut self, indices: &BTreeSet<usize>) {
        self.constraints
            .retain(|c| !indices.contains(&c.particle_index) && !c.levelset_index.is_some_and(|l| indices.contains(&l)));
    }

    /// Scripted contacts do not depend on particle state; they stand as
    /// reported.
    fn update_constraints(&mut self, _particles: &mut PbdRigidParticles, _indices: &BTreeSet<usize>, _dt: f32) {}
}
