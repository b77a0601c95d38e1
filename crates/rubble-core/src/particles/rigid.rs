// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::ops::{Deref, DerefMut};

use rubble_math::Mat3;

use super::KinematicGeometryParticles;
use crate::array_collection::ArrayIndex;

/// Adds mass properties, island membership and simulation flags.
///
/// New particles start as unit bodies: mass 1, identity inertia. A particle
/// with `inv_m == 0` is kinematic.
#[derive(Debug)]
pub struct RigidParticles {
    base: KinematicGeometryParticles,
    m: ArrayIndex<f32>,
    inv_m: ArrayIndex<f32>,
    i: ArrayIndex<Mat3>,
    inv_i: ArrayIndex<Mat3>,
    island: ArrayIndex<Option<usize>>,
    disabled: ArrayIndex<bool>,
    sleeping: ArrayIndex<bool>,
}

impl Default for RigidParticles {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidParticles {
    /// Empty set with the kinematic layer plus rigid-body arrays.
    pub fn new() -> Self {
        let mut base = KinematicGeometryParticles::new();
        let m = base.add_array_with(1.0_f32);
        let inv_m = base.add_array_with(1.0_f32);
        let i = base.add_array_with(Mat3::identity());
        let inv_i = base.add_array_with(Mat3::identity());
        let island = base.add_array::<Option<usize>>();
        let disabled = base.add_array::<bool>();
        let sleeping = base.add_array::<bool>();
        Self { base, m, inv_m, i, inv_i, island, disabled, sleeping }
    }

    soa_accessors! {
        /// Mass.
        m, m_mut: f32;
        /// Inverse mass; zero for kinematic bodies.
        inv_m, inv_m_mut: f32;
        /// Inertia tensor in the body frame.
        i, i_mut: Mat3;
        /// Inverse inertia tensor in the body frame.
        inv_i, inv_i_mut: Mat3;
        /// Constraint island, if assigned.
        island, island_mut: Option<usize>;
        /// Disabled particles are not simulated (clustered children, spent parents).
        disabled, disabled_mut: bool;
        /// Sleeping particles are skipped by integration and breaking.
        sleeping, sleeping_mut: bool;
    }

    /// `true` when the particle responds to forces and impulses.
    pub fn is_dynamic(&self, index: usize) -> bool {
        *self.inv_m(index) > 0.0
    }

    /// Inverse inertia rotated into world space at the current orientation.
    pub fn world_inv_inertia(&self, index: usize) -> Mat3 {
        let rot = self.r(index).to_mat3();
        rot.multiply(self.inv_i(index)).multiply(&rot.transpose())
    }

    /// Inertia rotated into world space at the current orientation.
    pub fn world_inertia(&self, index: usize) -> Mat3 {
        let rot = self.r(index).to_mat3();
        rot.multiply(self.i(index)).multiply(&rot.transpose())
    }
}

impl Deref for RigidParticles {
    type Target = KinematicGeometryParticles;

    fn deref(&self) -> &KinematicGeometryParticles {
        &self.base
    }
}

impl DerefMut for RigidParticles {
    fn deref_mut(&mut self) -> &mut KinematicGeometryParticles {
        &mut self.base
    }
}
