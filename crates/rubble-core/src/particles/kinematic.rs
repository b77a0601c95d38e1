// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::ops::{Deref, DerefMut};

use rubble_math::Vec3;

use super::GeometryParticles;
use crate::array_collection::ArrayIndex;

/// Adds linear and angular velocity.
#[derive(Debug)]
pub struct KinematicGeometryParticles {
    base: GeometryParticles,
    v: ArrayIndex<Vec3>,
    w: ArrayIndex<Vec3>,
}

impl Default for KinematicGeometryParticles {
    fn default() -> Self {
        Self::new()
    }
}

impl KinematicGeometryParticles {
    /// Empty set with the geometry layer plus velocity arrays.
    pub fn new() -> Self {
        let mut base = GeometryParticles::new();
        let v = base.add_array::<Vec3>();
        let w = base.add_array::<Vec3>();
        Self { base, v, w }
    }

    soa_accessors! {
        /// Linear velocity.
        v, v_mut: Vec3;
        /// Angular velocity (world frame, radians per second).
        w, w_mut: Vec3;
    }

    /// Velocity of the body point currently at world position `point`.
    pub fn point_velocity(&self, index: usize, point: &Vec3) -> Vec3 {
        *self.v(index) + self.w(index).cross(&(*point - *self.x(index)))
    }
}

impl Deref for KinematicGeometryParticles {
    type Target = GeometryParticles;

    fn deref(&self) -> &GeometryParticles {
        &self.base
    }
}

impl DerefMut for KinematicGeometryParticles {
    fn deref_mut(&mut self) -> &mut GeometryParticles {
        &mut self.base
    }
}
