// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::ops::{Deref, DerefMut};

use rubble_geom::{Aabb, ImplicitObject, ImplicitShape, RigidTransform};
use rubble_math::Quat;

use super::Particles;
use crate::array_collection::ArrayIndex;

/// Adds orientation and collision geometry.
#[derive(Debug)]
pub struct GeometryParticles {
    base: Particles,
    r: ArrayIndex<Quat>,
    geometry: ArrayIndex<Option<ImplicitShape>>,
}

impl Default for GeometryParticles {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryParticles {
    /// Empty set with position, rotation and geometry arrays.
    pub fn new() -> Self {
        let mut base = Particles::new();
        let r = base.add_array::<Quat>();
        let geometry = base.add_array::<Option<ImplicitShape>>();
        Self { base, r, geometry }
    }

    soa_accessors! {
        /// Orientation in world space.
        r, r_mut: Quat;
        /// Collision geometry in the particle's local frame.
        geometry, geometry_mut: Option<ImplicitShape>;
    }

    /// World pose `(x, r)`.
    pub fn transform(&self, index: usize) -> RigidTransform {
        RigidTransform::new(*self.x(index), *self.r(index))
    }

    /// Sets `(x, r)` from a pose.
    pub fn set_transform(&mut self, index: usize, pose: &RigidTransform) {
        *self.x_mut(index) = pose.translation();
        *self.r_mut(index) = pose.rotation();
    }

    /// Local-space bound of the geometry, if it has one.
    pub fn local_bounds(&self, index: usize) -> Option<Aabb> {
        self.geometry(index).as_ref().and_then(ImplicitObject::bounding_box)
    }

    /// World-space bound at the current pose.
    pub fn world_bounds(&self, index: usize) -> Option<Aabb> {
        self.local_bounds(index).map(|b| b.transformed(&self.transform(index)))
    }
}

impl Deref for GeometryParticles {
    type Target = Particles;

    fn deref(&self) -> &Particles {
        &self.base
    }
}

impl DerefMut for GeometryParticles {
    fn deref_mut(&mut self) -> &mut Particles {
        &mut self.base
    }
}
