// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Layered particle arrays.
//!
//! A particle is a dense index, not an object. Each layer wraps the one below
//! it, registers its own attribute arrays on the shared [`ArrayCollection`],
//! and derefs to the lower layer so every accessor stays reachable from the
//! top:
//!
//! `Particles` (x) → `GeometryParticles` (r, geometry) →
//! `KinematicGeometryParticles` (v, w) → `RigidParticles` (mass, inertia,
//! island, flags) → `PbdRigidParticles` (predicted pose, pre-solve velocity).
//!
//! Indices stay valid until the next structural change of the collection.
//!
//! [`ArrayCollection`]: crate::ArrayCollection

/// Generates `name(i) -> &T` and `name_mut(i) -> &mut T` for a layer field
/// holding an [`crate::ArrayIndex`].
macro_rules! soa_accessors {
    ($($(#[$doc:meta])* $field:ident, $field_mut:ident: $ty:ty;)+) => {
        $(
            $(#[$doc])*
            #[track_caller]
            pub fn $field(&self, index: usize) -> &$ty {
                &self.collection().array(self.$field)[index]
            }

            #[doc = concat!("Mutable access to `", stringify!($field), "`.")]
            #[track_caller]
            pub fn $field_mut(&mut self, index: usize) -> &mut $ty {
                let handle = self.$field;
                &mut self.collection_mut().array_mut(handle)[index]
            }
        )+
    };
}

mod base;
mod geometry;
mod kinematic;
mod pbd_rigid;
mod rigid;

pub use base::Particles;
pub use geometry::GeometryParticles;
pub use kinematic::KinematicGeometryParticles;
pub use pbd_rigid::PbdRigidParticles;
pub use rigid::RigidParticles;
