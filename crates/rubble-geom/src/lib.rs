// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Geometry primitives for rubble.

This crate provides:
- Axis-aligned bounding boxes (`Aabb`).
- Rigid transforms (`RigidTransform`).
- The implicit-surface query protocol (`ImplicitObject`) and its shapes:
  planes, solid boxes, spheres, transformed views and unions.

Design notes:
- Float32 throughout; no ambient RNG, so identical inputs yield identical
  outputs.
- Signed distances are negative inside a shape and normals point outward.
- Rustdoc is treated as part of the contract; public items are documented.
"]

/// Implicit-surface shapes and their query protocol.
pub mod implicit;
/// Foundational geometric types.
pub mod types;

pub use implicit::{
    ImplicitObject, ImplicitObjectTransformed, ImplicitObjectType, ImplicitObjectUnion,
    ImplicitShape, Plane, Sphere, UnionMember,
};
pub use types::aabb::Aabb;
pub use types::transform::RigidTransform;
