// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core geometry types used by the engine (transform, AABB).
//!
//! - Overlap semantics are inclusive on faces so touching pieces of a
//!   cluster count as connected.
//! - Affine math uses `f32` without fused multiply-add to preserve identical
//!   results across platforms.

#[doc = "Axis-aligned bounding boxes."]
pub mod aabb;
#[doc = "Rigid transforms (rotation + translation, no scale)."]
pub mod transform;
