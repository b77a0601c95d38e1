// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Implicit-surface shapes.
//!
//! Every shape answers the same queries: signed distance with outward normal,
//! closest point, first crossing along a segment, and support mapping. Shapes
//! without a closed form fall back to the generic routines in this module,
//! which only need `phi_with_normal` and a bounding box.

use core::fmt;

use rubble_math::{Vec3, EPSILON, SMALL_NUMBER};

use crate::Aabb;

mod box_shape;
mod plane;
mod shape;
mod sphere;
mod transformed;
mod union;

pub use plane::Plane;
pub use shape::ImplicitShape;
pub use sphere::Sphere;
pub use transformed::ImplicitObjectTransformed;
pub use union::{ImplicitObjectUnion, UnionMember};

/// Minimum step taken by the generic segment march.
pub const MARCH_NUDGE: f32 = 1e-2;

/// Bisection rounds used to refine a bracketed crossing.
const BISECTION_STEPS: usize = 32;

/// Type tag reported by [`ImplicitObject::object_type`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImplicitObjectType {
    /// Infinite half-space bounded by a plane.
    Plane,
    /// Solid axis-aligned box.
    Box,
    /// Solid sphere.
    Sphere,
    /// Another shape viewed through a rigid transform.
    Transformed,
    /// Several placed shapes treated as one.
    Union,
}

/// Query protocol shared by every implicit shape.
///
/// Implementations must keep `phi_with_normal` and `support` consistent with
/// the same surface.
pub trait ImplicitObject: fmt::Debug {
    /// Shape tag.
    fn object_type(&self) -> ImplicitObjectType;

    /// Whether the solid is convex.
    fn is_convex(&self) -> bool;

    /// Axis-aligned bound in the shape's own frame, if the shape is finite.
    fn bounding_box(&self) -> Option<Aabb>;

    /// Whether [`ImplicitObject::bounding_box`] returns a bound.
    fn has_bounding_box(&self) -> bool {
        self.bounding_box().is_some()
    }

    /// Signed distance to the surface (negative inside) and the outward unit
    /// normal at the nearest surface point.
    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3);

    /// Signed distance only.
    fn signed_distance(&self, point: &Vec3) -> f32 {
        self.phi_with_normal(point).0
    }

    /// Outward normal only.
    fn normal(&self, point: &Vec3) -> Vec3 {
        self.phi_with_normal(point).1
    }

    /// Projects `point` onto the surface inflated by `thickness`.
    fn find_closest_point(&self, point: &Vec3, thickness: f32) -> Vec3 {
        let (phi, normal) = self.phi_with_normal(point);
        *point - normal.scale(phi - thickness)
    }

    /// First crossing of the surface (inflated by `thickness`) along the
    /// segment `start -> end`, or `None` if the segment never crosses it.
    fn find_closest_intersection(&self, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3> {
        march_closest_intersection(self, start, end, thickness)
    }

    /// Point of the shape furthest along `direction`.
    fn support(&self, direction: &Vec3) -> Vec3 {
        bounded_support(self, direction)
    }
}

/// Generic segment query built on `phi_with_normal`.
///
/// Marches from `start` toward `end` in steps of the current distance, never
/// shorter than [`MARCH_NUDGE`] and never past the segment length. The first
/// step that changes the sign of the inflated distance is refined by
/// bisection. A start point already on the inflated surface is returned as is.
pub fn march_closest_intersection<O>(object: &O, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3>
where
    O: ImplicitObject + ?Sized,
{
    let phi_at = |p: &Vec3| object.signed_distance(p) - thickness;

    let start_phi = phi_at(start);
    if start_phi.abs() <= SMALL_NUMBER {
        return Some(*start);
    }
    let segment = *end - *start;
    let length = segment.length();
    if length <= EPSILON {
        return None;
    }
    let dir = segment.scale(1.0 / length);
    let outside = start_phi > 0.0;

    let mut prev_t = 0.0_f32;
    let mut prev_phi = start_phi;
    loop {
        let t = (prev_t + prev_phi.abs().max(MARCH_NUDGE)).min(length);
        let phi = phi_at(&(*start + dir.scale(t)));
        if phi.abs() <= SMALL_NUMBER {
            return Some(*start + dir.scale(t));
        }
        if (phi > 0.0) != outside {
            let (mut lo, mut hi) = (prev_t, t);
            for _ in 0..BISECTION_STEPS {
                let mid = 0.5 * (lo + hi);
                if (phi_at(&(*start + dir.scale(mid))) > 0.0) == outside {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            return Some(*start + dir.scale(0.5 * (lo + hi)));
        }
        if t >= length {
            return None;
        }
        prev_t = t;
        prev_phi = phi;
    }
}

/// Generic support mapping built on the bounding box.
///
/// Casts from just outside the bound toward its center along `direction`
/// and returns the first surface crossing. Unbounded shapes return their
/// closest point to the origin.
pub fn bounded_support<O>(object: &O, direction: &Vec3) -> Vec3
where
    O: ImplicitObject + ?Sized,
{
    let Some(bounds) = object.bounding_box() else {
        return object.find_closest_point(&Vec3::ZERO, 0.0);
    };
    let center = bounds.center();
    let dir = direction.normalize();
    if dir == Vec3::ZERO {
        return object.find_closest_point(&center, 0.0);
    }
    let extents = bounds.extents();
    let reach = extents.max_element() + extents.length() + MARCH_NUDGE;
    let from = center + dir.scale(reach);
    object.find_closest_intersection(&from, &center, 0.0).unwrap_or(center)
}
