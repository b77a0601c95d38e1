// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::Vec3;

use super::{ImplicitObject, ImplicitObjectType};
use crate::Aabb;

/// Half-space `{ x : (x - point) · normal <= 0 }`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    point: Vec3,
    normal: Vec3,
}

impl Plane {
    /// Plane through `point` facing `normal` (normalized here).
    ///
    /// # Panics
    /// Panics if `normal` is degenerate.
    #[must_use]
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        assert!(normal != Vec3::ZERO, "plane normal must be non-zero");
        Self { point, normal }
    }

    /// A point on the plane.
    #[must_use]
    pub fn point(&self) -> Vec3 {
        self.point
    }

    /// Unit outward normal.
    #[must_use]
    pub fn plane_normal(&self) -> Vec3 {
        self.normal
    }
}

impl ImplicitObject for Plane {
    fn object_type(&self) -> ImplicitObjectType {
        ImplicitObjectType::Plane
    }

    fn is_convex(&self) -> bool {
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        None
    }

    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3) {
        ((*point - self.point).dot(&self.normal), self.normal)
    }

    /// Closed-form segment/plane intersection.
    ///
    /// The plane is offset by `thickness` toward whichever side is nearer
    /// `start`. A segment parallel to the plane reports `end` only when it
    /// lies exactly in the offset plane; roots outside `[0, length]` miss.
    fn find_closest_intersection(&self, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3> {
        let segment = *end - *start;
        let length = segment.length();
        let direction = segment.normalize();

        let offset = self.normal.scale(thickness);
        let x_pos = self.point + offset;
        let x_neg = self.point - offset;
        let effective = if (x_neg - *start).length() < (x_pos - *start).length() { x_neg } else { x_pos };

        let plane_to_start = effective - *start;
        let numerator = plane_to_start.dot(&self.normal);
        let denominator = direction.dot(&self.normal);
        if denominator == 0.0 {
            return (numerator == 0.0).then_some(*end);
        }
        let root = numerator / denominator;
        if root < 0.0 || root > length {
            return None;
        }
        Some(*start + direction.scale(root))
    }

    /// The plane has no furthest point; its anchor is the representative
    /// surface point for every direction.
    fn support(&self, _direction: &Vec3) -> Vec3 {
        self.point
    }
}
