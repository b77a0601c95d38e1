// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::{Vec3, EPSILON, SMALL_NUMBER};

use super::{ImplicitObject, ImplicitObjectType};
use crate::Aabb;

/// Solid sphere.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
}

impl Sphere {
    /// Sphere at `center` with `radius`.
    ///
    /// # Panics
    /// Panics if `radius` is negative.
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        assert!(radius >= 0.0, "sphere radius must be non-negative");
        Self { center, radius }
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl ImplicitObject for Sphere {
    fn object_type(&self) -> ImplicitObjectType {
        ImplicitObjectType::Sphere
    }

    fn is_convex(&self) -> bool {
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(Aabb::from_center_half_extents(self.center, self.radius, self.radius, self.radius))
    }

    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3) {
        let offset = *point - self.center;
        let dist = offset.length();
        let normal = if dist <= EPSILON { Vec3::UNIT_Z } else { offset.scale(1.0 / dist) };
        (dist - self.radius, normal)
    }

    fn find_closest_intersection(&self, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3> {
        let radius = self.radius + thickness;
        let m = *start - self.center;
        let c = m.length_squared() - radius * radius;
        if (m.length() - radius).abs() <= SMALL_NUMBER {
            return Some(*start);
        }
        let segment = *end - *start;
        let length = segment.length();
        if length <= EPSILON {
            return None;
        }
        let dir = segment.scale(1.0 / length);
        let b = m.dot(&dir);
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        let near = -b - sq;
        let t = if near >= 0.0 { near } else { -b + sq };
        if t < 0.0 || t > length {
            return None;
        }
        Some(*start + dir.scale(t))
    }

    fn support(&self, direction: &Vec3) -> Vec3 {
        self.center + direction.normalize().scale(self.radius)
    }
}
