// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::Vec3;

use super::transformed::{
    closest_intersection_through, phi_with_normal_through, support_through, transformed_bounds,
};
use super::{ImplicitObject, ImplicitObjectType, ImplicitShape};
use crate::{Aabb, RigidTransform};

/// One placed member of an [`ImplicitObjectUnion`].
#[derive(Debug, Clone, PartialEq)]
pub struct UnionMember {
    /// Placement of `shape` in the union's frame.
    pub transform: RigidTransform,
    /// Member geometry, in its own frame.
    pub shape: ImplicitShape,
}

/// Several placed shapes queried as one solid.
///
/// The distance is the minimum over members, so the union is exact outside
/// and a conservative estimate inside overlapping members.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitObjectUnion {
    members: Vec<UnionMember>,
    bounds: Option<Aabb>,
}

impl ImplicitObjectUnion {
    /// Builds a union; the bound is `None` if any member is unbounded.
    ///
    /// # Panics
    /// Panics if `members` is empty.
    #[must_use]
    pub fn new(members: Vec<UnionMember>) -> Self {
        assert!(!members.is_empty(), "union requires at least one member");
        let mut bounds = transformed_bounds(&members[0].shape, &members[0].transform);
        for m in &members[1..] {
            bounds = match (bounds, transformed_bounds(&m.shape, &m.transform)) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                _ => None,
            };
        }
        Self { members, bounds }
    }

    /// Members in insertion order.
    #[must_use]
    pub fn members(&self) -> &[UnionMember] {
        &self.members
    }
}

impl ImplicitObject for ImplicitObjectUnion {
    fn object_type(&self) -> ImplicitObjectType {
        ImplicitObjectType::Union
    }

    fn is_convex(&self) -> bool {
        self.members.len() == 1 && self.members[0].shape.is_convex()
    }

    fn bounding_box(&self) -> Option<Aabb> {
        self.bounds
    }

    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3) {
        let mut best = (f32::MAX, Vec3::UNIT_Z);
        for m in &self.members {
            let candidate = phi_with_normal_through(&m.shape, &m.transform, point);
            if candidate.0 < best.0 {
                best = candidate;
            }
        }
        best
    }

    /// Nearest hit over all members.
    fn find_closest_intersection(&self, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3> {
        self.members
            .iter()
            .filter_map(|m| closest_intersection_through(&m.shape, &m.transform, start, end, thickness))
            .min_by(|a, b| a.distance(start).total_cmp(&b.distance(start)))
    }

    fn support(&self, direction: &Vec3) -> Vec3 {
        let mut best = Vec3::ZERO;
        let mut best_dot = f32::MIN;
        for m in &self.members {
            let p = support_through(&m.shape, &m.transform, direction);
            let d = p.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = p;
            }
        }
        best
    }
}
