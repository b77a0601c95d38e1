// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::Vec3;

use super::{ImplicitObject, ImplicitObjectType, ImplicitObjectUnion, Plane, Sphere};
use crate::Aabb;

/// Owned particle geometry: the closed set of shapes a body can carry.
///
/// Dispatch is a `match` per query so shapes stay inline in the particle
/// arrays. Placed views are built on demand with
/// [`crate::ImplicitObjectTransformed`].
#[derive(Debug, Clone, PartialEq)]
pub enum ImplicitShape {
    /// Half-space.
    Plane(Plane),
    /// Solid box.
    Box(Aabb),
    /// Solid sphere.
    Sphere(Sphere),
    /// Merged geometry of a cluster.
    Union(ImplicitObjectUnion),
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $call:expr) => {
        match $self {
            ImplicitShape::Plane($s) => $call,
            ImplicitShape::Box($s) => $call,
            ImplicitShape::Sphere($s) => $call,
            ImplicitShape::Union($s) => $call,
        }
    };
}

impl ImplicitObject for ImplicitShape {
    fn object_type(&self) -> ImplicitObjectType {
        dispatch!(self, s => s.object_type())
    }

    fn is_convex(&self) -> bool {
        dispatch!(self, s => s.is_convex())
    }

    fn bounding_box(&self) -> Option<Aabb> {
        dispatch!(self, s => s.bounding_box())
    }

    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3) {
        dispatch!(self, s => s.phi_with_normal(point))
    }

    fn find_closest_point(&self, point: &Vec3, thickness: f32) -> Vec3 {
        dispatch!(self, s => s.find_closest_point(point, thickness))
    }

    fn find_closest_intersection(&self, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3> {
        dispatch!(self, s => s.find_closest_intersection(start, end, thickness))
    }

    fn support(&self, direction: &Vec3) -> Vec3 {
        dispatch!(self, s => s.support(direction))
    }
}

impl From<Plane> for ImplicitShape {
    fn from(value: Plane) -> Self {
        Self::Plane(value)
    }
}

impl From<Aabb> for ImplicitShape {
    fn from(value: Aabb) -> Self {
        Self::Box(value)
    }
}

impl From<Sphere> for ImplicitShape {
    fn from(value: Sphere) -> Self {
        Self::Sphere(value)
    }
}

impl From<ImplicitObjectUnion> for ImplicitShape {
    fn from(value: ImplicitObjectUnion) -> Self {
        Self::Union(value)
    }
}
