// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::Vec3;

use super::{ImplicitObject, ImplicitObjectType};
use crate::{Aabb, RigidTransform};

/// Non-owning view of a shape placed by a rigid transform.
///
/// The wrapped shape is borrowed for `'a`, so it always outlives the view.
/// Every query maps its inputs into the wrapped shape's local space,
/// delegates, and maps the answer back: normals and directions through the
/// rotation only, points through the full transform.
#[derive(Debug, Clone, Copy)]
pub struct ImplicitObjectTransformed<'a> {
    object: &'a dyn ImplicitObject,
    transform: RigidTransform,
    bounding_box: Option<Aabb>,
}

impl<'a> ImplicitObjectTransformed<'a> {
    /// Wraps `object` placed at `transform`.
    #[must_use]
    pub fn new(object: &'a dyn ImplicitObject, transform: RigidTransform) -> Self {
        Self { object, transform, bounding_box: transformed_bounds(object, &transform) }
    }

    /// The wrapped shape.
    #[must_use]
    pub fn object(&self) -> &'a dyn ImplicitObject {
        self.object
    }

    /// Current placement.
    #[must_use]
    pub fn transform(&self) -> RigidTransform {
        self.transform
    }

    /// Replaces the placement and recomputes the cached bound.
    pub fn set_transform(&mut self, transform: RigidTransform) {
        self.transform = transform;
        self.bounding_box = transformed_bounds(self.object, &transform);
    }
}

pub(crate) fn transformed_bounds<O>(object: &O, transform: &RigidTransform) -> Option<Aabb>
where
    O: ImplicitObject + ?Sized,
{
    object.bounding_box().map(|b| b.transformed(transform))
}

pub(crate) fn phi_with_normal_through<O>(object: &O, transform: &RigidTransform, point: &Vec3) -> (f32, Vec3)
where
    O: ImplicitObject + ?Sized,
{
    let local = transform.inverse_transform_position(point);
    let (phi, normal) = object.phi_with_normal(&local);
    (phi, transform.transform_vector(&normal))
}

pub(crate) fn closest_intersection_through<O>(
    object: &O,
    transform: &RigidTransform,
    start: &Vec3,
    end: &Vec3,
    thickness: f32,
) -> Option<Vec3>
where
    O: ImplicitObject + ?Sized,
{
    let local_start = transform.inverse_transform_position(start);
    let local_end = transform.inverse_transform_position(end);
    object
        .find_closest_intersection(&local_start, &local_end, thickness)
        .map(|p| transform.transform_position(&p))
}

pub(crate) fn support_through<O>(object: &O, transform: &RigidTransform, direction: &Vec3) -> Vec3
where
    O: ImplicitObject + ?Sized,
{
    let local_dir = transform.inverse_transform_vector(direction);
    transform.transform_position(&object.support(&local_dir))
}

impl ImplicitObject for ImplicitObjectTransformed<'_> {
    fn object_type(&self) -> ImplicitObjectType {
        ImplicitObjectType::Transformed
    }

    fn is_convex(&self) -> bool {
        self.object.is_convex()
    }

    fn bounding_box(&self) -> Option<Aabb> {
        self.bounding_box
    }

    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3) {
        phi_with_normal_through(self.object, &self.transform, point)
    }

    fn find_closest_point(&self, point: &Vec3, thickness: f32) -> Vec3 {
        let local = self.transform.inverse_transform_position(point);
        self.transform.transform_position(&self.object.find_closest_point(&local, thickness))
    }

    fn find_closest_intersection(&self, start: &Vec3, end: &Vec3, thickness: f32) -> Option<Vec3> {
        closest_intersection_through(self.object, &self.transform, start, end, thickness)
    }

    fn support(&self, direction: &Vec3) -> Vec3 {
        support_through(self.object, &self.transform, direction)
    }
}
