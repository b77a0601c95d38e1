// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `Aabb` as a solid box.

use rubble_math::Vec3;

use super::{ImplicitObject, ImplicitObjectType};
use crate::Aabb;

fn sign_or_positive(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

impl ImplicitObject for Aabb {
    fn object_type(&self) -> ImplicitObjectType {
        ImplicitObjectType::Box
    }

    fn is_convex(&self) -> bool {
        true
    }

    fn bounding_box(&self) -> Option<Aabb> {
        Some(*self)
    }

    /// Exact box distance. Outside, the normal points from the nearest
    /// surface point; inside, it is the axis of the nearest face.
    fn phi_with_normal(&self, point: &Vec3) -> (f32, Vec3) {
        let local = *point - self.center();
        let q = local.abs() - self.half_extents();
        let outside = q.max(&Vec3::ZERO);
        let outside_len = outside.length();
        if outside_len > 0.0 {
            let n = Vec3::new(
                sign_or_positive(local.x()) * outside.x(),
                sign_or_positive(local.y()) * outside.y(),
                sign_or_positive(local.z()) * outside.z(),
            );
            return (outside_len, n.scale(1.0 / outside_len));
        }
        let axis = if q.x() >= q.y() && q.x() >= q.z() {
            0
        } else if q.y() >= q.z() {
            1
        } else {
            2
        };
        let normal = Vec3::ZERO.with_component(axis, sign_or_positive(local.component(axis)));
        (q.component(axis), normal)
    }

    /// Corner picked by the sign of each direction component.
    fn support(&self, direction: &Vec3) -> Vec3 {
        let lo = self.min();
        let hi = self.max();
        Vec3::new(
            if direction.x() < 0.0 { lo.x() } else { hi.x() },
            if direction.y() < 0.0 { lo.y() } else { hi.y() },
            if direction.z() < 0.0 { lo.z() } else { hi.z() },
        )
    }
}
