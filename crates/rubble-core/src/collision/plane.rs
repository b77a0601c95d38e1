// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use std::collections::BTreeSet;

use rubble_geom::{ImplicitObject, ImplicitShape, Plane, RigidTransform};
use rubble_math::{Vec3, EPSILON};

use super::{CollisionConstraintRule, RigidBodyContactConstraint};
use crate::particles::PbdRigidParticles;

/// Points this close to the deepest one share the contact.
const CONTACT_TIE_TOLERANCE: f32 = 1e-3;

/// Static plane colliding with every active dynamic particle.
///
/// One contact per particle at the centroid of its deepest geometry points.
/// A normal impulse with restitution is applied there, the predicted pose is
/// re-integrated from the new velocity, and any remaining penetration is
/// pushed out along the normal.
#[derive(Debug, Clone)]
pub struct PlaneCollisionRule {
    plane: Plane,
    restitution: f32,
    constraints: Vec<RigidBodyContactConstraint>,
}

impl PlaneCollisionRule {
    /// Rule against `plane` with the given coefficient of restitution.
    pub fn new(plane: Plane, restitution: f32) -> Self {
        Self { plane, restitution, constraints: Vec::new() }
    }

    /// Horizontal ground plane at `height` facing `+z`.
    pub fn ground(height: f32, restitution: f32) -> Self {
        Self::new(Plane::new(Vec3::new(0.0, 0.0, height), Vec3::UNIT_Z), restitution)
    }

    /// The collision plane.
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Deepest point set of `geometry` placed at `pose`, as `(centroid, phi)`.
    fn deepest_contact(&self, geometry: &ImplicitShape, pose: &RigidTransform) -> Option<(Vec3, f32)> {
        let normal = self.plane.plane_normal();
        let mut points = Vec::new();
        let mut stack = vec![(geometry, *pose)];
        while let Some((shape, placement)) = stack.pop() {
            match shape {
                ImplicitShape::Union(union) => {
                    for member in union.members() {
                        stack.push((&member.shape, placement.multiply(&member.transform)));
                    }
                }
                ImplicitShape::Box(b) => {
                    points.extend(b.corners().iter().map(|c| placement.transform_position(c)));
                }
                ImplicitShape::Sphere(s) => {
                    let local_dir = placement.inverse_transform_vector(&-normal);
                    points.push(placement.transform_position(&s.support(&local_dir)));
                }
                ImplicitShape::Plane(_) => {}
            }
        }

        let min_phi = points.iter().map(|p| self.plane.signed_distance(p)).fold(f32::MAX, f32::min);
        if min_phi >= 0.0 {
            return None;
        }
        let mut sum = Vec3::ZERO;
        let mut count = 0.0_f32;
        for p in &points {
            if self.plane.signed_distance(p) <= min_phi + CONTACT_TIE_TOLERANCE {
                sum += *p;
                count += 1.0;
            }
        }
        Some((sum / count, min_phi))
    }
}

impl PlaneCollisionRule {
    /// Contact, impulse and push-out for one particle.
    fn resolve(&mut self, particles: &mut PbdRigidParticles, index: usize, dt: f32) {
        if *particles.disabled(index) || *particles.sleeping(index) || !particles.is_dynamic(index) {
            return;
        }
        let normal = self.plane.plane_normal();
        let pose = particles.predicted_transform(index);
        let Some((location, phi)) = particles.geometry(index).as_ref().and_then(|g| self.deepest_contact(g, &pose))
        else {
            return;
        };

        let arm = location - pose.translation();
        let inv_m = *particles.inv_m(index);
        let rot = pose.rotation().to_mat3();
        let inv_i = rot.multiply(particles.inv_i(index)).multiply(&rot.transpose());
        let mut v = *particles.v(index);
        let mut w = *particles.w(index);
        let vn = (v + w.cross(&arm)).dot(&normal);

        let mut impulse = Vec3::ZERO;
        if vn < 0.0 {
            let arm_n = arm.cross(&normal);
            let k = inv_m + normal.dot(&inv_i.mul_vec3(&arm_n).cross(&arm));
            if k > EPSILON {
                impulse = normal.scale(-(1.0 + self.restitution) * vn / k);
                v += impulse.scale(inv_m);
                w += inv_i.mul_vec3(&arm.cross(&impulse));
                *particles.v_mut(index) = v;
                *particles.w_mut(index) = w;
                let x = *particles.x(index);
                let r = *particles.r(index);
                *particles.p_mut(index) = x + v.scale(dt);
                *particles.q_mut(index) = r.integrate(&w, dt);
            }
        }

        let repredicted = particles.predicted_transform(index);
        let depth = particles
            .geometry(index)
            .as_ref()
            .and_then(|g| self.deepest_contact(g, &repredicted))
            .map_or(0.0, |(_, phi)| phi);
        if depth < 0.0 {
            *particles.p_mut(index) += normal.scale(-depth);
        }

        self.constraints.push(RigidBodyContactConstraint {
            particle_index: index,
            levelset_index: None,
            location,
            normal,
            phi,
            accumulated_impulse: impulse,
        });
    }
}

impl CollisionConstraintRule for PlaneCollisionRule {
    fn apply(&mut self, particles: &mut PbdRigidParticles, active: &BTreeSet<usize>, dt: f32) {
        self.constraints.clear();
        for &index in active {
            self.resolve(particles, index, dt);
        }
    }

    fn constraints(&self) -> &[RigidBodyContactConstraint] {
        &self.constraints
    }

    fn remove_constraints(&mut self, indices: &BTreeSet<usize>) {
        self.constraints.retain(|c| !indices.contains(&c.particle_index));
    }

    fn update_constraints(&mut self, particles: &mut PbdRigidParticles, indices: &BTreeSet<usize>, dt: f32) {
        self.remove_constraints(indices);
        for &index in indices {
            self.resolve(particles, index, dt);
        }
        self.constraints.sort_by_key(|c| c.particle_index);
    }
}
