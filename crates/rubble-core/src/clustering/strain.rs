// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_geom::Aabb;
use rubble_math::Vec3;
use rustc_hash::FxHashMap;

use super::PbdRigidClustering;
use crate::collision::RigidBodyContactConstraint;
use crate::particles::PbdRigidParticles;

/// Impulse gathered by one clustered child during a step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct StrainHit {
    /// Sum of contact impulse magnitudes.
    pub impulse: f32,
    /// Sum of the impulse vectors, used as the break direction.
    pub direction: Vec3,
}

impl PbdRigidClustering {
    /// Maps this step's contacts onto clustered children.
    ///
    /// A contact that names a clustered particle goes to that particle. A
    /// contact on a top-level cluster parent is shared by every child whose
    /// bound (in the parent frame) lies within the distance threshold of the
    /// contact point. Magnitudes are summed per child; nothing carries over to
    /// the next step.
    pub(crate) fn compute_strain_from_collision(
        &self,
        particles: &PbdRigidParticles,
        contacts: &[RigidBodyContactConstraint],
    ) -> FxHashMap<usize, StrainHit> {
        let mut hits: FxHashMap<usize, StrainHit> = FxHashMap::default();
        for contact in contacts {
            let magnitude = contact.accumulated_impulse.length();
            if magnitude <= 0.0 {
                continue;
            }
            let sides = [
                (Some(contact.particle_index), contact.accumulated_impulse),
                (contact.levelset_index, -contact.accumulated_impulse),
            ];
            for (side, impulse) in sides {
                let Some(side) = side else {
                    continue;
                };
                if self.cluster_id(particles, side).is_some() {
                    accumulate(&mut hits, side, magnitude, impulse);
                } else if let Some(children) = self.parent_to_children.get(&side) {
                    let local = particles.predicted_transform(side).inverse_transform_position(&contact.location);
                    let probe = Aabb::from_points(&[local]).thicken(self.config.cluster_distance_threshold);
                    for &child in children {
                        if self.child_bounds_in_parent(particles, child).intersects(&probe) {
                            accumulate(&mut hits, child, magnitude, impulse);
                        }
                    }
                }
            }
        }
        hits
    }
}

fn accumulate(hits: &mut FxHashMap<usize, StrainHit>, child: usize, magnitude: f32, impulse: Vec3) {
    let hit = hits.entry(child).or_default();
    hit.impulse += magnitude;
    hit.direction += impulse;
}
