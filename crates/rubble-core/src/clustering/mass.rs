// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::{Mat3, Quat, Vec3, EPSILON};

use crate::particles::PbdRigidParticles;

/// Aggregate rigid-body properties of a set of children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MassProperties {
    pub mass: f32,
    pub inv_mass: f32,
    pub center: Vec3,
    /// Principal axes of the combined inertia.
    pub rotation: Quat,
    /// Diagonal inertia along `rotation`.
    pub inertia: Vec3,
    pub inv_inertia: Vec3,
    pub v: Vec3,
    pub w: Vec3,
    /// Velocities the step started from, combined the same way as `v`/`w`.
    pub pre_v: Vec3,
    pub pre_w: Vec3,
}

/// Combines the children's mass, momentum and inertia at their current poses.
///
/// Any kinematic child makes the whole aggregate kinematic: infinite mass and
/// inertia, zero velocity.
pub(crate) fn aggregate(particles: &PbdRigidParticles, children: &[usize]) -> MassProperties {
    let mut mass = 0.0_f32;
    let mut weighted = Vec3::ZERO;
    let mut momentum = Vec3::ZERO;
    let mut pre_momentum = Vec3::ZERO;
    let mut kinematic = false;
    for &child in children {
        let m = *particles.m(child);
        mass += m;
        weighted += particles.x(child).scale(m);
        momentum += particles.v(child).scale(m);
        pre_momentum += particles.pre_v(child).scale(m);
        kinematic |= !particles.is_dynamic(child);
    }

    let center = if mass > EPSILON {
        weighted / mass
    } else {
        let sum = children.iter().fold(Vec3::ZERO, |acc, &c| acc + *particles.x(c));
        sum / children.len().max(1) as f32
    };

    let mut inertia = Mat3::ZERO;
    let mut angular_momentum = Vec3::ZERO;
    let mut pre_angular_momentum = Vec3::ZERO;
    for &child in children {
        let m = *particles.m(child);
        let d = *particles.x(child) - center;
        let world_i = particles.world_inertia(child);
        let shift = Mat3::identity().scale(m * d.length_squared()) + Mat3::outer(&d, &d).scale(-m);
        inertia = inertia + world_i + shift;
        angular_momentum += world_i.mul_vec3(particles.w(child)) + d.cross(&particles.v(child).scale(m));
        pre_angular_momentum += world_i.mul_vec3(particles.pre_w(child)) + d.cross(&particles.pre_v(child).scale(m));
    }

    let (principal, axes) = inertia.symmetric_eigen();
    let rotation = Quat::from_mat3(&axes).normalize();

    if kinematic || mass <= EPSILON {
        return MassProperties {
            mass,
            inv_mass: 0.0,
            center,
            rotation,
            inertia: principal,
            inv_inertia: Vec3::ZERO,
            v: Vec3::ZERO,
            w: Vec3::ZERO,
            pre_v: Vec3::ZERO,
            pre_w: Vec3::ZERO,
        };
    }

    let inv_inertia_world = inertia.inverse();
    let spin = |l: Vec3| inv_inertia_world.map_or(Vec3::ZERO, |inv| inv.mul_vec3(&l));
    MassProperties {
        mass,
        inv_mass: 1.0 / mass,
        center,
        rotation,
        inertia: principal,
        inv_inertia: Vec3::new(invert(principal.x()), invert(principal.y()), invert(principal.z())),
        v: momentum / mass,
        w: spin(angular_momentum),
        pre_v: pre_momentum / mass,
        pre_w: spin(pre_angular_momentum),
    }
}

fn invert(value: f32) -> f32 {
    if value > EPSILON {
        1.0 / value
    } else {
        0.0
    }
}
