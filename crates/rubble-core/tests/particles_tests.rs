// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Layered particle sets share one collection.

mod common;

use common::approx_eq3;
use core::f32::consts::FRAC_PI_2;
use rubble_core::PbdRigidParticles;
use rubble_geom::{Aabb, ImplicitShape, RigidTransform};
use rubble_math::{Mat3, Quat, Vec3};

#[test]
fn layers_grow_together() {
    let mut p = PbdRigidParticles::new();
    assert_eq!(p.add_particles(3), 0);
    assert_eq!(p.size(), 3);
    let lens = p.collection().array_lens();
    assert!(lens.iter().all(|&l| l == 3), "{lens:?}");
    assert_eq!(p.add_particles(1), 3);
    assert!(p.collection().array_lens().iter().all(|&l| l == 4));
}

#[test]
fn new_particles_are_unit_bodies() {
    let mut p = PbdRigidParticles::new();
    p.add_particles(1);
    assert_eq!(*p.m(0), 1.0);
    assert_eq!(*p.inv_m(0), 1.0);
    assert_eq!(*p.i(0), Mat3::identity());
    assert_eq!(*p.r(0), Quat::identity());
    assert_eq!(*p.island(0), None);
    assert!(!*p.disabled(0));
    assert!(p.is_dynamic(0));
    assert!(p.geometry(0).is_none());
}

#[test]
fn auxiliary_arrays_follow_particles() {
    let mut p = PbdRigidParticles::new();
    p.add_particles(2);
    let tag = p.add_array_with(7_u8);
    p.add_particles(1);
    assert_eq!(&p.collection().array(tag)[..], &[7, 7, 7]);
}

#[test]
fn poses_and_bounds() {
    let mut p = PbdRigidParticles::new();
    p.add_particles(1);
    let turn = Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2);
    p.set_transform(0, &RigidTransform::new(Vec3::new(1.0, 2.0, 3.0), turn));
    *p.geometry_mut(0) = Some(ImplicitShape::Box(Aabb::new(Vec3::new(-2.0, -0.5, -0.5), Vec3::new(2.0, 0.5, 0.5))));

    let world = p.world_bounds(0).unwrap();
    approx_eq3(world.min(), Vec3::new(0.5, 0.0, 2.5), 1e-4);
    approx_eq3(world.max(), Vec3::new(1.5, 4.0, 3.5), 1e-4);

    p.set_predicted_transform(0, &RigidTransform::from_translation(Vec3::UNIT_X));
    approx_eq3(*p.p(0), Vec3::UNIT_X, 0.0);
    assert_eq!(*p.q(0), Quat::identity());
}

#[test]
fn point_velocity_includes_spin() {
    let mut p = PbdRigidParticles::new();
    p.add_particles(1);
    *p.v_mut(0) = Vec3::new(1.0, 0.0, 0.0);
    *p.w_mut(0) = Vec3::new(0.0, 0.0, 2.0);
    let at = p.point_velocity(0, &Vec3::new(0.0, 1.0, 0.0));
    approx_eq3(at, Vec3::new(-1.0, 0.0, 0.0), 1e-6);
}

#[test]
fn world_inertia_rotates_body_tensor() {
    let mut p = PbdRigidParticles::new();
    p.add_particles(1);
    *p.i_mut(0) = Mat3::from_diagonal(Vec3::new(1.0, 2.0, 3.0));
    *p.r_mut(0) = Quat::from_axis_angle(Vec3::UNIT_Z, FRAC_PI_2);
    let world = p.world_inertia(0);
    approx_eq3(world.diagonal(), Vec3::new(2.0, 1.0, 3.0), 1e-5);
}
