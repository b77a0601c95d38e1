// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Stepping: integration, ground contact, breaking on impact, islands, events.

mod common;

use common::{approx, approx_eq3, cube, init_tracing, weightless};
use rubble_core::{
    PbdRigidsEvolution, PlaneCollisionRule, RigidBodyContactConstraint, RigidBodyDesc,
    ScriptedCollisionRule, SolverConfig,
};
use rubble_math::{Quat, Vec3};

const DT: f32 = 1.0 / 60.0;

fn drop_pair(strain: Option<f32>) -> (PbdRigidsEvolution, usize) {
    let mut evolution = PbdRigidsEvolution::new(&SolverConfig::default());
    for x in [-0.5, 0.5] {
        let mut body = cube(Vec3::new(x, 0.0, 2.0));
        body.strain = strain;
        evolution.add_rigid_body(&body);
    }
    let parent = evolution.create_cluster_particle(&[0, 1]);
    (evolution, parent)
}

#[test]
fn free_fall_follows_gravity() {
    let mut evolution = PbdRigidsEvolution::new(&SolverConfig::default());
    let body = evolution.add_rigid_body(&RigidBodyDesc::new(Vec3::new(0.0, 0.0, 10.0)));
    let mut rule = ScriptedCollisionRule::new();

    evolution.advance_one_time_step(0.1, &mut rule);

    let p = evolution.particles();
    approx(p.v(body).z(), -0.981, 1e-4);
    approx(p.x(body).z(), 10.0 - 0.0981, 1e-4);
    approx(evolution.time(), 0.1, 1e-7);
}

#[test]
fn kinematic_bodies_ignore_gravity() {
    let mut evolution = PbdRigidsEvolution::new(&SolverConfig::default());
    let body = evolution.add_rigid_body(&cube(Vec3::ZERO).with_velocity(Vec3::UNIT_X).kinematic());
    let mut rule = PlaneCollisionRule::ground(-5.0, 0.2);
    for _ in 0..10 {
        evolution.advance_one_time_step(0.1, &mut rule);
    }
    approx_eq3(*evolution.particles().x(body), Vec3::UNIT_X, 1e-4);
    approx_eq3(*evolution.particles().v(body), Vec3::UNIT_X, 1e-4);
}

#[test]
fn spin_is_integrated_into_orientation() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let body = evolution.add_rigid_body(&cube(Vec3::ZERO).with_angular_velocity(Vec3::UNIT_Z));
    let mut rule = ScriptedCollisionRule::new();
    for _ in 0..10 {
        evolution.advance_one_time_step(0.01, &mut rule);
    }
    let p = evolution.particles();
    let (axis, angle) = p.r(body).to_axis_angle();
    approx(angle, 0.1, 1e-3);
    approx_eq3(axis, Vec3::UNIT_Z, 1e-3);
    approx_eq3(*p.w(body), Vec3::UNIT_Z, 1e-3);
}

#[test]
fn cube_comes_to_rest_on_ground() {
    init_tracing();
    let mut evolution = PbdRigidsEvolution::new(&SolverConfig::default());
    let body = evolution.add_rigid_body(&cube(Vec3::new(0.0, 0.0, 0.5)));
    let mut rule = PlaneCollisionRule::ground(0.0, 0.2);
    for _ in 0..120 {
        evolution.advance_one_time_step(DT, &mut rule);
    }
    let z = evolution.particles().x(body).z();
    assert!((0.49..0.56).contains(&z), "resting height {z}");
    assert!(!evolution.events().collisions().is_empty());
}

#[test]
fn strong_cluster_lands_intact() {
    let (mut evolution, parent) = drop_pair(None);
    let mut rule = PlaneCollisionRule::ground(0.0, 0.2);
    for _ in 0..90 {
        evolution.advance_one_time_step(DT, &mut rule);
    }
    let p = evolution.particles();
    assert_eq!(evolution.children(parent), Some(&[0, 1][..]));
    assert!(evolution.events().breakings().is_empty());
    let z = p.x(parent).z();
    assert!((0.49..0.6).contains(&z), "resting height {z}");
    approx_eq3(*p.x(0), *p.x(parent) + Vec3::new(-0.5, 0.0, 0.0), 1e-3);
}

#[test]
fn weak_cluster_shatters_on_impact() {
    init_tracing();
    let (mut evolution, parent) = drop_pair(Some(1.0));
    let mut rule = PlaneCollisionRule::ground(0.0, 0.2);
    for _ in 0..60 {
        evolution.advance_one_time_step(DT, &mut rule);
    }
    let p = evolution.particles();
    assert_eq!(evolution.cluster_id(0), None);
    assert_eq!(evolution.cluster_id(1), None);
    assert!(*p.disabled(parent));
    assert_eq!(evolution.events().breakings().len(), 2);
    for child in [0, 1] {
        let z = p.x(child).z();
        assert!(z > 0.45, "child {child} sank to {z}");
    }
    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![0, 1]);
}

/// Two touching cubes, just above the ground and falling at 5 m/s, glued
/// into one cluster. Only cube 0 is weak enough to break on landing.
fn landing_slab(rewind: bool) -> PbdRigidsEvolution {
    let mut config = SolverConfig::default();
    config.clustering.rewind_on_decluster = rewind;
    let mut evolution = PbdRigidsEvolution::new(&config);
    let fall = Vec3::new(0.0, 0.0, -5.0);
    evolution.add_rigid_body(&cube(Vec3::new(0.0, 0.0, 0.5)).with_velocity(fall).with_strain(0.1));
    evolution.add_rigid_body(&cube(Vec3::new(1.0, 0.0, 0.5)).with_velocity(fall));
    evolution.create_cluster_particle(&[0, 1]);
    evolution
}

#[test]
fn released_child_collides_on_its_own_in_the_breaking_step() {
    init_tracing();
    let mut evolution = landing_slab(true);
    let mut rule = PlaneCollisionRule::ground(0.0, 0.2);
    evolution.advance_one_time_step(DT, &mut rule);

    let breakings = evolution.events().breakings();
    assert_eq!(breakings.len(), 1);
    assert_eq!(breakings[0].particle_index, 0);

    // Each half lands with unit mass and no lever arm: 1.2 * (5 + g dt).
    let expected = 1.2 * (5.0 + 9.81 * DT);
    let collisions = evolution.events().collisions();
    let indices: Vec<usize> = collisions.iter().map(|c| c.particle_index).collect();
    assert_eq!(indices, vec![0, 2]);
    for event in collisions {
        approx(event.accumulated_impulse[2], expected, 1e-3);
    }
    assert!(evolution.particles().v(0).z() > 0.0);
}

#[test]
fn without_rewind_the_released_child_waits_a_step_for_contact() {
    let mut evolution = landing_slab(false);
    let mut rule = PlaneCollisionRule::ground(0.0, 0.2);
    evolution.advance_one_time_step(DT, &mut rule);

    assert_eq!(evolution.events().breakings().len(), 1);
    let collisions = evolution.events().collisions();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].particle_index, 2);
    approx(collisions[0].accumulated_impulse[2], 2.0 * 1.2 * (5.0 + 9.81 * DT), 1e-2);
}

#[test]
fn contacts_between_bodies_share_an_island() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    for x in [0.0, 1.0, 5.0] {
        evolution.add_rigid_body(&cube(Vec3::new(x, 0.0, 0.0)));
    }
    let mut rule = ScriptedCollisionRule::new();
    rule.push_contact(RigidBodyContactConstraint {
        particle_index: 1,
        levelset_index: Some(0),
        location: Vec3::new(0.5, 0.0, 0.0),
        normal: Vec3::UNIT_X,
        phi: 0.0,
        accumulated_impulse: Vec3::ZERO,
    });
    evolution.advance_one_time_step(DT, &mut rule);

    let p = evolution.particles();
    assert_eq!(*p.island(0), Some(0));
    assert_eq!(*p.island(1), Some(0));
    assert_eq!(*p.island(2), Some(1));
    let islands = evolution.island_particles();
    assert_eq!(islands.len(), 2);
    assert_eq!(islands[0].iter().copied().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn collision_events_describe_the_contact() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let body = evolution.add_rigid_body(&cube(Vec3::ZERO));
    let mut rule = ScriptedCollisionRule::new();
    rule.push_impulse(body, Vec3::new(0.0, 0.0, -0.5), Vec3::new(0.0, 0.0, 2.0));
    evolution.advance_one_time_step(DT, &mut rule);

    let collisions = evolution.events_mut().drain_collisions();
    assert_eq!(collisions.len(), 1);
    let event = &collisions[0];
    assert_eq!(event.particle_index, body);
    assert_eq!(event.levelset_index, None);
    assert_eq!(event.mass1, 1.0);
    assert_eq!(event.mass2, 0.0);
    assert_eq!(event.accumulated_impulse, [0.0, 0.0, 2.0]);
    assert_eq!(event.time, 0.0);
    assert!(evolution.events().collisions().is_empty());

    let json = serde_json::to_string(event).unwrap();
    assert!(json.contains("\"accumulated_impulse\":[0.0,0.0,2.0]"), "{json}");
}

#[test]
fn trailing_events_follow_fast_bodies() {
    let mut config = weightless();
    config.evolution.trailing_event_min_speed = Some(1.0);
    config.evolution.collision_event_min_impulse = None;
    let mut evolution = PbdRigidsEvolution::new(&config);
    let fast = evolution.add_rigid_body(&cube(Vec3::ZERO).with_velocity(Vec3::new(5.0, 0.0, 0.0)));
    let _slow = evolution.add_rigid_body(&RigidBodyDesc::ball(Vec3::new(0.0, 5.0, 0.0), 0.5, 1.0).with_velocity(Vec3::new(0.1, 0.0, 0.0)));
    let mut rule = ScriptedCollisionRule::new();
    rule.push_impulse(fast, Vec3::ZERO, Vec3::UNIT_Z);
    evolution.advance_one_time_step(0.1, &mut rule);

    let events = evolution.events();
    assert!(events.collisions().is_empty());
    assert_eq!(events.trailings().len(), 1);
    let trailing = &events.trailings()[0];
    assert_eq!(trailing.particle_index, fast);
    approx_eq3(Vec3::from(trailing.location), Vec3::new(0.5, 0.0, 0.0), 1e-4);
    approx_eq3(Vec3::from(trailing.extent_min), Vec3::new(0.0, -0.5, -0.5), 1e-4);
}

#[test]
fn rotated_bodies_keep_their_orientation_at_rest() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let turn = Quat::from_axis_angle(Vec3::UNIT_Y, 0.3);
    let body = evolution.add_rigid_body(&cube(Vec3::ZERO).with_rotation(turn));
    let mut rule = ScriptedCollisionRule::new();
    evolution.advance_one_time_step(DT, &mut rule);
    let r = *evolution.particles().r(body);
    assert!(r.dot(&turn).abs() > 1.0 - 1e-6);
}

#[test]
#[should_panic(expected = "time step must be positive")]
fn zero_time_step_is_rejected() {
    let mut evolution = PbdRigidsEvolution::new(&SolverConfig::default());
    let mut rule = ScriptedCollisionRule::new();
    evolution.advance_one_time_step(0.0, &mut rule);
}
