// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Cluster creation, strain-driven breaking, and regrouping.

mod common;

use common::{approx, approx_eq3, cube, cube_row, init_tracing, weightless};
use rubble_core::{
    PbdRigidsEvolution, RigidBodyContactConstraint, ScriptedCollisionRule, SolverConfig,
};
use rubble_geom::{ImplicitObject, ImplicitShape};
use rubble_math::Vec3;

const DT: f32 = 1.0 / 60.0;

/// Two unit cubes at x = -10 and x = 10 glued into one cluster.
fn two_far_cubes(config: &SolverConfig) -> (PbdRigidsEvolution, usize) {
    let mut evolution = PbdRigidsEvolution::new(config);
    evolution.add_rigid_body(&cube(Vec3::new(-10.0, 0.0, 0.0)));
    evolution.add_rigid_body(&cube(Vec3::new(10.0, 0.0, 0.0)));
    let parent = evolution.create_cluster_particle(&[0, 1]);
    (evolution, parent)
}

fn hit(particle: usize, location: Vec3, impulse: Vec3) -> ScriptedCollisionRule {
    let mut rule = ScriptedCollisionRule::new();
    rule.push_impulse(particle, location, impulse);
    rule
}

#[test]
fn cluster_takes_combined_mass_and_position() {
    init_tracing();
    let (evolution, parent) = two_far_cubes(&weightless());
    let p = evolution.particles();

    assert_eq!(parent, 2);
    assert_eq!(*p.m(parent), 2.0);
    approx_eq3(*p.x(parent), Vec3::ZERO, 1e-5);
    assert_eq!(evolution.children(parent), Some(&[0, 1][..]));
    assert_eq!(evolution.cluster_id(0), Some(parent));
    assert_eq!(evolution.cluster_id(1), Some(parent));
    assert!(*p.disabled(0) && *p.disabled(1));
    assert!(!*p.disabled(parent));
    assert_eq!(evolution.active_indices().iter().copied().collect::<Vec<_>>(), vec![parent]);
    approx_eq3(evolution.clustering().child_to_parent(p, 0).translation(), Vec3::new(-10.0, 0.0, 0.0), 1e-4);
}

#[test]
fn cluster_conserves_linear_and_angular_momentum() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    evolution.add_rigid_body(&cube(Vec3::new(-1.0, 0.0, 0.0)).with_velocity(Vec3::new(0.0, -1.0, 0.0)));
    evolution.add_rigid_body(&cube(Vec3::new(1.0, 0.0, 0.0)).with_velocity(Vec3::new(0.0, 1.0, 0.0)));
    let parent = evolution.create_cluster_particle(&[0, 1]);
    let p = evolution.particles();

    approx_eq3(*p.v(parent), Vec3::ZERO, 1e-6);
    let angular_momentum = p.world_inertia(parent).mul_vec3(p.w(parent));
    approx_eq3(angular_momentum, Vec3::new(0.0, 0.0, 2.0), 1e-4);
}

#[test]
fn cluster_geometry_is_union_of_children() {
    let (evolution, parent) = two_far_cubes(&weightless());
    let p = evolution.particles();
    match p.geometry(parent).as_ref().unwrap() {
        ImplicitShape::Union(union) => assert_eq!(union.members().len(), 2),
        other => unreachable!("expected union geometry, got {other:?}"),
    }
    let bounds = p.world_bounds(parent).unwrap();
    approx_eq3(bounds.min(), Vec3::new(-10.5, -0.5, -0.5), 1e-4);
    approx_eq3(bounds.max(), Vec3::new(10.5, 0.5, 0.5), 1e-4);

    let local = p.transform(parent).inverse_transform_position(&Vec3::new(-10.0, 0.0, 0.0));
    assert!(p.geometry(parent).as_ref().unwrap().signed_distance(&local) < 0.0);
}

#[test]
fn impulse_above_strain_releases_child() {
    init_tracing();
    let (mut evolution, parent) = two_far_cubes(&weightless());
    evolution.set_strain(0, 1.0);

    let mut rule = hit(0, Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 5.0));
    evolution.advance_one_time_step(DT, &mut rule);

    let p = evolution.particles();
    assert_eq!(evolution.cluster_id(0), None);
    assert!(!*p.disabled(0));
    approx_eq3(*p.x(0), Vec3::new(-10.0, 0.0, 0.0), 1e-4);
    assert_eq!(evolution.children(parent), Some(&[1][..]));
    assert_eq!(*p.m(parent), 1.0);
    approx_eq3(*p.x(parent), Vec3::new(10.0, 0.0, 0.0), 1e-4);
    assert!(evolution.active_indices().contains(&0));
    assert!(evolution.active_indices().contains(&parent));
    assert!(!evolution.active_indices().contains(&1));

    let breakings = evolution.events().breakings();
    assert_eq!(breakings.len(), 1);
    let event = &breakings[0];
    assert_eq!(event.particle_index, 0);
    assert_eq!(event.mass, 1.0);
    approx_eq3(Vec3::from(event.breaking_region_normal), Vec3::UNIT_Z, 1e-6);
    approx_eq3(Vec3::from(event.breaking_region_centroid), Vec3::new(-10.0, 0.0, 0.0), 1e-4);
    approx(event.breaking_region_radius, 0.5 * 3.0_f32.sqrt(), 1e-5);
}

#[test]
fn impulse_equal_to_strain_holds() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    evolution.set_strain(0, 5.0);

    let mut rule = hit(0, Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 5.0));
    evolution.advance_one_time_step(DT, &mut rule);
    assert_eq!(evolution.cluster_id(0), Some(parent));
    assert!(evolution.events().breakings().is_empty());

    let mut rule = hit(0, Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 5.01));
    evolution.advance_one_time_step(DT, &mut rule);
    assert_eq!(evolution.cluster_id(0), None);
}

#[test]
fn impulses_sum_within_a_step_but_not_across_steps() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    evolution.set_strain(0, 5.0);
    let at = Vec3::new(-10.0, 0.0, 0.0);
    let up = Vec3::new(0.0, 0.0, 3.0);

    for _ in 0..3 {
        let mut rule = hit(0, at, up);
        evolution.advance_one_time_step(DT, &mut rule);
    }
    assert_eq!(evolution.cluster_id(0), Some(parent));

    let mut rule = hit(0, at, up);
    rule.push_impulse(0, at, up);
    evolution.advance_one_time_step(DT, &mut rule);
    assert_eq!(evolution.cluster_id(0), None);
}

#[test]
fn contact_on_parent_strains_nearby_children_only() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    evolution.set_strain(0, 1.0);
    evolution.set_strain(1, 1.0);

    let mut rule = hit(parent, Vec3::new(-10.0, 0.0, -0.5), Vec3::new(0.0, 0.0, 4.0));
    evolution.advance_one_time_step(DT, &mut rule);

    assert_eq!(evolution.cluster_id(0), None);
    assert_eq!(evolution.cluster_id(1), Some(parent));
}

#[test]
fn contact_between_particles_strains_both_sides() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    evolution.set_strain(0, 1.0);
    evolution.set_strain(1, 1.0);

    let mut rule = ScriptedCollisionRule::new();
    rule.push_contact(RigidBodyContactConstraint {
        particle_index: 0,
        levelset_index: Some(1),
        location: Vec3::ZERO,
        normal: Vec3::UNIT_X,
        phi: 0.0,
        accumulated_impulse: Vec3::new(2.0, 0.0, 0.0),
    });
    evolution.advance_one_time_step(DT, &mut rule);

    assert_eq!(evolution.cluster_id(0), None);
    assert_eq!(evolution.cluster_id(1), None);
    assert!(*evolution.particles().disabled(parent));
    assert_eq!(evolution.children(parent), None);
}

#[test]
fn released_nested_cluster_keeps_its_children() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let g1 = evolution.add_rigid_body(&cube(Vec3::ZERO));
    let g2 = evolution.add_rigid_body(&cube(Vec3::new(1.0, 0.0, 0.0)));
    let b = evolution.add_rigid_body(&cube(Vec3::new(10.0, 0.0, 0.0)));
    let inner = evolution.create_cluster_particle(&[g1, g2]);
    let top = evolution.create_cluster_particle(&[inner, b]);
    evolution.set_strain(inner, 1.0);
    approx(*evolution.particles().m(top), 3.0, 1e-6);
    let inner_inertia = *evolution.particles().i(inner);

    let mut rule = hit(inner, Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 0.0, 10.0));
    evolution.advance_one_time_step(DT, &mut rule);

    let p = evolution.particles();
    assert_eq!(evolution.cluster_id(inner), None);
    assert_eq!(evolution.children(inner), Some(&[g1, g2][..]));
    assert_eq!(evolution.cluster_id(g1), Some(inner));
    assert_eq!(evolution.cluster_id(g2), Some(inner));
    approx(*p.m(inner), 2.0, 1e-6);
    assert_eq!(*p.i(inner), inner_inertia);
    approx_eq3(*p.x(inner), Vec3::new(0.5, 0.0, 0.0), 1e-4);
    approx_eq3(*p.x(g1), Vec3::ZERO, 1e-4);
    assert_eq!(evolution.children(top), Some(&[b][..]));
    approx(*p.m(top), 1.0, 1e-6);

    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![inner, top]);
}

#[test]
fn touching_children_are_linked() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let row = cube_row(&mut evolution, 3);
    let parent = evolution.create_cluster_particle(&row);
    let clustering = evolution.clustering();
    let p = evolution.particles();

    let siblings = |i: usize| clustering.connectivity_edges(p, i).iter().map(|e| e.sibling).collect::<Vec<_>>();
    assert_eq!(siblings(0), vec![1]);
    assert_eq!(siblings(1), vec![0, 2]);
    assert_eq!(siblings(2), vec![1]);
    assert_eq!(clustering.connectivity_edges(p, 0)[0].strain, f32::MAX);
    assert!(clustering.connectivity_edges(p, parent).is_empty());
}

#[test]
fn breaking_splits_disconnected_remainder() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let row = cube_row(&mut evolution, 4);
    let parent = evolution.create_cluster_particle(&row);

    let activated = evolution.release_children(parent, &[1]);

    assert_eq!(activated, vec![1, 0]);
    assert_eq!(evolution.children(parent), Some(&[2, 3][..]));
    assert_eq!(evolution.cluster_id(0), None);
    approx(*evolution.particles().m(parent), 2.0, 1e-6);
    approx_eq3(*evolution.particles().x(parent), Vec3::new(2.5, 0.0, 0.0), 1e-4);
    let clustering = evolution.clustering();
    assert!(clustering.connectivity_edges(evolution.particles(), 0).is_empty());
    assert_eq!(clustering.connectivity_edges(evolution.particles(), 2)[0].sibling, 3);
}

#[test]
fn equal_pieces_become_an_internal_cluster() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let row = cube_row(&mut evolution, 5);
    let parent = evolution.create_cluster_particle(&row);

    let activated = evolution.release_children(parent, &[2]);

    let piece = parent + 1;
    assert_eq!(activated, vec![2, piece]);
    assert_eq!(evolution.children(parent), Some(&[0, 1][..]));
    assert_eq!(evolution.children(piece), Some(&[3, 4][..]));
    assert_eq!(evolution.cluster_id(3), Some(piece));
    let clustering = evolution.clustering();
    assert!(clustering.is_internal_cluster(evolution.particles(), piece));
    assert!(!clustering.is_internal_cluster(evolution.particles(), parent));
    approx_eq3(*evolution.particles().x(piece), Vec3::new(3.5, 0.0, 0.0), 1e-4);
    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![2, parent, piece]);
}

#[test]
fn split_pieces_keep_the_parent_strain_and_sleep() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let row = cube_row(&mut evolution, 5);
    let parent = evolution.create_cluster_particle(&row);
    evolution.set_strain(parent, 7.0);
    *evolution.particles_mut().sleeping_mut(parent) = true;

    let activated = evolution.release_children(parent, &[2]);

    let piece = parent + 1;
    assert_eq!(activated, vec![2, piece]);
    approx(evolution.strain(piece), 7.0, 0.0);
    let p = evolution.particles();
    assert!(*p.sleeping(piece));
    assert!(*p.sleeping(2));
    assert!(*p.sleeping(parent));
}

#[test]
fn released_children_of_an_awake_cluster_are_awake() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    *evolution.particles_mut().sleeping_mut(0) = true;

    evolution.release_children(parent, &[0]);
    assert!(!*evolution.particles().sleeping(0));
}

#[test]
fn cluster_sleeps_only_when_every_child_sleeps() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let row = cube_row(&mut evolution, 4);
    for &i in &row {
        *evolution.particles_mut().sleeping_mut(i) = true;
    }
    *evolution.particles_mut().sleeping_mut(row[3]) = false;

    let asleep = evolution.create_cluster_particle(&row[..2]);
    let awake = evolution.create_cluster_particle(&row[2..]);
    assert!(*evolution.particles().sleeping(asleep));
    assert!(!*evolution.particles().sleeping(awake));
}

#[test]
fn connectivity_thickness_bridges_small_gaps() {
    let spaced_row = |thickness: f32| {
        let mut config = weightless();
        config.clustering.connectivity_thickness = thickness;
        let mut evolution = PbdRigidsEvolution::new(&config);
        for x in [0.0, 1.1, 2.2] {
            evolution.add_rigid_body(&cube(Vec3::new(x, 0.0, 0.0)));
        }
        let parent = evolution.create_cluster_particle(&[0, 1, 2]);
        (evolution, parent)
    };

    let (mut evolution, parent) = spaced_row(0.01);
    assert!(evolution.clustering().connectivity_edges(evolution.particles(), 1).is_empty());
    assert_eq!(evolution.release_children(parent, &[0]), vec![0, 2]);
    assert_eq!(evolution.children(parent), Some(&[1][..]));

    let (mut evolution, parent) = spaced_row(0.2);
    let siblings: Vec<usize> =
        evolution.clustering().connectivity_edges(evolution.particles(), 1).iter().map(|e| e.sibling).collect();
    assert_eq!(siblings, vec![0, 2]);
    assert_eq!(evolution.release_children(parent, &[0]), vec![0]);
    assert_eq!(evolution.children(parent), Some(&[1, 2][..]));
}

#[test]
fn without_connectivity_the_parent_keeps_everything_else() {
    let mut config = weightless();
    config.clustering.use_connectivity = false;
    let mut evolution = PbdRigidsEvolution::new(&config);
    let row = cube_row(&mut evolution, 4);
    let parent = evolution.create_cluster_particle(&row);

    let activated = evolution.release_children(parent, &[1]);
    assert_eq!(activated, vec![1]);
    assert_eq!(evolution.children(parent), Some(&[0, 2, 3][..]));
    assert!(evolution.clustering().connectivity_edges(evolution.particles(), 0).is_empty());
}

#[test]
fn single_child_clusters_dissolve_when_configured() {
    let mut config = weightless();
    config.clustering.dissolve_single_child_clusters = true;
    let (mut evolution, parent) = two_far_cubes(&config);

    let activated = evolution.release_children(parent, &[0]);
    assert_eq!(activated, vec![0, 1]);
    assert!(*evolution.particles().disabled(parent));
    assert_eq!(evolution.children(parent), None);
    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![0, 1]);
    assert_eq!(evolution.events().breakings().len(), 2);
}

#[test]
fn deactivate_releases_every_child() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    let released = evolution.deactivate_cluster_particle(parent);

    assert_eq!(released, vec![0, 1]);
    assert!(*evolution.particles().disabled(parent));
    assert_eq!(evolution.clustering().num_clusters(), 0);
    assert_eq!(evolution.cluster_id(0), None);
    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![0, 1]);
    approx_eq3(*evolution.particles().x(1), Vec3::new(10.0, 0.0, 0.0), 1e-4);
    assert!(evolution.events().breakings().is_empty());
}

#[test]
fn children_can_move_into_a_new_internal_cluster() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let row = cube_row(&mut evolution, 3);
    let parent = evolution.create_cluster_particle(&row);

    let piece = evolution.create_cluster_particle_from_cluster_children(parent, &[2]);

    assert_eq!(evolution.children(parent), Some(&[0, 1][..]));
    assert_eq!(evolution.children(piece), Some(&[2][..]));
    assert!(evolution.clustering().is_internal_cluster(evolution.particles(), piece));
    approx(*evolution.particles().m(parent), 2.0, 1e-6);
    approx_eq3(*evolution.particles().x(piece), Vec3::new(2.0, 0.0, 0.0), 1e-4);
    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![parent, piece]);
}

#[test]
fn kinematic_child_pins_the_cluster() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    evolution.add_rigid_body(&cube(Vec3::new(-10.0, 0.0, 0.0)).kinematic());
    evolution.add_rigid_body(&cube(Vec3::new(10.0, 0.0, 0.0)).with_velocity(Vec3::UNIT_X));
    let parent = evolution.create_cluster_particle(&[0, 1]);
    evolution.set_strain(1, 1.0);

    assert!(!evolution.particles().is_dynamic(parent));
    approx_eq3(*evolution.particles().v(parent), Vec3::ZERO, 0.0);

    let mut rule = hit(1, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 50.0));
    evolution.advance_one_time_step(DT, &mut rule);
    assert_eq!(evolution.cluster_id(1), Some(parent));
}

#[test]
fn released_children_inherit_parent_motion() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    evolution.add_rigid_body(&cube(Vec3::new(-10.0, 0.0, 0.0)).with_velocity(Vec3::UNIT_X));
    evolution.add_rigid_body(&cube(Vec3::new(10.0, 0.0, 0.0)).with_velocity(Vec3::UNIT_X));
    let parent = evolution.create_cluster_particle(&[0, 1]);
    evolution.set_strain(0, 1.0);

    let mut rule = hit(0, Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 5.0));
    evolution.advance_one_time_step(DT, &mut rule);

    assert_eq!(evolution.cluster_id(0), None);
    approx_eq3(*evolution.particles().v(0), Vec3::UNIT_X, 1e-3);
    approx_eq3(*evolution.particles().v(parent), Vec3::UNIT_X, 1e-3);
}

#[test]
fn released_children_can_start_at_rest() {
    let mut config = weightless();
    config.clustering.children_inherit_velocity = false;
    let mut evolution = PbdRigidsEvolution::new(&config);
    evolution.add_rigid_body(&cube(Vec3::new(-10.0, 0.0, 0.0)).with_velocity(Vec3::UNIT_X));
    evolution.add_rigid_body(&cube(Vec3::new(10.0, 0.0, 0.0)).with_velocity(Vec3::UNIT_X));
    evolution.create_cluster_particle(&[0, 1]);
    evolution.set_strain(0, 1.0);

    let mut rule = hit(0, Vec3::new(-10.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 5.0));
    evolution.advance_one_time_step(DT, &mut rule);

    approx_eq3(*evolution.particles().v(0), Vec3::ZERO, 1e-6);
    approx_eq3(*evolution.particles().x(0), Vec3::new(-10.0, 0.0, 0.0), 1e-4);
}

#[test]
fn breaking_events_can_be_disabled() {
    let mut config = weightless();
    config.clustering.emit_breaking_events = false;
    let (mut evolution, parent) = two_far_cubes(&config);
    let _ = evolution.release_children(parent, &[0]);
    assert!(evolution.events().breakings().is_empty());
}

#[test]
#[should_panic(expected = "already belongs to a cluster")]
fn clustered_particle_cannot_join_another_cluster() {
    let (mut evolution, _) = two_far_cubes(&weightless());
    let _ = evolution.create_cluster_particle(&[0]);
}

#[test]
#[should_panic(expected = "at least one child")]
fn empty_cluster_is_rejected() {
    let mut evolution = PbdRigidsEvolution::new(&weightless());
    let _ = evolution.create_cluster_particle(&[]);
}

#[test]
fn releasing_no_children_leaves_the_cluster_whole() {
    let (mut evolution, parent) = two_far_cubes(&weightless());

    assert!(evolution.release_children(parent, &[]).is_empty());
    assert_eq!(evolution.children(parent), Some(&[0, 1][..]));
    assert_eq!(evolution.cluster_id(0), Some(parent));
    assert!(evolution.events().breakings().is_empty());
    let active: Vec<usize> = evolution.active_indices().iter().copied().collect();
    assert_eq!(active, vec![parent]);
}

#[test]
#[should_panic(expected = "is not a child of")]
fn releasing_a_stranger_is_rejected() {
    let (mut evolution, parent) = two_far_cubes(&weightless());
    let stranger = evolution.add_rigid_body(&cube(Vec3::ZERO));
    let _ = evolution.release_children(parent, &[stranger]);
}
