// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared fixtures for the rubble benchmarks.

use rubble_core::{PbdRigidsEvolution, RigidBodyDesc, SolverConfig};
use rubble_math::Vec3;

/// Adds a `side × side` wall of touching unit cubes standing on the
/// `z = 0` plane and returns their indices in row-major order.
pub fn build_wall(evolution: &mut PbdRigidsEvolution, side: usize) -> Vec<usize> {
    let mut bricks = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            let center = Vec3::new(col as f32, 0.0, row as f32 + 0.5);
            bricks.push(evolution.add_rigid_body(&RigidBodyDesc::cuboid(center, Vec3::splat(0.5), 1.0)));
        }
    }
    bricks
}

/// Evolution holding one clustered wall; returns it with the parent index.
pub fn clustered_wall(config: &SolverConfig, side: usize) -> (PbdRigidsEvolution, usize) {
    let mut evolution = PbdRigidsEvolution::new(config);
    let bricks = build_wall(&mut evolution, side);
    let parent = evolution.create_cluster_particle(&bricks);
    (evolution, parent)
}
