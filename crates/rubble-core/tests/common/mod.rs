// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use rubble_core::{PbdRigidsEvolution, RigidBodyDesc, SolverConfig};
use rubble_math::Vec3;

/// Routes `tracing` output through the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Solver settings without gravity, so only scripted contacts move things.
pub fn weightless() -> SolverConfig {
    let mut config = SolverConfig::default();
    config.evolution.gravity = [0.0, 0.0, 0.0];
    config
}

/// Unit cube of mass 1 centred at `center`.
pub fn cube(center: Vec3) -> RigidBodyDesc {
    RigidBodyDesc::cuboid(center, Vec3::splat(0.5), 1.0)
}

/// Adds unit cubes along +x starting at the origin, one metre apart so
/// neighbours touch.
pub fn cube_row(evolution: &mut PbdRigidsEvolution, count: usize) -> Vec<usize> {
    (0..count).map(|i| evolution.add_rigid_body(&cube(Vec3::new(i as f32, 0.0, 0.0)))).collect()
}

pub fn approx_eq3(a: Vec3, b: Vec3, tol: f32) {
    assert!((a - b).length() <= tol, "expected {b:?}, got {a:?}");
}

pub fn approx(a: f32, b: f32, tol: f32) {
    assert!((a - b).abs() <= tol, "expected {b}, got {a}");
}
