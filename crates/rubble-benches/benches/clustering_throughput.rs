// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Cluster assembly and breaking costs as the child count grows.
//!
//! ```sh
//! cargo bench --package rubble-benches --bench clustering_throughput
//! ```
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use rubble_benches::{build_wall, clustered_wall};
use rubble_core::{PbdRigidsEvolution, ScriptedCollisionRule, SolverConfig};
use rubble_math::Vec3;
use std::{hint::black_box, time::Duration};

const SIDES: [usize; 4] = [2, 4, 8, 16];

fn bench_create(c: &mut Criterion) {
    let config = SolverConfig::default();
    let mut group = c.benchmark_group("cluster_create");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    for &side in &SIDES {
        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, &side| {
            b.iter_batched(
                || {
                    let mut evolution = PbdRigidsEvolution::new(&config);
                    let bricks = build_wall(&mut evolution, side);
                    (evolution, bricks)
                },
                |(mut evolution, bricks)| {
                    let parent = evolution.create_cluster_particle(&bricks);
                    black_box((evolution, parent));
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_break(c: &mut Criterion) {
    let mut config = SolverConfig::default();
    config.evolution.gravity = [0.0, 0.0, 0.0];
    let mut group = c.benchmark_group("cluster_break_step");
    group.sample_size(30);
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    for &side in &SIDES {
        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, &side| {
            b.iter_batched(
                || {
                    let (mut evolution, parent) = clustered_wall(&config, side);
                    // Break the first column out of the wall.
                    let mut rule = ScriptedCollisionRule::new();
                    for row in 0..side {
                        let brick = row * side;
                        evolution.set_strain(brick, 1.0);
                        let at = *evolution.particles().x(brick);
                        rule.push_impulse(brick, at, Vec3::new(-5.0, 0.0, 0.0));
                    }
                    (evolution, parent, rule)
                },
                |(mut evolution, parent, mut rule)| {
                    evolution.advance_one_time_step(1.0 / 60.0, &mut rule);
                    black_box((evolution.children(parent).map(<[usize]>::len), evolution));
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create, bench_break);
criterion_main!(benches);
