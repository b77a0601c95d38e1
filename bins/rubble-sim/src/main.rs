// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! rubble-sim
//!
//! Builds a wall of unit bricks, glues it into one cluster, drops it on a
//! ground plane and steps the evolution. Breaking events are logged as they
//! happen; every event can also be written to a JSON file.
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rubble_config_fs::FsConfigStore;
use rubble_core::{
    BreakingData, CollisionData, PbdRigidsEvolution, PlaneCollisionRule,
    RigidBodyDesc, SolverConfig, TrailingData,
};
use rubble_math::Vec3;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of steps to simulate
    #[clap(short, long, default_value_t = 240)]
    steps: u32,

    /// Step length in seconds
    #[clap(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Bricks per wall edge
    #[clap(long, default_value_t = 4)]
    side: usize,

    /// Height of the wall's lowest bricks above the ground
    #[clap(long, default_value_t = 3.0)]
    drop_height: f32,

    /// Strain given to every brick
    #[clap(long, default_value_t = 8.0)]
    strain: f32,

    /// Directory holding `<key>.json` configs (platform config dir when omitted)
    #[clap(long)]
    config_dir: Option<PathBuf>,

    /// Config key to load
    #[clap(long, default_value = "solver")]
    config_key: String,

    /// Write every event to this JSON file
    #[clap(long)]
    events_out: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize)]
struct EventLog {
    collisions: Vec<CollisionData>,
    breakings: Vec<BreakingData>,
    trailings: Vec<TrailingData>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config(&args)?;
    info!(steps = args.steps, dt = args.dt, side = args.side, "starting rubble-sim");

    let mut evolution = PbdRigidsEvolution::new(&config);
    let mut bricks = Vec::with_capacity(args.side * args.side);
    for row in 0..args.side {
        for col in 0..args.side {
            let center = Vec3::new(col as f32, 0.0, args.drop_height + row as f32 + 0.5);
            let brick = RigidBodyDesc::cuboid(center, Vec3::splat(0.5), 1.0).with_strain(args.strain);
            bricks.push(evolution.add_rigid_body(&brick));
        }
    }
    let wall = evolution.create_cluster_particle(&bricks);
    info!(wall, mass = *evolution.particles().m(wall), "wall clustered");

    let mut rule = PlaneCollisionRule::ground(config.collision.ground_height, config.collision.restitution);
    let mut log = EventLog::default();
    for step in 0..args.steps {
        evolution.advance_one_time_step(args.dt, &mut rule);
        let events = evolution.events_mut();
        for breaking in events.breakings() {
            info!(
                step,
                particle = breaking.particle_index,
                mass = breaking.mass,
                centroid = ?breaking.breaking_region_centroid,
                "piece broke free"
            );
        }
        log.collisions.extend(events.drain_collisions());
        log.breakings.extend(events.drain_breakings());
        log.trailings.extend(events.drain_trailings());
    }

    let remaining = evolution.children(wall).map_or(0, <[usize]>::len);
    info!(
        time = evolution.time(),
        active = evolution.active_indices().len(),
        remaining,
        broken = log.breakings.len(),
        "simulation finished"
    );

    if let Some(path) = &args.events_out {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &log)
            .with_context(|| format!("writing events to {}", path.display()))?;
        info!(path = %path.display(), "events written");
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<SolverConfig> {
    let store = match &args.config_dir {
        Some(dir) => FsConfigStore::with_base(dir).with_context(|| format!("opening {}", dir.display()))?,
        None => match FsConfigStore::new() {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "no config directory; using defaults");
                return Ok(SolverConfig::default());
            }
        },
    };
    SolverConfig::load(&store, &args.config_key)
        .with_context(|| format!("loading {} from {}", args.config_key, store.base().display()))
}
