// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Position-based rigid evolution driving the clustering pass.
//!
//! One step: integrate predicted poses under gravity, let the collision rule
//! resolve contacts and clustering break what the impulses overwhelm, derive
//! velocities from the pose change, commit the predicted poses, carry
//! clustered children along, rebuild islands and queue events.

use std::collections::{BTreeMap, BTreeSet};

use rubble_geom::{Aabb, ImplicitShape, Sphere};
use rubble_math::{Mat3, Quat, Vec3, EPSILON};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace};

use crate::clustering::PbdRigidClustering;
use crate::collision::{CollisionConstraintRule, RigidBodyContactConstraint};
use crate::config::{EvolutionConfig, SolverConfig};
use crate::events::{vdata, CollisionData, PhysicsEvents, TrailingData};
use crate::particles::PbdRigidParticles;

/// Simulation-wide state shared by the evolution and the clustering pass.
#[derive(Debug, Default)]
pub struct EvolutionState {
    pub(crate) active_indices: BTreeSet<usize>,
    pub(crate) island_particles: Vec<BTreeSet<usize>>,
    pub(crate) events: PhysicsEvents,
    pub(crate) time: f32,
    pub(crate) gravity: Vec3,
}

impl EvolutionState {
    /// Empty state at time zero, without gravity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty state at time zero integrating under `gravity`.
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self { gravity, ..Self::default() }
    }

    /// Acceleration applied to dynamic particles when integrating.
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Particles simulated this step, ascending.
    pub fn active_indices(&self) -> &BTreeSet<usize> {
        &self.active_indices
    }

    /// Members of each island, indexed by island id.
    pub fn island_particles(&self) -> &[BTreeSet<usize>] {
        &self.island_particles
    }

    /// Pending events.
    pub fn events(&self) -> &PhysicsEvents {
        &self.events
    }

    /// Pending events, for draining.
    pub fn events_mut(&mut self) -> &mut PhysicsEvents {
        &mut self.events
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Adds `index` to the active set.
    pub fn activate(&mut self, index: usize) {
        self.active_indices.insert(index);
    }

    /// Removes `index` from the active set.
    pub fn deactivate(&mut self, index: usize) {
        self.active_indices.remove(&index);
    }

    /// Moves `index` to `island`, keeping the particle array and the island
    /// member sets in agreement.
    pub fn set_island(&mut self, particles: &mut PbdRigidParticles, index: usize, island: Option<usize>) {
        if let Some(old) = *particles.island(index) {
            if let Some(members) = self.island_particles.get_mut(old) {
                members.remove(&index);
            }
        }
        *particles.island_mut(index) = island;
        if let Some(new) = island {
            if self.island_particles.len() <= new {
                self.island_particles.resize_with(new + 1, BTreeSet::new);
            }
            self.island_particles[new].insert(index);
        }
    }
}

/// Initial state of a body added with [`PbdRigidsEvolution::add_rigid_body`].
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyDesc {
    /// Center of mass in world space.
    pub position: Vec3,
    /// World orientation.
    pub rotation: Quat,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Angular velocity.
    pub angular_velocity: Vec3,
    /// Mass.
    pub mass: f32,
    /// Diagonal of the body-frame inertia tensor.
    pub inertia: Vec3,
    /// Moves only as scripted; never accelerated by gravity or impulses.
    pub kinematic: bool,
    /// Collision geometry in the body frame.
    pub geometry: Option<ImplicitShape>,
    /// Strain threshold; the clustering default when `None`.
    pub strain: Option<f32>,
}

impl RigidBodyDesc {
    /// Unit-mass body with identity inertia and no geometry at `position`.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::identity(),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            inertia: Vec3::ONE,
            kinematic: false,
            geometry: None,
            strain: None,
        }
    }

    /// Solid box with the given half extents and mass.
    pub fn cuboid(position: Vec3, half_extents: Vec3, mass: f32) -> Self {
        let h = half_extents.mul_elem(&half_extents);
        let inertia = Vec3::new(h.y() + h.z(), h.x() + h.z(), h.x() + h.y()).scale(mass / 3.0);
        let geometry = Aabb::new(-half_extents, half_extents);
        Self { mass, inertia, geometry: Some(ImplicitShape::Box(geometry)), ..Self::new(position) }
    }

    /// Solid sphere with the given radius and mass.
    pub fn ball(position: Vec3, radius: f32, mass: f32) -> Self {
        let inertia = Vec3::splat(0.4 * mass * radius * radius);
        let geometry = Sphere::new(Vec3::ZERO, radius);
        Self { mass, inertia, geometry: Some(ImplicitShape::Sphere(geometry)), ..Self::new(position) }
    }

    /// Same body with `velocity`.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Same body with `angular_velocity`.
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Same body with `rotation`.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Same body with a strain threshold.
    pub fn with_strain(mut self, strain: f32) -> Self {
        self.strain = Some(strain);
        self
    }

    /// Same body, kinematic.
    pub fn kinematic(mut self) -> Self {
        self.kinematic = true;
        self
    }
}

/// Owns the particle set and drives it forward with clustering enabled.
#[derive(Debug)]
pub struct PbdRigidsEvolution {
    particles: PbdRigidParticles,
    state: EvolutionState,
    clustering: PbdRigidClustering,
    config: EvolutionConfig,
}

impl PbdRigidsEvolution {
    /// Empty evolution using `config`.
    pub fn new(config: &SolverConfig) -> Self {
        let mut particles = PbdRigidParticles::new();
        let clustering = PbdRigidClustering::new(&mut particles, config.clustering);
        let state = EvolutionState::with_gravity(Vec3::from(config.evolution.gravity));
        Self { particles, state, clustering, config: config.evolution }
    }

    /// Integration and event policy.
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// The particle set.
    pub fn particles(&self) -> &PbdRigidParticles {
        &self.particles
    }

    /// Mutable particle set, for hosts that script bodies between steps.
    pub fn particles_mut(&mut self) -> &mut PbdRigidParticles {
        &mut self.particles
    }

    /// Cluster bookkeeping.
    pub fn clustering(&self) -> &PbdRigidClustering {
        &self.clustering
    }

    /// Shared simulation state.
    pub fn state(&self) -> &EvolutionState {
        &self.state
    }

    /// Particles simulated this step.
    pub fn active_indices(&self) -> &BTreeSet<usize> {
        self.state.active_indices()
    }

    /// Island member sets.
    pub fn island_particles(&self) -> &[BTreeSet<usize>] {
        self.state.island_particles()
    }

    /// Pending events.
    pub fn events(&self) -> &PhysicsEvents {
        self.state.events()
    }

    /// Pending events, for draining.
    pub fn events_mut(&mut self) -> &mut PhysicsEvents {
        self.state.events_mut()
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f32 {
        self.state.time()
    }

    /// Appends an active body; returns its index.
    pub fn add_rigid_body(&mut self, desc: &RigidBodyDesc) -> usize {
        let index = self.particles.add_particles(1);
        let p = &mut self.particles;
        *p.x_mut(index) = desc.position;
        *p.r_mut(index) = desc.rotation.normalize();
        *p.p_mut(index) = desc.position;
        *p.q_mut(index) = desc.rotation.normalize();
        *p.v_mut(index) = desc.velocity;
        *p.w_mut(index) = desc.angular_velocity;
        *p.pre_v_mut(index) = desc.velocity;
        *p.pre_w_mut(index) = desc.angular_velocity;
        *p.m_mut(index) = desc.mass;
        *p.i_mut(index) = Mat3::from_diagonal(desc.inertia);
        if desc.kinematic || desc.mass <= EPSILON {
            *p.inv_m_mut(index) = 0.0;
            *p.inv_i_mut(index) = Mat3::ZERO;
        } else {
            *p.inv_m_mut(index) = 1.0 / desc.mass;
            *p.inv_i_mut(index) = Mat3::from_diagonal(Vec3::new(
                invert(desc.inertia.x()),
                invert(desc.inertia.y()),
                invert(desc.inertia.z()),
            ));
        }
        *p.geometry_mut(index) = desc.geometry.clone();
        if let Some(strain) = desc.strain {
            self.clustering.set_strain(&mut self.particles, index, strain);
        }
        self.state.activate(index);
        trace!(index, mass = desc.mass, "added rigid body");
        index
    }

    /// Strain threshold of `index`.
    pub fn strain(&self, index: usize) -> f32 {
        self.clustering.strain(&self.particles, index)
    }

    /// Sets the strain threshold of `index`.
    pub fn set_strain(&mut self, index: usize, strain: f32) {
        self.clustering.set_strain(&mut self.particles, index, strain);
    }

    /// Parent of `index`, if clustered.
    pub fn cluster_id(&self, index: usize) -> Option<usize> {
        self.clustering.cluster_id(&self.particles, index)
    }

    /// Children of `parent`, if it is a cluster parent.
    pub fn children(&self, parent: usize) -> Option<&[usize]> {
        self.clustering.children(parent)
    }

    /// See [`PbdRigidClustering::create_cluster_particle`].
    pub fn create_cluster_particle(&mut self, children: &[usize]) -> usize {
        self.clustering.create_cluster_particle(&mut self.particles, &mut self.state, children)
    }

    /// See [`PbdRigidClustering::create_cluster_particle_from_cluster_children`].
    pub fn create_cluster_particle_from_cluster_children(&mut self, parent: usize, children: &[usize]) -> usize {
        self.clustering.create_cluster_particle_from_cluster_children(
            &mut self.particles,
            &mut self.state,
            parent,
            children,
        )
    }

    /// See [`PbdRigidClustering::release_children`].
    pub fn release_children(&mut self, parent: usize, children: &[usize]) -> Vec<usize> {
        self.clustering.release_children(&mut self.particles, &mut self.state, parent, children)
    }

    /// See [`PbdRigidClustering::deactivate_cluster_particle`].
    pub fn deactivate_cluster_particle(&mut self, parent: usize) -> Vec<usize> {
        self.clustering.deactivate_cluster_particle(&mut self.particles, &mut self.state, parent)
    }

    /// Advances the simulation by `dt` seconds with `rule` resolving contacts.
    ///
    /// # Panics
    /// Panics if `dt` is not a positive finite number.
    #[instrument(level = "debug", skip_all, fields(dt = dt, time = self.state.time))]
    pub fn advance_one_time_step<R>(&mut self, dt: f32, rule: &mut R)
    where
        R: CollisionConstraintRule + ?Sized,
    {
        assert!(dt > 0.0 && dt.is_finite(), "time step must be positive and finite");
        self.integrate(dt);
        let activated = self.clustering.advance_clustering(&mut self.particles, &mut self.state, dt, rule);
        self.finalize(dt);
        self.clustering.update_all_positions(&mut self.particles);
        self.rebuild_islands(rule.constraints());
        self.record_events(rule.constraints());
        self.state.time += dt;
        debug!(
            active = self.state.active_indices.len(),
            islands = self.state.island_particles.len(),
            activated = activated.len(),
            "step complete"
        );
    }

    fn integrate(&mut self, dt: f32) {
        integrate(&mut self.particles, &self.state.active_indices, self.state.gravity, dt);
    }

    /// Derives velocities from the pose change and commits `(p, q)`.
    fn finalize(&mut self, dt: f32) {
        let p = &mut self.particles;
        for &index in &self.state.active_indices {
            if *p.disabled(index) || *p.sleeping(index) {
                continue;
            }
            let x = *p.x(index);
            let r = *p.r(index);
            let predicted = *p.p(index);
            let q = *p.q(index);
            *p.v_mut(index) = (predicted - x) / dt;
            *p.w_mut(index) = Quat::angular_velocity_between(&r, &q, dt);
            *p.x_mut(index) = predicted;
            *p.r_mut(index) = q;
        }
    }

    /// Groups active dynamic particles linked by particle-particle contacts.
    /// Island ids follow the smallest member index.
    fn rebuild_islands(&mut self, contacts: &[RigidBodyContactConstraint]) {
        let bodies: Vec<usize> = self
            .state
            .active_indices
            .iter()
            .copied()
            .filter(|&i| self.particles.is_dynamic(i) && !*self.particles.sleeping(i))
            .collect();
        let slots: FxHashMap<usize, usize> = bodies.iter().enumerate().map(|(slot, &i)| (i, slot)).collect();
        let mut sets = DisjointSets::new(bodies.len());
        for contact in contacts {
            let Some(other) = contact.levelset_index else {
                continue;
            };
            if let (Some(&a), Some(&b)) = (slots.get(&contact.particle_index), slots.get(&other)) {
                sets.union(a, b);
            }
        }

        let mut island_of_root: BTreeMap<usize, usize> = BTreeMap::new();
        let mut islands: Vec<BTreeSet<usize>> = Vec::new();
        for &index in &self.state.active_indices {
            *self.particles.island_mut(index) = None;
        }
        for (slot, &index) in bodies.iter().enumerate() {
            let root = sets.find(slot);
            let id = *island_of_root.entry(root).or_insert_with(|| {
                islands.push(BTreeSet::new());
                islands.len() - 1
            });
            islands[id].insert(index);
            *self.particles.island_mut(index) = Some(id);
        }
        trace!(islands = islands.len(), "rebuilt islands");
        self.state.island_particles = islands;
    }

    fn record_events(&mut self, contacts: &[RigidBodyContactConstraint]) {
        let time = self.state.time;
        if let Some(min_impulse) = self.config.collision_event_min_impulse {
            for contact in contacts {
                if contact.accumulated_impulse.length() < min_impulse {
                    continue;
                }
                let (velocity2, mass2) = contact
                    .levelset_index
                    .map_or((Vec3::ZERO, 0.0), |o| (*self.particles.v(o), *self.particles.m(o)));
                self.state.events.push_collision(CollisionData {
                    time,
                    location: vdata(contact.location),
                    accumulated_impulse: vdata(contact.accumulated_impulse),
                    normal: vdata(contact.normal),
                    velocity1: vdata(*self.particles.v(contact.particle_index)),
                    velocity2: vdata(velocity2),
                    mass1: *self.particles.m(contact.particle_index),
                    mass2,
                    particle_index: contact.particle_index,
                    levelset_index: contact.levelset_index,
                });
            }
        }

        if let Some(min_speed) = self.config.trailing_event_min_speed {
            for &index in &self.state.active_indices {
                let p = &self.particles;
                if !p.is_dynamic(index) || p.v(index).length() < min_speed {
                    continue;
                }
                let Some(bounds) = p.world_bounds(index) else {
                    continue;
                };
                self.state.events.push_trailing(TrailingData {
                    time,
                    location: vdata(*p.x(index)),
                    extent_min: vdata(bounds.min()),
                    extent_max: vdata(bounds.max()),
                    velocity: vdata(*p.v(index)),
                    angular_velocity: vdata(*p.w(index)),
                    mass: *p.m(index),
                    particle_index: index,
                });
            }
        }
    }
}

/// Predicts `(p, q)` for `indices` from their velocities after gravity and
/// records the velocities they started from. Disabled and sleeping particles
/// are left alone.
pub(crate) fn integrate(particles: &mut PbdRigidParticles, indices: &BTreeSet<usize>, gravity: Vec3, dt: f32) {
    let p = particles;
    for &index in indices {
        if *p.disabled(index) || *p.sleeping(index) {
            continue;
        }
        let v = *p.v(index);
        let w = *p.w(index);
        *p.pre_v_mut(index) = v;
        *p.pre_w_mut(index) = w;
        let v = if p.is_dynamic(index) { v + gravity.scale(dt) } else { v };
        *p.v_mut(index) = v;
        *p.p_mut(index) = *p.x(index) + v.scale(dt);
        *p.q_mut(index) = p.r(index).integrate(&w, dt);
    }
}

fn invert(value: f32) -> f32 {
    if value > EPSILON {
        1.0 / value
    } else {
        0.0
    }
}

/// Union-find with path halving and union by rank.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self { parent: (0..len).collect(), rank: vec![0; len] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            core::cmp::Ordering::Less => self.parent[ra] = rb,
            core::cmp::Ordering::Greater => self.parent[rb] = ra,
            core::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] = self.rank[ra].saturating_add(1);
            }
        }
    }
}
