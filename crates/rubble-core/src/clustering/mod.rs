// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rigid clustering with strain-based breaking.
//!
//! A cluster parent is an ordinary particle appended to the shared
//! [`PbdRigidParticles`] set. While clustered, children are disabled, leave
//! the active set, and ride on the parent through a fixed child-to-parent
//! frame. Each step the collision rule's impulses are mapped onto children as
//! strain; a child whose summed impulse exceeds its strain threshold is
//! released, and whatever stays behind is regrouped by connectivity.
//!
//! Clustering bookkeeping lives in extra arrays registered on the particle
//! collection, so it grows and shrinks with the particles. The clustering
//! object itself holds only the array handles and the parent → children map;
//! particles and evolution state are passed in on every call.

use std::collections::{BTreeMap, BTreeSet};

use rubble_geom::{ImplicitObjectUnion, ImplicitShape, RigidTransform, UnionMember};
use rubble_math::{Mat3, Vec3};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument, trace};

use crate::array_collection::ArrayIndex;
use crate::collision::CollisionConstraintRule;
use crate::config::ClusteringConfig;
use crate::events::{vdata, BreakingData};
use crate::evolution::{integrate, EvolutionState};
use crate::particles::PbdRigidParticles;

mod connectivity;
mod mass;
mod strain;

pub use connectivity::ConnectivityEdge;
use strain::StrainHit;

/// Cluster bookkeeping over a [`PbdRigidParticles`] set.
#[derive(Debug)]
pub struct PbdRigidClustering {
    config: ClusteringConfig,
    cluster_ids: ArrayIndex<Option<usize>>,
    internal_cluster: ArrayIndex<bool>,
    strains: ArrayIndex<f32>,
    connectivity_edges: ArrayIndex<Vec<ConnectivityEdge>>,
    child_to_parent: ArrayIndex<RigidTransform>,
    parent_to_children: BTreeMap<usize, Vec<usize>>,
}

impl PbdRigidClustering {
    /// Registers the clustering arrays on `particles`.
    ///
    /// Every existing and future particle starts unclustered with
    /// `config.default_strain`.
    pub fn new(particles: &mut PbdRigidParticles, config: ClusteringConfig) -> Self {
        let cluster_ids = particles.add_array::<Option<usize>>();
        let internal_cluster = particles.add_array::<bool>();
        let strains = particles.add_array_with(config.default_strain);
        let connectivity_edges = particles.add_array::<Vec<ConnectivityEdge>>();
        let child_to_parent = particles.add_array_with(RigidTransform::identity());
        Self {
            config,
            cluster_ids,
            internal_cluster,
            strains,
            connectivity_edges,
            child_to_parent,
            parent_to_children: BTreeMap::new(),
        }
    }

    /// Active policy.
    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Parent of `index`, if it is clustered.
    pub fn cluster_id(&self, particles: &PbdRigidParticles, index: usize) -> Option<usize> {
        particles.collection().array(self.cluster_ids)[index]
    }

    /// `true` for parents created by splitting another cluster.
    pub fn is_internal_cluster(&self, particles: &PbdRigidParticles, index: usize) -> bool {
        particles.collection().array(self.internal_cluster)[index]
    }

    /// Impulse `index` withstands before leaving its parent.
    pub fn strain(&self, particles: &PbdRigidParticles, index: usize) -> f32 {
        particles.collection().array(self.strains)[index]
    }

    /// Sets the strain threshold of `index`.
    pub fn set_strain(&self, particles: &mut PbdRigidParticles, index: usize, strain: f32) {
        particles.collection_mut().array_mut(self.strains)[index] = strain;
    }

    /// Fixed placement of `index` in its parent's frame (identity when
    /// unclustered).
    pub fn child_to_parent(&self, particles: &PbdRigidParticles, index: usize) -> RigidTransform {
        particles.collection().array(self.child_to_parent)[index]
    }

    /// Siblings linked to `index`.
    pub fn connectivity_edges<'a>(&self, particles: &'a PbdRigidParticles, index: usize) -> &'a [ConnectivityEdge] {
        &particles.collection().array(self.connectivity_edges)[index]
    }

    /// Children of `parent`, or `None` if it is not a cluster parent.
    pub fn children(&self, parent: usize) -> Option<&[usize]> {
        self.parent_to_children.get(&parent).map(Vec::as_slice)
    }

    /// `true` if `index` currently owns children.
    pub fn is_cluster_parent(&self, index: usize) -> bool {
        self.parent_to_children.contains_key(&index)
    }

    /// Every cluster parent, ascending. Nested parents are included.
    pub fn parents(&self) -> impl Iterator<Item = usize> + '_ {
        self.parent_to_children.keys().copied()
    }

    /// Number of cluster parents.
    pub fn num_clusters(&self) -> usize {
        self.parent_to_children.len()
    }

    /// Appends a parent particle that owns `children`; returns its index.
    ///
    /// The parent takes the children's combined mass properties and
    /// momentum, a union of their geometry, and the first child island found.
    /// Children are disabled and removed from the active set.
    ///
    /// # Panics
    /// Panics if `children` is empty, repeats an index, holds an index out of
    /// range, or names a particle that is already clustered.
    #[instrument(level = "debug", skip_all, fields(children = children.len()))]
    pub fn create_cluster_particle(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        children: &[usize],
    ) -> usize {
        assert!(!children.is_empty(), "a cluster needs at least one child");
        let mut seen = BTreeSet::new();
        for &child in children {
            assert!(child < particles.size(), "particle {child} is out of range");
            assert!(seen.insert(child), "particle {child} is listed twice");
            assert!(self.cluster_id(particles, child).is_none(), "particle {child} already belongs to a cluster");
        }
        let parent = particles.add_particles(1);
        self.assemble(particles, state, parent, children.to_vec(), false);
        debug!(parent, mass = *particles.m(parent), "created cluster");
        #[cfg(debug_assertions)]
        self.debug_check(particles);
        parent
    }

    /// Moves `children` out of `parent` into a new internal cluster and
    /// returns it. `parent` is rebuilt around what remains, or retired if
    /// nothing does.
    ///
    /// # Panics
    /// Panics if `children` is empty, if `parent` is nested inside another
    /// cluster, or if any entry is not a child of `parent`.
    pub fn create_cluster_particle_from_cluster_children(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        parent: usize,
        children: &[usize],
    ) -> usize {
        assert!(!children.is_empty(), "a cluster needs at least one child");
        assert!(self.cluster_id(particles, parent).is_none(), "cluster {parent} is nested inside another cluster");
        let current = self.parent_to_children.get(&parent).cloned().unwrap_or_default();
        for child in children {
            assert!(current.contains(child), "particle {child} is not a child of {parent}");
        }

        self.update_position_recursive(particles, [parent]);
        let moving: BTreeSet<usize> = children.iter().copied().collect();
        let remaining: Vec<usize> = current.into_iter().filter(|c| !moving.contains(c)).collect();
        let cluster = self.spawn_internal_cluster(particles, state, parent, moving.into_iter().collect());
        if remaining.is_empty() {
            self.retire(particles, state, parent);
        } else {
            self.parent_to_children.insert(parent, remaining);
            self.rebuild(particles, parent);
        }
        cluster
    }

    /// Runs `rule`, turns its impulses into strain, and breaks every child
    /// whose summed impulse this step is strictly greater than its strain.
    ///
    /// Sleeping, disabled and kinematic parents do not break. With
    /// `rewind_on_decluster`, every island touched by a break is rewound to
    /// the start of the step, integrated again under the state's gravity and
    /// handed back to `rule`, so released pieces get their own contacts this
    /// step. Returns the particles made active by breaking, in the order
    /// they were released.
    #[instrument(level = "debug", skip_all, fields(dt = dt))]
    pub fn advance_clustering<R>(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        dt: f32,
        rule: &mut R,
    ) -> Vec<usize>
    where
        R: CollisionConstraintRule + ?Sized,
    {
        rule.apply(particles, &state.active_indices, dt);
        let hits = self.compute_strain_from_collision(particles, rule.constraints());

        let mut struck: Vec<usize> = hits.keys().copied().collect();
        struck.sort_unstable();
        let mut breaking: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for child in struck {
            let Some(parent) = self.cluster_id(particles, child) else {
                continue;
            };
            if !Self::can_break(particles, parent) {
                continue;
            }
            let impulse = hits[&child].impulse;
            let strain = self.strain(particles, child);
            trace!(child, parent, impulse, strain, "strain check");
            if impulse > strain {
                breaking.entry(parent).or_default().push(child);
            }
        }

        let mut activated = Vec::new();
        let mut modified = BTreeSet::new();
        let mut retired = BTreeSet::new();
        for (parent, children) in breaking {
            activated.extend(self.break_cluster(particles, state, parent, &children, &hits));
            if self.parent_to_children.contains_key(&parent) {
                modified.insert(parent);
            } else {
                retired.insert(parent);
            }
        }
        if !retired.is_empty() {
            rule.remove_constraints(&retired);
        }
        if self.config.rewind_on_decluster && !activated.is_empty() {
            modified.extend(activated.iter().copied());
            Self::rewind_and_resolve(particles, state, modified, dt, rule);
        }
        #[cfg(debug_assertions)]
        self.debug_check(particles);
        activated
    }

    /// Releases `children` from `parent` as if they had broken, then
    /// regroups the rest. Returns the particles made active; an empty
    /// `children` leaves the cluster untouched.
    ///
    /// # Panics
    /// Panics if `parent` is nested inside another cluster or if any entry
    /// is not a child of `parent`.
    pub fn release_children(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        parent: usize,
        children: &[usize],
    ) -> Vec<usize> {
        if children.is_empty() {
            return Vec::new();
        }
        self.break_cluster(particles, state, parent, children, &FxHashMap::default())
    }

    /// Dissolves `parent` entirely: every child is released with the
    /// parent's motion and the parent is disabled. Returns the children.
    ///
    /// # Panics
    /// Panics if `parent` is nested inside another cluster.
    pub fn deactivate_cluster_particle(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        parent: usize,
    ) -> Vec<usize> {
        let Some(children) = self.parent_to_children.get(&parent).cloned() else {
            return Vec::new();
        };
        assert!(self.cluster_id(particles, parent).is_none(), "cluster {parent} is nested inside another cluster");
        self.update_position_recursive(particles, [parent]);
        for &child in &children {
            self.detach(particles, state, parent, child);
        }
        self.retire(particles, state, parent);
        debug!(parent, children = children.len(), "deactivated cluster");
        children
    }

    /// Recomputes mass, inertia, momentum, pose and child frames of
    /// `parent` from its children's current state.
    ///
    /// The predicted pose keeps the rigid offset the first child has between
    /// its current and predicted poses.
    pub fn update_mass_properties(&self, particles: &mut PbdRigidParticles, parent: usize) {
        let Some(children) = self.parent_to_children.get(&parent) else {
            return;
        };
        let props = mass::aggregate(particles, children);
        let anchor = children[0];
        let pose = RigidTransform::new(props.center, props.rotation);
        let predicted = particles.predicted_transform(anchor).multiply(&pose.relative_to(&particles.transform(anchor)));

        particles.set_transform(parent, &pose);
        particles.set_predicted_transform(parent, &predicted);
        *particles.v_mut(parent) = props.v;
        *particles.w_mut(parent) = props.w;
        *particles.pre_v_mut(parent) = props.pre_v;
        *particles.pre_w_mut(parent) = props.pre_w;
        *particles.m_mut(parent) = props.mass;
        *particles.inv_m_mut(parent) = props.inv_mass;
        *particles.i_mut(parent) = Mat3::from_diagonal(props.inertia);
        *particles.inv_i_mut(parent) = Mat3::from_diagonal(props.inv_inertia);

        for &child in children {
            let frame = particles.transform(child).relative_to(&pose);
            particles.collection_mut().array_mut(self.child_to_parent)[child] = frame;
        }
    }

    /// Rebuilds the parent geometry as a union of the children's geometry at
    /// their frames. Children without geometry are skipped.
    pub fn update_geometry(&self, particles: &mut PbdRigidParticles, parent: usize) {
        let Some(children) = self.parent_to_children.get(&parent) else {
            return;
        };
        let members: Vec<UnionMember> = children
            .iter()
            .filter_map(|&c| {
                particles
                    .geometry(c)
                    .clone()
                    .map(|shape| UnionMember { transform: self.child_to_parent(particles, c), shape })
            })
            .collect();
        *particles.geometry_mut(parent) =
            if members.is_empty() { None } else { Some(ImplicitShape::Union(ImplicitObjectUnion::new(members))) };
    }

    /// Moves island membership from the children to `parent`.
    ///
    /// The parent keeps its own island if it has one, otherwise it takes the
    /// first island found among its children.
    pub fn update_island_particles(&self, particles: &mut PbdRigidParticles, state: &mut EvolutionState, parent: usize) {
        let Some(children) = self.parent_to_children.get(&parent) else {
            return;
        };
        let island = (*particles.island(parent)).or_else(|| children.iter().find_map(|&c| *particles.island(c)));
        for &child in children {
            state.set_island(particles, child, None);
        }
        state.set_island(particles, parent, island);
    }

    /// Places the children of each parent in `parents` (and, recursively,
    /// their own children) from the parent's current and predicted poses.
    /// Children also take the parent's velocity, and the velocity it started
    /// the step with, at their position.
    pub fn update_position_recursive<I>(&self, particles: &mut PbdRigidParticles, parents: I)
    where
        I: IntoIterator<Item = usize>,
    {
        let mut stack: Vec<usize> = parents.into_iter().collect();
        while let Some(parent) = stack.pop() {
            let Some(children) = self.parent_to_children.get(&parent) else {
                continue;
            };
            let pose = particles.transform(parent);
            let predicted = particles.predicted_transform(parent);
            let v = *particles.v(parent);
            let w = *particles.w(parent);
            let pre_v = *particles.pre_v(parent);
            let pre_w = *particles.pre_w(parent);
            for &child in children {
                let frame = self.child_to_parent(particles, child);
                let world = pose.multiply(&frame);
                let arm = world.translation() - pose.translation();
                particles.set_transform(child, &world);
                particles.set_predicted_transform(child, &predicted.multiply(&frame));
                *particles.v_mut(child) = v + w.cross(&arm);
                *particles.w_mut(child) = w;
                *particles.pre_v_mut(child) = pre_v + pre_w.cross(&arm);
                *particles.pre_w_mut(child) = pre_w;
                if self.parent_to_children.contains_key(&child) {
                    stack.push(child);
                }
            }
        }
    }

    /// [`Self::update_position_recursive`] from every enabled top-level parent.
    pub fn update_all_positions(&self, particles: &mut PbdRigidParticles) {
        let roots: Vec<usize> = self
            .parent_to_children
            .keys()
            .copied()
            .filter(|&p| self.cluster_id(particles, p).is_none() && !*particles.disabled(p))
            .collect();
        self.update_position_recursive(particles, roots);
    }

    fn can_break(particles: &PbdRigidParticles, parent: usize) -> bool {
        !*particles.disabled(parent) && !*particles.sleeping(parent) && particles.is_dynamic(parent)
    }

    /// Clusters `children` under the fresh particle `parent`, which sleeps
    /// only if every child does.
    fn assemble(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        parent: usize,
        children: Vec<usize>,
        internal: bool,
    ) {
        let asleep = children.iter().all(|&c| *particles.sleeping(c));
        for &child in &children {
            particles.collection_mut().array_mut(self.cluster_ids)[child] = Some(parent);
            *particles.disabled_mut(child) = true;
            state.active_indices.remove(&child);
        }
        particles.collection_mut().array_mut(self.internal_cluster)[parent] = internal;
        *particles.disabled_mut(parent) = false;
        *particles.sleeping_mut(parent) = asleep;
        self.parent_to_children.insert(parent, children);
        self.rebuild(particles, parent);
        self.update_island_particles(particles, state, parent);
        state.active_indices.insert(parent);
    }

    fn rebuild(&self, particles: &mut PbdRigidParticles, parent: usize) {
        self.update_mass_properties(particles, parent);
        self.update_geometry(particles, parent);
        if self.config.use_connectivity {
            self.update_connectivity_graph(particles, parent);
        }
    }

    /// Wraps `children`, already taken out of `source`'s list, in a new
    /// internal cluster that inherits `source`'s island, strain and sleep
    /// state.
    fn spawn_internal_cluster(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        source: usize,
        children: Vec<usize>,
    ) -> usize {
        for &child in &children {
            particles.collection_mut().array_mut(self.cluster_ids)[child] = None;
            self.remove_connectivity_edges(particles, child);
        }
        let island = *particles.island(source);
        let asleep = *particles.sleeping(source);
        let strain = self.strain(particles, source);
        let cluster = particles.add_particles(1);
        state.set_island(particles, cluster, island);
        self.assemble(particles, state, cluster, children, true);
        self.set_strain(particles, cluster, strain);
        *particles.sleeping_mut(cluster) = asleep;
        cluster
    }

    fn break_cluster(
        &mut self,
        particles: &mut PbdRigidParticles,
        state: &mut EvolutionState,
        parent: usize,
        releasing: &[usize],
        hits: &FxHashMap<usize, StrainHit>,
    ) -> Vec<usize> {
        let Some(current) = self.parent_to_children.get(&parent).cloned() else {
            return Vec::new();
        };
        assert!(self.cluster_id(particles, parent).is_none(), "cluster {parent} is nested inside another cluster");
        for child in releasing {
            assert!(current.contains(child), "particle {child} is not a child of {parent}");
        }

        self.update_position_recursive(particles, [parent]);
        let releasing: BTreeSet<usize> = releasing.iter().copied().collect();
        let mut activated = Vec::new();
        for &child in &releasing {
            self.detach(particles, state, parent, child);
            self.emit_breaking(particles, state, child, hits.get(&child));
            activated.push(child);
        }

        let remaining: Vec<usize> = current.into_iter().filter(|c| !releasing.contains(c)).collect();
        let mut pieces = if self.config.use_connectivity {
            self.connected_components(particles, &remaining)
        } else if remaining.is_empty() {
            Vec::new()
        } else {
            vec![remaining]
        };
        pieces.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));
        let kept = if pieces.is_empty() { Vec::new() } else { pieces.remove(0) };

        for piece in pieces {
            if piece.len() == 1 {
                let single = piece[0];
                self.detach(particles, state, parent, single);
                self.emit_breaking(particles, state, single, None);
                activated.push(single);
            } else {
                let cluster = self.spawn_internal_cluster(particles, state, parent, piece);
                self.emit_breaking(particles, state, cluster, None);
                activated.push(cluster);
            }
        }

        if kept.is_empty() {
            self.retire(particles, state, parent);
        } else if kept.len() == 1 && self.config.dissolve_single_child_clusters {
            let last = kept[0];
            self.detach(particles, state, parent, last);
            self.emit_breaking(particles, state, last, None);
            activated.push(last);
            self.retire(particles, state, parent);
        } else {
            self.parent_to_children.insert(parent, kept);
            self.rebuild(particles, parent);
        }
        debug!(parent, activated = activated.len(), "cluster broke");
        activated
    }

    /// Makes `child` a free, active particle on its old parent's island,
    /// asleep if the parent is.
    fn detach(&self, particles: &mut PbdRigidParticles, state: &mut EvolutionState, parent: usize, child: usize) {
        particles.collection_mut().array_mut(self.cluster_ids)[child] = None;
        particles.collection_mut().array_mut(self.child_to_parent)[child] = RigidTransform::identity();
        self.remove_connectivity_edges(particles, child);
        *particles.disabled_mut(child) = false;
        let asleep = *particles.sleeping(parent);
        *particles.sleeping_mut(child) = asleep;
        state.active_indices.insert(child);
        let island = *particles.island(parent);
        state.set_island(particles, child, island);

        if !self.config.children_inherit_velocity {
            *particles.v_mut(child) = Vec3::ZERO;
            *particles.w_mut(child) = Vec3::ZERO;
            *particles.pre_v_mut(child) = Vec3::ZERO;
            *particles.pre_w_mut(child) = Vec3::ZERO;
            let pose = particles.transform(child);
            particles.set_predicted_transform(child, &pose);
        }
    }

    /// Resets `touched` and every particle sharing an island with it to its
    /// start-of-step pose and velocity, integrates them again and lets `rule`
    /// resolve their contacts once more. Disabled and sleeping particles are
    /// skipped.
    fn rewind_and_resolve<R>(
        particles: &mut PbdRigidParticles,
        state: &EvolutionState,
        mut touched: BTreeSet<usize>,
        dt: f32,
        rule: &mut R,
    ) where
        R: CollisionConstraintRule + ?Sized,
    {
        let islands: BTreeSet<usize> = touched.iter().filter_map(|&i| *particles.island(i)).collect();
        for island in islands {
            if let Some(members) = state.island_particles.get(island) {
                touched.extend(members.iter().copied());
            }
        }
        touched.retain(|&i| !*particles.disabled(i) && !*particles.sleeping(i));

        // Integration predicts the pose from (x, r) again.
        for &index in &touched {
            let pre_v = *particles.pre_v(index);
            let pre_w = *particles.pre_w(index);
            *particles.v_mut(index) = pre_v;
            *particles.w_mut(index) = pre_w;
        }
        integrate(particles, &touched, state.gravity, dt);
        rule.update_constraints(particles, &touched, dt);
        debug!(rewound = touched.len(), "rewound declustered islands");
    }

    /// Disables a parent with no children left.
    fn retire(&mut self, particles: &mut PbdRigidParticles, state: &mut EvolutionState, parent: usize) {
        self.parent_to_children.remove(&parent);
        self.remove_connectivity_edges(particles, parent);
        particles.collection_mut().array_mut(self.internal_cluster)[parent] = false;
        *particles.disabled_mut(parent) = true;
        *particles.geometry_mut(parent) = None;
        state.active_indices.remove(&parent);
        state.set_island(particles, parent, None);
        trace!(parent, "retired cluster");
    }

    fn emit_breaking(
        &self,
        particles: &PbdRigidParticles,
        state: &mut EvolutionState,
        index: usize,
        hit: Option<&StrainHit>,
    ) {
        if !self.config.emit_breaking_events {
            return;
        }
        let radius = particles.local_bounds(index).map_or(0.0, |b| 0.5 * b.extents().length());
        let normal = hit.map_or(Vec3::ZERO, |h| h.direction.normalize());
        state.events.push_breaking(BreakingData {
            time: state.time,
            breaking_region_centroid: vdata(*particles.x(index)),
            breaking_region_normal: vdata(normal),
            breaking_region_radius: radius,
            velocity: vdata(*particles.v(index)),
            mass: *particles.m(index),
            particle_index: index,
        });
    }

    #[cfg(debug_assertions)]
    fn debug_check(&self, particles: &PbdRigidParticles) {
        for (&parent, children) in &self.parent_to_children {
            debug_assert!(!children.is_empty(), "cluster {parent} has no children");
            for &child in children {
                debug_assert_eq!(self.cluster_id(particles, child), Some(parent), "child {child} lost its parent");
            }
        }
    }
}
