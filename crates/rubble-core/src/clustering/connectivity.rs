// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use std::collections::{BTreeSet, VecDeque};

use rubble_geom::Aabb;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::PbdRigidClustering;
use crate::particles::PbdRigidParticles;

/// Link between two children of the same cluster whose bounds touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityEdge {
    /// The other child.
    pub sibling: usize,
    /// Mean strain of the two endpoints when the edge was built.
    pub strain: f32,
}

impl PbdRigidClustering {
    /// Rebuilds the edges between the children of `parent`.
    ///
    /// Two children are linked when their bounds, placed in the parent frame
    /// and thickened by the connectivity margin, overlap. Children without
    /// geometry are treated as points at their frame origin.
    pub fn update_connectivity_graph(&self, particles: &mut PbdRigidParticles, parent: usize) {
        let Some(children) = self.parent_to_children.get(&parent) else {
            return;
        };
        let thickness = self.config.connectivity_thickness;
        let bounds: Vec<(usize, Aabb)> = children
            .iter()
            .map(|&c| (c, self.child_bounds_in_parent(particles, c).thicken(thickness)))
            .collect();
        for &(child, _) in &bounds {
            self.edges_mut(particles, child).clear();
        }

        let mut links = 0_usize;
        for (i, &(a, box_a)) in bounds.iter().enumerate() {
            for &(b, box_b) in &bounds[i + 1..] {
                if !box_a.intersects(&box_b) {
                    continue;
                }
                let strain = 0.5 * self.strain(particles, a) + 0.5 * self.strain(particles, b);
                self.edges_mut(particles, a).push(ConnectivityEdge { sibling: b, strain });
                self.edges_mut(particles, b).push(ConnectivityEdge { sibling: a, strain });
                links += 1;
            }
        }
        trace!(parent, children = bounds.len(), links, "rebuilt connectivity");
    }

    /// Bound of `child` expressed in its parent's frame.
    pub(crate) fn child_bounds_in_parent(&self, particles: &PbdRigidParticles, child: usize) -> Aabb {
        let frame = self.child_to_parent(particles, child);
        particles
            .local_bounds(child)
            .map_or_else(|| Aabb::from_points(&[frame.translation()]), |b| b.transformed(&frame))
    }

    /// Drops every edge touching `index`, on both ends.
    pub(crate) fn remove_connectivity_edges(&self, particles: &mut PbdRigidParticles, index: usize) {
        let edges = core::mem::take(self.edges_mut(particles, index));
        for edge in edges {
            self.edges_mut(particles, edge.sibling).retain(|e| e.sibling != index);
        }
    }

    /// Splits `members` into groups connected through edges that stay inside
    /// `members`. Groups are sorted ascending and ordered by smallest member.
    pub(crate) fn connected_components(&self, particles: &PbdRigidParticles, members: &[usize]) -> Vec<Vec<usize>> {
        let members: BTreeSet<usize> = members.iter().copied().collect();
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for &start in &members {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for edge in self.connectivity_edges(particles, node) {
                    if members.contains(&edge.sibling) && seen.insert(edge.sibling) {
                        component.push(edge.sibling);
                        queue.push_back(edge.sibling);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    fn edges_mut<'a>(&self, particles: &'a mut PbdRigidParticles, index: usize) -> &'a mut Vec<ConnectivityEdge> {
        &mut particles.collection_mut().array_mut(self.connectivity_edges)[index]
    }
}
