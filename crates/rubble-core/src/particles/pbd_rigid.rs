// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::ops::{Deref, DerefMut};

use rubble_geom::RigidTransform;
use rubble_math::{Quat, Vec3};

use super::RigidParticles;
use crate::array_collection::ArrayIndex;

/// Top layer used by the position-based solver: the predicted pose for the
/// current step and the velocities captured before constraints ran.
#[derive(Debug)]
pub struct PbdRigidParticles {
    base: RigidParticles,
    p: ArrayIndex<Vec3>,
    q: ArrayIndex<Quat>,
    pre_v: ArrayIndex<Vec3>,
    pre_w: ArrayIndex<Vec3>,
}

impl Default for PbdRigidParticles {
    fn default() -> Self {
        Self::new()
    }
}

impl PbdRigidParticles {
    /// Empty set with every layer's arrays registered.
    pub fn new() -> Self {
        let mut base = RigidParticles::new();
        let p = base.add_array::<Vec3>();
        let q = base.add_array::<Quat>();
        let pre_v = base.add_array::<Vec3>();
        let pre_w = base.add_array::<Vec3>();
        Self { base, p, q, pre_v, pre_w }
    }

    soa_accessors! {
        /// Predicted position for the step in progress.
        p, p_mut: Vec3;
        /// Predicted orientation for the step in progress.
        q, q_mut: Quat;
        /// Linear velocity before this step's constraints.
        pre_v, pre_v_mut: Vec3;
        /// Angular velocity before this step's constraints.
        pre_w, pre_w_mut: Vec3;
    }

    /// Predicted pose `(p, q)`.
    pub fn predicted_transform(&self, index: usize) -> RigidTransform {
        RigidTransform::new(*self.p(index), *self.q(index))
    }

    /// Sets `(p, q)` from a pose.
    pub fn set_predicted_transform(&mut self, index: usize, pose: &RigidTransform) {
        *self.p_mut(index) = pose.translation();
        *self.q_mut(index) = pose.rotation();
    }
}

impl Deref for PbdRigidParticles {
    type Target = RigidParticles;

    fn deref(&self) -> &RigidParticles {
        &self.base
    }
}

impl DerefMut for PbdRigidParticles {
    fn deref_mut(&mut self) -> &mut RigidParticles {
        &mut self.base
    }
}
