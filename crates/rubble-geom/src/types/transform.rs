// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use rubble_math::{Quat, Vec3};

/// Rigid transform (rotation then translation) used for body poses and the
/// frame of a clustered child relative to its parent.
///
/// Conventions:
/// - `translation` in meters.
/// - `rotation` as a unit quaternion (normalized on construction).
/// - `a.multiply(&b)` applies `b` first; with `a` a parent's world pose and
///   `b` a child frame, the result is the child's world pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RigidTransform {
    translation: Vec3,
    rotation: Quat,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    /// Identity transform (no translation, no rotation).
    #[must_use]
    pub const fn identity() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::identity() }
    }

    /// Creates a transform from components.
    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation: rotation.normalize() }
    }

    /// Pure translation.
    #[must_use]
    pub const fn from_translation(translation: Vec3) -> Self {
        Self { translation, rotation: Quat::identity() }
    }

    /// Translation component.
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Rotation component.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Maps a point from local space into the parent/world frame.
    #[must_use]
    pub fn transform_position(&self, point: &Vec3) -> Vec3 {
        self.rotation.rotate_vector(point) + self.translation
    }

    /// Maps a direction from local space into the parent/world frame.
    #[must_use]
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation.rotate_vector(vector)
    }

    /// Maps a point from the parent/world frame into local space.
    #[must_use]
    pub fn inverse_transform_position(&self, point: &Vec3) -> Vec3 {
        self.rotation.unrotate_vector(&(*point - self.translation))
    }

    /// Maps a direction from the parent/world frame into local space.
    #[must_use]
    pub fn inverse_transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation.unrotate_vector(vector)
    }

    /// Inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.conjugate();
        Self { translation: -rotation.rotate_vector(&self.translation), rotation }
    }

    /// Composition `self ∘ rhs` (apply `rhs`, then `self`).
    #[must_use]
    pub fn multiply(&self, rhs: &Self) -> Self {
        Self {
            translation: self.transform_position(&rhs.translation),
            rotation: self.rotation.multiply(&rhs.rotation).normalize(),
        }
    }

    /// Expresses this pose in the frame of `parent`.
    ///
    /// `parent.multiply(&self.relative_to(parent))` reproduces `self`.
    #[must_use]
    pub fn relative_to(&self, parent: &Self) -> Self {
        parent.inverse().multiply(self)
    }
}
