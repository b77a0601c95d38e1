// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use crate::{clamp, Mat3, Vec3, EPSILON};

/// Quaternion stored as `(x, y, z, w)`; rotations are unit quaternions.
///
/// * All angles are expressed in radians.
/// * `a.multiply(&b)` rotates by `b` first, then by `a`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quat {
    data: [f32; 4],
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quat {
    /// Creates a quaternion from components.
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { data: [x, y, z, w] }
    }

    /// Returns the identity quaternion.
    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Returns the quaternion as an array.
    pub fn to_array(self) -> [f32; 4] {
        self.data
    }

    /// Vector part `(x, y, z)`.
    pub fn xyz(&self) -> Vec3 {
        Vec3::new(self.data[0], self.data[1], self.data[2])
    }

    /// Scalar part.
    pub fn w(&self) -> f32 {
        self.data[3]
    }

    /// Constructs a quaternion from a rotation axis and angle in radians.
    ///
    /// Returns the identity quaternion when the axis length is ≤ `EPSILON`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let len_sq = axis.length_squared();
        if len_sq <= EPSILON * EPSILON {
            return Self::identity();
        }
        let norm_axis = axis.scale(1.0 / len_sq.sqrt());
        let (sin_half, cos_half) = (angle * 0.5).sin_cos();
        let [x, y, z] = norm_axis.scale(sin_half).to_array();
        Self::new(x, y, z, cos_half)
    }

    /// Hamilton product `self * other`.
    ///
    /// Applied to a vector the result rotates by `other` first and then by
    /// `self`. Quaternion multiplication is non-commutative.
    ///
    /// # Examples
    /// ```
    /// use core::f32::consts::FRAC_PI_2;
    /// use rubble_math::{Quat, Vec3};
    /// let yaw = Quat::from_axis_angle(Vec3::UNIT_Y, FRAC_PI_2);
    /// let pitch = Quat::from_axis_angle(Vec3::UNIT_X, FRAC_PI_2);
    /// assert_ne!(yaw.multiply(&pitch).to_array(), pitch.multiply(&yaw).to_array());
    /// ```
    pub fn multiply(&self, other: &Self) -> Self {
        let [ax, ay, az, aw] = self.data;
        let [bx, by, bz, bw] = other.data;
        Self::new(
            aw * bx + ax * bw + ay * bz - az * by,
            aw * by - ax * bz + ay * bw + az * bx,
            aw * bz + ax * by - ay * bx + az * bw,
            aw * bw - ax * bx - ay * by - az * bz,
        )
    }

    /// 4D dot product.
    pub fn dot(&self, other: &Self) -> f32 {
        self.data.iter().zip(other.data).map(|(a, b)| a * b).sum()
    }

    /// Quaternion norm.
    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Normalises the quaternion; returns identity when norm is ~0.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len <= EPSILON {
            return Self::identity();
        }
        let inv = 1.0 / len;
        let [x, y, z, w] = self.data;
        Self::new(x * inv, y * inv, z * inv, w * inv)
    }

    /// Conjugate `(-x, -y, -z, w)`; the inverse of a unit quaternion.
    pub fn conjugate(&self) -> Self {
        let [x, y, z, w] = self.data;
        Self::new(-x, -y, -z, w)
    }

    /// Multiplicative inverse; identity for a degenerate quaternion.
    pub fn inverse(&self) -> Self {
        let len_sq = self.dot(self);
        if len_sq <= EPSILON * EPSILON {
            return Self::identity();
        }
        let [x, y, z, w] = self.conjugate().data;
        let inv = 1.0 / len_sq;
        Self::new(x * inv, y * inv, z * inv, w * inv)
    }

    /// Rotates `v` by this (unit) quaternion.
    pub fn rotate_vector(&self, v: &Vec3) -> Vec3 {
        let u = self.xyz();
        let t = u.cross(v).scale(2.0);
        *v + t.scale(self.w()) + u.cross(&t)
    }

    /// Rotates `v` by the inverse of this (unit) quaternion.
    pub fn unrotate_vector(&self, v: &Vec3) -> Vec3 {
        self.conjugate().rotate_vector(v)
    }

    /// Converts the quaternion to a column-major rotation matrix.
    pub fn to_mat3(&self) -> Mat3 {
        let q = self.normalize();
        let [x, y, z, w] = q.data;
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);
        Mat3::new([
            1.0 - 2.0 * (yy + zz),
            2.0 * (xy + wz),
            2.0 * (xz - wy),
            2.0 * (xy - wz),
            1.0 - 2.0 * (xx + zz),
            2.0 * (yz + wx),
            2.0 * (xz + wy),
            2.0 * (yz - wx),
            1.0 - 2.0 * (xx + yy),
        ])
    }

    /// Builds a unit quaternion from a proper rotation matrix.
    ///
    /// Branches on the largest diagonal term to keep the square root well
    /// conditioned.
    pub fn from_mat3(m: &Mat3) -> Self {
        let (m00, m11, m22) = (m.at(0, 0), m.at(1, 1), m.at(2, 2));
        let trace = m00 + m11 + m22;
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(
                (m.at(2, 1) - m.at(1, 2)) / s,
                (m.at(0, 2) - m.at(2, 0)) / s,
                (m.at(1, 0) - m.at(0, 1)) / s,
                0.25 * s,
            )
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m.at(0, 1) + m.at(1, 0)) / s,
                (m.at(0, 2) + m.at(2, 0)) / s,
                (m.at(2, 1) - m.at(1, 2)) / s,
            )
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Self::new(
                (m.at(0, 1) + m.at(1, 0)) / s,
                0.25 * s,
                (m.at(1, 2) + m.at(2, 1)) / s,
                (m.at(0, 2) - m.at(2, 0)) / s,
            )
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Self::new(
                (m.at(0, 2) + m.at(2, 0)) / s,
                (m.at(1, 2) + m.at(2, 1)) / s,
                0.25 * s,
                (m.at(1, 0) - m.at(0, 1)) / s,
            )
        };
        q.normalize()
    }

    /// Axis and angle of the shortest rotation this quaternion represents.
    ///
    /// The angle lies in `[0, π]`; near-identity rotations report `UNIT_X`.
    pub fn to_axis_angle(&self) -> (Vec3, f32) {
        let mut q = self.normalize();
        if q.w() < 0.0 {
            q = Self::new(-q.data[0], -q.data[1], -q.data[2], -q.data[3]);
        }
        let w = clamp(q.w(), -1.0, 1.0);
        let angle = 2.0 * w.acos();
        let s = (1.0 - w * w).sqrt();
        if s <= EPSILON {
            return (Vec3::UNIT_X, 0.0);
        }
        (q.xyz().scale(1.0 / s), angle)
    }

    /// Advances this orientation by angular velocity `w` over `dt` seconds.
    ///
    /// First-order update `q + ½·dt·(ω ⊗ q)` followed by normalisation.
    pub fn integrate(&self, w: &Vec3, dt: f32) -> Self {
        let omega = Self::new(w.x(), w.y(), w.z(), 0.0);
        let dq = omega.multiply(self);
        let h = 0.5 * dt;
        let [x, y, z, qw] = self.data;
        let [dx, dy, dz, dw] = dq.data;
        Self::new(x + h * dx, y + h * dy, z + h * dz, qw + h * dw).normalize()
    }

    /// Angular velocity that carries `from` to `to` in `dt` seconds.
    pub fn angular_velocity_between(from: &Self, to: &Self, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return Vec3::ZERO;
        }
        let delta = to.multiply(&from.conjugate());
        let (axis, angle) = delta.to_axis_angle();
        axis.scale(angle / dt)
    }
}

/// Converts a 4-element `[f32; 4]` array `(x, y, z, w)` into a `Quat`.
/// The components are taken verbatim; normalisation is not enforced.
impl From<[f32; 4]> for Quat {
    fn from(value: [f32; 4]) -> Self {
        Self { data: value }
    }
}
