// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

use core::ops::{Add, Mul};

use crate::Vec3;

/// Maximum number of Jacobi sweeps in [`Mat3::symmetric_eigen`].
const JACOBI_MAX_SWEEPS: usize = 32;

/// Column-major 3×3 matrix used for rotation matrices and inertia tensors.
///
/// Layout mirrors the engine's other column-major types: element `(row, col)`
/// lives at `data[col * 3 + row]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat3 {
    data: [f32; 9],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Mat3 {
    /// All-zero matrix.
    pub const ZERO: Self = Self { data: [0.0; 9] };

    /// Returns the identity matrix.
    pub const fn identity() -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, // col 0
                0.0, 1.0, 0.0, // col 1
                0.0, 0.0, 1.0, // col 2
            ],
        }
    }

    /// Creates a matrix from column-major array data.
    pub const fn new(data: [f32; 9]) -> Self {
        Self { data }
    }

    /// Builds a matrix from three column vectors.
    pub fn from_cols(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        let [a, b, c] = c0.to_array();
        let [d, e, f] = c1.to_array();
        let [g, h, i] = c2.to_array();
        Self::new([a, b, c, d, e, f, g, h, i])
    }

    /// Diagonal matrix with `diag` on the main diagonal.
    pub fn from_diagonal(diag: Vec3) -> Self {
        let [x, y, z] = diag.to_array();
        Self::new([x, 0.0, 0.0, 0.0, y, 0.0, 0.0, 0.0, z])
    }

    /// Outer product `a * bᵀ`.
    pub fn outer(a: &Vec3, b: &Vec3) -> Self {
        Self::from_cols(a.scale(b.x()), a.scale(b.y()), a.scale(b.z()))
    }

    /// Returns the matrix as a column-major array.
    pub fn to_array(self) -> [f32; 9] {
        self.data
    }

    /// Element at `(row, col)`.
    pub fn at(&self, row: usize, col: usize) -> f32 {
        self.data[col * 3 + row]
    }

    /// Column `col` as a vector.
    pub fn col(&self, col: usize) -> Vec3 {
        Vec3::new(self.data[col * 3], self.data[col * 3 + 1], self.data[col * 3 + 2])
    }

    /// Main diagonal as a vector.
    pub fn diagonal(&self) -> Vec3 {
        Vec3::new(self.data[0], self.data[4], self.data[8])
    }

    /// Matrix product `self * rhs`.
    pub fn multiply(&self, rhs: &Self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    sum += self.at(row, k) * rhs.at(k, col);
                }
                out[col * 3 + row] = sum;
            }
        }
        Self::new(out)
    }

    /// Transforms a vector (`self * v`).
    pub fn mul_vec3(&self, v: &Vec3) -> Vec3 {
        let [x, y, z] = v.to_array();
        Vec3::new(
            self.at(0, 0) * x + self.at(0, 1) * y + self.at(0, 2) * z,
            self.at(1, 0) * x + self.at(1, 1) * y + self.at(1, 2) * z,
            self.at(2, 0) * x + self.at(2, 1) * y + self.at(2, 2) * z,
        )
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[row * 3 + col] = self.at(row, col);
            }
        }
        Self::new(out)
    }

    /// Scales every element.
    pub fn scale(&self, s: f32) -> Self {
        let mut out = self.data;
        for v in &mut out {
            *v *= s;
        }
        Self::new(out)
    }

    /// Determinant.
    pub fn determinant(&self) -> f32 {
        let c0 = self.col(0);
        let c1 = self.col(1);
        let c2 = self.col(2);
        c0.dot(&c1.cross(&c2))
    }

    /// Inverse, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let c0 = self.col(0);
        let c1 = self.col(1);
        let c2 = self.col(2);
        let r0 = c1.cross(&c2);
        let r1 = c2.cross(&c0);
        let r2 = c0.cross(&c1);
        let det = c0.dot(&r0);
        if det.abs() < f32::MIN_POSITIVE || !det.is_finite() {
            return None;
        }
        // Rows of the inverse are the cross products above divided by det.
        Some(Self::from_cols(r0, r1, r2).transpose().scale(1.0 / det))
    }

    /// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
    ///
    /// Returns `(eigenvalues, eigenvectors)` where column `k` of the second
    /// value is the unit eigenvector for eigenvalue `k`. The eigenvector
    /// matrix is a proper rotation (determinant `+1`) so it can be turned
    /// into a quaternion directly. Only the upper triangle is read.
    pub fn symmetric_eigen(&self) -> (Vec3, Self) {
        let mut a = [[0.0_f32; 3]; 3];
        for (row, r) in a.iter_mut().enumerate() {
            for (col, v) in r.iter_mut().enumerate() {
                *v = if row <= col { self.at(row, col) } else { self.at(col, row) };
            }
        }
        let mut v = [[1.0_f32, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

        let scale = a[0][0].abs() + a[1][1].abs() + a[2][2].abs();
        for _ in 0..JACOBI_MAX_SWEEPS {
            let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
            if off <= f32::EPSILON * f32::EPSILON * scale * scale || off == 0.0 {
                break;
            }
            for (p, q) in [(0, 1), (0, 2), (1, 2)] {
                let apq = a[p][q];
                if apq.abs() <= f32::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = if theta.abs() > 1e18 {
                    0.5 / theta
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for row in &mut a {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..3 {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in &mut v {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }

        let values = Vec3::new(a[0][0], a[1][1], a[2][2]);
        let c0 = Vec3::new(v[0][0], v[1][0], v[2][0]);
        let c1 = Vec3::new(v[0][1], v[1][1], v[2][1]);
        let mut c2 = Vec3::new(v[0][2], v[1][2], v[2][2]);
        if c0.dot(&c1.cross(&c2)) < 0.0 {
            c2 = -c2;
        }
        (values, Self::from_cols(c0, c1, c2))
    }
}

impl Add for Mat3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut out = self.data;
        for (o, r) in out.iter_mut().zip(rhs.data) {
            *o += r;
        }
        Self::new(out)
    }
}

impl Mul for Mat3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.multiply(&rhs)
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        self.mul_vec3(&rhs)
    }
}
