// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Attitude quaternion in scalar/vector form.
//!
//! # Convention
//!
//! An attitude quaternion `q` of a body frame `B` with respect to a parent
//! frame `P` is a left transformation quaternion: `transform_vector` maps a
//! vector expressed in `P` into `B` (`v_B = q v_P q*`), and
//! `conjugate_transform_vector` maps back (`v_P = q* v_B q`). Composition of
//! consecutive frames therefore reads `q_C/A = q_C/B * q_B/A`, and the
//! kinematics are `q_dot = -1/2 [0, w] * q` with `w` expressed in `B`.
//!
//! # Degenerate input
//!
//! Operations whose result is undefined (zero or non-finite magnitude)
//! return the identity quaternion instead of propagating NaN.

use super::euler::{self, EulerSequence};
use super::vector::{self, Vec3};

/// Band around unit magnitude in which the Pade normalisation is used.
///
/// Inside this band the second order error of `2 / (1 + n^2)` (about
/// `diff^2 / 8`) stays below double precision epsilon.
pub const NORMALIZE_PADE_TOLERANCE: f64 = 2.107342e-08;

/// Attitude quaternion with scalar part first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuaternionData {
    /// Scalar part.
    pub scalar: f64,
    /// Vector part.
    pub vector: Vec3,
}

impl Default for QuaternionData {
    /// Identity rotation.
    fn default() -> Self {
        Self::identity()
    }
}

impl QuaternionData {
    pub const fn new(scalar: f64, vector: Vec3) -> Self {
        Self { scalar, vector }
    }

    pub const fn identity() -> Self {
        Self {
            scalar: 1.0,
            vector: [0.0; 3],
        }
    }

    /// Rotation of `angle` radians about the unit vector `axis`.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        let (s, c) = (0.5 * angle).sin_cos();
        let mut q = Self::new(c, vector::scale(axis, s));
        q.normalize();
        q
    }

    pub fn set_identity(&mut self) {
        *self = Self::identity();
    }

    pub fn is_finite(&self) -> bool {
        self.scalar.is_finite() && self.vector.iter().all(|v| v.is_finite())
    }

    pub fn norm_squared(&self) -> f64 {
        self.scalar * self.scalar + vector::norm_squared(&self.vector)
    }

    /// Multiply every component by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.scalar *= factor;
        self.vector = vector::scale(&self.vector, factor);
    }

    pub fn scaled(&self, factor: f64) -> Self {
        let mut q = *self;
        q.scale(factor);
        q
    }

    /// Conjugate in place.
    pub fn conjugate(&mut self) {
        self.vector = vector::negate(&self.vector);
    }

    /// Conjugate copy.
    pub fn conjugated(&self) -> Self {
        Self::new(self.scalar, vector::negate(&self.vector))
    }

    /// Normalise to unit magnitude.
    pub fn normalize(&mut self) {
        let n2 = self.norm_squared();
        if !n2.is_finite() || n2 <= 0.0 {
            self.set_identity();
            return;
        }

        if (1.0 - n2).abs() >= NORMALIZE_PADE_TOLERANCE {
            self.scale(1.0 / n2.sqrt());
        }
        // Pade refinement: exact to second order inside the tolerance band.
        let n2 = self.norm_squared();
        self.scale(2.0 / (1.0 + n2));
    }

    pub fn normalized(&self) -> Self {
        let mut q = *self;
        q.normalize();
        q
    }

    /// Hamilton product `self * rhs`.
    pub fn multiply(&self, rhs: &Self) -> Self {
        self.multiply_sv(rhs.scalar, &rhs.vector)
    }

    /// Hamilton product with a quaternion given as scalar and vector parts.
    pub fn multiply_sv(&self, scalar: f64, vec: &Vec3) -> Self {
        let s = self.scalar * scalar - vector::dot(&self.vector, vec);
        let v = vector::sum(&[
            vector::scale(vec, self.scalar),
            vector::scale(&self.vector, scalar),
            vector::cross(&self.vector, vec),
        ]);
        Self::new(s, v)
    }

    /// `[0, vec] * self`.
    pub fn multiply_vector_left(&self, vec: &Vec3) -> Self {
        Self::new(0.0, *vec).multiply(self)
    }

    /// `self * [0, vec]`.
    pub fn multiply_vector_right(&self, vec: &Vec3) -> Self {
        self.multiply_sv(0.0, vec)
    }

    /// First time derivative for body angular velocity `omega`.
    pub fn derivative_first(&self, omega: &Vec3) -> Self {
        if !self.is_finite() {
            return Self::identity();
        }
        self.multiply_vector_left(omega).scaled(-0.5)
    }

    /// Second time derivative for body angular velocity and acceleration.
    pub fn derivative_second(&self, omega: &Vec3, omega_dot: &Vec3) -> Self {
        if !self.is_finite() {
            return Self::identity();
        }
        let accel_term = self.multiply_vector_left(omega_dot).scaled(-0.5);
        let rate_term = self.scaled(-0.25 * vector::norm_squared(omega));
        Self::new(
            accel_term.scalar + rate_term.scalar,
            vector::add(&accel_term.vector, &rate_term.vector),
        )
    }

    /// Recover the body angular velocity from this attitude and its rate.
    pub fn compute_omega(&self, q_dot: &Self) -> Vec3 {
        let product = q_dot.multiply(&self.conjugated());
        let omega = vector::scale(&product.vector, -2.0);
        if omega.iter().all(|w| w.is_finite()) {
            omega
        } else {
            vector::ZERO
        }
    }

    /// `q v q*`: parent-frame vector expressed in the body frame.
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let qs = self.scalar;
        let qv = &self.vector;
        vector::sum(&[
            vector::scale(&vector::cross(qv, v), 2.0 * qs),
            vector::scale(v, 2.0 * qs * qs - 1.0),
            vector::scale(qv, 2.0 * vector::dot(qv, v)),
        ])
    }

    /// `q* v q`: body-frame vector expressed in the parent frame.
    pub fn conjugate_transform_vector(&self, v: &Vec3) -> Vec3 {
        self.conjugated().transform_vector(v)
    }

    /// Matrix equivalent of [`QuaternionData::transform_vector`].
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        let s = self.scalar;
        let [x, y, z] = self.vector;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - s * z),
                2.0 * (x * z + s * y),
            ],
            [
                2.0 * (x * y + s * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - s * x),
            ],
            [
                2.0 * (x * z - s * y),
                2.0 * (y * z + s * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }

    /// Rebuild from a transformation matrix.
    ///
    /// Selects the largest of the trace and the three diagonal elements as
    /// pivot so the square root argument never approaches zero. The scalar
    /// part of the result is non-negative.
    pub fn set_from_matrix(&mut self, m: &[[f64; 3]; 3]) {
        let trace = m[0][0] + m[1][1] + m[2][2];
        let pivots = [trace, m[0][0], m[1][1], m[2][2]];
        let mut branch = 0;
        for (idx, value) in pivots.iter().enumerate().skip(1) {
            if *value > pivots[branch] {
                branch = idx;
            }
        }

        let (s, x, y, z) = match branch {
            0 => {
                let s = 0.5 * (1.0 + trace).max(0.0).sqrt();
                let f = 0.25 / s;
                (s, (m[2][1] - m[1][2]) * f, (m[0][2] - m[2][0]) * f, (m[1][0] - m[0][1]) * f)
            }
            1 => {
                let x = 0.5 * (1.0 + m[0][0] - m[1][1] - m[2][2]).max(0.0).sqrt();
                let f = 0.25 / x;
                ((m[2][1] - m[1][2]) * f, x, (m[0][1] + m[1][0]) * f, (m[0][2] + m[2][0]) * f)
            }
            2 => {
                let y = 0.5 * (1.0 - m[0][0] + m[1][1] - m[2][2]).max(0.0).sqrt();
                let f = 0.25 / y;
                ((m[0][2] - m[2][0]) * f, (m[0][1] + m[1][0]) * f, y, (m[1][2] + m[2][1]) * f)
            }
            _ => {
                let z = 0.5 * (1.0 - m[0][0] - m[1][1] + m[2][2]).max(0.0).sqrt();
                let f = 0.25 / z;
                ((m[1][0] - m[0][1]) * f, (m[0][2] + m[2][0]) * f, (m[1][2] + m[2][1]) * f, z)
            }
        };

        let mut q = Self::new(s, [x, y, z]);
        if !q.is_finite() {
            self.set_identity();
            return;
        }
        if q.scalar < 0.0 {
            q.scale(-1.0);
        }
        q.normalize();
        *self = q;
    }

    pub fn from_matrix(m: &[[f64; 3]; 3]) -> Self {
        let mut q = Self::identity();
        q.set_from_matrix(m);
        q
    }

    /// Set from Euler angles in radians.
    pub fn set_from_euler(&mut self, sequence: EulerSequence, angles: &Vec3) {
        self.set_from_matrix(&euler::euler_to_matrix(sequence, angles));
    }

    /// Set from Euler angles in degrees.
    pub fn set_from_euler_deg(&mut self, sequence: EulerSequence, angles: &Vec3) {
        self.set_from_euler(sequence, &euler::to_radians(angles));
    }

    /// Euler angles in radians.
    pub fn get_euler(&self, sequence: EulerSequence) -> Vec3 {
        euler::matrix_to_euler(sequence, &self.to_matrix())
    }

    /// Euler angles in degrees.
    pub fn get_euler_deg(&self, sequence: EulerSequence) -> Vec3 {
        euler::to_degrees(&self.get_euler(sequence))
    }
}
