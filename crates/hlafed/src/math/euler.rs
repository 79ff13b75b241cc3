// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Euler angle trigonometry keyed by rotation sequence.
//!
//! A sequence `(i, j, k)` composes the transformation matrix as
//! `M = R_i(a) * R_j(b) * R_k(c)` where `R_n` is the elementary rotation
//! about axis `n`. Quaternion conversions go through these helpers so that
//! every sequence shares one decomposition routine.

use super::vector::Vec3;

/// Tolerance on `cos(b)` below which the decomposition is gimbal locked.
const GIMBAL_TOLERANCE: f64 = 1.0e-12;

/// Supported Euler rotation sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EulerSequence {
    /// X then Y then Z (1-2-3).
    #[default]
    RollPitchYaw,
    /// Y then Z then X (2-3-1).
    PitchYawRoll,
    /// Z then Y then X (3-2-1).
    YawPitchRoll,
}

impl EulerSequence {
    /// Axis indices `(i, j, k)` of the sequence.
    pub const fn axes(self) -> (usize, usize, usize) {
        match self {
            EulerSequence::RollPitchYaw => (0, 1, 2),
            EulerSequence::PitchYawRoll => (1, 2, 0),
            EulerSequence::YawPitchRoll => (2, 1, 0),
        }
    }

    /// +1 for cyclic axis orderings, -1 for anti-cyclic ones.
    const fn parity(self) -> f64 {
        match self {
            EulerSequence::RollPitchYaw | EulerSequence::PitchYawRoll => 1.0,
            EulerSequence::YawPitchRoll => -1.0,
        }
    }
}

/// Elementary rotation matrix about a single axis.
pub fn axis_rotation(axis: usize, angle: f64) -> [[f64; 3]; 3] {
    let (s, c) = angle.sin_cos();
    match axis {
        0 => [[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]],
        1 => [[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]],
        _ => [[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]],
    }
}

/// Build the matrix for `angles` (radians) applied in `sequence` order.
pub fn euler_to_matrix(sequence: EulerSequence, angles: &Vec3) -> [[f64; 3]; 3] {
    let (i, j, k) = sequence.axes();
    let first = axis_rotation(i, angles[0]);
    let second = axis_rotation(j, angles[1]);
    let third = axis_rotation(k, angles[2]);
    super::vector::mat_mul(&super::vector::mat_mul(&first, &second), &third)
}

/// Decompose a rotation matrix into angles (radians) for `sequence`.
///
/// The middle angle lies in `[-pi/2, pi/2]`. At gimbal lock the last angle
/// is set to zero and the first absorbs the combined rotation.
pub fn matrix_to_euler(sequence: EulerSequence, m: &[[f64; 3]; 3]) -> Vec3 {
    let (i, j, k) = sequence.axes();
    let s = sequence.parity();

    let sin_b = (s * m[i][k]).clamp(-1.0, 1.0);
    let b = sin_b.asin();

    if b.cos().abs() < GIMBAL_TOLERANCE {
        let a = (s * m[k][j]).atan2(m[j][j]);
        return [a, b, 0.0];
    }

    let a = (-s * m[j][k]).atan2(m[k][k]);
    let c = (-s * m[i][j]).atan2(m[i][i]);
    [a, b, c]
}

/// Convert degrees to radians component-wise.
pub fn to_radians(angles: &Vec3) -> Vec3 {
    [
        angles[0].to_radians(),
        angles[1].to_radians(),
        angles[2].to_radians(),
    ]
}

/// Convert radians to degrees component-wise.
pub fn to_degrees(angles: &Vec3) -> Vec3 {
    [
        angles[0].to_degrees(),
        angles[1].to_degrees(),
        angles[2].to_degrees(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SEQUENCES: [EulerSequence; 3] = [
        EulerSequence::RollPitchYaw,
        EulerSequence::PitchYawRoll,
        EulerSequence::YawPitchRoll,
    ];

    #[test]
    fn test_matrix_roundtrip_all_sequences() {
        let angles = [0.3, -0.7, 1.9];
        for sequence in SEQUENCES {
            let m = euler_to_matrix(sequence, &angles);
            let back = matrix_to_euler(sequence, &m);
            for n in 0..3 {
                assert_abs_diff_eq!(back[n], angles[n], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_gimbal_lock_preserves_matrix() {
        let angles = [0.4, std::f64::consts::FRAC_PI_2, 0.2];
        for sequence in SEQUENCES {
            let m = euler_to_matrix(sequence, &angles);
            let back = matrix_to_euler(sequence, &m);
            let rebuilt = euler_to_matrix(sequence, &back);
            for r in 0..3 {
                for c in 0..3 {
                    assert_abs_diff_eq!(rebuilt[r][c], m[r][c], epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_degree_conversion() {
        let deg = to_degrees(&[std::f64::consts::PI, 0.0, -std::f64::consts::FRAC_PI_2]);
        assert_abs_diff_eq!(deg[0], 180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(deg[2], -90.0, epsilon = 1e-12);
        let rad = to_radians(&deg);
        assert_abs_diff_eq!(rad[0], std::f64::consts::PI, epsilon = 1e-12);
    }
}
