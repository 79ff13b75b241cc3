// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Three-vector helpers over plain `[f64; 3]` arrays.
//!
//! SpaceFOM records carry vectors as fixed arrays of three doubles, so the
//! algebra works directly on that representation instead of wrapping it.

/// Cartesian three-vector.
pub type Vec3 = [f64; 3];

/// Zero vector.
pub const ZERO: Vec3 = [0.0; 3];

#[inline]
pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn scale(a: &Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

#[inline]
pub fn negate(a: &Vec3) -> Vec3 {
    [-a[0], -a[1], -a[2]]
}

#[inline]
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn norm_squared(a: &Vec3) -> f64 {
    dot(a, a)
}

#[inline]
pub fn norm(a: &Vec3) -> f64 {
    norm_squared(a).sqrt()
}

/// Sum of any number of vectors.
pub fn sum(terms: &[Vec3]) -> Vec3 {
    terms.iter().fold(ZERO, |acc, v| add(&acc, v))
}

/// Largest absolute component difference between two vectors.
pub fn max_abs_diff(a: &Vec3, b: &Vec3) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).abs()).fold(0.0, f64::max)
}

/// Row-major 3x3 matrix times vector.
#[inline]
pub fn mat_mul_vec(m: &[[f64; 3]; 3], v: &Vec3) -> Vec3 {
    [dot(&m[0], v), dot(&m[1], v), dot(&m[2], v)]
}

/// Transpose of a row-major 3x3 matrix.
pub fn transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut t = [[0.0; 3]; 3];
    for (i, row) in m.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            t[j][i] = *value;
        }
    }
    t
}

/// Product of two row-major 3x3 matrices.
pub fn mat_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
