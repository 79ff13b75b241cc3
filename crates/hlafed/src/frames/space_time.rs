// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SpaceFOM space-time coordinate state.

use crate::math::{QuaternionData, Vec3};

/// Number of doubles in a packed [`SpaceTimeCoordinate`].
pub const SPACE_TIME_COORDINATE_LEN: usize = 14;

/// Translational and rotational state of a frame or body with respect to
/// its parent frame, plus the time it is valid at.
///
/// Position and velocity are expressed in the parent frame; the angular
/// velocity is expressed in the body frame. Equality compares the bit
/// patterns of every double.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceTimeCoordinate {
    pub position: Vec3,
    pub velocity: Vec3,
    pub attitude: QuaternionData,
    pub angular_velocity: Vec3,
    /// Time tag in seconds (truncated Julian date in SpaceFOM).
    pub time: f64,
}

impl SpaceTimeCoordinate {
    /// Identity state at time zero.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Wire order: position, velocity, attitude (scalar first), angular
    /// velocity, time.
    pub fn to_array(&self) -> [f64; SPACE_TIME_COORDINATE_LEN] {
        let p = &self.position;
        let v = &self.velocity;
        let q = &self.attitude;
        let w = &self.angular_velocity;
        [
            p[0], p[1], p[2], v[0], v[1], v[2], q.scalar, q.vector[0], q.vector[1], q.vector[2],
            w[0], w[1], w[2], self.time,
        ]
    }

    pub fn from_array(values: &[f64; SPACE_TIME_COORDINATE_LEN]) -> Self {
        Self {
            position: [values[0], values[1], values[2]],
            velocity: [values[3], values[4], values[5]],
            attitude: QuaternionData::new(values[6], [values[7], values[8], values[9]]),
            angular_velocity: [values[10], values[11], values[12]],
            time: values[13],
        }
    }
}

impl PartialEq for SpaceTimeCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_layout() {
        let state = SpaceTimeCoordinate {
            position: [1.0, 2.0, 3.0],
            velocity: [4.0, 5.0, 6.0],
            attitude: QuaternionData::new(7.0, [8.0, 9.0, 10.0]),
            angular_velocity: [11.0, 12.0, 13.0],
            time: 14.0,
        };
        let values = state.to_array();
        for (idx, value) in values.iter().enumerate() {
            assert_eq!(*value, (idx + 1) as f64);
        }
        assert_eq!(SpaceTimeCoordinate::from_array(&values), state);
    }

    #[test]
    fn test_equality_is_bitwise() {
        let a = SpaceTimeCoordinate::identity();
        let mut b = a;
        b.position[0] = -0.0;
        assert_ne!(a, b);

        let mut n = a;
        n.time = f64::NAN;
        assert_eq!(n, n);
    }
}
