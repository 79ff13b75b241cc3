// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Physical entity record.

use super::relative_state::FrameKinematics;
use super::space_time::SpaceTimeCoordinate;
use crate::math::{vector, QuaternionData, Vec3};

/// Body moving with respect to a parent reference frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhysicalEntity {
    pub name: String,
    pub entity_type: String,
    pub status: String,
    pub parent_frame: String,
    pub state: SpaceTimeCoordinate,
    /// Linear acceleration in the parent frame.
    pub acceleration: Vec3,
    /// Angular acceleration in the body frame.
    pub rotational_acceleration: Vec3,
    /// Centre of mass in the structural frame.
    pub center_of_mass: Vec3,
    /// Attitude of the body frame with respect to the structural frame.
    pub body_wrt_structural: QuaternionData,
}

impl PhysicalEntity {
    pub fn new(name: impl Into<String>, parent_frame: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_frame: parent_frame.into(),
            center_of_mass: vector::ZERO,
            body_wrt_structural: QuaternionData::identity(),
            ..Self::default()
        }
    }

    pub fn kinematics(&self) -> FrameKinematics {
        FrameKinematics {
            state: self.state,
            acceleration: self.acceleration,
            angular_acceleration: self.rotational_acceleration,
        }
    }

    pub fn set_kinematics(&mut self, kinematics: &FrameKinematics) {
        self.state = kinematics.state;
        self.acceleration = kinematics.acceleration;
        self.rotational_acceleration = kinematics.angular_acceleration;
    }
}
