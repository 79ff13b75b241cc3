// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference frame record.

use super::relative_state::FrameKinematics;
use super::space_time::SpaceTimeCoordinate;
use crate::math::{vector, Vec3};

/// Named reference frame and its state relative to its parent.
///
/// An empty `parent_name` marks the root of a frame tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefFrame {
    pub name: String,
    pub parent_name: String,
    pub state: SpaceTimeCoordinate,
    /// Linear acceleration in the parent frame.
    pub acceleration: Vec3,
    /// Angular acceleration in this frame.
    pub angular_acceleration: Vec3,
}

impl RefFrame {
    pub fn new(name: impl Into<String>, parent_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_name: parent_name.into(),
            state: SpaceTimeCoordinate::identity(),
            acceleration: vector::ZERO,
            angular_acceleration: vector::ZERO,
        }
    }

    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    pub fn is_root(&self) -> bool {
        self.parent_name.is_empty()
    }

    pub fn kinematics(&self) -> FrameKinematics {
        FrameKinematics {
            state: self.state,
            acceleration: self.acceleration,
            angular_acceleration: self.angular_acceleration,
        }
    }

    pub fn set_kinematics(&mut self, kinematics: &FrameKinematics) {
        self.state = kinematics.state;
        self.acceleration = kinematics.acceleration;
        self.angular_acceleration = kinematics.angular_acceleration;
    }

    pub fn with_kinematics(mut self, kinematics: FrameKinematics) -> Self {
        self.set_kinematics(&kinematics);
        self
    }
}
