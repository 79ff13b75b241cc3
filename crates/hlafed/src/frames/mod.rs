// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference frames, physical entities and relative-state computation.

pub mod packing;
pub mod physical_entity;
pub mod ref_frame;
pub mod relative_state;
pub mod space_time;
pub mod tree;

pub use packing::{PhysicalEntityBinding, RefFrameBinding};
pub use physical_entity::PhysicalEntity;
pub use ref_frame::RefFrame;
pub use relative_state::{relative_state, FrameKinematics};
pub use space_time::{SpaceTimeCoordinate, SPACE_TIME_COORDINATE_LEN};
pub use tree::RefFrameTree;

/// Supplier of frame states from an external dynamics package.
///
/// The root frame publisher asks for the state of each published frame at
/// the scenario time of the update it is about to send.
pub trait FrameStateSource: Send {
    /// State of `frame` relative to its parent, or `None` to resend the last
    /// published state.
    fn frame_state(&mut self, frame: &str, scenario_time: f64) -> Option<FrameKinematics>;
}
