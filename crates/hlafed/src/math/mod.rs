// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Quaternion and vector algebra for attitude kinematics.

pub mod euler;
pub mod quaternion;
pub mod vector;

pub use euler::EulerSequence;
pub use quaternion::QuaternionData;
pub use vector::Vec3;
