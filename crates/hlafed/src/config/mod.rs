// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hlafed global configuration.
//!
//! Process-wide constants live here and nowhere else. Everything that can
//! differ between two federates in one process (including the master flag)
//! is instance state carried by [`FederateConfig`].
//!
//! # Example
//!
//! ```ignore
//! use hlafed::config::*;
//!
//! let config = FederateConfig::builder("SpaceFederation", "Moon")
//!     .master(true)
//!     .least_common_time_step(Int64Interval::from_micros(250_000))
//!     .lookahead(Int64Interval::from_micros(250_000))
//!     .time_padding(Int64Interval::from_micros(1_000_000))
//!     .build()?;
//! ```

pub mod federate;
#[cfg(feature = "config-loaders")]
pub mod yaml;

pub use federate::{
    AttributeConfig, FederateConfig, FederateConfigBuilder, InteractionConfig, KnownFederate,
    ObjectConfig, ParameterConfig,
};

use std::time::Duration;

// =======================================================================
// Versioning
// =======================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Release date of this version.
pub const RELEASE_DATE: &str = "2026-03-02";

// =======================================================================
// Time
// =======================================================================

/// Base time units per second of HLA logical time (microsecond resolution).
pub const BASE_TIME_MULTIPLIER: i64 = 1_000_000;

/// Sleep between iterations of every blocking wait.
pub const WAIT_SLEEP: Duration = Duration::from_millis(1);

/// Interval between federation membership checks inside blocking waits.
pub const LIVENESS_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Minimum ratio between the master's time padding and the LCTS.
pub const MIN_PADDING_LCTS_RATIO: i64 = 3;

// =======================================================================
// Queues
// =======================================================================

/// Default bound of the interaction and attribute queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

// =======================================================================
// SpaceFOM synchronisation point labels
// =======================================================================

pub const SP_INITIALIZATION_STARTED: &str = "initialization_started";
pub const SP_INITIALIZATION_COMPLETED: &str = "initialization_completed";
pub const SP_OBJECTS_DISCOVERED: &str = "objects_discovered";
pub const SP_ROOT_FRAME_DISCOVERED: &str = "root_frame_discovered";
pub const SP_MTR_RUN: &str = "mtr_run";
pub const SP_MTR_FREEZE: &str = "mtr_freeze";
pub const SP_MTR_SHUTDOWN: &str = "mtr_shutdown";

// =======================================================================
// SpaceFOM classes
// =======================================================================

/// Mode transition request interaction class.
pub const MTR_INTERACTION_CLASS: &str = "HLAinteractionRoot.ModeTransitionRequest";
/// Its single parameter (i16 little-endian).
pub const MTR_EXECUTION_MODE_PARAMETER: &str = "execution_mode";

/// Execution configuration object class.
pub const EXCO_CLASS: &str = "HLAobjectRoot.ExecutionConfiguration";
/// Instance name of the execution configuration object.
pub const EXCO_INSTANCE_NAME: &str = "ExCO";

pub const EXCO_ROOT_FRAME_NAME: &str = "root_frame_name";
pub const EXCO_SCENARIO_TIME_EPOCH: &str = "scenario_time_epoch";
pub const EXCO_NEXT_MODE_SCENARIO_TIME: &str = "next_mode_scenario_time";
pub const EXCO_NEXT_MODE_CTE_TIME: &str = "next_mode_cte_time";
pub const EXCO_CURRENT_EXECUTION_MODE: &str = "current_execution_mode";
pub const EXCO_NEXT_EXECUTION_MODE: &str = "next_execution_mode";
pub const EXCO_LEAST_COMMON_TIME_STEP: &str = "least_common_time_step";

/// Every ExCO attribute, in declaration order.
pub const EXCO_ATTRIBUTES: [&str; 7] = [
    EXCO_ROOT_FRAME_NAME,
    EXCO_SCENARIO_TIME_EPOCH,
    EXCO_NEXT_MODE_SCENARIO_TIME,
    EXCO_NEXT_MODE_CTE_TIME,
    EXCO_CURRENT_EXECUTION_MODE,
    EXCO_NEXT_EXECUTION_MODE,
    EXCO_LEAST_COMMON_TIME_STEP,
];

/// Reference frame object class.
pub const REFERENCE_FRAME_CLASS: &str = "HLAobjectRoot.ReferenceFrame";
/// Physical entity object class.
pub const PHYSICAL_ENTITY_CLASS: &str = "HLAobjectRoot.PhysicalEntity";

/// Whether `label` is one of the reserved SpaceFOM synchronisation points.
pub fn is_reserved_sync_point(label: &str) -> bool {
    matches!(
        label,
        SP_INITIALIZATION_STARTED
            | SP_INITIALIZATION_COMPLETED
            | SP_OBJECTS_DISCOVERED
            | SP_ROOT_FRAME_DISCOVERED
            | SP_MTR_RUN
            | SP_MTR_FREEZE
            | SP_MTR_SHUTDOWN
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_labels() {
        assert!(is_reserved_sync_point("mtr_freeze"));
        assert!(!is_reserved_sync_point("phase_one"));
    }

    #[test]
    fn test_base_time_is_microseconds() {
        assert_eq!(BASE_TIME_MULTIPLIER, 1_000_000);
        assert!(!VERSION.is_empty());
    }
}
