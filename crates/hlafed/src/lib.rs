// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hlafed - SpaceFOM federate middleware
//!
//! Core of an HLA 1516 federate following the SpaceFOM execution control
//! rules: multiphase initialization, master-driven mode transitions,
//! reference frame publication and attribute marshalling between
//! simulation memory and the RTI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hlafed::{
//!     ExecutionMode, Executive, Federate, FederateConfig, LoopbackRti, SimExecutive,
//! };
//!
//! fn main() -> hlafed::Result<()> {
//!     let rti = LoopbackRti::new();
//!     let exec = SimExecutive::shared(0.25);
//!
//!     let config = FederateConfig::builder("SpaceFederation", "Moon")
//!         .master(true)
//!         .root_frame_name("SolarSystemBarycentricInertial")
//!         .publish_root_frame(true)
//!         .build()?;
//!
//!     let mut federate = Federate::new(config, rti.ambassador(), exec.clone())?;
//!     federate.initialize()?;
//!     while federate.run_cycle(&exec)? == ExecutionMode::Running {
//!         if exec.sim_time() >= 10.0 {
//!             federate.request_mode_transition(ExecutionMode::Shutdown)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------------------+
//! |                         Simulation jobs                         |
//! |         SimExecutive (cycle, freeze, variable registry)         |
//! +-----------------------------------------------------------------+
//! |                            Federate                             |
//! |   initialize | pre_step | post_step | freeze_step | shutdown    |
//! +---------------+----------------+----------------+---------------+
//! |  exec         |  fom           |  frames        |  queue        |
//! |  ExCO, MTR,   |  objects,      |  RefFrameTree, |  attribute /  |
//! |  sync points  |  interactions  |  entities      |  interaction  |
//! +---------------+----------------+----------------+---------------+
//! |          codec (HLA encodings <-> simulation variables)         |
//! +-----------------------------------------------------------------+
//! |       rti (RtiAmbassador / FederateAmbassador, LoopbackRti)     |
//! +-----------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Federate`] | Owns the RTI session and drives the execution control state machine |
//! | [`FederateConfig`] | Per-federate settings (master flag, time management, FOM mapping) |
//! | [`ExecutionMode`] | Uninitialized, Initializing, Running, Freeze, Shutdown |
//! | [`ExecutionConfiguration`] | The SpaceFOM ExCO object |
//! | [`RefFrameTree`] | Reference frame graph and frame transformations |
//! | [`LoopbackRti`] | In-process RTI used for tests and single-process federations |
//! | [`SimExecutive`] | Minimal cyclic executive holding simulation variables |
//!
//! ## Modules Overview
//!
//! - [`codec`] - HLA encodings and simulation variable packing
//! - [`config`] - Constants, [`FederateConfig`] and YAML loading
//! - [`exec`] - Execution control: modes, ExCO, MTR, sync points
//! - [`federate`] - Federate lifecycle and executive hooks
//! - [`fom`] - Object and interaction mapping onto the FOM
//! - [`frames`] - Reference frames, physical entities, relative state
//! - [`rti`] - RTI service boundary and the loopback implementation

/// HLA data encodings and simulation variable packing.
pub mod codec;
/// Process-wide constants and per-federate configuration.
pub mod config;
/// Error types.
pub mod error;
/// SpaceFOM execution control (modes, ExCO, MTR, sync points).
pub mod exec;
/// Simulation executive abstraction and the in-process implementation.
pub mod executive;
/// Federate lifecycle and executive hooks.
pub mod federate;
/// Object and interaction bindings onto the federation object model.
pub mod fom;
/// Reference frames and physical entities.
pub mod frames;
/// Vector and quaternion math.
pub mod math;
/// Queues of received attribute and interaction data.
pub mod queue;
/// RTI service boundary.
pub mod rti;
/// HLA logical time and scenario timelines.
pub mod time;

pub use config::{FederateConfig, FederateConfigBuilder, KnownFederate, VERSION};
pub use error::{Error, Result};
pub use exec::{ExecutionConfiguration, ExecutionMode};
pub use executive::{Executive, SimExecutive};
pub use federate::{Federate, FederateShared, InteractionHandler, PhaseHook};
pub use frames::{FrameKinematics, FrameStateSource, PhysicalEntity, RefFrame, RefFrameTree};
pub use rti::{FederateAmbassador, LoopbackRti, RtiAmbassador};
pub use time::{CteClock, Int64Interval, Int64Time, ScenarioTimeline};
