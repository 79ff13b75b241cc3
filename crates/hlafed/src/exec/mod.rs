// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SpaceFOM execution control.
//!
//! # Initialisation
//!
//! ```text
//!  master                                  early joiner
//!  ------                                  ------------
//!  create + join                           join
//!  wait required federates
//!  register initialization_started,
//!    objects_discovered,
//!    root_frame_discovered, multiphase  --> announced
//!  reserve/register objects                reserve/register objects
//!  achieve objects_discovered  <========>  achieve objects_discovered
//!  publish ExCO + root frame  ----------->  wait ExCO + root frame
//!  achieve root_frame_discovered <======>  achieve root_frame_discovered
//!  multiphase labels           <========>  multiphase labels
//!  enable time management                  enable time management
//!  achieve initialization_started <=====>  achieve initialization_started
//!  register initialization_completed (left pending as a late-joiner marker)
//!  register mtr_run  ------------------->  achieve, wait, RUNNING
//! ```
//!
//! A late joiner sees `initialization_completed` announced without
//! `initialization_started`, reads the ExCO, aligns its logical time to the
//! next LCTS boundary past GALT and enters the mode the ExCO names.

pub mod control;
pub mod exco;
pub mod mode;
pub mod mtr;
pub mod sync_point;
pub mod wait;

pub use control::{ExecutionControl, ScheduledTransition};
pub use exco::ExecutionConfiguration;
pub use mode::ExecutionMode;
pub use mtr::{decode_mtr, encode_mtr};
pub use sync_point::{Registration, SyncPointManager};
pub use wait::{WaitPolicy, WaitTick};
