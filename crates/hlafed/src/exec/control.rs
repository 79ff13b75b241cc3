// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution control state: mode, master role, ExCO and scheduled
//! transitions.
//!
//! This is the RTI-free half of execution control. The federate drives it
//! from its hooks and performs the RTI traffic (ExCO updates, sync points)
//! it asks for.

use std::collections::VecDeque;

use crate::config::FederateConfig;
use crate::error::{Error, Result};
use crate::exec::{ExecutionConfiguration, ExecutionMode};
use crate::time::Int64Interval;

/// Tolerance when comparing scenario times, well below one base time unit.
const SCENARIO_TIME_EPSILON: f64 = 1.0e-9;

/// Mode change accepted by the master and carried by a sync point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledTransition {
    pub mode: ExecutionMode,
    /// Scenario time at which the mode takes effect.
    pub scenario_time: f64,
    /// CTE time gating a run transition (0 when CTE is off).
    pub cte_time: f64,
}

/// Per-federate execution control state.
#[derive(Debug)]
pub struct ExecutionControl {
    mode: ExecutionMode,
    master: bool,
    master_locked: bool,
    late_joiner: bool,
    exco: ExecutionConfiguration,
    exco_dirty: bool,
    scheduled: Option<ScheduledTransition>,
    pending_requests: VecDeque<ExecutionMode>,
    time_padding: Int64Interval,
}

impl ExecutionControl {
    pub fn new(config: &FederateConfig) -> Self {
        let exco = ExecutionConfiguration {
            root_frame_name: config.root_frame_name.clone(),
            scenario_time_epoch: config.scenario_time_epoch,
            least_common_time_step: config.least_common_time_step,
            ..ExecutionConfiguration::default()
        };
        Self {
            mode: ExecutionMode::Uninitialized,
            master: config.preset_master.unwrap_or(false),
            master_locked: false,
            late_joiner: false,
            exco,
            exco_dirty: false,
            scheduled: None,
            pending_requests: VecDeque::new(),
            time_padding: config.time_padding,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_master(&self) -> bool {
        self.master
    }

    /// Change the master role; refused once joining has begun.
    pub fn set_master(&mut self, master: bool) -> Result<()> {
        if self.master_locked && master != self.master {
            return Err(Error::InvalidState(
                "master role cannot change after joining".into(),
            ));
        }
        self.master = master;
        Ok(())
    }

    pub fn lock_master(&mut self) {
        self.master_locked = true;
    }

    pub fn is_late_joiner(&self) -> bool {
        self.late_joiner
    }

    pub fn set_late_joiner(&mut self, late: bool) {
        self.late_joiner = late;
    }

    pub fn time_padding(&self) -> Int64Interval {
        self.time_padding
    }

    /// Move to `to`, enforcing the transition table.
    pub fn transition(&mut self, to: ExecutionMode) -> Result<()> {
        if !self.mode.can_transition_to(to) {
            return Err(Error::InvalidModeTransition {
                from: self.mode,
                to,
            });
        }
        log::info!("[exec] mode {} -> {}", self.mode, to);
        self.mode = to;
        if self.master {
            self.exco.current_execution_mode = to;
            if self.exco.next_execution_mode == to
                || self.exco.next_execution_mode == ExecutionMode::Uninitialized
            {
                self.exco.next_execution_mode = to;
            }
            self.exco_dirty = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Execution configuration
    // ------------------------------------------------------------------

    pub fn exco(&self) -> &ExecutionConfiguration {
        &self.exco
    }

    /// Mutable access for the master; marks the ExCO for sending.
    pub fn exco_mut(&mut self) -> &mut ExecutionConfiguration {
        self.exco_dirty = true;
        &mut self.exco
    }

    /// Replace the local copy with a reflected ExCO (non-master).
    pub fn adopt_exco(&mut self, exco: ExecutionConfiguration) {
        self.exco = exco;
    }

    /// Whether the ExCO changed since the last call.
    pub fn take_exco_dirty(&mut self) -> bool {
        std::mem::take(&mut self.exco_dirty)
    }

    pub fn mark_exco_dirty(&mut self) {
        self.exco_dirty = true;
    }

    // ------------------------------------------------------------------
    // Mode transition requests (master)
    // ------------------------------------------------------------------

    /// Queue a mode transition request for the master to process.
    pub fn queue_request(&mut self, mode: ExecutionMode) {
        log::debug!("[exec] queued mode transition request {}", mode);
        self.pending_requests.push_back(mode);
    }

    pub fn has_pending_requests(&self) -> bool {
        !self.pending_requests.is_empty()
    }

    /// Accept the first valid queued request.
    ///
    /// While running the new mode takes effect `time_padding` after
    /// `now_scenario`; from initialisation or freeze it takes effect at
    /// `now_scenario`. Invalid requests and requests arriving while a
    /// transition is already scheduled are dropped with a warning.
    pub fn process_requests(
        &mut self,
        now_scenario: f64,
        cte_now: Option<f64>,
    ) -> Option<ScheduledTransition> {
        while let Some(requested) = self.pending_requests.pop_front() {
            if let Some(scheduled) = &self.scheduled {
                if requested != ExecutionMode::Shutdown || scheduled.mode == ExecutionMode::Shutdown {
                    log::warn!(
                        "[exec] transition to {} already scheduled, ignoring request {}",
                        scheduled.mode,
                        requested
                    );
                    continue;
                }
            }
            if let Err(e) = self.mode.validate_request(requested) {
                log::warn!("[exec] rejected mode transition request: {}", e);
                continue;
            }

            let padding = self.time_padding.seconds();
            // Scenario time does not advance outside Running; only CTE is padded.
            let scenario_time = if self.mode == ExecutionMode::Running {
                now_scenario + padding
            } else {
                now_scenario
            };
            let transition = ScheduledTransition {
                mode: requested,
                scenario_time,
                cte_time: cte_now.map_or(0.0, |now| now + padding),
            };

            let exco = self.exco_mut();
            exco.next_execution_mode = requested;
            exco.next_mode_scenario_time = transition.scenario_time;
            exco.next_mode_cte_time = transition.cte_time;

            log::info!(
                "[exec] accepted transition {} -> {} at scenario time {:.6}",
                self.mode,
                requested,
                scenario_time
            );
            self.scheduled = Some(transition);
            return Some(transition);
        }
        None
    }

    // ------------------------------------------------------------------
    // Scheduled transitions
    // ------------------------------------------------------------------

    /// Schedule a transition announced by the master.
    pub fn schedule(&mut self, transition: ScheduledTransition) {
        self.scheduled = Some(transition);
    }

    /// Transition carried by the current ExCO, if it names a new mode.
    pub fn transition_from_exco(&self) -> Option<ScheduledTransition> {
        let next = self.exco.next_execution_mode;
        (next != self.mode && next.is_requestable()).then_some(ScheduledTransition {
            mode: next,
            scenario_time: self.exco.next_mode_scenario_time,
            cte_time: self.exco.next_mode_cte_time,
        })
    }

    pub fn scheduled(&self) -> Option<ScheduledTransition> {
        self.scheduled
    }

    /// Whether the scheduled transition takes effect at `now_scenario`.
    pub fn is_due(&self, now_scenario: f64) -> bool {
        self.scheduled
            .is_some_and(|t| now_scenario + SCENARIO_TIME_EPSILON >= t.scenario_time)
    }

    pub fn clear_scheduled(&mut self) -> Option<ScheduledTransition> {
        self.scheduled.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master_config() -> FederateConfig {
        FederateConfig::builder("Fed", "Master")
            .master(true)
            .least_common_time_step(Int64Interval::from_micros(250_000))
            .lookahead(Int64Interval::from_micros(250_000))
            .time_padding(Int64Interval::from_micros(1_000_000))
            .root_frame_name("Root")
            .build()
            .expect("config should succeed")
    }

    fn running(control: &mut ExecutionControl) {
        control
            .transition(ExecutionMode::Initializing)
            .expect("transition should succeed");
        control
            .transition(ExecutionMode::Running)
            .expect("transition should succeed");
    }

    #[test]
    fn test_master_flag_locks() {
        let mut control = ExecutionControl::new(&master_config());
        assert!(control.is_master());
        control.set_master(false).expect("unlocked change should succeed");
        control.lock_master();
        assert!(control.set_master(true).is_err());
        assert!(control.set_master(false).is_ok());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut control = ExecutionControl::new(&master_config());
        let err = control
            .transition(ExecutionMode::Running)
            .expect_err("uninitialized cannot run");
        assert!(matches!(err, Error::InvalidModeTransition { .. }));
        assert_eq!(control.mode(), ExecutionMode::Uninitialized);
    }

    #[test]
    fn test_freeze_request_is_padded() {
        let mut control = ExecutionControl::new(&master_config());
        running(&mut control);
        control.take_exco_dirty();

        control.queue_request(ExecutionMode::Freeze);
        let scheduled = control
            .process_requests(5.0, None)
            .expect("freeze accepted");
        assert_eq!(scheduled.mode, ExecutionMode::Freeze);
        assert_eq!(scheduled.scenario_time, 6.0);
        assert_eq!(control.exco().next_execution_mode, ExecutionMode::Freeze);
        assert_eq!(control.exco().next_mode_scenario_time, 6.0);
        assert!(control.take_exco_dirty());

        assert!(!control.is_due(5.75));
        assert!(control.is_due(6.0));
    }

    #[test]
    fn test_run_from_freeze_is_immediate() {
        let mut control = ExecutionControl::new(&master_config());
        running(&mut control);
        control
            .transition(ExecutionMode::Freeze)
            .expect("transition should succeed");
        control.queue_request(ExecutionMode::Running);
        let scheduled = control
            .process_requests(6.0, Some(100.0))
            .expect("run accepted");
        assert_eq!(scheduled.scenario_time, 6.0);
        assert_eq!(scheduled.cte_time, 101.0);
    }

    #[test]
    fn test_invalid_and_duplicate_requests_dropped() {
        let mut control = ExecutionControl::new(&master_config());
        running(&mut control);
        control.queue_request(ExecutionMode::Running);
        assert!(control.process_requests(1.0, None).is_none());

        control.queue_request(ExecutionMode::Freeze);
        control.queue_request(ExecutionMode::Freeze);
        assert!(control.process_requests(1.0, None).is_some());
        assert!(control.process_requests(1.0, None).is_none());
        assert!(!control.has_pending_requests());

        // Shutdown still overrides a scheduled freeze.
        control.queue_request(ExecutionMode::Shutdown);
        let scheduled = control
            .process_requests(1.25, None)
            .expect("shutdown accepted");
        assert_eq!(scheduled.mode, ExecutionMode::Shutdown);
    }

    #[test]
    fn test_master_transition_updates_exco() {
        let mut control = ExecutionControl::new(&master_config());
        running(&mut control);
        assert_eq!(control.exco().current_execution_mode, ExecutionMode::Running);
        assert_eq!(control.exco().root_frame_name, "Root");
        assert!(control.transition_from_exco().is_none());
    }

    #[test]
    fn test_transition_from_reflected_exco() {
        let config = FederateConfig::builder("Fed", "Other")
            .build()
            .expect("config should succeed");
        let mut control = ExecutionControl::new(&config);
        running(&mut control);
        let mut exco = control.exco().clone();
        exco.next_execution_mode = ExecutionMode::Freeze;
        exco.next_mode_scenario_time = 6.0;
        control.adopt_exco(exco);
        let scheduled = control.transition_from_exco().expect("freeze pending");
        assert_eq!(scheduled.scenario_time, 6.0);
    }
}
