// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Executive hooks: pre/post step, freeze handling and mode transitions.

use std::time::Duration;

use super::Federate;
use crate::config::{is_reserved_sync_point, SP_MTR_SHUTDOWN};
use crate::error::{Error, Result};
use crate::exec::{ExecutionMode, ScheduledTransition};
use crate::frames::RefFrame;

impl Federate {
    /// Core job, before the numerical jobs of a cycle.
    ///
    /// Waits for the pending time grant, decodes everything received and
    /// applies a mode transition that has come due.
    pub fn pre_step(&mut self) -> Result<()> {
        let result = self.pre_step_inner();
        self.settle(result)
    }

    /// Core job, after the numerical jobs of a cycle.
    ///
    /// Sends owned attributes stamped `granted + lookahead`, runs the
    /// master's mode transition handling and requests the next advance.
    pub fn post_step(&mut self) -> Result<()> {
        let result = self.post_step_inner();
        self.settle(result)
    }

    /// Job run on every cycle while frozen.
    pub fn freeze_step(&mut self) -> Result<()> {
        let result = self.freeze_step_inner();
        self.settle(result)
    }

    /// Job run once on entry to freeze.
    pub fn freeze_init(&mut self) {
        log::info!(
            "[exec] {} frozen at scenario time {:.6}",
            self.config.federate_name,
            self.scenario_time()
        );
    }

    /// Hold the executive at the current simulation time.
    pub fn enter_freeze(&mut self) {
        self.executive.freeze_at(self.executive.sim_time());
    }

    /// Release the executive from freeze.
    pub fn exit_freeze(&mut self) {
        self.executive.run();
    }

    fn pre_step_inner(&mut self) -> Result<()> {
        if self.control.mode() != ExecutionMode::Running {
            return Ok(());
        }
        self.wait_for_grant()?;
        self.service_callbacks()?;
        self.handle_transition_announcements()?;
        self.run_due_transition()
    }

    fn post_step_inner(&mut self) -> Result<()> {
        if self.control.mode() != ExecutionMode::Running {
            return Ok(());
        }
        self.refresh_root_frame()?;
        let stamp = self
            .config
            .time_regulating
            .then(|| self.granted + self.config.lookahead);
        self.fom.send_owned(&self.rti, stamp)?;
        self.answer_provide_requests()?;

        if self.control.is_master() {
            self.master_control()?;
            if self.control.mode() == ExecutionMode::Shutdown {
                return Ok(());
            }
        }
        let next = self.granted + self.core_cycle();
        self.request_time_advance(next)
    }

    fn freeze_step_inner(&mut self) -> Result<()> {
        if self.control.mode() != ExecutionMode::Freeze {
            return Ok(());
        }
        self.service_callbacks()?;
        if self.control.is_master() {
            self.master_control()?;
            if self.control.mode() == ExecutionMode::Shutdown {
                return Ok(());
            }
        }
        self.handle_transition_announcements()?;
        self.run_due_transition()
    }

    /// Route a hook failure: a shutdown request ends the run cleanly,
    /// fatal and environment errors resign first, the rest is logged.
    fn settle(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => Ok(()),
            Err(Error::ShutdownRequested) => {
                log::info!(
                    "[exec] {} shutting down on request",
                    self.config.federate_name
                );
                if self.shared.sync_points().is_announced(SP_MTR_SHUTDOWN)
                    && !self.shared.sync_points().is_achieved(SP_MTR_SHUTDOWN)
                {
                    if let Err(e) = self.achieve(SP_MTR_SHUTDOWN) {
                        log::debug!("[sync] {}", e);
                    }
                }
                self.shutdown();
                Ok(())
            }
            Err(e) if e.is_fatal() || e.is_environment() => {
                log::error!("[exec] {}: {}", self.config.federate_name, e);
                self.shutdown();
                Err(e)
            }
            Err(e) => {
                log::warn!("[exec] {}: {}", self.config.federate_name, e);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Mode transitions
    // ------------------------------------------------------------------

    /// Schedule the transitions announced through `mtr_*` labels.
    fn handle_transition_announcements(&mut self) -> Result<()> {
        for label in self.shared.sync_points().pending_announced() {
            let Some(mode) = ExecutionMode::from_sync_point(&label) else {
                if !is_reserved_sync_point(&label)
                    && !self.config.multiphase_init_sync_points.contains(&label)
                {
                    self.achieve(&label)?;
                }
                continue;
            };
            if mode == ExecutionMode::Shutdown {
                if self.control.is_master() {
                    continue;
                }
                return Err(Error::ShutdownRequested);
            }
            if self.control.scheduled().is_some_and(|t| t.mode == mode) {
                continue;
            }
            if self.control.mode() == mode {
                // Already there (late joiner inside a hand-shake).
                self.achieve(&label)?;
                continue;
            }
            let transition = match self.control.transition_from_exco() {
                Some(t) if t.mode == mode => t,
                _ => {
                    log::warn!(
                        "[exec] '{}' announced without a matching ExCO, applying now",
                        label
                    );
                    ScheduledTransition {
                        mode,
                        scenario_time: self.scenario_time(),
                        cte_time: 0.0,
                    }
                }
            };
            log::info!(
                "[exec] {} scheduled {} at scenario time {:.6}",
                self.config.federate_name,
                mode,
                transition.scenario_time
            );
            self.control.schedule(transition);
        }
        Ok(())
    }

    fn run_due_transition(&mut self) -> Result<()> {
        if !self.control.is_due(self.scenario_time()) {
            return Ok(());
        }
        match self.control.scheduled() {
            Some(transition) => self.execute_transition(transition),
            None => Ok(()),
        }
    }

    /// Achieve the transition label, wait for the federation, then switch.
    pub(super) fn execute_transition(&mut self, transition: ScheduledTransition) -> Result<()> {
        if transition.mode == ExecutionMode::Shutdown {
            return Err(Error::ShutdownRequested);
        }
        if let Some(label) = transition.mode.sync_point() {
            self.achieve_and_wait(label)?;
        }
        self.control.clear_scheduled();
        match transition.mode {
            ExecutionMode::Running => {
                self.wait_for_cte(transition.cte_time)?;
                self.control.transition(ExecutionMode::Running)?;
                self.exit_freeze();
            }
            ExecutionMode::Freeze => {
                self.control.transition(ExecutionMode::Freeze)?;
                self.enter_freeze();
                self.freeze_init();
            }
            other => {
                return Err(Error::InvalidState(format!(
                    "no transition hand-shake into {}",
                    other
                )))
            }
        }
        if self.control.is_master() {
            self.send_exco()?;
        }
        Ok(())
    }

    /// Hold until the common timeline reaches `cte_time`.
    fn wait_for_cte(&mut self, cte_time: f64) -> Result<()> {
        let Some(clock) = self.cte.clone() else {
            return Ok(());
        };
        if cte_time <= 0.0 {
            return Ok(());
        }
        self.wait_until("CTE go time", |_| Ok(clock.now() >= cte_time))
    }

    /// Master: accept queued requests, publish the ExCO and register the
    /// transition label.
    fn master_control(&mut self) -> Result<()> {
        let now = self.scenario_time();
        let cte_now = self.cte.as_ref().map(|clock| clock.now());
        match self.control.process_requests(now, cte_now) {
            Some(transition) if transition.mode == ExecutionMode::Shutdown => self.master_shutdown(),
            Some(transition) => {
                self.send_exco()?;
                match transition.mode.sync_point() {
                    Some(label) => self.register_sync_point(label),
                    None => Ok(()),
                }
            }
            None => {
                if self.control.take_exco_dirty() {
                    self.send_exco()?;
                }
                Ok(())
            }
        }
    }

    /// Master: announce shutdown, give the federation the time padding to
    /// react, then resign.
    pub(super) fn master_shutdown(&mut self) -> Result<()> {
        self.send_exco()?;
        self.register_sync_point(SP_MTR_SHUTDOWN)?;
        let padding = self.control.time_padding().seconds().max(0.0);
        log::info!(
            "[exec] master shutting the federation down in {:.3}s",
            padding
        );
        std::thread::sleep(Duration::from_secs_f64(padding));
        self.shutdown();
        Ok(())
    }

    /// Refresh the published root frame from the frame state source.
    pub(super) fn refresh_root_frame(&mut self) -> Result<()> {
        let scenario_time = self.scenario_time();
        let Some(root) = self.root_frame.as_ref().filter(|r| r.publisher) else {
            return Ok(());
        };
        let Some(source) = self.frame_source.as_mut() else {
            return Ok(());
        };
        let name = root.binding.instance();
        let Some(kinematics) = source.frame_state(name, scenario_time) else {
            return Ok(());
        };
        let mut frame = self
            .frames
            .find(name)
            .cloned()
            .unwrap_or_else(|| RefFrame::root(name));
        frame.set_kinematics(&kinematics);
        root.binding.write(self.executive.as_ref(), &frame)?;
        self.frames.upsert_frame(frame);
        Ok(())
    }
}
