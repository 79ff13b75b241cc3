// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The federate: binds one executive to one RTI connection and runs the
//! SpaceFOM execution control around the executive's core job.
//!
//! # Example
//!
//! ```ignore
//! let rti = LoopbackRti::new();
//! let exec = SimExecutive::shared(0.25);
//! let config = FederateConfig::builder("Artemis", "Lander").build()?;
//! let mut federate = Federate::new(config, rti.ambassador(), exec.clone())?;
//! federate.initialize()?;
//! while federate.run_cycle(&exec)? != ExecutionMode::Shutdown {}
//! ```

mod callbacks;
mod init;
mod step;

pub use callbacks::FederateShared;

use std::sync::Arc;

use crate::config::{is_reserved_sync_point, FederateConfig};
use crate::error::{Error, Result};
use crate::exec::{ExecutionConfiguration, ExecutionControl, ExecutionMode, WaitPolicy};
use crate::executive::{Executive, SimExecutive};
use crate::fom::FomManager;
use crate::frames::{self, FrameStateSource, PhysicalEntity, RefFrameBinding, RefFrameTree};
use crate::queue::{AttributeItem, InteractionItem};
use crate::rti::{
    AttributeValues, FederateAmbassador, InteractionClassHandle, ObjectClassHandle,
    ObjectInstanceHandle, ParameterHandle, RtiAmbassador, RtiHandle, TransportOrder,
};
use crate::time::{CteClock, Int64Interval, Int64Time, ScenarioTimeline, SystemCteClock};

/// Receives user interactions after their parameters were decoded.
pub trait InteractionHandler: Send {
    fn handle(&mut self, class_name: &str, item: &InteractionItem);
}

impl<F> InteractionHandler for F
where
    F: FnMut(&str, &InteractionItem) + Send,
{
    fn handle(&mut self, class_name: &str, item: &InteractionItem) {
        self(class_name, item)
    }
}

/// Hook run by early joiners before achieving each multiphase label.
pub type PhaseHook = Box<dyn FnMut(&str) -> Result<()> + Send>;

struct SpaceFomHandles {
    exco_class: ObjectClassHandle,
    exco_instance: Option<ObjectInstanceHandle>,
    mtr_class: InteractionClassHandle,
    mtr_parameter: ParameterHandle,
}

struct RootFrame {
    binding: RefFrameBinding,
    publisher: bool,
    received: bool,
}

/// One SpaceFOM federate.
pub struct Federate {
    config: FederateConfig,
    rti: RtiHandle,
    executive: Arc<dyn Executive>,
    shared: Arc<FederateShared>,
    control: ExecutionControl,
    fom: FomManager,
    timeline: ScenarioTimeline,
    cte: Option<Arc<dyn CteClock>>,
    wait: WaitPolicy,
    spacefom: Option<SpaceFomHandles>,
    root_frame: Option<RootFrame>,
    frames: RefFrameTree,
    frame_source: Option<Box<dyn FrameStateSource>>,
    interaction_handler: Option<Box<dyn InteractionHandler>>,
    phase_hook: Option<PhaseHook>,
    granted: Int64Time,
    advance_pending: bool,
    exco_seen: u64,
    joined: bool,
}

impl Federate {
    /// Bind the configured objects and interactions to `executive`.
    ///
    /// Nothing is sent to the RTI before [`Federate::initialize`].
    pub fn new(
        config: FederateConfig,
        rti: Arc<dyn RtiAmbassador>,
        executive: Arc<dyn Executive>,
    ) -> Result<Self> {
        config.validate()?;
        let fom = FomManager::initialize(&config, executive.as_ref())?;
        let shared = Arc::new(FederateShared::new(
            &config.federate_name,
            config.queue_capacity,
        ));
        let cte: Option<Arc<dyn CteClock>> = if config.cte_enabled {
            Some(Arc::new(SystemCteClock))
        } else {
            None
        };
        Ok(Self {
            rti: RtiHandle::new(rti, config.fpu_validate),
            control: ExecutionControl::new(&config),
            timeline: ScenarioTimeline::new(config.scenario_time_epoch),
            wait: WaitPolicy::new(config.wait_sleep, config.liveness_interval),
            config,
            executive,
            shared,
            fom,
            cte,
            spacefom: None,
            root_frame: None,
            frames: RefFrameTree::new(),
            frame_source: None,
            interaction_handler: None,
            phase_hook: None,
            granted: Int64Time::ZERO,
            advance_pending: false,
            exco_seen: 0,
            joined: false,
        })
    }

    /// Gate run transitions on `clock` instead of the system clock.
    pub fn with_cte_clock(mut self, clock: Arc<dyn CteClock>) -> Self {
        self.cte = Some(clock);
        self
    }

    pub fn set_interaction_handler(&mut self, handler: impl InteractionHandler + 'static) {
        self.interaction_handler = Some(Box::new(handler));
    }

    pub fn set_frame_source(&mut self, source: impl FrameStateSource + 'static) {
        self.frame_source = Some(Box::new(source));
    }

    pub fn set_phase_hook(&mut self, hook: impl FnMut(&str) -> Result<()> + Send + 'static) {
        self.phase_hook = Some(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &FederateConfig {
        &self.config
    }

    pub fn mode(&self) -> ExecutionMode {
        self.control.mode()
    }

    pub fn is_master(&self) -> bool {
        self.control.is_master()
    }

    pub fn is_late_joiner(&self) -> bool {
        self.control.is_late_joiner()
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Last granted HLA logical time.
    pub fn granted_time(&self) -> Int64Time {
        self.granted
    }

    /// Scenario time of the last grant.
    pub fn scenario_time(&self) -> f64 {
        self.timeline.scenario_from_hla(self.granted.seconds())
    }

    pub fn timeline(&self) -> ScenarioTimeline {
        self.timeline
    }

    /// ExCO as last published (master) or reflected (everyone else).
    pub fn exco(&self) -> &ExecutionConfiguration {
        self.control.exco()
    }

    pub fn fom(&self) -> &FomManager {
        &self.fom
    }

    pub fn frames(&self) -> &RefFrameTree {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut RefFrameTree {
        &mut self.frames
    }

    pub fn shared(&self) -> &Arc<FederateShared> {
        &self.shared
    }

    /// State of `entity` expressed in frame `express`.
    pub fn relative_state(&self, entity: &PhysicalEntity, express: &str) -> Result<PhysicalEntity> {
        frames::relative_state(&self.frames, entity, express)
    }

    /// Copy of the pending callback queues for a checkpoint.
    pub fn checkpoint_queues(&self) -> (Vec<AttributeItem>, Vec<InteractionItem>) {
        (
            self.shared.attribute_queue().checkpoint(),
            self.shared.interaction_queue().checkpoint(),
        )
    }

    /// Refill the callback queues from a checkpoint.
    pub fn restore_queues(&self, attributes: Vec<AttributeItem>, interactions: Vec<InteractionItem>) {
        self.shared.attribute_queue().restore(attributes);
        self.shared.interaction_queue().restore(interactions);
    }

    // ------------------------------------------------------------------
    // User services
    // ------------------------------------------------------------------

    /// Ask for a federation mode change.
    ///
    /// The master queues it for its next post step; everyone else sends a
    /// mode transition request to the master.
    pub fn request_mode_transition(&mut self, mode: ExecutionMode) -> Result<()> {
        self.control.mode().validate_request(mode)?;
        if self.control.is_master() {
            self.control.queue_request(mode);
            return Ok(());
        }
        let handles = self
            .spacefom
            .as_ref()
            .ok_or_else(|| Error::InvalidState("federate is not initialised".into()))?;
        let class = handles.mtr_class;
        let parameters = vec![(handles.mtr_parameter, crate::exec::encode_mtr(mode))];
        log::info!("[exec] {} requests mode {}", self.config.federate_name, mode);
        self.rti.call("send_interaction", |r| {
            r.send_interaction(class, parameters, &[], None)
        })
    }

    /// Unconditionally take over `attributes` of `instance_name`.
    pub fn acquire_ownership(&mut self, instance_name: &str, attributes: &[&str]) -> Result<()> {
        self.track_ownership();
        self.fom.acquire_ownership(&self.rti, instance_name, attributes)
    }

    /// Send the bound interaction `class_name`, time stamped when its
    /// preferred order is time-stamp and this federate regulates.
    pub fn send_interaction(&mut self, class_name: &str) -> Result<()> {
        let order = self
            .fom
            .interaction(class_name)
            .map(|i| i.order())
            .ok_or_else(|| Error::Config(format!("no interaction binding for {}", class_name)))?;
        let time = (order == TransportOrder::Timestamp && self.config.time_regulating)
            .then(|| self.granted + self.config.lookahead);
        self.fom.send_interaction(&self.rti, class_name, time)
    }

    /// Drive one core cycle of a [`SimExecutive`].
    ///
    /// Runs pre step, post step and one executive step while running, or
    /// one freeze step while frozen.
    pub fn run_cycle(&mut self, exec: &SimExecutive) -> Result<ExecutionMode> {
        match self.control.mode() {
            ExecutionMode::Running => {
                self.pre_step()?;
                if self.control.mode() == ExecutionMode::Running {
                    self.post_step()?;
                    exec.step();
                }
            }
            ExecutionMode::Freeze => {
                self.freeze_step()?;
                if self.control.mode() == ExecutionMode::Freeze {
                    std::thread::sleep(self.wait.sleep);
                }
            }
            _ => {}
        }
        Ok(self.control.mode())
    }

    /// Resign and stop the executive. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        if self.control.mode() != ExecutionMode::Shutdown {
            if let Err(e) = self.control.transition(ExecutionMode::Shutdown) {
                log::debug!("[exec] {}", e);
            }
        }
        if let Err(e) = self
            .rti
            .call("resign_federation_execution", |r| r.resign_federation_execution())
        {
            log::warn!("[exec] {} resign failed: {}", self.config.federate_name, e);
        }
        let federation = self.config.federation_name.clone();
        match self.rti.call("destroy_federation_execution", |r| {
            r.destroy_federation_execution(&federation)
        }) {
            Ok(true) => log::info!("[exec] federation '{}' destroyed", federation),
            Ok(false) => log::debug!("[exec] federation '{}' still has members", federation),
            Err(e) => log::debug!("[exec] destroy of '{}' failed: {}", federation, e),
        }
        self.executive.stop();
        log::info!("[exec] {} shut down", self.config.federate_name);
    }

    // ------------------------------------------------------------------
    // Callback servicing
    // ------------------------------------------------------------------

    /// Consume everything the callback thread recorded.
    fn service_callbacks(&mut self) -> Result<()> {
        self.check_connection()?;
        self.check_exco_source()?;
        self.bind_discoveries();
        self.adopt_reflected_exco();
        self.drain_attributes()?;
        self.drain_interactions()?;
        self.answer_provide_requests()
    }

    fn check_connection(&self) -> Result<()> {
        if self.shared.is_connection_lost() {
            return Err(Error::FederationMembershipLost);
        }
        Ok(())
    }

    /// A master must never see another federate's ExCO.
    fn check_exco_source(&self) -> Result<()> {
        if self.shared.is_foreign_exco_reflected() {
            return Err(Error::ExcoNotFromMaster);
        }
        Ok(())
    }

    fn bind_discoveries(&mut self) {
        for instance in self.shared.take_removed() {
            if self.fom.unbind_removed(instance) {
                log::info!("[attr] instance {} removed from the federation", instance);
                if let Some(root) = self.root_frame.as_mut().filter(|r| !r.publisher) {
                    if self.fom.object(root.binding.instance()).and_then(|o| o.instance()).is_none() {
                        root.received = false;
                    }
                }
            }
        }
        let mut bound = false;
        for (instance, class, name) in self.shared.discovered_instances() {
            if self.fom.find_instance(instance).is_some() {
                continue;
            }
            bound |= self.fom.bind_discovered(instance, class, &name);
        }
        if bound {
            self.track_ownership();
        }
    }

    /// Share the ownership flags of every bound instance with the
    /// callback side.
    fn track_ownership(&self) {
        for object in self.fom.objects() {
            for (key, flag) in object.ownership_flags() {
                self.shared.track_ownership(key, flag);
            }
        }
    }

    fn adopt_reflected_exco(&mut self) -> bool {
        if self.control.is_master() {
            return false;
        }
        let Some((sequence, exco)) = self.shared.exco_since(self.exco_seen) else {
            return false;
        };
        self.exco_seen = sequence;
        exco.reconcile_on_receive(self.config.lookahead, self.executive.as_ref());
        if exco.scenario_time_epoch != self.timeline.epoch() {
            log::info!(
                "[exco] scenario epoch {:.6} -> {:.6}",
                self.timeline.epoch(),
                exco.scenario_time_epoch
            );
            self.timeline.set_epoch(exco.scenario_time_epoch);
        }
        self.control.adopt_exco(exco);
        true
    }

    fn drain_attributes(&mut self) -> Result<()> {
        for item in self.shared.attribute_queue().drain() {
            self.fom.reflect(&item, self.executive.as_ref())?;
        }
        let Some(root) = self.root_frame.as_mut().filter(|r| !r.publisher) else {
            return Ok(());
        };
        let changed = self
            .fom
            .object_mut(root.binding.instance())
            .is_some_and(|o| !o.take_changed().is_empty());
        if changed {
            match root.binding.read(self.executive.as_ref()) {
                Ok(frame) => {
                    if !root.received {
                        log::info!("[frames] root frame '{}' reflected", frame.name);
                    }
                    self.frames.upsert_frame(frame);
                    root.received = true;
                }
                Err(e) => log::warn!("[frames] root frame reflection skipped: {}", e),
            }
        }
        Ok(())
    }

    fn drain_interactions(&mut self) -> Result<()> {
        let mtr_class = self.spacefom.as_ref().map(|h| h.mtr_class);
        for item in self.shared.interaction_queue().drain() {
            if Some(item.class) == mtr_class {
                self.receive_mtr(&item);
                continue;
            }
            let class_name = self
                .fom
                .receive_interaction(&item, self.executive.as_ref())?
                .map(str::to_string);
            match (class_name, self.interaction_handler.as_mut()) {
                (Some(name), Some(handler)) => handler.handle(&name, &item),
                (Some(_), None) => {}
                (None, _) => log::debug!("[attr] interaction {} has no binding", item.class),
            }
        }
        Ok(())
    }

    fn receive_mtr(&mut self, item: &InteractionItem) {
        if !self.control.is_master() {
            return;
        }
        let Some(parameter) = self.spacefom.as_ref().map(|h| h.mtr_parameter) else {
            return;
        };
        let Some(bytes) = item.parameter(parameter) else {
            log::warn!("[exec] mode transition request without execution_mode");
            return;
        };
        match crate::exec::decode_mtr(bytes) {
            Ok(mode) => self.control.queue_request(mode),
            Err(e) => log::warn!("[exec] dropped mode transition request: {}", e),
        }
    }

    fn answer_provide_requests(&mut self) -> Result<()> {
        if self.shared.take_exco_update_requested() && self.control.is_master() {
            self.send_exco()?;
        }
        for (instance, attributes) in self.shared.take_provide_requests() {
            self.fom.provide_update(&self.rti, instance, &attributes)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // ExCO and synchronisation points
    // ------------------------------------------------------------------

    /// Send every ExCO attribute (master only).
    fn send_exco(&mut self) -> Result<()> {
        let instance = self
            .spacefom
            .as_ref()
            .and_then(|h| h.exco_instance)
            .ok_or(Error::MissingExco)?;
        let binding = self.shared.exco_binding().ok_or(Error::MissingExco)?;
        let exco = self.control.exco();
        exco.validate_for_send(self.config.lookahead, self.executive.software_frame())?;

        let mut values = AttributeValues::with_capacity(binding.attributes.len());
        for (handle, name) in &binding.attributes {
            let bytes = exco.encode_attribute(name).map_err(|source| Error::Codec {
                fom_name: name.to_string(),
                source,
            })?;
            values.push((*handle, bytes));
        }
        log::debug!(
            "[exco] sending: current {} next {} at {:.6}",
            exco.current_execution_mode,
            exco.next_execution_mode,
            exco.next_mode_scenario_time
        );
        self.rti.call("update_attribute_values", |r| {
            r.update_attribute_values(instance, values, &[], None)
        })?;
        self.control.take_exco_dirty();
        Ok(())
    }

    fn register_sync_point(&self, label: &str) -> Result<()> {
        self.shared.sync_points().mark_registration_requested(label);
        self.rti.call("register_federation_synchronization_point", |r| {
            r.register_federation_synchronization_point(label, &[])
        })
    }

    fn achieve(&self, label: &str) -> Result<()> {
        log::debug!("[sync] {} achieving '{}'", self.config.federate_name, label);
        self.rti.call("synchronization_point_achieved", |r| {
            r.synchronization_point_achieved(label)
        })?;
        self.shared.sync_points().mark_achieved(label);
        Ok(())
    }

    /// Achieve announced labels nobody in this federate uses.
    fn achieve_unknown_sync_points(&self) -> Result<()> {
        for label in self.shared.sync_points().pending_announced() {
            if is_reserved_sync_point(&label)
                || self.config.multiphase_init_sync_points.contains(&label)
            {
                continue;
            }
            log::debug!("[sync] achieving unknown label '{}'", label);
            self.achieve(&label)?;
        }
        Ok(())
    }

    fn shutdown_announced(&self) -> bool {
        let sync_points = self.shared.sync_points();
        !self.control.is_master()
            && sync_points.is_announced(crate::config::SP_MTR_SHUTDOWN)
            && !sync_points.is_achieved(crate::config::SP_MTR_SHUTDOWN)
    }

    /// Poll `ready` until it holds, servicing callbacks between polls.
    ///
    /// Aborts on a shutdown announcement and on loss of membership.
    fn wait_until<F>(&mut self, what: &str, mut ready: F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<bool>,
    {
        let policy = self.wait;
        policy.wait(what, |tick| {
            if tick.check_liveness && !self.rti.is_joined() {
                return Err(Error::FederationMembershipLost);
            }
            self.service_callbacks()?;
            self.achieve_unknown_sync_points()?;
            if self.shutdown_announced() {
                return Err(Error::ShutdownRequested);
            }
            ready(self)
        })
    }

    fn wait_for_sync(&mut self, label: &str) -> Result<()> {
        self.wait_until(label, |f| Ok(f.shared.sync_points().is_synchronized(label)))
    }

    /// Wait for `label` to be announced, achieve it and wait for the
    /// federation to synchronise on it.
    fn achieve_and_wait(&mut self, label: &str) -> Result<()> {
        if !self.shared.sync_points().is_announced(label) {
            self.wait_until(label, |f| Ok(f.shared.sync_points().is_announced(label)))?;
        }
        if !self.shared.sync_points().is_achieved(label) {
            self.achieve(label)?;
        }
        self.wait_for_sync(label)
    }

    // ------------------------------------------------------------------
    // Time management
    // ------------------------------------------------------------------

    fn enable_time_management(&mut self) -> Result<()> {
        if self.config.time_regulating {
            let lookahead = self.config.lookahead;
            self.rti.call("enable_time_regulation", |r| {
                r.enable_time_regulation(lookahead)
            })?;
            self.wait_until("time regulation", |f| Ok(f.shared.is_regulating()))?;
        }
        if self.config.time_constrained {
            self.rti
                .call("enable_time_constrained", |r| r.enable_time_constrained())?;
            self.wait_until("time constrained", |f| Ok(f.shared.is_constrained()))?;
        }
        self.granted = self
            .rti
            .call("query_logical_time", |r| r.query_logical_time())?;
        log::info!(
            "[exec] {} time management enabled at {}",
            self.config.federate_name,
            self.granted
        );
        Ok(())
    }

    fn request_time_advance(&mut self, time: Int64Time) -> Result<()> {
        self.rti
            .call("time_advance_request", |r| r.time_advance_request(time))?;
        self.advance_pending = true;
        Ok(())
    }

    fn wait_for_grant(&mut self) -> Result<()> {
        if !self.advance_pending {
            return Ok(());
        }
        let policy = self.wait;
        policy.wait("time advance grant", |tick| {
            if tick.check_liveness && !self.rti.is_joined() {
                return Err(Error::FederationMembershipLost);
            }
            self.check_connection()?;
            self.check_exco_source()?;
            self.achieve_unknown_sync_points()?;
            if self.shutdown_announced() {
                return Err(Error::ShutdownRequested);
            }
            Ok(match self.shared.take_grant() {
                Some(time) => {
                    self.granted = time;
                    true
                }
                None => false,
            })
        })?;
        self.advance_pending = false;
        Ok(())
    }

    fn core_cycle(&self) -> Int64Interval {
        Int64Interval::from_seconds(self.executive.core_cycle())
    }

    fn shared_ambassador(&self) -> Arc<dyn FederateAmbassador> {
        Arc::clone(&self.shared) as Arc<dyn FederateAmbassador>
    }
}

impl Drop for Federate {
    fn drop(&mut self) {
        self.shutdown();
    }
}
