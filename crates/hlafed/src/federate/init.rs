// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SpaceFOM initialisation: role determination, early joiner and late
//! joiner sequences.

use super::{Federate, RootFrame, SpaceFomHandles};
use crate::config::{
    EXCO_ATTRIBUTES, EXCO_CLASS, EXCO_INSTANCE_NAME, MTR_EXECUTION_MODE_PARAMETER,
    MTR_INTERACTION_CLASS, SP_INITIALIZATION_COMPLETED, SP_INITIALIZATION_STARTED, SP_MTR_FREEZE,
    SP_MTR_RUN, SP_OBJECTS_DISCOVERED, SP_ROOT_FRAME_DISCOVERED,
};
use crate::error::{Error, Result};
use crate::exec::{ExecutionMode, Registration, ScheduledTransition};
use crate::federate::callbacks::ExcoBinding;
use crate::frames::{RefFrame, RefFrameBinding};

impl Federate {
    /// Join the federation and run the SpaceFOM initialisation up to the
    /// first RUNNING or FREEZE mode.
    ///
    /// On failure the federate resigns before the error is returned.
    pub fn initialize(&mut self) -> Result<()> {
        let result = self.initialize_federate();
        if let Err(e) = &result {
            log::error!(
                "[exec] {} initialization failed: {}",
                self.config.federate_name,
                e
            );
            self.shutdown();
        }
        result
    }

    fn initialize_federate(&mut self) -> Result<()> {
        self.join()?;
        self.control.transition(ExecutionMode::Initializing)?;
        self.declare_spacefom()?;

        let root_name = self.config.root_frame_name.clone();
        let publisher = self.config.publishes_root_frame;
        self.bind_root_frame(&root_name, publisher)?;
        self.fom.resolve_handles(&self.rti)?;

        if self.control.is_master() {
            self.wait_for_required_federates()?;
            self.register_initialization_sync_points()?;
        }

        let late = self.determine_late_joiner()?;
        self.control.set_late_joiner(late);
        if late {
            self.initialize_late()
        } else {
            self.initialize_early()
        }
    }

    fn join(&mut self) -> Result<()> {
        let ambassador = self.shared_ambassador();
        self.rti.call("connect", |r| r.connect(ambassador))?;

        let federation = self.config.federation_name.clone();
        let created = self.rti.call("create_federation_execution", |r| {
            r.create_federation_execution(&federation)
        })?;
        let master = self.config.preset_master.unwrap_or(created);
        self.control.set_master(master)?;
        self.control.lock_master();
        self.shared.set_master(master);

        let name = self.config.federate_name.clone();
        let federate_type = self.config.federate_type.clone();
        let handle = self.rti.call("join_federation_execution", |r| {
            r.join_federation_execution(&name, &federate_type, &federation)
        })?;
        self.joined = true;
        self.rti
            .call("enable_asynchronous_delivery", |r| r.enable_asynchronous_delivery())?;
        log::info!(
            "[exec] '{}' joined '{}' as {} ({})",
            name,
            federation,
            handle,
            if master { "master" } else { "member" }
        );
        Ok(())
    }

    /// Resolve and declare the ExCO object class and the mode transition
    /// request interaction.
    fn declare_spacefom(&mut self) -> Result<()> {
        let exco_class = self
            .rti
            .call("get_object_class_handle", |r| r.get_object_class_handle(EXCO_CLASS))?;
        let mut attributes = Vec::with_capacity(EXCO_ATTRIBUTES.len());
        for name in EXCO_ATTRIBUTES {
            let handle = self.rti.call("get_attribute_handle", |r| {
                r.get_attribute_handle(exco_class, name)
            })?;
            attributes.push((handle, name));
        }
        let binding = ExcoBinding {
            class: exco_class,
            attributes,
        };
        let exco_handles = binding.handles();
        self.shared.set_exco_binding(binding);

        let mtr_class = self.rti.call("get_interaction_class_handle", |r| {
            r.get_interaction_class_handle(MTR_INTERACTION_CLASS)
        })?;
        let mtr_parameter = self.rti.call("get_parameter_handle", |r| {
            r.get_parameter_handle(mtr_class, MTR_EXECUTION_MODE_PARAMETER)
        })?;

        if self.control.is_master() {
            self.rti.call("publish_object_class_attributes", |r| {
                r.publish_object_class_attributes(exco_class, &exco_handles)
            })?;
            self.rti.call("subscribe_interaction_class", |r| {
                r.subscribe_interaction_class(mtr_class)
            })?;
        } else {
            self.rti.call("subscribe_object_class_attributes", |r| {
                r.subscribe_object_class_attributes(exco_class, &exco_handles)
            })?;
            self.rti.call("publish_interaction_class", |r| {
                r.publish_interaction_class(mtr_class)
            })?;
        }

        self.spacefom = Some(SpaceFomHandles {
            exco_class,
            exco_instance: None,
            mtr_class,
            mtr_parameter,
        });
        Ok(())
    }

    /// Bind the root reference frame object, published or subscribed.
    fn bind_root_frame(&mut self, name: &str, publisher: bool) -> Result<()> {
        if name.is_empty() || self.root_frame.is_some() {
            return Ok(());
        }
        let binding = RefFrameBinding::new(name);
        let frame = RefFrame::root(name);
        binding.register_variables(self.executive.as_ref(), &frame);
        self.fom
            .add_object(&binding.object_config(publisher), self.executive.as_ref())?;
        if publisher {
            self.frames.upsert_frame(frame);
        }
        log::debug!(
            "[frames] root frame '{}' bound ({})",
            name,
            if publisher { "publisher" } else { "subscriber" }
        );
        self.root_frame = Some(RootFrame {
            binding,
            publisher,
            received: publisher,
        });
        Ok(())
    }

    /// Subscribe to the root frame named by the ExCO when the local
    /// configuration did not name one.
    fn attach_root_frame_from_exco(&mut self) -> Result<()> {
        let name = self.control.exco().root_frame_name.clone();
        if name.is_empty() || self.root_frame.is_some() {
            return Ok(());
        }
        self.bind_root_frame(&name, false)?;
        self.fom.resolve_handles(&self.rti)?;
        self.fom.publish_and_subscribe(&self.rti)
    }

    fn wait_for_required_federates(&mut self) -> Result<()> {
        let required: Vec<String> = self.config.required_federates().map(str::to_string).collect();
        if required.is_empty() {
            return Ok(());
        }
        log::info!("[exec] waiting for required federates {:?}", required);
        self.wait_until("required federates", |f| {
            let joined = f
                .rti
                .call("joined_federate_names", |r| r.joined_federate_names())?;
            Ok(required.iter().all(|name| joined.contains(name)))
        })
    }

    fn register_initialization_sync_points(&mut self) -> Result<()> {
        let mut labels: Vec<String> = [
            SP_INITIALIZATION_STARTED,
            SP_OBJECTS_DISCOVERED,
            SP_ROOT_FRAME_DISCOVERED,
        ]
        .iter()
        .map(|l| l.to_string())
        .collect();
        labels.extend(self.config.multiphase_init_sync_points.iter().cloned());

        for label in &labels {
            self.register_sync_point(label)?;
        }
        for label in &labels {
            self.wait_until("synchronization point registration", |f| {
                match f.shared.sync_points().registration(label) {
                    Some(Registration::Succeeded) => Ok(true),
                    Some(Registration::Failed(reason)) => Err(Error::SyncPointRegistrationFailed(
                        format!("{}: {}", label, reason),
                    )),
                    _ => Ok(false),
                }
            })?;
        }
        Ok(())
    }

    /// A non-master is late when `initialization_completed` was announced
    /// before `initialization_started`.
    fn determine_late_joiner(&mut self) -> Result<bool> {
        if self.control.is_master() {
            return Ok(false);
        }
        let mut late = None;
        self.wait_until("initialization announcement", |f| {
            let sync_points = f.shared.sync_points();
            late = match (
                sync_points.announce_order(SP_INITIALIZATION_STARTED),
                sync_points.announce_order(SP_INITIALIZATION_COMPLETED),
            ) {
                (Some(started), Some(completed)) => Some(completed < started),
                (Some(_), None) => Some(false),
                (None, Some(_)) => Some(true),
                (None, None) => None,
            };
            Ok(late.is_some())
        })?;
        Ok(late.unwrap_or(false))
    }

    // ------------------------------------------------------------------
    // Early joiners (including the master)
    // ------------------------------------------------------------------

    fn initialize_early(&mut self) -> Result<()> {
        log::info!("[exec] {} initializing as early joiner", self.config.federate_name);
        let early = [
            SP_INITIALIZATION_STARTED,
            SP_OBJECTS_DISCOVERED,
            SP_ROOT_FRAME_DISCOVERED,
        ];
        self.wait_until("initialization synchronization points", |f| {
            Ok(early
                .iter()
                .all(|label| f.shared.sync_points().is_announced(label)))
        })?;

        self.fom.publish_and_subscribe(&self.rti)?;
        self.reserve_and_register()?;
        self.wait_until("required objects", |f| Ok(f.fom.required_objects_discovered()))?;
        self.achieve_and_wait(SP_OBJECTS_DISCOVERED)?;

        if self.control.is_master() {
            let lcts = self.control.exco().least_common_time_step;
            self.executive.set_software_frame(lcts.seconds());
            self.send_exco()?;
        } else {
            self.wait_until("ExCO reflection", |f| Ok(f.exco_seen > 0))?;
            self.attach_root_frame_from_exco()?;
        }
        self.send_root_frame()?;
        self.wait_for_root_frame()?;
        self.achieve_and_wait(SP_ROOT_FRAME_DISCOVERED)?;

        for label in self.config.multiphase_init_sync_points.clone() {
            log::info!("[exec] multiphase initialization '{}'", label);
            if let Some(hook) = self.phase_hook.as_mut() {
                hook(label.as_str())?;
            }
            self.achieve_and_wait(&label)?;
        }

        self.enable_time_management()?;
        self.achieve_and_wait(SP_INITIALIZATION_STARTED)?;

        if self.control.is_master() {
            self.register_sync_point(SP_INITIALIZATION_COMPLETED)?;
            self.announce_first_mode()?;
            if self.control.mode() == ExecutionMode::Shutdown {
                return Err(Error::ShutdownRequested);
            }
        }
        self.enter_first_mode()
    }

    /// Reserve and register locally created instances (and the ExCO on the
    /// master).
    fn reserve_and_register(&mut self) -> Result<()> {
        let mut names = self.fom.reserve_names(&self.rti)?;
        let master = self.control.is_master();
        if master {
            self.rti.call("reserve_object_instance_name", |r| {
                r.reserve_object_instance_name(EXCO_INSTANCE_NAME)
            })?;
            names.push(EXCO_INSTANCE_NAME.to_string());
        }
        self.wait_until("object instance name reservations", |f| {
            Ok(names.iter().all(|name| f.shared.reservation(name).is_some()))
        })?;
        for name in &names {
            let success = self.shared.reservation(name).unwrap_or(false);
            if name == EXCO_INSTANCE_NAME {
                if !success {
                    return Err(Error::Config(format!(
                        "'{}' is already registered in the federation",
                        EXCO_INSTANCE_NAME
                    )));
                }
                continue;
            }
            self.fom.name_reserved(name, success)?;
        }

        if master {
            let handles = self
                .spacefom
                .as_mut()
                .ok_or_else(|| Error::InvalidState("SpaceFOM classes not declared".into()))?;
            let class = handles.exco_class;
            let instance = self.rti.call("register_object_instance", |r| {
                r.register_object_instance(class, EXCO_INSTANCE_NAME)
            })?;
            handles.exco_instance = Some(instance);
            self.shared.set_exco_instance(instance);
            log::debug!("[exco] registered as {}", instance);
        }
        self.fom.register_objects(&self.rti)?;
        self.track_ownership();
        Ok(())
    }

    /// Publish the root frame once, outside the regular cycle.
    fn send_root_frame(&mut self) -> Result<()> {
        if !self.root_frame.as_ref().is_some_and(|r| r.publisher) {
            return Ok(());
        }
        self.refresh_root_frame()?;
        let Some(root) = self.root_frame.as_ref() else {
            return Ok(());
        };
        let Some(object) = self.fom.object(root.binding.instance()) else {
            return Ok(());
        };
        let instance = object.instance().ok_or_else(|| {
            Error::InvalidState(format!("root frame '{}' not registered", object.instance_name()))
        })?;
        let handles = object.published_handles();
        self.fom.provide_update(&self.rti, instance, &handles)
    }

    fn wait_for_root_frame(&mut self) -> Result<()> {
        let Some(instance_name) = self
            .root_frame
            .as_ref()
            .filter(|r| !r.publisher)
            .map(|r| r.binding.instance().to_string())
        else {
            return Ok(());
        };
        let mut requested = false;
        self.wait_until("root frame reflection", |f| {
            if f.root_frame.as_ref().is_some_and(|r| r.received) {
                return Ok(true);
            }
            let discovered = f
                .fom
                .object(&instance_name)
                .and_then(|o| o.instance())
                .is_some();
            if discovered && !requested {
                f.fom.request_update(&f.rti, &instance_name)?;
                requested = true;
            }
            Ok(false)
        })
    }

    /// Master: pick RUNNING, or the pending request, publish it on the
    /// ExCO and register its synchronisation point.
    fn announce_first_mode(&mut self) -> Result<()> {
        let now = self.scenario_time();
        let cte_now = self.cte.as_ref().map(|clock| clock.now());
        let transition = match self.control.process_requests(now, cte_now) {
            Some(transition) => transition,
            None => {
                self.control.queue_request(ExecutionMode::Running);
                self.control
                    .process_requests(now, cte_now)
                    .ok_or_else(|| Error::InvalidState("run transition rejected".into()))?
            }
        };
        if transition.mode == ExecutionMode::Shutdown {
            return self.master_shutdown();
        }
        self.send_exco()?;
        if let Some(label) = transition.mode.sync_point() {
            self.register_sync_point(label)?;
        }
        Ok(())
    }

    /// Hand-shake into the first mode on `mtr_run` or `mtr_freeze`.
    fn enter_first_mode(&mut self) -> Result<()> {
        let mut announced = None;
        self.wait_until("run or freeze synchronization point", |f| {
            announced = [SP_MTR_RUN, SP_MTR_FREEZE]
                .into_iter()
                .find(|label| f.shared.sync_points().is_announced(label))
                .and_then(ExecutionMode::from_sync_point);
            Ok(announced.is_some())
        })?;
        let mode = announced.unwrap_or(ExecutionMode::Running);
        let transition = self
            .control
            .scheduled()
            .or_else(|| self.control.transition_from_exco())
            .filter(|t| t.mode == mode)
            .unwrap_or(ScheduledTransition {
                mode,
                scenario_time: self.scenario_time(),
                cte_time: 0.0,
            });
        self.execute_transition(transition)
    }

    // ------------------------------------------------------------------
    // Late joiners
    // ------------------------------------------------------------------

    fn initialize_late(&mut self) -> Result<()> {
        log::info!(
            "[exec] {} joining a running federation",
            self.config.federate_name
        );
        self.wait_until("ExCO discovery", |f| Ok(f.shared.exco_instance().is_some()))?;
        let instance = self.shared.exco_instance().ok_or(Error::MissingExco)?;
        let attributes = self
            .shared
            .exco_binding()
            .map(|b| b.handles())
            .ok_or(Error::MissingExco)?;
        self.rti.call("request_attribute_value_update", |r| {
            r.request_attribute_value_update(instance, &attributes, &[])
        })?;
        self.wait_until("ExCO reflection", |f| Ok(f.exco_seen > 0))?;

        self.attach_root_frame_from_exco()?;
        self.fom.publish_and_subscribe(&self.rti)?;
        self.reserve_and_register()?;
        self.wait_until("required objects", |f| Ok(f.fom.required_objects_discovered()))?;
        self.wait_for_root_frame()?;

        self.enable_time_management()?;
        self.align_to_federation_time()?;
        self.enter_exco_mode()
    }

    /// Jump to the first LCTS boundary at or past GALT and derive the
    /// scenario offset from the grant.
    fn align_to_federation_time(&mut self) -> Result<()> {
        let lcts = match self.control.exco().least_common_time_step {
            lcts if lcts.is_positive() => lcts,
            _ => self.config.least_common_time_step,
        };
        let galt = self.rti.call("query_galt", |r| r.query_galt())?;
        let base = galt.map_or(self.granted, |galt| galt.max(self.granted));
        let target = base.ceil_to_multiple(lcts);
        if target > self.granted {
            self.request_time_advance(target)?;
            self.wait_for_grant()?;
        }
        self.timeline
            .set_offset(self.granted.seconds() - self.executive.sim_time());
        log::info!(
            "[exec] {} aligned to {} (scenario {:.6}, offset {:.6})",
            self.config.federate_name,
            self.granted,
            self.scenario_time(),
            self.timeline.offset()
        );
        Ok(())
    }

    /// Enter the mode the ExCO reports, keeping any transition it
    /// announces for later.
    fn enter_exco_mode(&mut self) -> Result<()> {
        match self.control.exco().current_execution_mode {
            ExecutionMode::Running => {
                self.control.transition(ExecutionMode::Running)?;
                self.exit_freeze();
            }
            ExecutionMode::Freeze => {
                self.control.transition(ExecutionMode::Freeze)?;
                self.enter_freeze();
                self.freeze_init();
            }
            ExecutionMode::Shutdown => return Err(Error::ShutdownRequested),
            other => {
                return Err(Error::InvalidState(format!(
                    "federation reports mode {} to a late joiner",
                    other
                )))
            }
        }
        if let Some(transition) = self.control.transition_from_exco() {
            log::debug!(
                "[exec] late joiner keeps pending transition to {} at {:.6}",
                transition.mode,
                transition.scenario_time
            );
            self.control.schedule(transition);
        }
        Ok(())
    }
}
