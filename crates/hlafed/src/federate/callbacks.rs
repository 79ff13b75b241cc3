// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Federate ambassador.
//!
//! Runs on the RTI callback thread. Every callback only records what
//! happened (queues, flags, snapshots); the application thread consumes
//! the records from the pre/post step hooks and the initialisation waits.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::EXCO_INSTANCE_NAME;
use crate::error::Error;
use crate::exec::{ExecutionConfiguration, SyncPointManager};
use crate::queue::{AttributeItem, InteractionItem, ItemQueue};
use crate::rti::{
    AttributeHandle, AttributeValues, DeliveryInfo, FederateAmbassador, InteractionClassHandle,
    ObjectClassHandle, ObjectInstanceHandle, ParameterValues,
};
use crate::time::Int64Time;

/// Handles of the ExCO class and its attributes.
#[derive(Debug, Clone)]
pub(crate) struct ExcoBinding {
    pub class: ObjectClassHandle,
    pub attributes: Vec<(AttributeHandle, &'static str)>,
}

impl ExcoBinding {
    pub fn handles(&self) -> Vec<AttributeHandle> {
        self.attributes.iter().map(|(h, _)| *h).collect()
    }
}

type OwnershipKey = (ObjectInstanceHandle, AttributeHandle);

/// State shared between the RTI callback thread and the federate.
pub struct FederateShared {
    name: String,
    sync_points: SyncPointManager,
    attributes: ItemQueue<AttributeItem>,
    interactions: ItemQueue<InteractionItem>,

    discovered: DashMap<ObjectInstanceHandle, (ObjectClassHandle, String)>,
    removed: Mutex<Vec<ObjectInstanceHandle>>,
    reservations: DashMap<String, bool>,
    ownership: DashMap<OwnershipKey, Arc<AtomicBool>>,
    provide_requests: Mutex<Vec<(ObjectInstanceHandle, Vec<AttributeHandle>)>>,

    exco_binding: ArcSwapOption<ExcoBinding>,
    exco_instance: Mutex<Option<ObjectInstanceHandle>>,
    exco: ArcSwapOption<ExecutionConfiguration>,
    exco_sequence: AtomicU64,
    exco_update_requested: AtomicBool,
    master: AtomicBool,

    regulating: AtomicBool,
    constrained: AtomicBool,
    granted: AtomicBool,
    granted_time: AtomicI64,
    connection_lost: AtomicBool,
    foreign_exco: AtomicBool,
}

impl FederateShared {
    pub fn new(name: &str, queue_capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            sync_points: SyncPointManager::new(),
            attributes: ItemQueue::new("attribute queue", queue_capacity),
            interactions: ItemQueue::new("interaction queue", queue_capacity),
            discovered: DashMap::new(),
            removed: Mutex::new(Vec::new()),
            reservations: DashMap::new(),
            ownership: DashMap::new(),
            provide_requests: Mutex::new(Vec::new()),
            exco_binding: ArcSwapOption::empty(),
            exco_instance: Mutex::new(None),
            exco: ArcSwapOption::empty(),
            exco_sequence: AtomicU64::new(0),
            exco_update_requested: AtomicBool::new(false),
            master: AtomicBool::new(false),
            regulating: AtomicBool::new(false),
            constrained: AtomicBool::new(false),
            granted: AtomicBool::new(false),
            granted_time: AtomicI64::new(0),
            connection_lost: AtomicBool::new(false),
            foreign_exco: AtomicBool::new(false),
        }
    }

    pub fn sync_points(&self) -> &SyncPointManager {
        &self.sync_points
    }

    pub fn attribute_queue(&self) -> &ItemQueue<AttributeItem> {
        &self.attributes
    }

    pub fn interaction_queue(&self) -> &ItemQueue<InteractionItem> {
        &self.interactions
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Every discovered instance still present in the federation.
    pub fn discovered_instances(&self) -> Vec<(ObjectInstanceHandle, ObjectClassHandle, String)> {
        self.discovered
            .iter()
            .map(|entry| {
                let (class, name) = entry.value();
                (*entry.key(), *class, name.clone())
            })
            .collect()
    }

    pub fn take_removed(&self) -> Vec<ObjectInstanceHandle> {
        std::mem::take(&mut *self.removed.lock())
    }

    /// Outcome of a name reservation, `None` while pending.
    pub fn reservation(&self, name: &str) -> Option<bool> {
        self.reservations.get(name).map(|r| *r.value())
    }

    /// Share an attribute's ownership flag with the ownership callbacks.
    pub fn track_ownership(&self, key: OwnershipKey, flag: Arc<AtomicBool>) {
        self.ownership.insert(key, flag);
    }

    pub fn take_provide_requests(&self) -> Vec<(ObjectInstanceHandle, Vec<AttributeHandle>)> {
        std::mem::take(&mut *self.provide_requests.lock())
    }

    // ------------------------------------------------------------------
    // ExCO
    // ------------------------------------------------------------------

    pub(crate) fn set_exco_binding(&self, binding: ExcoBinding) {
        self.exco_binding.store(Some(Arc::new(binding)));
    }

    pub(crate) fn exco_binding(&self) -> Option<Arc<ExcoBinding>> {
        self.exco_binding.load_full()
    }

    pub fn exco_instance(&self) -> Option<ObjectInstanceHandle> {
        *self.exco_instance.lock()
    }

    pub fn set_exco_instance(&self, instance: ObjectInstanceHandle) {
        *self.exco_instance.lock() = Some(instance);
    }

    /// Latest reflected ExCO when newer than `seen`.
    pub fn exco_since(&self, seen: u64) -> Option<(u64, ExecutionConfiguration)> {
        let sequence = self.exco_sequence.load(Ordering::Acquire);
        if sequence <= seen {
            return None;
        }
        self.exco
            .load_full()
            .map(|exco| (sequence, ExecutionConfiguration::clone(&exco)))
    }

    pub fn take_exco_update_requested(&self) -> bool {
        self.exco_update_requested.swap(false, Ordering::AcqRel)
    }

    pub fn set_master(&self, master: bool) {
        self.master.store(master, Ordering::Release);
    }

    /// Whether an ExCO update reached this federate while it is master.
    pub fn is_foreign_exco_reflected(&self) -> bool {
        self.foreign_exco.load(Ordering::Acquire)
    }

    fn reflect_exco(&self, values: &AttributeValues) {
        if self.master.load(Ordering::Acquire) {
            log::error!("[exco] {}: {}", self.name, Error::ExcoNotFromMaster);
            self.foreign_exco.store(true, Ordering::Release);
            return;
        }
        let Some(binding) = self.exco_binding.load_full() else {
            return;
        };
        let mut exco = self
            .exco
            .load_full()
            .map(|current| ExecutionConfiguration::clone(&current))
            .unwrap_or_default();
        for (handle, bytes) in values {
            let Some((_, name)) = binding.attributes.iter().find(|(h, _)| h == handle) else {
                continue;
            };
            if let Err(e) = exco.apply_attribute(name, bytes) {
                log::warn!("[exco] '{}' skipped: {}", name, e);
            }
        }
        log::debug!(
            "[exco] reflected: current {} next {} at {:.6}",
            exco.current_execution_mode,
            exco.next_execution_mode,
            exco.next_mode_scenario_time
        );
        self.exco.store(Some(Arc::new(exco)));
        self.exco_sequence.fetch_add(1, Ordering::AcqRel);
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    pub fn is_regulating(&self) -> bool {
        self.regulating.load(Ordering::Acquire)
    }

    pub fn is_constrained(&self) -> bool {
        self.constrained.load(Ordering::Acquire)
    }

    /// Consume a time advance grant.
    pub fn take_grant(&self) -> Option<Int64Time> {
        self.granted
            .swap(false, Ordering::AcqRel)
            .then(|| Int64Time::from_base_units(self.granted_time.load(Ordering::Acquire)))
    }

    pub fn is_connection_lost(&self) -> bool {
        self.connection_lost.load(Ordering::Acquire)
    }

    fn set_ownership(&self, object: ObjectInstanceHandle, attributes: &[AttributeHandle], owned: bool) {
        for attribute in attributes {
            match self.ownership.get(&(object, *attribute)) {
                Some(flag) => flag.store(owned, Ordering::Release),
                None => log::debug!(
                    "[attr] ownership change for untracked {}/{}",
                    object,
                    attribute
                ),
            }
        }
    }
}

impl FederateAmbassador for FederateShared {
    fn synchronization_point_registration_succeeded(&self, label: &str) {
        self.sync_points.on_registration_succeeded(label);
    }

    fn synchronization_point_registration_failed(&self, label: &str, reason: &str) {
        self.sync_points.on_registration_failed(label, reason);
    }

    fn announce_synchronization_point(&self, label: &str, tag: &[u8]) {
        self.sync_points.on_announced(label, tag);
    }

    fn federation_synchronized(&self, label: &str) {
        self.sync_points.on_synchronized(label);
    }

    fn object_instance_name_reservation_succeeded(&self, name: &str) {
        log::debug!("[attr] name '{}' reserved", name);
        self.reservations.insert(name.to_string(), true);
    }

    fn object_instance_name_reservation_failed(&self, name: &str) {
        log::warn!("[attr] reservation of name '{}' failed", name);
        self.reservations.insert(name.to_string(), false);
    }

    fn discover_object_instance(
        &self,
        object: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: &str,
    ) {
        let is_exco = name == EXCO_INSTANCE_NAME
            && self
                .exco_binding
                .load()
                .as_ref()
                .is_some_and(|b| b.class == class);
        if is_exco {
            log::debug!("[exco] discovered as {}", object);
            self.set_exco_instance(object);
            return;
        }
        self.discovered.insert(object, (class, name.to_string()));
    }

    fn remove_object_instance(&self, object: ObjectInstanceHandle) {
        {
            let mut exco = self.exco_instance.lock();
            if *exco == Some(object) {
                log::warn!("[exco] instance removed");
                *exco = None;
                return;
            }
        }
        if self.discovered.remove(&object).is_some() {
            self.removed.lock().push(object);
        }
    }

    fn reflect_attribute_values(
        &self,
        object: ObjectInstanceHandle,
        values: &AttributeValues,
        tag: &[u8],
        info: DeliveryInfo,
    ) {
        if self.exco_instance() == Some(object) {
            self.reflect_exco(values);
            return;
        }
        if let Err(e) = self
            .attributes
            .push(AttributeItem::new(object, values, tag, info))
        {
            log::debug!("[queue] reflection of {} dropped: {}", object, e);
        }
    }

    fn receive_interaction(
        &self,
        class: InteractionClassHandle,
        parameters: &ParameterValues,
        tag: &[u8],
        info: DeliveryInfo,
    ) {
        if let Err(e) = self
            .interactions
            .push(InteractionItem::new(class, parameters, tag, info))
        {
            log::debug!("[queue] interaction {} dropped: {}", class, e);
        }
    }

    fn provide_attribute_value_update(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        _tag: &[u8],
    ) {
        if self.exco_instance() == Some(object) {
            self.exco_update_requested.store(true, Ordering::Release);
            return;
        }
        self.provide_requests
            .lock()
            .push((object, attributes.to_vec()));
    }

    fn attribute_ownership_acquisition_notification(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) {
        log::debug!("[attr] acquired {} attribute(s) of {}", attributes.len(), object);
        self.set_ownership(object, attributes, true);
    }

    fn request_attribute_ownership_release(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) {
        log::debug!("[attr] released {} attribute(s) of {}", attributes.len(), object);
        self.set_ownership(object, attributes, false);
    }

    fn time_regulation_enabled(&self, time: Int64Time) {
        log::debug!("[exec] {} time regulating at {}", self.name, time);
        self.granted_time.store(time.base_units(), Ordering::Release);
        self.regulating.store(true, Ordering::Release);
    }

    fn time_constrained_enabled(&self, time: Int64Time) {
        log::debug!("[exec] {} time constrained at {}", self.name, time);
        self.constrained.store(true, Ordering::Release);
    }

    fn time_advance_grant(&self, time: Int64Time) {
        self.granted_time.store(time.base_units(), Ordering::Release);
        self.granted.store(true, Ordering::Release);
    }

    fn connection_lost(&self, reason: &str) {
        log::error!("[rti] {} lost its connection: {}", self.name, reason);
        self.connection_lost.store(true, Ordering::Release);
    }
}
