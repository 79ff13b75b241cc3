// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Intra-process RTI.
//!
//! # Architecture
//!
//! ```text
//! LoopbackRti (cloneable, one per process or per test)
//! +-- bus: Mutex<Bus>
//!     +-- federations: HashMap<name, Federation>
//!         +-- members: BTreeMap<FederateHandle, Member>
//!         |   +-- sender: crossbeam Sender<Callback>  -> dispatcher thread
//!         |   +-- pending_tso: BTreeMap<(stamp, seq), Callback>
//!         +-- sync_points, reserved names, objects, handle tables
//! ```
//!
//! Every federate gets its own dispatcher thread that invokes the
//! [`FederateAmbassador`] outside the bus lock, so callbacks may call back
//! into the RTI.
//!
//! # Time management
//!
//! Conservative: a constrained federate's request for `t` is granted once
//! `t < GALT`, where GALT is the least `(requested or current time) +
//! lookahead` over the other regulating federates. Time-stamped messages
//! for a constrained receiver are held and released in stamp order just
//! before the grant that reaches them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use super::ambassador::{FederateAmbassador, RtiAmbassador};
use super::{
    AttributeHandle, AttributeValues, DeliveryInfo, FederateHandle, InteractionClassHandle,
    ObjectClassHandle, ObjectInstanceHandle, ParameterHandle, ParameterValues, TransportOrder,
};
use crate::error::{Error, Result};
use crate::time::{Int64Interval, Int64Time};

/// Callback queued for a federate's dispatcher thread.
enum Callback {
    RegistrationSucceeded(String),
    RegistrationFailed(String, String),
    Announce(String, Vec<u8>),
    Synchronized(String),
    NameReserved(String),
    NameReservationFailed(String),
    Discover(ObjectInstanceHandle, ObjectClassHandle, String),
    Remove(ObjectInstanceHandle),
    Reflect(ObjectInstanceHandle, AttributeValues, Vec<u8>, DeliveryInfo),
    Interaction(InteractionClassHandle, ParameterValues, Vec<u8>, DeliveryInfo),
    ProvideUpdate(ObjectInstanceHandle, Vec<AttributeHandle>, Vec<u8>),
    OwnershipAcquired(ObjectInstanceHandle, Vec<AttributeHandle>),
    OwnershipReleased(ObjectInstanceHandle, Vec<AttributeHandle>),
    RegulationEnabled(Int64Time),
    ConstrainedEnabled(Int64Time),
    Grant(Int64Time),
    ConnectionLost(String),
}

fn dispatch(ambassador: &dyn FederateAmbassador, callback: Callback) {
    match callback {
        Callback::RegistrationSucceeded(label) => {
            ambassador.synchronization_point_registration_succeeded(&label)
        }
        Callback::RegistrationFailed(label, reason) => {
            ambassador.synchronization_point_registration_failed(&label, &reason)
        }
        Callback::Announce(label, tag) => ambassador.announce_synchronization_point(&label, &tag),
        Callback::Synchronized(label) => ambassador.federation_synchronized(&label),
        Callback::NameReserved(name) => {
            ambassador.object_instance_name_reservation_succeeded(&name)
        }
        Callback::NameReservationFailed(name) => {
            ambassador.object_instance_name_reservation_failed(&name)
        }
        Callback::Discover(object, class, name) => {
            ambassador.discover_object_instance(object, class, &name)
        }
        Callback::Remove(object) => ambassador.remove_object_instance(object),
        Callback::Reflect(object, values, tag, info) => {
            ambassador.reflect_attribute_values(object, &values, &tag, info)
        }
        Callback::Interaction(class, params, tag, info) => {
            ambassador.receive_interaction(class, &params, &tag, info)
        }
        Callback::ProvideUpdate(object, attrs, tag) => {
            ambassador.provide_attribute_value_update(object, &attrs, &tag)
        }
        Callback::OwnershipAcquired(object, attrs) => {
            ambassador.attribute_ownership_acquisition_notification(object, &attrs)
        }
        Callback::OwnershipReleased(object, attrs) => {
            ambassador.request_attribute_ownership_release(object, &attrs)
        }
        Callback::RegulationEnabled(time) => ambassador.time_regulation_enabled(time),
        Callback::ConstrainedEnabled(time) => ambassador.time_constrained_enabled(time),
        Callback::Grant(time) => ambassador.time_advance_grant(time),
        Callback::ConnectionLost(reason) => ambassador.connection_lost(&reason),
    }
}

// ============================================================================
// Federation state
// ============================================================================

struct Member {
    name: String,
    sender: Sender<Callback>,
    published: HashSet<(ObjectClassHandle, AttributeHandle)>,
    subscribed: HashMap<ObjectClassHandle, HashSet<AttributeHandle>>,
    subscribed_interactions: HashSet<InteractionClassHandle>,
    discovered: HashSet<ObjectInstanceHandle>,
    regulating: bool,
    constrained: bool,
    lookahead: Int64Interval,
    time: Int64Time,
    requested: Option<Int64Time>,
    pending_tso: BTreeMap<(Int64Time, u64), Callback>,
}

impl Member {
    fn send(&self, callback: Callback) {
        // Dispatcher gone means the federate is tearing down.
        let _ = self.sender.send(callback);
    }

    /// Least time stamp this federate may still send.
    fn lbts(&self) -> Int64Time {
        self.requested.unwrap_or(self.time) + self.lookahead
    }
}

struct PendingSyncPoint {
    label: String,
    tag: Vec<u8>,
    participants: BTreeSet<FederateHandle>,
    waiting: BTreeSet<FederateHandle>,
}

struct ObjectRecord {
    class: ObjectClassHandle,
    name: String,
    registrant: FederateHandle,
    owners: HashMap<AttributeHandle, FederateHandle>,
}

#[derive(Default)]
struct Federation {
    members: BTreeMap<FederateHandle, Member>,
    next_federate: u32,
    object_classes: HashMap<String, ObjectClassHandle>,
    attributes: HashMap<(ObjectClassHandle, String), AttributeHandle>,
    interaction_classes: HashMap<String, InteractionClassHandle>,
    parameters: HashMap<(InteractionClassHandle, String), ParameterHandle>,
    next_class: u32,
    next_attribute: u32,
    next_parameter: u32,
    sync_points: Vec<PendingSyncPoint>,
    reserved_names: HashMap<String, FederateHandle>,
    objects: BTreeMap<ObjectInstanceHandle, ObjectRecord>,
    next_object: u64,
    next_seq: u64,
}

impl Federation {
    fn member(&self, handle: FederateHandle) -> Result<&Member> {
        self.members
            .get(&handle)
            .ok_or_else(|| Error::Rti("federate is not joined".into()))
    }

    fn send(&self, handle: FederateHandle, callback: Callback) {
        if let Some(member) = self.members.get(&handle) {
            member.send(callback);
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // ------------------------------------------------------------------
    // Synchronisation points
    // ------------------------------------------------------------------

    fn complete_sync_points(&mut self) {
        let (done, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sync_points)
            .into_iter()
            .partition(|point| point.waiting.is_empty());
        self.sync_points = pending;
        for point in done {
            log::debug!("[loopback] federation synchronized on '{}'", point.label);
            for handle in &point.participants {
                self.send(*handle, Callback::Synchronized(point.label.clone()));
            }
        }
    }

    // ------------------------------------------------------------------
    // Time management
    // ------------------------------------------------------------------

    fn galt_for(&self, handle: FederateHandle) -> Option<Int64Time> {
        self.members
            .iter()
            .filter(|(other, member)| **other != handle && member.regulating)
            .map(|(_, member)| member.lbts())
            .min()
    }

    fn process_time_advances(&mut self) {
        loop {
            let ready: Vec<(FederateHandle, Int64Time)> = self
                .members
                .iter()
                .filter_map(|(handle, member)| {
                    let requested = member.requested?;
                    let unblocked = !member.constrained
                        || self.galt_for(*handle).map_or(true, |galt| requested < galt);
                    unblocked.then_some((*handle, requested))
                })
                .collect();
            if ready.is_empty() {
                break;
            }
            for (handle, time) in ready {
                self.grant(handle, time);
            }
        }
    }

    fn grant(&mut self, handle: FederateHandle, time: Int64Time) {
        let Some(member) = self.members.get_mut(&handle) else {
            return;
        };
        let later = member
            .pending_tso
            .split_off(&(time + Int64Interval::from_base_units(1), 0));
        let due = std::mem::replace(&mut member.pending_tso, later);
        for (_, callback) in due {
            member.send(callback);
        }
        member.time = time;
        member.requested = None;
        member.send(Callback::Grant(time));
    }

    /// Route an update or interaction to `receivers`, holding time-stamped
    /// messages for constrained receivers.
    fn route(
        &mut self,
        sender: FederateHandle,
        time: Option<Int64Time>,
        deliveries: Vec<(FederateHandle, Box<dyn FnOnce(DeliveryInfo) -> Callback>)>,
    ) -> Result<()> {
        let sender_member = self.member(sender)?;
        let stamp = match time {
            Some(stamp) if sender_member.regulating => {
                let earliest = sender_member.lbts();
                if stamp < earliest {
                    return Err(Error::Rti(format!(
                        "invalid logical time {} (earliest allowed {})",
                        stamp, earliest
                    )));
                }
                Some(stamp)
            }
            _ => None,
        };

        for (receiver, build) in deliveries {
            let seq = self.next_seq();
            let Some(member) = self.members.get_mut(&receiver) else {
                continue;
            };
            match stamp {
                Some(stamp) if member.constrained => {
                    let info = DeliveryInfo {
                        order: TransportOrder::Timestamp,
                        time: Some(stamp),
                        producer: sender,
                    };
                    member.pending_tso.insert((stamp, seq), build(info));
                }
                _ => {
                    let info = DeliveryInfo {
                        order: TransportOrder::Receive,
                        time,
                        producer: sender,
                    };
                    member.send(build(info));
                }
            }
        }
        Ok(())
    }

    fn remove_member(&mut self, handle: FederateHandle) -> Option<Member> {
        let member = self.members.remove(&handle)?;

        for point in &mut self.sync_points {
            point.participants.remove(&handle);
            point.waiting.remove(&handle);
        }
        self.complete_sync_points();

        let owned: Vec<ObjectInstanceHandle> = self
            .objects
            .iter()
            .filter(|(_, record)| record.registrant == handle)
            .map(|(object, _)| *object)
            .collect();
        for object in owned {
            self.objects.remove(&object);
            for other in self.members.values_mut() {
                if other.discovered.remove(&object) {
                    other.send(Callback::Remove(object));
                }
            }
        }
        for record in self.objects.values_mut() {
            record.owners.retain(|_, owner| *owner != handle);
        }
        self.reserved_names.retain(|_, owner| *owner != handle);

        self.process_time_advances();
        Some(member)
    }
}

#[derive(Default)]
struct Bus {
    federations: HashMap<String, Federation>,
}

// ============================================================================
// Public entry points
// ============================================================================

/// In-process RTI shared by every federate created from it.
#[derive(Clone, Default)]
pub struct LoopbackRti {
    bus: Arc<Mutex<Bus>>,
}

impl LoopbackRti {
    pub fn new() -> Self {
        Self::default()
    }

    /// New unconnected ambassador for one federate.
    pub fn ambassador(&self) -> Arc<LoopbackAmbassador> {
        Arc::new(LoopbackAmbassador {
            bus: Arc::clone(&self.bus),
            callbacks: Mutex::new(None),
            session: Mutex::new(None),
        })
    }

    pub fn federation_exists(&self, federation: &str) -> bool {
        self.bus.lock().federations.contains_key(federation)
    }

    /// Names of the federates joined to `federation`.
    pub fn joined_federates(&self, federation: &str) -> Vec<String> {
        self.bus
            .lock()
            .federations
            .get(federation)
            .map(|fed| fed.members.values().map(|m| m.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Current logical time of a joined federate.
    pub fn logical_time(&self, federation: &str, federate: &str) -> Option<Int64Time> {
        let bus = self.bus.lock();
        let fed = bus.federations.get(federation)?;
        fed.members
            .values()
            .find(|m| m.name == federate)
            .map(|m| m.time)
    }

    /// Drop a federate from its federation as if its connection failed.
    ///
    /// Returns `false` when no such federate is joined.
    pub fn disconnect_federate(&self, federation: &str, federate: &str) -> bool {
        let mut bus = self.bus.lock();
        let Some(fed) = bus.federations.get_mut(federation) else {
            return false;
        };
        let Some(handle) = fed
            .members
            .iter()
            .find(|(_, m)| m.name == federate)
            .map(|(h, _)| *h)
        else {
            return false;
        };
        if let Some(member) = fed.remove_member(handle) {
            log::debug!("[loopback] disconnected '{}' from '{}'", federate, federation);
            member.send(Callback::ConnectionLost("connection dropped".into()));
        }
        true
    }
}

#[derive(Clone)]
struct Session {
    federation: String,
    handle: FederateHandle,
}

/// One federate's view of a [`LoopbackRti`].
pub struct LoopbackAmbassador {
    bus: Arc<Mutex<Bus>>,
    callbacks: Mutex<Option<Arc<dyn FederateAmbassador>>>,
    session: Mutex<Option<Session>>,
}

impl LoopbackAmbassador {
    fn with_federation<T>(
        &self,
        f: impl FnOnce(&mut Federation, FederateHandle) -> Result<T>,
    ) -> Result<T> {
        let session = self
            .session
            .lock()
            .clone()
            .ok_or_else(|| Error::Rti("federate is not joined".into()))?;
        let mut bus = self.bus.lock();
        let fed = bus
            .federations
            .get_mut(&session.federation)
            .ok_or(Error::FederationMembershipLost)?;
        if !fed.members.contains_key(&session.handle) {
            return Err(Error::FederationMembershipLost);
        }
        f(fed, session.handle)
    }

    fn spawn_dispatcher(
        name: &str,
        ambassador: Arc<dyn FederateAmbassador>,
        receiver: Receiver<Callback>,
    ) -> Result<()> {
        thread::Builder::new()
            .name(format!("hlafed-cb-{}", name))
            .spawn(move || {
                for callback in receiver.iter() {
                    dispatch(ambassador.as_ref(), callback);
                }
            })
            .map(|_| ())
            .map_err(|e| Error::Rti(format!("failed to spawn callback thread: {}", e)))
    }
}

impl RtiAmbassador for LoopbackAmbassador {
    fn connect(&self, ambassador: Arc<dyn FederateAmbassador>) -> Result<()> {
        *self.callbacks.lock() = Some(ambassador);
        Ok(())
    }

    fn create_federation_execution(&self, federation: &str) -> Result<bool> {
        let mut bus = self.bus.lock();
        if bus.federations.contains_key(federation) {
            return Ok(false);
        }
        bus.federations
            .insert(federation.to_string(), Federation::default());
        log::debug!("[loopback] created federation '{}'", federation);
        Ok(true)
    }

    fn join_federation_execution(
        &self,
        federate_name: &str,
        federate_type: &str,
        federation: &str,
    ) -> Result<FederateHandle> {
        let ambassador = self
            .callbacks
            .lock()
            .clone()
            .ok_or_else(|| Error::Rti("not connected".into()))?;
        if self.session.lock().is_some() {
            return Err(Error::Rti("federate already joined".into()));
        }

        let mut bus = self.bus.lock();
        let fed = bus.federations.get_mut(federation).ok_or_else(|| {
            Error::Rti(format!("federation execution '{}' does not exist", federation))
        })?;
        if fed.members.values().any(|m| m.name == federate_name) {
            return Err(Error::Rti(format!(
                "federate name '{}' already in use",
                federate_name
            )));
        }

        let (sender, receiver) = channel::unbounded();
        Self::spawn_dispatcher(federate_name, ambassador, receiver)?;

        fed.next_federate += 1;
        let handle = FederateHandle(fed.next_federate);
        let member = Member {
            name: federate_name.to_string(),
            sender,
            published: HashSet::new(),
            subscribed: HashMap::new(),
            subscribed_interactions: HashSet::new(),
            discovered: HashSet::new(),
            regulating: false,
            constrained: false,
            lookahead: Int64Interval::ZERO,
            time: Int64Time::ZERO,
            requested: None,
            pending_tso: BTreeMap::new(),
        };

        // Points still pending are announced to the new member as well.
        for point in &mut fed.sync_points {
            point.participants.insert(handle);
            point.waiting.insert(handle);
            member.send(Callback::Announce(point.label.clone(), point.tag.clone()));
        }
        fed.members.insert(handle, member);

        *self.session.lock() = Some(Session {
            federation: federation.to_string(),
            handle,
        });
        log::debug!(
            "[loopback] '{}' ({}) joined '{}' as {}",
            federate_name,
            federate_type,
            federation,
            handle
        );
        Ok(handle)
    }

    fn resign_federation_execution(&self) -> Result<()> {
        let session = self.session.lock().take();
        let Some(session) = session else {
            return Err(Error::Rti("federate is not joined".into()));
        };
        let mut bus = self.bus.lock();
        if let Some(fed) = bus.federations.get_mut(&session.federation) {
            if let Some(member) = fed.remove_member(session.handle) {
                log::debug!("[loopback] '{}' resigned", member.name);
            }
        }
        Ok(())
    }

    fn destroy_federation_execution(&self, federation: &str) -> Result<bool> {
        let mut bus = self.bus.lock();
        match bus.federations.get(federation) {
            None => Err(Error::Rti(format!(
                "federation execution '{}' does not exist",
                federation
            ))),
            Some(fed) if !fed.members.is_empty() => Ok(false),
            Some(_) => {
                bus.federations.remove(federation);
                log::debug!("[loopback] destroyed federation '{}'", federation);
                Ok(true)
            }
        }
    }

    fn enable_asynchronous_delivery(&self) -> Result<()> {
        Ok(())
    }

    fn joined_federate_names(&self) -> Result<Vec<String>> {
        self.with_federation(|fed, _| Ok(fed.members.values().map(|m| m.name.clone()).collect()))
    }

    fn is_joined(&self) -> bool {
        self.with_federation(|_, _| Ok(())).is_ok()
    }

    fn register_federation_synchronization_point(&self, label: &str, tag: &[u8]) -> Result<()> {
        self.with_federation(|fed, me| {
            if fed.sync_points.iter().any(|p| p.label == label) {
                fed.send(
                    me,
                    Callback::RegistrationFailed(label.to_string(), "label not unique".into()),
                );
                return Ok(());
            }
            let participants: BTreeSet<FederateHandle> = fed.members.keys().copied().collect();
            fed.send(me, Callback::RegistrationSucceeded(label.to_string()));
            for handle in &participants {
                fed.send(*handle, Callback::Announce(label.to_string(), tag.to_vec()));
            }
            fed.sync_points.push(PendingSyncPoint {
                label: label.to_string(),
                tag: tag.to_vec(),
                waiting: participants.clone(),
                participants,
            });
            Ok(())
        })
    }

    fn synchronization_point_achieved(&self, label: &str) -> Result<()> {
        self.with_federation(|fed, me| {
            let point = fed
                .sync_points
                .iter_mut()
                .find(|p| p.label == label)
                .ok_or_else(|| {
                    Error::Rti(format!("synchronization point '{}' is not announced", label))
                })?;
            point.waiting.remove(&me);
            fed.complete_sync_points();
            Ok(())
        })
    }

    fn get_object_class_handle(&self, name: &str) -> Result<ObjectClassHandle> {
        self.with_federation(|fed, _| {
            if let Some(handle) = fed.object_classes.get(name) {
                return Ok(*handle);
            }
            fed.next_class += 1;
            let handle = ObjectClassHandle(fed.next_class);
            fed.object_classes.insert(name.to_string(), handle);
            Ok(handle)
        })
    }

    fn get_attribute_handle(&self, class: ObjectClassHandle, name: &str) -> Result<AttributeHandle> {
        self.with_federation(|fed, _| {
            let key = (class, name.to_string());
            if let Some(handle) = fed.attributes.get(&key) {
                return Ok(*handle);
            }
            fed.next_attribute += 1;
            let handle = AttributeHandle(fed.next_attribute);
            fed.attributes.insert(key, handle);
            Ok(handle)
        })
    }

    fn get_interaction_class_handle(&self, name: &str) -> Result<InteractionClassHandle> {
        self.with_federation(|fed, _| {
            if let Some(handle) = fed.interaction_classes.get(name) {
                return Ok(*handle);
            }
            fed.next_class += 1;
            let handle = InteractionClassHandle(fed.next_class);
            fed.interaction_classes.insert(name.to_string(), handle);
            Ok(handle)
        })
    }

    fn get_parameter_handle(
        &self,
        class: InteractionClassHandle,
        name: &str,
    ) -> Result<ParameterHandle> {
        self.with_federation(|fed, _| {
            let key = (class, name.to_string());
            if let Some(handle) = fed.parameters.get(&key) {
                return Ok(*handle);
            }
            fed.next_parameter += 1;
            let handle = ParameterHandle(fed.next_parameter);
            fed.parameters.insert(key, handle);
            Ok(handle)
        })
    }

    fn publish_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()> {
        self.with_federation(|fed, me| {
            let member = fed
                .members
                .get_mut(&me)
                .ok_or(Error::FederationMembershipLost)?;
            member
                .published
                .extend(attributes.iter().map(|attr| (class, *attr)));
            Ok(())
        })
    }

    fn subscribe_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()> {
        self.with_federation(|fed, me| {
            let existing: Vec<(ObjectInstanceHandle, String)> = fed
                .objects
                .iter()
                .filter(|(_, record)| record.class == class && record.registrant != me)
                .map(|(object, record)| (*object, record.name.clone()))
                .collect();
            let member = fed
                .members
                .get_mut(&me)
                .ok_or(Error::FederationMembershipLost)?;
            member
                .subscribed
                .entry(class)
                .or_default()
                .extend(attributes.iter().copied());
            for (object, name) in existing {
                if member.discovered.insert(object) {
                    member.send(Callback::Discover(object, class, name));
                }
            }
            Ok(())
        })
    }

    fn publish_interaction_class(&self, _class: InteractionClassHandle) -> Result<()> {
        self.with_federation(|_, _| Ok(()))
    }

    fn subscribe_interaction_class(&self, class: InteractionClassHandle) -> Result<()> {
        self.with_federation(|fed, me| {
            let member = fed
                .members
                .get_mut(&me)
                .ok_or(Error::FederationMembershipLost)?;
            member.subscribed_interactions.insert(class);
            Ok(())
        })
    }

    fn reserve_object_instance_name(&self, name: &str) -> Result<()> {
        self.with_federation(|fed, me| {
            if fed.reserved_names.contains_key(name) {
                fed.send(me, Callback::NameReservationFailed(name.to_string()));
            } else {
                fed.reserved_names.insert(name.to_string(), me);
                fed.send(me, Callback::NameReserved(name.to_string()));
            }
            Ok(())
        })
    }

    fn register_object_instance(
        &self,
        class: ObjectClassHandle,
        name: &str,
    ) -> Result<ObjectInstanceHandle> {
        self.with_federation(|fed, me| {
            fed.next_object += 1;
            let object = ObjectInstanceHandle(fed.next_object);
            let name = if name.is_empty() {
                format!("HLAobject_{}", object.0)
            } else {
                if fed.reserved_names.get(name) != Some(&me) {
                    return Err(Error::Rti(format!(
                        "object instance name '{}' is not reserved",
                        name
                    )));
                }
                if fed.objects.values().any(|record| record.name == name) {
                    return Err(Error::Rti(format!(
                        "object instance name '{}' already in use",
                        name
                    )));
                }
                name.to_string()
            };

            let owners = fed
                .member(me)?
                .published
                .iter()
                .filter(|(published_class, _)| *published_class == class)
                .map(|(_, attr)| (*attr, me))
                .collect();
            fed.objects.insert(
                object,
                ObjectRecord {
                    class,
                    name: name.clone(),
                    registrant: me,
                    owners,
                },
            );

            for (handle, member) in fed.members.iter_mut() {
                if *handle != me && member.subscribed.contains_key(&class) {
                    member.discovered.insert(object);
                    member.send(Callback::Discover(object, class, name.clone()));
                }
            }
            log::debug!("[loopback] registered '{}' as {}", name, object);
            Ok(object)
        })
    }

    fn update_attribute_values(
        &self,
        object: ObjectInstanceHandle,
        values: AttributeValues,
        tag: &[u8],
        time: Option<Int64Time>,
    ) -> Result<()> {
        self.with_federation(|fed, me| {
            let record = fed
                .objects
                .get(&object)
                .ok_or_else(|| Error::Rti(format!("unknown object instance {}", object)))?;
            if let Some((attr, _)) = values
                .iter()
                .find(|(attr, _)| record.owners.get(attr) != Some(&me))
            {
                return Err(Error::Rti(format!("attribute {} of {} not owned", attr, object)));
            }
            let class = record.class;

            let mut deliveries: Vec<(FederateHandle, Box<dyn FnOnce(DeliveryInfo) -> Callback>)> =
                Vec::new();
            for (handle, member) in &fed.members {
                if *handle == me || !member.discovered.contains(&object) {
                    continue;
                }
                let Some(subscribed) = member.subscribed.get(&class) else {
                    continue;
                };
                let filtered: AttributeValues = values
                    .iter()
                    .filter(|(attr, _)| subscribed.contains(attr))
                    .cloned()
                    .collect();
                if filtered.is_empty() {
                    continue;
                }
                let tag = tag.to_vec();
                deliveries.push((
                    *handle,
                    Box::new(move |info| Callback::Reflect(object, filtered, tag, info)),
                ));
            }
            fed.route(me, time, deliveries)
        })
    }

    fn request_attribute_value_update(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> Result<()> {
        self.with_federation(|fed, me| {
            let record = fed
                .objects
                .get(&object)
                .ok_or_else(|| Error::Rti(format!("unknown object instance {}", object)))?;
            let mut by_owner: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
            for attr in attributes {
                if let Some(owner) = record.owners.get(attr) {
                    if *owner != me {
                        by_owner.entry(*owner).or_default().push(*attr);
                    }
                }
            }
            for (owner, attrs) in by_owner {
                fed.send(owner, Callback::ProvideUpdate(object, attrs, tag.to_vec()));
            }
            Ok(())
        })
    }

    fn send_interaction(
        &self,
        class: InteractionClassHandle,
        parameters: ParameterValues,
        tag: &[u8],
        time: Option<Int64Time>,
    ) -> Result<()> {
        self.with_federation(|fed, me| {
            let mut deliveries: Vec<(FederateHandle, Box<dyn FnOnce(DeliveryInfo) -> Callback>)> =
                Vec::new();
            for (handle, member) in &fed.members {
                if *handle == me || !member.subscribed_interactions.contains(&class) {
                    continue;
                }
                let parameters = parameters.clone();
                let tag = tag.to_vec();
                deliveries.push((
                    *handle,
                    Box::new(move |info| Callback::Interaction(class, parameters, tag, info)),
                ));
            }
            fed.route(me, time, deliveries)
        })
    }

    fn attribute_ownership_acquisition(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()> {
        self.with_federation(|fed, me| {
            let record = fed
                .objects
                .get_mut(&object)
                .ok_or_else(|| Error::Rti(format!("unknown object instance {}", object)))?;
            let mut released: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
            for attr in attributes {
                if let Some(previous) = record.owners.insert(*attr, me) {
                    if previous != me {
                        released.entry(previous).or_default().push(*attr);
                    }
                }
            }
            for (previous, attrs) in released {
                fed.send(previous, Callback::OwnershipReleased(object, attrs));
            }
            fed.send(me, Callback::OwnershipAcquired(object, attributes.to_vec()));
            Ok(())
        })
    }

    fn enable_time_regulation(&self, lookahead: Int64Interval) -> Result<()> {
        self.with_federation(|fed, me| {
            let floor = fed
                .members
                .iter()
                .filter(|(handle, member)| **handle != me && member.constrained)
                .map(|(_, member)| member.time)
                .max();
            let member = fed
                .members
                .get_mut(&me)
                .ok_or(Error::FederationMembershipLost)?;
            if member.regulating {
                return Err(Error::Rti("time regulation already enabled".into()));
            }
            member.regulating = true;
            member.lookahead = lookahead;
            if let Some(floor) = floor {
                member.time = member.time.max(floor);
            }
            member.send(Callback::RegulationEnabled(member.time));
            fed.process_time_advances();
            Ok(())
        })
    }

    fn enable_time_constrained(&self) -> Result<()> {
        self.with_federation(|fed, me| {
            let member = fed
                .members
                .get_mut(&me)
                .ok_or(Error::FederationMembershipLost)?;
            if member.constrained {
                return Err(Error::Rti("time constrained already enabled".into()));
            }
            member.constrained = true;
            member.send(Callback::ConstrainedEnabled(member.time));
            Ok(())
        })
    }

    fn time_advance_request(&self, time: Int64Time) -> Result<()> {
        self.with_federation(|fed, me| {
            let member = fed
                .members
                .get_mut(&me)
                .ok_or(Error::FederationMembershipLost)?;
            if member.requested.is_some() {
                return Err(Error::Rti("time advance already pending".into()));
            }
            if time < member.time {
                return Err(Error::Rti(format!(
                    "requested time {} is before current time {}",
                    time, member.time
                )));
            }
            member.requested = Some(time);
            fed.process_time_advances();
            Ok(())
        })
    }

    fn query_galt(&self) -> Result<Option<Int64Time>> {
        self.with_federation(|fed, me| Ok(fed.galt_for(me)))
    }

    fn query_logical_time(&self) -> Result<Int64Time> {
        self.with_federation(|fed, me| Ok(fed.member(me)?.time))
    }
}
