// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Federate-wide set of object and interaction bindings.

use std::collections::{BTreeMap, BTreeSet};

use super::interaction::Interaction;
use super::object::Object;
use crate::config::{FederateConfig, InteractionConfig, ObjectConfig};
use crate::error::{Error, Result};
use crate::executive::{Executive, MemoryManager};
use crate::queue::{AttributeItem, InteractionItem};
use crate::rti::{
    AttributeHandle, InteractionClassHandle, ObjectClassHandle, ObjectInstanceHandle, RtiHandle,
};
use crate::time::Int64Time;

/// Every object and interaction binding of one federate.
#[derive(Debug, Default)]
pub struct FomManager {
    objects: Vec<Object>,
    interactions: Vec<Interaction>,
}

impl FomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the objects and interactions of `config`.
    pub fn initialize(config: &FederateConfig, exec: &dyn Executive) -> Result<Self> {
        let mut manager = Self::new();
        for object in &config.objects {
            manager.add_object(object, exec)?;
        }
        for interaction in &config.interactions {
            manager.add_interaction(interaction, exec)?;
        }
        Ok(manager)
    }

    pub fn add_object(&mut self, config: &ObjectConfig, exec: &dyn Executive) -> Result<()> {
        if self
            .objects
            .iter()
            .any(|o| o.instance_name() == config.instance_name && !config.instance_name.is_empty())
        {
            return Err(Error::Config(format!(
                "object instance '{}' bound twice",
                config.instance_name
            )));
        }
        self.objects.push(Object::initialize(config, exec)?);
        Ok(())
    }

    pub fn add_interaction(&mut self, config: &InteractionConfig, exec: &dyn Executive) -> Result<()> {
        self.interactions.push(Interaction::initialize(config, exec)?);
        Ok(())
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, instance_name: &str) -> Option<&Object> {
        self.objects.iter().find(|o| o.instance_name() == instance_name)
    }

    pub fn object_mut(&mut self, instance_name: &str) -> Option<&mut Object> {
        self.objects
            .iter_mut()
            .find(|o| o.instance_name() == instance_name)
    }

    pub fn find_instance(&self, handle: ObjectInstanceHandle) -> Option<&Object> {
        self.objects.iter().find(|o| o.instance() == Some(handle))
    }

    pub fn find_instance_mut(&mut self, handle: ObjectInstanceHandle) -> Option<&mut Object> {
        self.objects
            .iter_mut()
            .find(|o| o.instance() == Some(handle))
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interaction(&self, class_name: &str) -> Option<&Interaction> {
        self.interactions
            .iter()
            .find(|i| i.class_name() == class_name)
    }

    // ------------------------------------------------------------------
    // Declaration management
    // ------------------------------------------------------------------

    /// Look up class, attribute, interaction and parameter handles.
    pub fn resolve_handles(&mut self, rti: &RtiHandle) -> Result<()> {
        for object in &mut self.objects {
            let class_name = object.class_name().to_string();
            let class = rti.call("get_object_class_handle", |r| {
                r.get_object_class_handle(&class_name)
            })?;
            object.set_class_handle(class);
            for attr in object.attributes_mut() {
                let name = attr.fom_name().to_string();
                let handle = rti.call("get_attribute_handle", |r| {
                    r.get_attribute_handle(class, &name)
                })?;
                attr.set_handle(handle);
            }
        }
        for interaction in &mut self.interactions {
            let class_name = interaction.class_name().to_string();
            let class = rti.call("get_interaction_class_handle", |r| {
                r.get_interaction_class_handle(&class_name)
            })?;
            interaction.set_class_handle(class);
            for param in interaction.parameters_mut() {
                let name = param.fom_name().to_string();
                let handle = rti.call("get_parameter_handle", |r| {
                    r.get_parameter_handle(class, &name)
                })?;
                param.set_handle(handle);
            }
        }
        Ok(())
    }

    /// Publish and subscribe the union of attributes per class, then the
    /// interaction classes.
    pub fn publish_and_subscribe(&self, rti: &RtiHandle) -> Result<()> {
        let mut published: BTreeMap<ObjectClassHandle, BTreeSet<AttributeHandle>> = BTreeMap::new();
        let mut subscribed: BTreeMap<ObjectClassHandle, BTreeSet<AttributeHandle>> = BTreeMap::new();
        for object in &self.objects {
            let Some(class) = object.class_handle() else {
                continue;
            };
            published
                .entry(class)
                .or_default()
                .extend(object.published_handles());
            subscribed
                .entry(class)
                .or_default()
                .extend(object.subscribed_handles());
        }
        for (class, attrs) in published.into_iter().filter(|(_, a)| !a.is_empty()) {
            let attrs: Vec<_> = attrs.into_iter().collect();
            rti.call("publish_object_class_attributes", |r| {
                r.publish_object_class_attributes(class, &attrs)
            })?;
        }
        for (class, attrs) in subscribed.into_iter().filter(|(_, a)| !a.is_empty()) {
            let attrs: Vec<_> = attrs.into_iter().collect();
            rti.call("subscribe_object_class_attributes", |r| {
                r.subscribe_object_class_attributes(class, &attrs)
            })?;
        }
        for interaction in &self.interactions {
            let Some(class) = interaction.class_handle() else {
                continue;
            };
            if interaction.is_published() {
                rti.call("publish_interaction_class", |r| {
                    r.publish_interaction_class(class)
                })?;
            }
            if interaction.is_subscribed() {
                rti.call("subscribe_interaction_class", |r| {
                    r.subscribe_interaction_class(class)
                })?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Object management
    // ------------------------------------------------------------------

    /// Ask the RTI to reserve the names of locally created instances.
    pub fn reserve_names(&self, rti: &RtiHandle) -> Result<Vec<String>> {
        let mut requested = Vec::new();
        for object in self.objects.iter().filter(|o| o.is_created()) {
            if object.is_name_reserved() || object.instance_name().is_empty() {
                continue;
            }
            let name = object.instance_name().to_string();
            rti.call("reserve_object_instance_name", |r| {
                r.reserve_object_instance_name(&name)
            })?;
            requested.push(name);
        }
        Ok(requested)
    }

    /// Record a reservation outcome; a failure is a configuration error.
    pub fn name_reserved(&mut self, name: &str, success: bool) -> Result<()> {
        if !success {
            return Err(Error::Config(format!(
                "object instance name '{}' is not unique in the federation",
                name
            )));
        }
        if let Some(object) = self.object_mut(name) {
            object.set_name_reserved(true);
        }
        Ok(())
    }

    /// Register every locally created instance not yet registered.
    pub fn register_objects(&mut self, rti: &RtiHandle) -> Result<Vec<ObjectInstanceHandle>> {
        let mut registered = Vec::new();
        for object in self.objects.iter_mut().filter(|o| o.is_created()) {
            if object.instance().is_some() {
                continue;
            }
            let class = object
                .class_handle()
                .ok_or_else(|| Error::InvalidState(format!("{} has no class handle", object.class_name())))?;
            let name = object.instance_name().to_string();
            let handle = rti.call("register_object_instance", |r| {
                r.register_object_instance(class, &name)
            })?;
            log::debug!("[attr] registered {} as {}", name, handle);
            object.bind_instance(handle);
            registered.push(handle);
        }
        Ok(registered)
    }

    /// Bind a discovered instance to the matching unbound binding.
    ///
    /// Returns false for instances this federate has no binding for.
    pub fn bind_discovered(
        &mut self,
        instance: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: &str,
    ) -> bool {
        let Some(object) = self.objects.iter_mut().find(|o| {
            !o.is_created()
                && o.instance().is_none()
                && o.instance_name() == name
                && o.class_handle() == Some(class)
        }) else {
            return false;
        };
        log::debug!("[attr] discovered {} as {}", name, instance);
        object.bind_instance(instance);
        true
    }

    /// Forget a removed instance so a later discovery can rebind it.
    pub fn unbind_removed(&mut self, instance: ObjectInstanceHandle) -> bool {
        match self.find_instance_mut(instance) {
            Some(object) => {
                object.unbind_instance();
                true
            }
            None => false,
        }
    }

    /// Whether every required, remotely created instance has been bound.
    pub fn required_objects_discovered(&self) -> bool {
        self.objects
            .iter()
            .filter(|o| o.is_required() && !o.is_created())
            .all(|o| o.instance().is_some())
    }

    // ------------------------------------------------------------------
    // Attribute exchange
    // ------------------------------------------------------------------

    /// Pack and send owned attributes of every bound instance.
    ///
    /// Time-stamp ordered attributes carry `time`; receive ordered ones, and
    /// all of them when `time` is `None`, go out without a stamp.
    pub fn send_owned(&mut self, rti: &RtiHandle, time: Option<Int64Time>) -> Result<usize> {
        let mut sent = 0;
        for object in &mut self.objects {
            let Some(instance) = object.instance() else {
                continue;
            };
            let (mut timestamp, receive) = object.pack_owned(false)?;
            if time.is_none() {
                timestamp.extend(receive);
                if !timestamp.is_empty() {
                    sent += timestamp.len();
                    rti.call("update_attribute_values", |r| {
                        r.update_attribute_values(instance, timestamp, &[], None)
                    })?;
                }
                continue;
            }
            if !timestamp.is_empty() {
                sent += timestamp.len();
                rti.call("update_attribute_values", |r| {
                    r.update_attribute_values(instance, timestamp, &[], time)
                })?;
            }
            if !receive.is_empty() {
                sent += receive.len();
                rti.call("update_attribute_values", |r| {
                    r.update_attribute_values(instance, receive, &[], None)
                })?;
            }
        }
        Ok(sent)
    }

    /// Answer a provide-update request with the current owned values.
    pub fn provide_update(
        &mut self,
        rti: &RtiHandle,
        instance: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()> {
        let Some(object) = self.find_instance_mut(instance) else {
            return Ok(());
        };
        let values = object.pack_requested(attributes)?;
        if values.is_empty() {
            return Ok(());
        }
        rti.call("update_attribute_values", |r| {
            r.update_attribute_values(instance, values, &[], None)
        })
    }

    /// Decode a reflected item into the bound instance.
    pub fn reflect(&mut self, item: &AttributeItem, memory: &dyn MemoryManager) -> Result<usize> {
        match self.find_instance_mut(item.object) {
            Some(object) => object.unpack_values(&item.values, memory),
            None => {
                log::debug!("[attr] reflection for unbound {}", item.object);
                Ok(0)
            }
        }
    }

    /// Request current values of every subscribed attribute of `instance_name`.
    pub fn request_update(&self, rti: &RtiHandle, instance_name: &str) -> Result<()> {
        let object = self
            .object(instance_name)
            .ok_or_else(|| Error::InvalidState(format!("no binding for {}", instance_name)))?;
        let Some(instance) = object.instance() else {
            return Err(Error::InvalidState(format!("{} not discovered", instance_name)));
        };
        let attrs = object.subscribed_handles();
        rti.call("request_attribute_value_update", |r| {
            r.request_attribute_value_update(instance, &attrs, &[])
        })
    }

    /// Unconditionally acquire `attributes` of `instance_name`.
    pub fn acquire_ownership(&self, rti: &RtiHandle, instance_name: &str, attributes: &[&str]) -> Result<()> {
        let object = self
            .object(instance_name)
            .ok_or_else(|| Error::InvalidState(format!("no binding for {}", instance_name)))?;
        let instance = object
            .instance()
            .ok_or_else(|| Error::InvalidState(format!("{} not discovered", instance_name)))?;
        let handles = object.handles_for(attributes);
        if handles.len() != attributes.len() {
            return Err(Error::Config(format!(
                "unknown attribute in ownership request for {}",
                instance_name
            )));
        }
        rti.call("attribute_ownership_acquisition", |r| {
            r.attribute_ownership_acquisition(instance, &handles)
        })
    }

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Encode and send the interaction bound to `class_name`.
    pub fn send_interaction(&self, rti: &RtiHandle, class_name: &str, time: Option<Int64Time>) -> Result<()> {
        let interaction = self
            .interaction(class_name)
            .ok_or_else(|| Error::Config(format!("no interaction binding for {}", class_name)))?;
        let class = interaction
            .class_handle()
            .ok_or_else(|| Error::InvalidState(format!("{} has no class handle", class_name)))?;
        let parameters = interaction.pack_parameters()?;
        rti.call("send_interaction", |r| {
            r.send_interaction(class, parameters, &[], time)
        })
    }

    /// Decode a received interaction into its binding.
    ///
    /// Returns the class name when a binding exists.
    pub fn receive_interaction(
        &self,
        item: &InteractionItem,
        memory: &dyn MemoryManager,
    ) -> Result<Option<&str>> {
        let Some(interaction) = self.interaction_by_handle(item.class) else {
            return Ok(None);
        };
        interaction.unpack_item(item, memory)?;
        Ok(Some(interaction.class_name()))
    }

    fn interaction_by_handle(&self, class: InteractionClassHandle) -> Option<&Interaction> {
        self.interactions
            .iter()
            .find(|i| i.class_handle() == Some(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encoding, SimVariable};
    use crate::config::AttributeConfig;
    use crate::executive::SimExecutive;

    fn vehicle(create: bool) -> ObjectConfig {
        let attr = AttributeConfig::new("mass", "lander.mass", Encoding::LittleEndian);
        let attr = if create { attr.publish() } else { attr.subscribe() };
        let object = ObjectConfig::new("HLAobjectRoot.Vehicle", "Lander").attribute(attr);
        if create {
            object.created()
        } else {
            object.required()
        }
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let exec = SimExecutive::new(0.25);
        exec.register(SimVariable::scalar("lander.mass", 1.0f64));
        let mut manager = FomManager::new();
        manager.add_object(&vehicle(true), &exec).expect("add should succeed");
        assert!(matches!(
            manager.add_object(&vehicle(true), &exec),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_discovery_binding() {
        let exec = SimExecutive::new(0.25);
        exec.register(SimVariable::scalar("lander.mass", 1.0f64));
        let mut manager = FomManager::new();
        manager.add_object(&vehicle(false), &exec).expect("add should succeed");
        manager.objects[0].set_class_handle(ObjectClassHandle(3));
        assert!(!manager.required_objects_discovered());

        assert!(!manager.bind_discovered(ObjectInstanceHandle(9), ObjectClassHandle(4), "Lander"));
        assert!(!manager.bind_discovered(ObjectInstanceHandle(9), ObjectClassHandle(3), "Other"));
        assert!(manager.bind_discovered(ObjectInstanceHandle(9), ObjectClassHandle(3), "Lander"));
        assert!(manager.required_objects_discovered());
        assert!(manager.find_instance(ObjectInstanceHandle(9)).is_some());

        assert!(manager.unbind_removed(ObjectInstanceHandle(9)));
        assert!(!manager.required_objects_discovered());
    }

    #[test]
    fn test_failed_reservation_is_fatal() {
        let mut manager = FomManager::new();
        let err = manager
            .name_reserved("Lander", false)
            .expect_err("failure must be reported");
        assert!(err.is_fatal());
    }
}
