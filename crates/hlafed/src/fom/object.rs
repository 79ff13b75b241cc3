// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object instance binding.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::attribute::Attribute;
use crate::config::ObjectConfig;
use crate::error::Result;
use crate::executive::{Executive, MemoryManager};
use crate::rti::{AttributeHandle, AttributeValues, ObjectClassHandle, ObjectInstanceHandle, TransportOrder};

/// A named object instance and its attribute bindings.
#[derive(Debug)]
pub struct Object {
    class_name: String,
    instance_name: String,
    create: bool,
    required: bool,
    attributes: Vec<Attribute>,
    class_handle: Option<ObjectClassHandle>,
    instance: Option<ObjectInstanceHandle>,
    name_reserved: bool,
}

impl Object {
    pub fn initialize(config: &ObjectConfig, exec: &dyn Executive) -> Result<Self> {
        let attributes = config
            .attributes
            .iter()
            .map(|a| Attribute::initialize(a, exec))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            class_name: config.class_name.clone(),
            instance_name: config.instance_name.clone(),
            create: config.create,
            required: config.required,
            attributes,
            class_handle: None,
            instance: None,
            name_reserved: false,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    /// Registered by this federate rather than discovered.
    pub fn is_created(&self) -> bool {
        self.create
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, fom_name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.fom_name() == fom_name)
    }

    pub fn attribute_mut(&mut self, fom_name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.fom_name() == fom_name)
    }

    pub fn attributes_mut(&mut self) -> &mut [Attribute] {
        &mut self.attributes
    }

    pub fn class_handle(&self) -> Option<ObjectClassHandle> {
        self.class_handle
    }

    pub fn set_class_handle(&mut self, handle: ObjectClassHandle) {
        self.class_handle = Some(handle);
    }

    pub fn instance(&self) -> Option<ObjectInstanceHandle> {
        self.instance
    }

    /// Bind the RTI instance handle (registration or discovery).
    pub fn bind_instance(&mut self, handle: ObjectInstanceHandle) {
        self.instance = Some(handle);
    }

    pub fn unbind_instance(&mut self) -> Option<ObjectInstanceHandle> {
        self.instance.take()
    }

    pub fn is_name_reserved(&self) -> bool {
        self.name_reserved
    }

    pub fn set_name_reserved(&mut self, reserved: bool) {
        self.name_reserved = reserved;
    }

    /// Handles of attributes this binding publishes.
    pub fn published_handles(&self) -> Vec<AttributeHandle> {
        self.attributes
            .iter()
            .filter(|a| a.is_published())
            .filter_map(Attribute::handle)
            .collect()
    }

    /// Handles of attributes this binding subscribes to.
    pub fn subscribed_handles(&self) -> Vec<AttributeHandle> {
        self.attributes
            .iter()
            .filter(|a| a.is_subscribed())
            .filter_map(Attribute::handle)
            .collect()
    }

    /// Resolve attribute names to handles.
    pub fn handles_for(&self, names: &[&str]) -> Vec<AttributeHandle> {
        names
            .iter()
            .filter_map(|name| self.attribute(name).and_then(Attribute::handle))
            .collect()
    }

    /// `(instance, attribute)` keyed ownership flags of every resolved
    /// attribute.
    pub fn ownership_flags(&self) -> Vec<((ObjectInstanceHandle, AttributeHandle), Arc<AtomicBool>)> {
        let Some(instance) = self.instance else {
            return Vec::new();
        };
        self.attributes
            .iter()
            .filter_map(|a| a.handle().map(|h| ((instance, h), a.ownership_flag())))
            .collect()
    }

    /// Pack owned, published attributes for one core cycle, split by
    /// preferred order into `(timestamp, receive)` value sets.
    ///
    /// `force` sends regardless of the cycle ratio.
    pub fn pack_owned(&mut self, force: bool) -> Result<(AttributeValues, AttributeValues)> {
        let mut timestamp = AttributeValues::new();
        let mut receive = AttributeValues::new();
        for attr in &mut self.attributes {
            let ready = attr.cycle_ready();
            if !attr.is_published() || !(ready || force) {
                continue;
            }
            let Some(handle) = attr.handle() else {
                continue;
            };
            if let Some(bytes) = attr.pack()? {
                match attr.order() {
                    TransportOrder::Timestamp => timestamp.push((handle, bytes)),
                    TransportOrder::Receive => receive.push((handle, bytes)),
                }
            }
        }
        Ok((timestamp, receive))
    }

    /// Pack the owned attributes among `handles` (provide-update requests).
    pub fn pack_requested(&mut self, handles: &[AttributeHandle]) -> Result<AttributeValues> {
        let mut values = AttributeValues::new();
        for attr in &mut self.attributes {
            let Some(handle) = attr.handle() else {
                continue;
            };
            if !handles.contains(&handle) {
                continue;
            }
            if let Some(bytes) = attr.pack()? {
                values.push((handle, bytes));
            }
        }
        Ok(values)
    }

    /// Decode reflected values; returns how many attributes were updated.
    pub fn unpack_values(
        &mut self,
        values: &[(AttributeHandle, Vec<u8>)],
        memory: &dyn MemoryManager,
    ) -> Result<usize> {
        let mut updated = 0;
        for (handle, bytes) in values {
            let Some(attr) = self
                .attributes
                .iter_mut()
                .find(|a| a.handle() == Some(*handle))
            else {
                log::debug!(
                    "[attr] {}: no binding for {}",
                    self.instance_name,
                    handle
                );
                continue;
            };
            if attr.unpack(bytes, memory)? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Names of attributes decoded since the last call.
    pub fn take_changed(&mut self) -> Vec<String> {
        self.attributes
            .iter_mut()
            .filter_map(|a| a.take_changed().then(|| a.fom_name().to_string()))
            .collect()
    }
}
