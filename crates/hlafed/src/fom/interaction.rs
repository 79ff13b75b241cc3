// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interaction and parameter bindings.

use super::codec_failure;
use crate::codec::{self, VariableRef, WireFormat};
use crate::config::{InteractionConfig, ParameterConfig};
use crate::error::{Error, Result};
use crate::executive::{Executive, MemoryManager};
use crate::queue::InteractionItem;
use crate::rti::{InteractionClassHandle, ParameterHandle, ParameterValues, TransportOrder};

/// One interaction parameter bound to an executive variable.
#[derive(Debug)]
pub struct Parameter {
    fom_name: String,
    variable_name: String,
    variable: VariableRef,
    format: WireFormat,
    handle: Option<ParameterHandle>,
}

impl Parameter {
    pub fn initialize(config: &ParameterConfig, exec: &dyn Executive) -> Result<Self> {
        let variable = exec
            .lookup(&config.variable)
            .ok_or_else(|| Error::MissingVariable {
                fom_name: config.fom_name.clone(),
                var_name: config.variable.clone(),
            })?;
        let format = {
            let var = variable.read();
            WireFormat::resolve(config.encoding, var.element_type(), var.shape(), var.units())
        }
        .map_err(|reason| Error::UnsupportedAttributeType {
            fom_name: config.fom_name.clone(),
            var_name: config.variable.clone(),
            reason,
        })?;
        Ok(Self {
            fom_name: config.fom_name.clone(),
            variable_name: config.variable.clone(),
            variable,
            format,
            handle: None,
        })
    }

    pub fn fom_name(&self) -> &str {
        &self.fom_name
    }

    pub fn handle(&self) -> Option<ParameterHandle> {
        self.handle
    }

    pub fn set_handle(&mut self, handle: ParameterHandle) {
        self.handle = Some(handle);
    }

    pub fn pack(&self) -> Result<Option<Vec<u8>>> {
        let mut out = Vec::new();
        let result = codec::pack(&self.format, &self.variable.read(), &mut out);
        match result {
            Ok(()) => Ok(Some(out)),
            Err(source) => {
                codec_failure(&self.fom_name, &self.variable_name, "pack", source)?;
                Ok(None)
            }
        }
    }

    pub fn unpack(&self, bytes: &[u8], memory: &dyn MemoryManager) -> Result<bool> {
        let result = codec::unpack(&self.format, bytes, &mut self.variable.write(), memory);
        match result {
            Ok(_) => Ok(true),
            Err(source) => {
                codec_failure(&self.fom_name, &self.variable_name, "unpack", source)?;
                Ok(false)
            }
        }
    }
}

/// An interaction class and its parameter bindings.
#[derive(Debug)]
pub struct Interaction {
    class_name: String,
    publish: bool,
    subscribe: bool,
    order: TransportOrder,
    parameters: Vec<Parameter>,
    class_handle: Option<InteractionClassHandle>,
}

impl Interaction {
    pub fn initialize(config: &InteractionConfig, exec: &dyn Executive) -> Result<Self> {
        let parameters = config
            .parameters
            .iter()
            .map(|p| Parameter::initialize(p, exec))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            class_name: config.class_name.clone(),
            publish: config.publish,
            subscribe: config.subscribe,
            order: config.order,
            parameters,
            class_handle: None,
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_published(&self) -> bool {
        self.publish
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribe
    }

    pub fn order(&self) -> TransportOrder {
        self.order
    }

    pub fn class_handle(&self) -> Option<InteractionClassHandle> {
        self.class_handle
    }

    pub fn set_class_handle(&mut self, handle: InteractionClassHandle) {
        self.class_handle = Some(handle);
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    /// Encode every parameter with a resolved handle.
    pub fn pack_parameters(&self) -> Result<ParameterValues> {
        let mut values = ParameterValues::new();
        for param in &self.parameters {
            let Some(handle) = param.handle() else {
                continue;
            };
            if let Some(bytes) = param.pack()? {
                values.push((handle, bytes));
            }
        }
        Ok(values)
    }

    /// Decode a received interaction; returns how many parameters updated.
    pub fn unpack_item(&self, item: &InteractionItem, memory: &dyn MemoryManager) -> Result<usize> {
        let mut updated = 0;
        for param in &self.parameters {
            let Some(bytes) = param.handle().and_then(|h| item.parameter(h)) else {
                continue;
            };
            if param.unpack(bytes, memory)? {
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encoding, SimVariable};
    use crate::executive::SimExecutive;
    use crate::queue::ParameterItem;

    #[test]
    fn test_parameter_roundtrip_through_item() {
        let exec = SimExecutive::new(0.25);
        exec.register(SimVariable::scalar("cmd.thrust", 12.5f64));
        let config = InteractionConfig::new("HLAinteractionRoot.Command")
            .publish()
            .subscribe()
            .parameter(ParameterConfig::new("thrust", "cmd.thrust", Encoding::BigEndian));
        let mut interaction = Interaction::initialize(&config, &exec).expect("initialize should succeed");
        interaction.parameters_mut()[0].set_handle(ParameterHandle(1));

        let values = interaction.pack_parameters().expect("pack should succeed");
        assert_eq!(values, vec![(ParameterHandle(1), 12.5f64.to_be_bytes().to_vec())]);

        let item = InteractionItem {
            class: InteractionClassHandle(7),
            parameters: vec![ParameterItem {
                handle: ParameterHandle(1),
                data: 3.0f64.to_be_bytes().to_vec(),
            }],
            tag: Vec::new(),
            order: TransportOrder::Receive,
            time: None,
        };
        assert_eq!(interaction.unpack_item(&item, &exec).expect("unpack should succeed"), 1);
        let var = exec.lookup("cmd.thrust").expect("variable registered");
        assert_eq!(var.read().value::<f64>(), Some(3.0));
    }

    #[test]
    fn test_bad_parameter_is_skipped() {
        let exec = SimExecutive::new(0.25);
        exec.register(SimVariable::scalar("cmd.mode", 1i16));
        let param = Parameter::initialize(
            &ParameterConfig::new("mode", "cmd.mode", Encoding::LittleEndian),
            &exec,
        )
        .expect("initialize should succeed");
        assert!(!param.unpack(&[1, 2, 3], &exec).expect("data errors are not fatal"));
    }
}
