// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Attribute binding: one FOM attribute mapped onto one executive variable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::codec_failure;
use crate::codec::{self, DecodeOutcome, WireFormat, VariableRef};
use crate::config::AttributeConfig;
use crate::error::{Error, Result};
use crate::executive::{Executive, MemoryManager};
use crate::rti::{AttributeHandle, TransportOrder};

/// Tolerance on the cycle-time to core-cycle ratio.
const CYCLE_RATIO_TOLERANCE: f64 = 1.0e-9;

/// A FOM attribute bound to an executive variable.
///
/// Packing only happens while the attribute is locally owned and unpacking
/// only while it is owned elsewhere. The ownership flag is shared with the
/// RTI callback thread, which flips it on ownership transfer.
#[derive(Debug)]
pub struct Attribute {
    fom_name: String,
    variable_name: String,
    variable: VariableRef,
    format: WireFormat,
    order: TransportOrder,
    publish: bool,
    subscribe: bool,
    owned: Arc<AtomicBool>,
    changed: bool,
    cycle_ratio: u32,
    cycle_counter: u32,
    buffer: Vec<u8>,
    handle: Option<AttributeHandle>,
}

impl Attribute {
    /// Resolve the variable, validate the encoding and derive the cycle
    /// ratio against the executive core cycle.
    pub fn initialize(config: &AttributeConfig, exec: &dyn Executive) -> Result<Self> {
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

        let cycle_ratio = cycle_ratio(&config.fom_name, config.cycle_time, exec.core_cycle())?;

        log::debug!(
            "[attr] {} -> {} ({}, ratio {})",
            config.fom_name,
            config.variable,
            config.encoding,
            cycle_ratio
        );

        Ok(Self {
            fom_name: config.fom_name.clone(),
            variable_name: config.variable.clone(),
            variable,
            format,
            order: config.order,
            publish: config.publish,
            subscribe: config.subscribe,
            owned: Arc::new(AtomicBool::new(config.locally_owned)),
            changed: false,
            cycle_ratio,
            cycle_counter: 0,
            buffer: Vec::new(),
            handle: None,
        })
    }

    pub fn fom_name(&self) -> &str {
        &self.fom_name
    }

    pub fn variable_name(&self) -> &str {
        &self.variable_name
    }

    pub fn order(&self) -> TransportOrder {
        self.order
    }

    pub fn is_published(&self) -> bool {
        self.publish
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribe
    }

    pub fn cycle_ratio(&self) -> u32 {
        self.cycle_ratio
    }

    pub fn handle(&self) -> Option<AttributeHandle> {
        self.handle
    }

    pub fn set_handle(&mut self, handle: AttributeHandle) {
        self.handle = Some(handle);
    }

    pub fn is_owned(&self) -> bool {
        self.owned.load(Ordering::Acquire)
    }

    pub fn set_owned(&self, owned: bool) {
        self.owned.store(owned, Ordering::Release);
    }

    /// Flag shared with the callback side for ownership transfers.
    pub fn ownership_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.owned)
    }

    /// Count one core cycle; true on the cycles this attribute is sent.
    pub fn cycle_ready(&mut self) -> bool {
        let ready = self.cycle_counter == 0;
        self.cycle_counter = (self.cycle_counter + 1) % self.cycle_ratio;
        ready
    }

    /// Whether a remote value was decoded since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Bytes of the last successful pack.
    pub fn encoded(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode the variable if locally owned.
    ///
    /// Returns `Ok(None)` when not owned or when a recoverable encoding
    /// problem was logged.
    pub fn pack(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.is_owned() {
            return Ok(None);
        }
        self.buffer.clear();
        let result = {
            let var = self.variable.read();
            codec::pack(&self.format, &var, &mut self.buffer)
        };
        match result {
            Ok(()) => Ok(Some(self.buffer.clone())),
            Err(source) => {
                codec_failure(&self.fom_name, &self.variable_name, "pack", source)?;
                Ok(None)
            }
        }
    }

    /// Decode a reflected value into the variable unless locally owned.
    ///
    /// Returns whether the variable was updated. Recoverable decoding
    /// problems keep the previous value.
    pub fn unpack(&mut self, bytes: &[u8], memory: &dyn MemoryManager) -> Result<bool> {
        if self.is_owned() {
            log::warn!(
                "[attr] ignoring reflected '{}' (variable '{}'): locally owned",
                self.fom_name,
                self.variable_name
            );
            return Ok(false);
        }
        let result = {
            let mut var = self.variable.write();
            codec::unpack(&self.format, bytes, &mut var, memory)
        };
        match result {
            Ok(outcome) => {
                match outcome {
                    DecodeOutcome::Complete => {}
                    DecodeOutcome::Clamped => log::warn!(
                        "[attr] '{}' (variable '{}'): declared length past end of data, clamped",
                        self.fom_name,
                        self.variable_name
                    ),
                    DecodeOutcome::Truncated { received, capacity } => log::warn!(
                        "[attr] '{}' (variable '{}'): received {} elements, kept {}",
                        self.fom_name,
                        self.variable_name,
                        received,
                        capacity
                    ),
                }
                self.changed = true;
                Ok(true)
            }
            Err(source) => {
                codec_failure(&self.fom_name, &self.variable_name, "unpack", source)?;
                Ok(false)
            }
        }
    }
}

fn cycle_ratio(fom_name: &str, cycle_time: Option<f64>, core_cycle: f64) -> Result<u32> {
    let Some(cycle_time) = cycle_time else {
        return Ok(1);
    };
    let invalid = || Error::InvalidCycleTime {
        fom_name: fom_name.to_string(),
        cycle_time,
        core_cycle,
    };
    if !core_cycle.is_finite() || core_cycle <= 0.0 || !cycle_time.is_finite() {
        return Err(invalid());
    }
    let ratio = cycle_time / core_cycle;
    let rounded = ratio.round();
    if !(1.0..=u32::MAX as f64).contains(&rounded)
        || (ratio - rounded).abs() > CYCLE_RATIO_TOLERANCE * rounded
    {
        return Err(invalid());
    }
    Ok(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encoding, SimVariable};
    use crate::executive::SimExecutive;

    fn exec() -> SimExecutive {
        let exec = SimExecutive::new(0.25);
        exec.register(SimVariable::array("v.position", vec![1.0f64, 2.0, 3.0]));
        exec.register(SimVariable::scalar("v.name", String::from("Lander")));
        exec
    }

    #[test]
    fn test_missing_variable() {
        let exec = exec();
        let config = AttributeConfig::new("mass", "v.mass", Encoding::LittleEndian);
        let err = Attribute::initialize(&config, &exec).expect_err("unbound must fail");
        assert!(matches!(err, Error::MissingVariable { ref var_name, .. } if var_name == "v.mass"));
    }

    #[test]
    fn test_unsupported_type() {
        let exec = exec();
        let config = AttributeConfig::new("name", "v.name", Encoding::BigEndian);
        let err = Attribute::initialize(&config, &exec).expect_err("string as big endian must fail");
        assert!(matches!(err, Error::UnsupportedAttributeType { .. }));
    }

    #[test]
    fn test_cycle_ratio() {
        assert_eq!(cycle_ratio("a", None, 0.25).expect("ratio should succeed"), 1);
        assert_eq!(cycle_ratio("a", Some(1.0), 0.25).expect("ratio should succeed"), 4);
        assert!(matches!(
            cycle_ratio("a", Some(0.6), 0.25),
            Err(Error::InvalidCycleTime { .. })
        ));
        assert!(cycle_ratio("a", Some(0.1), 0.25).is_err());

        let exec = exec();
        let config = AttributeConfig::new("position", "v.position", Encoding::LittleEndian)
            .publish()
            .cycle_time(0.5);
        let mut attr = Attribute::initialize(&config, &exec).expect("initialize should succeed");
        let fired: Vec<bool> = (0..4).map(|_| attr.cycle_ready()).collect();
        assert_eq!(fired, vec![true, false, true, false]);
    }

    #[test]
    fn test_pack_requires_ownership() {
        let exec = exec();
        let config = AttributeConfig::new("position", "v.position", Encoding::LittleEndian).publish();
        let mut attr = Attribute::initialize(&config, &exec).expect("initialize should succeed");
        let bytes = attr.pack().expect("pack should succeed").expect("owned attribute packs");
        assert_eq!(bytes.len(), 24);
        assert_eq!(attr.encoded(), bytes.as_slice());

        // Owned attributes ignore reflections.
        assert!(!attr.unpack(&bytes, &exec).expect("unpack should succeed"));

        attr.set_owned(false);
        assert!(attr.pack().expect("pack should succeed").is_none());
    }

    #[test]
    fn test_unpack_marks_changed_and_keeps_value_on_error() {
        let exec = exec();
        let config = AttributeConfig::new("position", "v.position", Encoding::LittleEndian).subscribe();
        let mut attr = Attribute::initialize(&config, &exec).expect("initialize should succeed");
        assert!(!attr.is_owned());

        let mut bytes = Vec::new();
        for v in [4.0f64, 5.0, 6.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert!(attr.unpack(&bytes, &exec).expect("unpack should succeed"));
        assert!(attr.take_changed());
        assert!(!attr.take_changed());

        // Short buffer: warned and skipped.
        assert!(!attr.unpack(&bytes[..16], &exec).expect("data errors are not fatal"));
        let var = exec.lookup("v.position").expect("variable registered");
        assert_eq!(var.read().get::<f64>(), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn test_ownership_flag_is_shared() {
        let exec = exec();
        let config = AttributeConfig::new("position", "v.position", Encoding::LittleEndian).publish_unowned();
        let attr = Attribute::initialize(&config, &exec).expect("initialize should succeed");
        let flag = attr.ownership_flag();
        assert!(!attr.is_owned());
        flag.store(true, Ordering::Release);
        assert!(attr.is_owned());
    }
}
