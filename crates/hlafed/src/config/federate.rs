// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-federate configuration and its builder.

use std::collections::HashSet;
use std::time::Duration;

use super::{
    is_reserved_sync_point, DEFAULT_QUEUE_CAPACITY, LIVENESS_CHECK_INTERVAL,
    MIN_PADDING_LCTS_RATIO, WAIT_SLEEP,
};
use crate::codec::Encoding;
use crate::error::{Error, Result};
use crate::rti::TransportOrder;
use crate::time::Int64Interval;

/// Binding of one FOM attribute to an executive variable.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeConfig {
    /// FOM attribute name.
    pub fom_name: String,
    /// Executive variable name.
    pub variable: String,
    pub encoding: Encoding,
    pub order: TransportOrder,
    pub publish: bool,
    pub subscribe: bool,
    /// Whether this federate starts as the attribute owner.
    pub locally_owned: bool,
    /// Send period in seconds; `None` sends every core cycle.
    pub cycle_time: Option<f64>,
}

impl AttributeConfig {
    pub fn new(fom_name: impl Into<String>, variable: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            fom_name: fom_name.into(),
            variable: variable.into(),
            encoding,
            order: TransportOrder::Timestamp,
            publish: false,
            subscribe: false,
            locally_owned: false,
            cycle_time: None,
        }
    }

    /// Publish and own the attribute.
    pub fn publish(mut self) -> Self {
        self.publish = true;
        self.locally_owned = true;
        self
    }

    pub fn subscribe(mut self) -> Self {
        self.subscribe = true;
        self
    }

    /// Publish without initial ownership (ownership acquired later).
    pub fn publish_unowned(mut self) -> Self {
        self.publish = true;
        self.locally_owned = false;
        self
    }

    pub fn order(mut self, order: TransportOrder) -> Self {
        self.order = order;
        self
    }

    pub fn cycle_time(mut self, seconds: f64) -> Self {
        self.cycle_time = Some(seconds);
        self
    }
}

/// One object instance: a class, an instance name and its attribute bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectConfig {
    pub class_name: String,
    pub instance_name: String,
    /// Registered by this federate (otherwise discovered).
    pub create: bool,
    /// Must be discovered before `objects_discovered` is achieved.
    pub required: bool,
    pub attributes: Vec<AttributeConfig>,
}

impl ObjectConfig {
    pub fn new(class_name: impl Into<String>, instance_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            instance_name: instance_name.into(),
            create: false,
            required: false,
            attributes: Vec::new(),
        }
    }

    pub fn created(mut self) -> Self {
        self.create = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn attribute(mut self, attribute: AttributeConfig) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Binding of one interaction parameter to an executive variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterConfig {
    pub fom_name: String,
    pub variable: String,
    pub encoding: Encoding,
}

impl ParameterConfig {
    pub fn new(fom_name: impl Into<String>, variable: impl Into<String>, encoding: Encoding) -> Self {
        Self {
            fom_name: fom_name.into(),
            variable: variable.into(),
            encoding,
        }
    }
}

/// User interaction class binding.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionConfig {
    pub class_name: String,
    pub publish: bool,
    pub subscribe: bool,
    pub order: TransportOrder,
    pub parameters: Vec<ParameterConfig>,
}

impl InteractionConfig {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            publish: false,
            subscribe: false,
            order: TransportOrder::Receive,
            parameters: Vec::new(),
        }
    }

    pub fn publish(mut self) -> Self {
        self.publish = true;
        self
    }

    pub fn subscribe(mut self) -> Self {
        self.subscribe = true;
        self
    }

    pub fn order(mut self, order: TransportOrder) -> Self {
        self.order = order;
        self
    }

    pub fn parameter(mut self, parameter: ParameterConfig) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// Federate expected in the federation execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownFederate {
    pub name: String,
    /// The master waits for required federates before initialisation.
    pub required: bool,
}

impl KnownFederate {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// Complete configuration of one federate.
#[derive(Debug, Clone, PartialEq)]
pub struct FederateConfig {
    pub federation_name: String,
    pub federate_name: String,
    pub federate_type: String,
    /// `Some(true)` forces master, `Some(false)` forbids it, `None` makes
    /// the federation creator master.
    pub preset_master: Option<bool>,
    pub known_federates: Vec<KnownFederate>,
    /// Extra initialisation phases, achieved in order.
    pub multiphase_init_sync_points: Vec<String>,
    pub least_common_time_step: Int64Interval,
    pub lookahead: Int64Interval,
    /// Lead time between an accepted mode transition and its effect.
    pub time_padding: Int64Interval,
    pub time_regulating: bool,
    pub time_constrained: bool,
    /// Gate run transitions on the common timeline clock.
    pub cte_enabled: bool,
    pub root_frame_name: String,
    /// This federate publishes the root reference frame.
    pub publishes_root_frame: bool,
    /// Scenario time at logical time zero (set by the master).
    pub scenario_time_epoch: f64,
    pub objects: Vec<ObjectConfig>,
    pub interactions: Vec<InteractionConfig>,
    pub queue_capacity: usize,
    /// Warn when an RTI call changes the x87 control word.
    pub fpu_validate: bool,
    pub wait_sleep: Duration,
    pub liveness_interval: Duration,
}

impl FederateConfig {
    /// Create a configuration builder.
    ///
    /// # Example
    /// ```no_run
    /// use hlafed::config::FederateConfig;
    /// let config = FederateConfig::builder("SpaceFederation", "Moon")
    ///     .master(true)
    ///     .build()?;
    /// # Ok::<(), hlafed::Error>(())
    /// ```
    pub fn builder(federation_name: &str, federate_name: &str) -> FederateConfigBuilder {
        FederateConfigBuilder::new(federation_name, federate_name)
    }

    /// Check the timing invariants and binding uniqueness.
    pub fn validate(&self) -> Result<()> {
        if self.federation_name.trim().is_empty() {
            return Err(Error::Config("federation name is empty".into()));
        }
        if self.federate_name.trim().is_empty() {
            return Err(Error::Config("federate name is empty".into()));
        }

        validate_timing(
            self.least_common_time_step,
            self.lookahead,
            Some(self.time_padding),
        )?;

        if self.queue_capacity == 0 {
            return Err(Error::Config("queue capacity must be positive".into()));
        }
        if self.publishes_root_frame && self.root_frame_name.trim().is_empty() {
            return Err(Error::Config(
                "root frame publisher requires a root frame name".into(),
            ));
        }

        let mut labels = HashSet::new();
        for label in &self.multiphase_init_sync_points {
            if is_reserved_sync_point(label) {
                return Err(Error::Config(format!(
                    "multiphase label '{}' collides with a reserved label",
                    label
                )));
            }
            if !labels.insert(label.as_str()) {
                return Err(Error::Config(format!("duplicate multiphase label '{}'", label)));
            }
        }

        let mut instances = HashSet::new();
        for object in &self.objects {
            if object.instance_name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "object of class '{}' has no instance name",
                    object.class_name
                )));
            }
            if !instances.insert(object.instance_name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate object instance '{}'",
                    object.instance_name
                )));
            }
            let mut names = HashSet::new();
            for attribute in &object.attributes {
                if !names.insert(attribute.fom_name.as_str()) {
                    return Err(Error::Config(format!(
                        "duplicate attribute '{}' in object '{}'",
                        attribute.fom_name, object.instance_name
                    )));
                }
                if let Some(cycle) = attribute.cycle_time {
                    if !(cycle.is_finite() && cycle > 0.0) {
                        return Err(Error::Config(format!(
                            "attribute '{}' has a non-positive cycle time {}",
                            attribute.fom_name, cycle
                        )));
                    }
                }
            }
        }

        let mut classes = HashSet::new();
        for interaction in &self.interactions {
            if !classes.insert(interaction.class_name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate interaction class '{}'",
                    interaction.class_name
                )));
            }
        }

        Ok(())
    }

    /// Names of the federates the master must wait for.
    pub fn required_federates(&self) -> impl Iterator<Item = &str> {
        self.known_federates
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}

/// Check LCTS, lookahead and (optionally) padding against each other.
///
/// LCTS must be positive and a whole multiple of a positive lookahead;
/// padding must be at least three LCTS and a whole multiple of it.
pub fn validate_timing(
    lcts: Int64Interval,
    lookahead: Int64Interval,
    padding: Option<Int64Interval>,
) -> Result<()> {
    if !lcts.is_positive() {
        return Err(Error::InvalidTiming(format!(
            "least common time step {} must be positive",
            lcts
        )));
    }
    if lookahead.base_units() < 0 {
        return Err(Error::InvalidTiming(format!(
            "lookahead {} must not be negative",
            lookahead
        )));
    }
    if lookahead.is_positive() && !lcts.is_multiple_of(lookahead) {
        return Err(Error::InvalidTiming(format!(
            "least common time step {} is not a multiple of lookahead {}",
            lcts, lookahead
        )));
    }
    if let Some(padding) = padding {
        if padding < lcts.times(MIN_PADDING_LCTS_RATIO) {
            return Err(Error::InvalidTiming(format!(
                "time padding {} is less than {} x least common time step {}",
                padding, MIN_PADDING_LCTS_RATIO, lcts
            )));
        }
        if !padding.is_multiple_of(lcts) {
            return Err(Error::InvalidTiming(format!(
                "time padding {} is not a multiple of least common time step {}",
                padding, lcts
            )));
        }
    }
    Ok(())
}

/// Builder for [`FederateConfig`].
pub struct FederateConfigBuilder {
    config: FederateConfig,
}

impl FederateConfigBuilder {
    pub(crate) fn new(federation_name: &str, federate_name: &str) -> Self {
        Self {
            config: FederateConfig {
                federation_name: federation_name.to_string(),
                federate_name: federate_name.to_string(),
                federate_type: federate_name.to_string(),
                preset_master: None,
                known_federates: Vec::new(),
                multiphase_init_sync_points: Vec::new(),
                least_common_time_step: Int64Interval::from_micros(1_000_000),
                lookahead: Int64Interval::from_micros(1_000_000),
                time_padding: Int64Interval::from_micros(3_000_000),
                time_regulating: true,
                time_constrained: true,
                cte_enabled: false,
                root_frame_name: String::new(),
                publishes_root_frame: false,
                scenario_time_epoch: 0.0,
                objects: Vec::new(),
                interactions: Vec::new(),
                queue_capacity: DEFAULT_QUEUE_CAPACITY,
                fpu_validate: cfg!(feature = "fpu-validate"),
                wait_sleep: WAIT_SLEEP,
                liveness_interval: LIVENESS_CHECK_INTERVAL,
            },
        }
    }

    pub fn federate_type(mut self, federate_type: &str) -> Self {
        self.config.federate_type = federate_type.to_string();
        self
    }

    /// Preset the master role.
    pub fn master(mut self, is_master: bool) -> Self {
        self.config.preset_master = Some(is_master);
        self
    }

    pub fn known_federate(mut self, federate: KnownFederate) -> Self {
        self.config.known_federates.push(federate);
        self
    }

    pub fn multiphase_sync_point(mut self, label: &str) -> Self {
        self.config
            .multiphase_init_sync_points
            .push(label.to_string());
        self
    }

    pub fn least_common_time_step(mut self, lcts: Int64Interval) -> Self {
        self.config.least_common_time_step = lcts;
        self
    }

    pub fn lookahead(mut self, lookahead: Int64Interval) -> Self {
        self.config.lookahead = lookahead;
        self
    }

    pub fn time_padding(mut self, padding: Int64Interval) -> Self {
        self.config.time_padding = padding;
        self
    }

    pub fn time_regulating(mut self, enabled: bool) -> Self {
        self.config.time_regulating = enabled;
        self
    }

    pub fn time_constrained(mut self, enabled: bool) -> Self {
        self.config.time_constrained = enabled;
        self
    }

    pub fn cte(mut self, enabled: bool) -> Self {
        self.config.cte_enabled = enabled;
        self
    }

    pub fn root_frame_name(mut self, name: &str) -> Self {
        self.config.root_frame_name = name.to_string();
        self
    }

    /// Publish the root reference frame from this federate.
    pub fn publish_root_frame(mut self, enabled: bool) -> Self {
        self.config.publishes_root_frame = enabled;
        self
    }

    pub fn scenario_time_epoch(mut self, epoch: f64) -> Self {
        self.config.scenario_time_epoch = epoch;
        self
    }

    pub fn object(mut self, object: ObjectConfig) -> Self {
        self.config.objects.push(object);
        self
    }

    pub fn interaction(mut self, interaction: InteractionConfig) -> Self {
        self.config.interactions.push(interaction);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn fpu_validate(mut self, enabled: bool) -> Self {
        self.config.fpu_validate = enabled;
        self
    }

    /// Sleep between polls of blocking waits.
    pub fn wait_sleep(mut self, sleep: Duration) -> Self {
        self.config.wait_sleep = sleep;
        self
    }

    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.config.liveness_interval = interval;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<FederateConfig> {
        self.config.validate()?;
        log::debug!(
            "[config] federate '{}' in '{}': lcts={} lookahead={} padding={}",
            self.config.federate_name,
            self.config.federation_name,
            self.config.least_common_time_step,
            self.config.lookahead,
            self.config.time_padding
        );
        Ok(self.config)
    }
}
