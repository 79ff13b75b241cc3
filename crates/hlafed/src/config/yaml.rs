// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML federate configuration loader.
//!
//! # Example YAML
//!
//! ```yaml
//! federation: SpaceFederation
//! federate: Moon
//! master: false
//! known_federates:
//!   - name: Master
//!     required: true
//! timing:
//!   least_common_time_step: 0.25   # seconds
//!   lookahead: 0.25
//!   time_padding: 1.0
//! root_frame:
//!   name: SolarSystemBarycentricInertial
//!   publish: false
//! objects:
//!   - class: HLAobjectRoot.PhysicalEntity
//!     instance: Lander
//!     create: true
//!     attributes:
//!       - name: state
//!         variable: lander.state
//!         encoding: little_endian
//!         publish: true
//!         cycle_time: 0.5
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::federate::{
    AttributeConfig, FederateConfig, InteractionConfig, KnownFederate, ObjectConfig,
    ParameterConfig,
};
use crate::codec::Encoding;
use crate::error::{Error, Result};
use crate::rti::TransportOrder;
use crate::time::Int64Interval;

/// YAML federate configuration loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize)]
pub struct YamlFederateDocument {
    pub federation: String,
    pub federate: String,
    #[serde(default)]
    pub federate_type: Option<String>,
    /// Preset master role (omit to let the federation creator be master).
    #[serde(default)]
    pub master: Option<bool>,
    #[serde(default)]
    pub known_federates: Vec<YamlKnownFederate>,
    #[serde(default)]
    pub multiphase: Vec<String>,
    #[serde(default)]
    pub timing: YamlTiming,
    #[serde(default)]
    pub root_frame: YamlRootFrame,
    #[serde(default)]
    pub scenario_time_epoch: Option<f64>,
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    #[serde(default)]
    pub fpu_validate: Option<bool>,
    #[serde(default)]
    pub wait_sleep_ms: Option<u64>,
    #[serde(default)]
    pub objects: Vec<YamlObject>,
    #[serde(default)]
    pub interactions: Vec<YamlInteraction>,
}

/// Known federate entry.
#[derive(Debug, Deserialize)]
pub struct YamlKnownFederate {
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Timing section; durations in seconds.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlTiming {
    pub least_common_time_step: Option<f64>,
    pub lookahead: Option<f64>,
    pub time_padding: Option<f64>,
    pub regulating: Option<bool>,
    pub constrained: Option<bool>,
    pub cte: Option<bool>,
}

/// Root reference frame section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlRootFrame {
    pub name: Option<String>,
    pub publish: bool,
}

/// Object instance entry.
#[derive(Debug, Deserialize)]
pub struct YamlObject {
    pub class: String,
    pub instance: String,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub attributes: Vec<YamlAttribute>,
}

/// Attribute binding entry.
#[derive(Debug, Deserialize)]
pub struct YamlAttribute {
    pub name: String,
    pub variable: String,
    /// big_endian, little_endian, boolean, logical_time, unicode_string,
    /// ascii_string, c_string, opaque_data or none
    pub encoding: String,
    /// timestamp or receive
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub subscribe: bool,
    /// Defaults to `publish`.
    #[serde(default)]
    pub owned: Option<bool>,
    #[serde(default)]
    pub cycle_time: Option<f64>,
}

/// Interaction class entry.
#[derive(Debug, Deserialize)]
pub struct YamlInteraction {
    pub class: String,
    #[serde(default)]
    pub publish: bool,
    #[serde(default)]
    pub subscribe: bool,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub parameters: Vec<YamlParameter>,
}

/// Interaction parameter entry.
#[derive(Debug, Deserialize)]
pub struct YamlParameter {
    pub name: String,
    pub variable: String,
    pub encoding: String,
}

fn default_true() -> bool {
    true
}

impl YamlLoader {
    /// Load and validate a federate configuration from a YAML file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<FederateConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ConfigFileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        log::debug!("[config] loading {}", path.display());
        Self::load_str(&content)
    }

    /// Load and validate a federate configuration from a YAML string.
    pub fn load_str(content: &str) -> Result<FederateConfig> {
        let doc: YamlFederateDocument =
            serde_yaml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        Self::convert(doc)
    }

    fn convert(doc: YamlFederateDocument) -> Result<FederateConfig> {
        let mut builder = FederateConfig::builder(&doc.federation, &doc.federate);

        if let Some(federate_type) = &doc.federate_type {
            builder = builder.federate_type(federate_type);
        }
        if let Some(master) = doc.master {
            builder = builder.master(master);
        }
        for known in doc.known_federates {
            builder = builder.known_federate(KnownFederate {
                name: known.name,
                required: known.required,
            });
        }
        for label in &doc.multiphase {
            builder = builder.multiphase_sync_point(label);
        }

        let timing = &doc.timing;
        if let Some(lcts) = timing.least_common_time_step {
            builder = builder.least_common_time_step(Int64Interval::from_seconds(lcts));
        }
        if let Some(lookahead) = timing.lookahead {
            builder = builder.lookahead(Int64Interval::from_seconds(lookahead));
        }
        if let Some(padding) = timing.time_padding {
            builder = builder.time_padding(Int64Interval::from_seconds(padding));
        }
        if let Some(regulating) = timing.regulating {
            builder = builder.time_regulating(regulating);
        }
        if let Some(constrained) = timing.constrained {
            builder = builder.time_constrained(constrained);
        }
        if let Some(cte) = timing.cte {
            builder = builder.cte(cte);
        }

        if let Some(name) = &doc.root_frame.name {
            builder = builder.root_frame_name(name);
        }
        builder = builder.publish_root_frame(doc.root_frame.publish);

        if let Some(epoch) = doc.scenario_time_epoch {
            builder = builder.scenario_time_epoch(epoch);
        }
        if let Some(capacity) = doc.queue_capacity {
            builder = builder.queue_capacity(capacity);
        }
        if let Some(validate) = doc.fpu_validate {
            builder = builder.fpu_validate(validate);
        }
        if let Some(ms) = doc.wait_sleep_ms {
            builder = builder.wait_sleep(Duration::from_millis(ms));
        }

        for object in doc.objects {
            builder = builder.object(convert_object(object)?);
        }
        for interaction in doc.interactions {
            builder = builder.interaction(convert_interaction(interaction)?);
        }

        builder.build()
    }
}

fn convert_object(object: YamlObject) -> Result<ObjectConfig> {
    let mut config = ObjectConfig::new(object.class, object.instance);
    config.create = object.create;
    config.required = object.required;
    for attr in object.attributes {
        let mut binding =
            AttributeConfig::new(attr.name, attr.variable, parse_encoding(&attr.encoding)?);
        binding.publish = attr.publish;
        binding.subscribe = attr.subscribe;
        binding.locally_owned = attr.owned.unwrap_or(attr.publish);
        binding.cycle_time = attr.cycle_time;
        if let Some(order) = &attr.order {
            binding.order = parse_order(order)?;
        }
        config.attributes.push(binding);
    }
    Ok(config)
}

fn convert_interaction(interaction: YamlInteraction) -> Result<InteractionConfig> {
    let mut config = InteractionConfig::new(interaction.class);
    config.publish = interaction.publish;
    config.subscribe = interaction.subscribe;
    if let Some(order) = &interaction.order {
        config.order = parse_order(order)?;
    }
    for param in interaction.parameters {
        config.parameters.push(ParameterConfig::new(
            param.name,
            param.variable,
            parse_encoding(&param.encoding)?,
        ));
    }
    Ok(config)
}

fn parse_encoding(value: &str) -> Result<Encoding> {
    value.parse::<Encoding>().map_err(Error::ConfigParse)
}

fn parse_order(value: &str) -> Result<TransportOrder> {
    value.parse::<TransportOrder>().map_err(Error::ConfigParse)
}
