// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SpaceFOM `ReferenceFrame` and `PhysicalEntity` object bindings.
//!
//! Each binding owns a naming scheme for executive variables
//! (`<instance>.<attribute>`), registers them, produces the matching
//! [`ObjectConfig`] and moves frame/entity records in and out of the
//! variables. The attribute encoder does the wire work:
//!
//! | Attribute                    | Variable          | Encoding        |
//! |------------------------------|-------------------|-----------------|
//! | `name`, `parent_name`, ...   | `String` scalar   | unicode string  |
//! | `state`                      | `f64[14]`         | little endian   |
//! | accelerations, centre of mass| `f64[3]`          | little endian   |
//! | `body_wrt_structural`        | `f64[4]`          | little endian   |

use super::physical_entity::PhysicalEntity;
use super::ref_frame::RefFrame;
use super::space_time::{SpaceTimeCoordinate, SPACE_TIME_COORDINATE_LEN};
use crate::codec::{Encoding, SimVariable, VariableRef};
use crate::config::{
    AttributeConfig, ObjectConfig, PHYSICAL_ENTITY_CLASS, REFERENCE_FRAME_CLASS,
};
use crate::error::{Error, Result};
use crate::executive::Executive;
use crate::math::{QuaternionData, Vec3};

pub const ATTR_NAME: &str = "name";
pub const ATTR_PARENT_NAME: &str = "parent_name";
pub const ATTR_STATE: &str = "state";
pub const ATTR_TYPE: &str = "type";
pub const ATTR_STATUS: &str = "status";
pub const ATTR_PARENT_REFERENCE_FRAME: &str = "parent_reference_frame";
pub const ATTR_ACCELERATION: &str = "acceleration";
pub const ATTR_ROTATIONAL_ACCELERATION: &str = "rotational_acceleration";
pub const ATTR_CENTER_OF_MASS: &str = "center_of_mass";
pub const ATTR_BODY_WRT_STRUCTURAL: &str = "body_wrt_structural";

const FRAME_TEXT_ATTRIBUTES: [&str; 2] = [ATTR_NAME, ATTR_PARENT_NAME];

const ENTITY_TEXT_ATTRIBUTES: [&str; 4] =
    [ATTR_NAME, ATTR_TYPE, ATTR_STATUS, ATTR_PARENT_REFERENCE_FRAME];
const ENTITY_VECTOR_ATTRIBUTES: [&str; 3] = [
    ATTR_ACCELERATION,
    ATTR_ROTATIONAL_ACCELERATION,
    ATTR_CENTER_OF_MASS,
];

fn variable_name(instance: &str, attribute: &str) -> String {
    format!("{}.{}", instance, attribute)
}

fn lookup(exec: &dyn Executive, instance: &str, attribute: &str) -> Result<VariableRef> {
    let var_name = variable_name(instance, attribute);
    exec.lookup(&var_name).ok_or(Error::MissingVariable {
        fom_name: attribute.to_string(),
        var_name,
    })
}

fn type_mismatch(instance: &str, attribute: &str) -> Error {
    Error::InvalidState(format!(
        "variable {} has an unexpected type",
        variable_name(instance, attribute)
    ))
}

fn write_text(exec: &dyn Executive, instance: &str, attribute: &str, value: &str) -> Result<()> {
    let var = lookup(exec, instance, attribute)?;
    let ok = var.write().set_value(value.to_string());
    ok.then_some(()).ok_or_else(|| type_mismatch(instance, attribute))
}

fn read_text(exec: &dyn Executive, instance: &str, attribute: &str) -> Result<String> {
    let var = lookup(exec, instance, attribute)?;
    let value = var.read().value::<String>();
    value.ok_or_else(|| type_mismatch(instance, attribute))
}

fn write_doubles(exec: &dyn Executive, instance: &str, attribute: &str, values: &[f64]) -> Result<()> {
    let var = lookup(exec, instance, attribute)?;
    let ok = var.write().set_values(values);
    ok.then_some(()).ok_or_else(|| type_mismatch(instance, attribute))
}

fn read_doubles<const N: usize>(
    exec: &dyn Executive,
    instance: &str,
    attribute: &str,
) -> Result<[f64; N]> {
    let var = lookup(exec, instance, attribute)?;
    let guard = var.read();
    guard
        .get::<f64>()
        .and_then(|values| <[f64; N]>::try_from(values).ok())
        .ok_or_else(|| type_mismatch(instance, attribute))
}

fn text_attribute(instance: &str, attribute: &str, create: bool) -> AttributeConfig {
    bind(AttributeConfig::new(
        attribute,
        variable_name(instance, attribute),
        Encoding::UnicodeString,
    ), create)
}

fn double_attribute(instance: &str, attribute: &str, create: bool) -> AttributeConfig {
    bind(AttributeConfig::new(
        attribute,
        variable_name(instance, attribute),
        Encoding::LittleEndian,
    ), create)
}

fn bind(attribute: AttributeConfig, create: bool) -> AttributeConfig {
    if create {
        attribute.publish()
    } else {
        attribute.subscribe()
    }
}

// ============================================================================
// ReferenceFrame
// ============================================================================

/// Binding of one `ReferenceFrame` object instance to executive variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefFrameBinding {
    instance: String,
}

impl RefFrameBinding {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Register the instance variables, seeded from `frame`.
    pub fn register_variables(&self, exec: &dyn Executive, frame: &RefFrame) {
        let inst = &self.instance;
        exec.register(SimVariable::scalar(
            variable_name(inst, ATTR_NAME),
            frame.name.clone(),
        ));
        exec.register(SimVariable::scalar(
            variable_name(inst, ATTR_PARENT_NAME),
            frame.parent_name.clone(),
        ));
        exec.register(SimVariable::array(
            variable_name(inst, ATTR_STATE),
            frame.state.to_array().to_vec(),
        ));
    }

    /// Object binding: published when `create`, otherwise subscribed and
    /// required for initialisation.
    pub fn object_config(&self, create: bool) -> ObjectConfig {
        let inst = &self.instance;
        let mut object = ObjectConfig::new(REFERENCE_FRAME_CLASS, inst.clone());
        for attribute in FRAME_TEXT_ATTRIBUTES {
            object = object.attribute(text_attribute(inst, attribute, create));
        }
        object = object.attribute(double_attribute(inst, ATTR_STATE, create));
        if create {
            object.created()
        } else {
            object.required()
        }
    }

    /// Copy `frame` into the instance variables.
    pub fn write(&self, exec: &dyn Executive, frame: &RefFrame) -> Result<()> {
        let inst = &self.instance;
        write_text(exec, inst, ATTR_NAME, &frame.name)?;
        write_text(exec, inst, ATTR_PARENT_NAME, &frame.parent_name)?;
        write_doubles(exec, inst, ATTR_STATE, &frame.state.to_array())
    }

    /// Rebuild a frame from the instance variables.
    ///
    /// Accelerations are not part of the object and read back as zero.
    pub fn read(&self, exec: &dyn Executive) -> Result<RefFrame> {
        let inst = &self.instance;
        let mut frame = RefFrame::new(
            read_text(exec, inst, ATTR_NAME)?,
            read_text(exec, inst, ATTR_PARENT_NAME)?,
        );
        let state = read_doubles::<SPACE_TIME_COORDINATE_LEN>(exec, inst, ATTR_STATE)?;
        frame.state = SpaceTimeCoordinate::from_array(&state);
        Ok(frame)
    }
}

// ============================================================================
// PhysicalEntity
// ============================================================================

/// Binding of one `PhysicalEntity` object instance to executive variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalEntityBinding {
    instance: String,
}

impl PhysicalEntityBinding {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    fn text_fields(entity: &PhysicalEntity) -> [&str; 4] {
        [
            entity.name.as_str(),
            entity.entity_type.as_str(),
            entity.status.as_str(),
            entity.parent_frame.as_str(),
        ]
    }

    fn vector_fields(entity: &PhysicalEntity) -> [Vec3; 3] {
        [
            entity.acceleration,
            entity.rotational_acceleration,
            entity.center_of_mass,
        ]
    }

    fn quaternion_values(q: &QuaternionData) -> [f64; 4] {
        [q.scalar, q.vector[0], q.vector[1], q.vector[2]]
    }

    pub fn register_variables(&self, exec: &dyn Executive, entity: &PhysicalEntity) {
        let inst = &self.instance;
        for (attribute, value) in ENTITY_TEXT_ATTRIBUTES
            .iter()
            .zip(Self::text_fields(entity))
        {
            exec.register(SimVariable::scalar(
                variable_name(inst, attribute),
                value.to_string(),
            ));
        }
        exec.register(SimVariable::array(
            variable_name(inst, ATTR_STATE),
            entity.state.to_array().to_vec(),
        ));
        for (attribute, value) in ENTITY_VECTOR_ATTRIBUTES
            .iter()
            .zip(Self::vector_fields(entity))
        {
            exec.register(SimVariable::array(
                variable_name(inst, attribute),
                value.to_vec(),
            ));
        }
        exec.register(SimVariable::array(
            variable_name(inst, ATTR_BODY_WRT_STRUCTURAL),
            Self::quaternion_values(&entity.body_wrt_structural).to_vec(),
        ));
    }

    pub fn object_config(&self, create: bool) -> ObjectConfig {
        let inst = &self.instance;
        let mut object = ObjectConfig::new(PHYSICAL_ENTITY_CLASS, inst.clone());
        for attribute in ENTITY_TEXT_ATTRIBUTES {
            object = object.attribute(text_attribute(inst, attribute, create));
        }
        object = object.attribute(double_attribute(inst, ATTR_STATE, create));
        for attribute in ENTITY_VECTOR_ATTRIBUTES {
            object = object.attribute(double_attribute(inst, attribute, create));
        }
        object = object.attribute(double_attribute(inst, ATTR_BODY_WRT_STRUCTURAL, create));
        if create {
            object.created()
        } else {
            object
        }
    }

    pub fn write(&self, exec: &dyn Executive, entity: &PhysicalEntity) -> Result<()> {
        let inst = &self.instance;
        for (attribute, value) in ENTITY_TEXT_ATTRIBUTES
            .iter()
            .zip(Self::text_fields(entity))
        {
            write_text(exec, inst, attribute, value)?;
        }
        write_doubles(exec, inst, ATTR_STATE, &entity.state.to_array())?;
        for (attribute, value) in ENTITY_VECTOR_ATTRIBUTES
            .iter()
            .zip(Self::vector_fields(entity))
        {
            write_doubles(exec, inst, attribute, &value)?;
        }
        write_doubles(
            exec,
            inst,
            ATTR_BODY_WRT_STRUCTURAL,
            &Self::quaternion_values(&entity.body_wrt_structural),
        )
    }

    pub fn read(&self, exec: &dyn Executive) -> Result<PhysicalEntity> {
        let inst = &self.instance;
        let state = read_doubles::<SPACE_TIME_COORDINATE_LEN>(exec, inst, ATTR_STATE)?;
        let q = read_doubles::<4>(exec, inst, ATTR_BODY_WRT_STRUCTURAL)?;
        Ok(PhysicalEntity {
            name: read_text(exec, inst, ATTR_NAME)?,
            entity_type: read_text(exec, inst, ATTR_TYPE)?,
            status: read_text(exec, inst, ATTR_STATUS)?,
            parent_frame: read_text(exec, inst, ATTR_PARENT_REFERENCE_FRAME)?,
            state: SpaceTimeCoordinate::from_array(&state),
            acceleration: read_doubles::<3>(exec, inst, ATTR_ACCELERATION)?,
            rotational_acceleration: read_doubles::<3>(exec, inst, ATTR_ROTATIONAL_ACCELERATION)?,
            center_of_mass: read_doubles::<3>(exec, inst, ATTR_CENTER_OF_MASS)?,
            body_wrt_structural: QuaternionData::new(q[0], [q[1], q[2], q[3]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{pack, WireFormat};
    use crate::executive::SimExecutive;

    #[test]
    fn test_frame_variables_roundtrip() {
        let exec = SimExecutive::new(0.25);
        let binding = RefFrameBinding::new("EarthMJ2000Eq");
        let mut frame = RefFrame::new("EarthMJ2000Eq", "SolarSystemBarycentricInertial");
        frame.state.position = [1.5e11, -2.0e10, 3.0];
        frame.state.time = 42.5;

        binding.register_variables(&exec, &RefFrame::default());
        binding.write(&exec, &frame).expect("write should succeed");
        let back = binding.read(&exec).expect("read should succeed");
        assert_eq!(back, frame);
    }

    #[test]
    fn test_state_packs_as_fourteen_little_endian_doubles() {
        let exec = SimExecutive::new(0.25);
        let binding = RefFrameBinding::new("Root");
        let mut frame = RefFrame::root("Root");
        frame.state.velocity = [1.0, 2.0, 3.0];
        binding.register_variables(&exec, &frame);

        let var = exec.lookup("Root.state").expect("state variable registered");
        let guard = var.read();
        let format = WireFormat::resolve(
            Encoding::LittleEndian,
            guard.element_type(),
            guard.shape(),
            guard.units(),
        )
        .expect("state encoding should resolve");
        let mut bytes = Vec::new();
        pack(&format, &guard, &mut bytes).expect("pack should succeed");
        assert_eq!(bytes.len(), SPACE_TIME_COORDINATE_LEN * 8);
        assert_eq!(&bytes[24..32], &1.0f64.to_le_bytes());
        // Identity attitude scalar.
        assert_eq!(&bytes[48..56], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_object_config_roles() {
        let publisher = RefFrameBinding::new("Root").object_config(true);
        assert!(publisher.create);
        assert!(publisher.attributes.iter().all(|a| a.publish && a.locally_owned));
        assert_eq!(publisher.class_name, REFERENCE_FRAME_CLASS);

        let subscriber = RefFrameBinding::new("Root").object_config(false);
        assert!(subscriber.required);
        assert!(subscriber.attributes.iter().all(|a| a.subscribe && !a.publish));
    }

    #[test]
    fn test_entity_roundtrip_and_missing_variable() {
        let exec = SimExecutive::new(0.25);
        let binding = PhysicalEntityBinding::new("Lander");
        let mut entity = PhysicalEntity::new("Lander", "MoonCentricFixed");
        entity.entity_type = "vehicle".into();
        entity.center_of_mass = [0.1, 0.2, 0.3];

        assert!(matches!(
            binding.write(&exec, &entity),
            Err(Error::MissingVariable { .. })
        ));

        binding.register_variables(&exec, &PhysicalEntity::default());
        binding.write(&exec, &entity).expect("write should succeed");
        assert_eq!(binding.read(&exec).expect("read should succeed"), entity);
        assert_eq!(binding.object_config(true).attributes.len(), 9);
    }
}
