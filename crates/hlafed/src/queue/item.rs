// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Items carried from RTI callbacks to the application thread.

use crate::rti::{
    AttributeHandle, AttributeValues, DeliveryInfo, InteractionClassHandle, ObjectInstanceHandle,
    ParameterHandle, ParameterValues, TransportOrder,
};
use crate::time::Int64Time;

/// One encoded parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterItem {
    pub handle: ParameterHandle,
    pub data: Vec<u8>,
}

/// Received interaction with its parameter payloads.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionItem {
    pub class: InteractionClassHandle,
    pub parameters: Vec<ParameterItem>,
    pub tag: Vec<u8>,
    pub order: TransportOrder,
    /// Time stamp when delivered in time-stamp order.
    pub time: Option<Int64Time>,
}

impl InteractionItem {
    pub fn new(
        class: InteractionClassHandle,
        parameters: &ParameterValues,
        tag: &[u8],
        info: DeliveryInfo,
    ) -> Self {
        Self {
            class,
            parameters: parameters
                .iter()
                .map(|(handle, data)| ParameterItem {
                    handle: *handle,
                    data: data.clone(),
                })
                .collect(),
            tag: tag.to_vec(),
            order: info.order,
            time: info.time,
        }
    }

    pub fn parameter(&self, handle: ParameterHandle) -> Option<&[u8]> {
        self.parameters
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| p.data.as_slice())
    }
}

/// Reflected attribute values of one object instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeItem {
    pub object: ObjectInstanceHandle,
    pub values: Vec<(AttributeHandle, Vec<u8>)>,
    pub tag: Vec<u8>,
    pub order: TransportOrder,
    pub time: Option<Int64Time>,
}

impl AttributeItem {
    pub fn new(
        object: ObjectInstanceHandle,
        values: &AttributeValues,
        tag: &[u8],
        info: DeliveryInfo,
    ) -> Self {
        Self {
            object,
            values: values.clone(),
            tag: tag.to_vec(),
            order: info.order,
            time: info.time,
        }
    }
}
