// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTI service and callback interfaces (IEEE 1516 subset).

use std::sync::Arc;

use super::{
    AttributeHandle, AttributeValues, DeliveryInfo, FederateHandle, InteractionClassHandle,
    ObjectClassHandle, ObjectInstanceHandle, ParameterHandle, ParameterValues,
};
use crate::error::Result;
use crate::time::{Int64Interval, Int64Time};

/// Services offered by the RTI to one federate.
///
/// Asynchronous results (name reservation, synchronisation, time grants,
/// ownership) arrive later through the [`FederateAmbassador`] passed to
/// [`RtiAmbassador::connect`].
pub trait RtiAmbassador: Send + Sync {
    // ------------------------------------------------------------------
    // Federation management
    // ------------------------------------------------------------------

    fn connect(&self, ambassador: Arc<dyn FederateAmbassador>) -> Result<()>;

    /// Returns `true` when this call created the execution, `false` when it
    /// already existed.
    fn create_federation_execution(&self, federation: &str) -> Result<bool>;

    fn join_federation_execution(
        &self,
        federate_name: &str,
        federate_type: &str,
        federation: &str,
    ) -> Result<FederateHandle>;

    fn resign_federation_execution(&self) -> Result<()>;

    /// Returns `false` when other federates are still joined.
    fn destroy_federation_execution(&self, federation: &str) -> Result<bool>;

    fn enable_asynchronous_delivery(&self) -> Result<()>;

    /// Names of every federate currently joined to this federation.
    fn joined_federate_names(&self) -> Result<Vec<String>>;

    /// Whether this federate is still a member of its federation.
    fn is_joined(&self) -> bool;

    // ------------------------------------------------------------------
    // Synchronisation points
    // ------------------------------------------------------------------

    fn register_federation_synchronization_point(&self, label: &str, tag: &[u8]) -> Result<()>;

    fn synchronization_point_achieved(&self, label: &str) -> Result<()>;

    // ------------------------------------------------------------------
    // Declaration management
    // ------------------------------------------------------------------

    fn get_object_class_handle(&self, name: &str) -> Result<ObjectClassHandle>;

    fn get_attribute_handle(&self, class: ObjectClassHandle, name: &str) -> Result<AttributeHandle>;

    fn get_interaction_class_handle(&self, name: &str) -> Result<InteractionClassHandle>;

    fn get_parameter_handle(
        &self,
        class: InteractionClassHandle,
        name: &str,
    ) -> Result<ParameterHandle>;

    fn publish_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()>;

    fn subscribe_object_class_attributes(
        &self,
        class: ObjectClassHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()>;

    fn publish_interaction_class(&self, class: InteractionClassHandle) -> Result<()>;

    fn subscribe_interaction_class(&self, class: InteractionClassHandle) -> Result<()>;

    // ------------------------------------------------------------------
    // Object management
    // ------------------------------------------------------------------

    fn reserve_object_instance_name(&self, name: &str) -> Result<()>;

    fn register_object_instance(
        &self,
        class: ObjectClassHandle,
        name: &str,
    ) -> Result<ObjectInstanceHandle>;

    /// Send an update; `time` selects time-stamp order.
    fn update_attribute_values(
        &self,
        object: ObjectInstanceHandle,
        values: AttributeValues,
        tag: &[u8],
        time: Option<Int64Time>,
    ) -> Result<()>;

    fn request_attribute_value_update(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) -> Result<()>;

    fn send_interaction(
        &self,
        class: InteractionClassHandle,
        parameters: ParameterValues,
        tag: &[u8],
        time: Option<Int64Time>,
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Ownership management
    // ------------------------------------------------------------------

    /// Unconditionally take ownership of `attributes` from their current
    /// owner.
    fn attribute_ownership_acquisition(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Time management
    // ------------------------------------------------------------------

    fn enable_time_regulation(&self, lookahead: Int64Interval) -> Result<()>;

    fn enable_time_constrained(&self) -> Result<()>;

    fn time_advance_request(&self, time: Int64Time) -> Result<()>;

    /// Greatest available logical time, `None` when no federate regulates.
    fn query_galt(&self) -> Result<Option<Int64Time>>;

    fn query_logical_time(&self) -> Result<Int64Time>;
}

/// Callbacks delivered by the RTI to one federate.
///
/// Implementations must not block: record the event and return.
#[allow(unused_variables)]
pub trait FederateAmbassador: Send + Sync {
    fn synchronization_point_registration_succeeded(&self, label: &str) {}

    fn synchronization_point_registration_failed(&self, label: &str, reason: &str) {}

    fn announce_synchronization_point(&self, label: &str, tag: &[u8]) {}

    fn federation_synchronized(&self, label: &str) {}

    fn object_instance_name_reservation_succeeded(&self, name: &str) {}

    fn object_instance_name_reservation_failed(&self, name: &str) {}

    fn discover_object_instance(
        &self,
        object: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: &str,
    ) {
    }

    fn remove_object_instance(&self, object: ObjectInstanceHandle) {}

    fn reflect_attribute_values(
        &self,
        object: ObjectInstanceHandle,
        values: &AttributeValues,
        tag: &[u8],
        info: DeliveryInfo,
    ) {
    }

    fn receive_interaction(
        &self,
        class: InteractionClassHandle,
        parameters: &ParameterValues,
        tag: &[u8],
        info: DeliveryInfo,
    ) {
    }

    fn provide_attribute_value_update(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: &[u8],
    ) {
    }

    fn attribute_ownership_acquisition_notification(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) {
    }

    /// Ownership of `attributes` was taken by another federate.
    fn request_attribute_ownership_release(
        &self,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) {
    }

    fn time_regulation_enabled(&self, time: Int64Time) {}

    fn time_constrained_enabled(&self, time: Int64Time) {}

    fn time_advance_grant(&self, time: Int64Time) {}

    /// The connection to the federation was lost.
    fn connection_lost(&self, reason: &str) {}
}
