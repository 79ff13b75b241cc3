// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTI abstraction: handles, ambassador traits and transports.
//!
//! The federation core talks to the Runtime Infrastructure through
//! [`RtiAmbassador`] and receives callbacks through [`FederateAmbassador`].
//! [`LoopbackRti`] implements both ends inside one process; every call from
//! the core goes through [`RtiHandle`], which guards the floating-point
//! control word around the call.

pub mod ambassador;
pub mod fpu;
pub mod handle;
pub mod loopback;

pub use ambassador::{FederateAmbassador, RtiAmbassador};
pub use fpu::FpuGuard;
pub use handle::RtiHandle;
pub use loopback::LoopbackRti;

use std::fmt;
use std::str::FromStr;

use crate::time::Int64Time;

macro_rules! rti_handle {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

rti_handle!(
    /// Joined federate.
    FederateHandle(u32)
);
rti_handle!(
    /// Object class.
    ObjectClassHandle(u32)
);
rti_handle!(
    /// Attribute of an object class.
    AttributeHandle(u32)
);
rti_handle!(
    /// Registered or discovered object instance.
    ObjectInstanceHandle(u64)
);
rti_handle!(
    /// Interaction class.
    InteractionClassHandle(u32)
);
rti_handle!(
    /// Parameter of an interaction class.
    ParameterHandle(u32)
);

/// Encoded attribute values of one update, keyed by attribute handle.
pub type AttributeValues = Vec<(AttributeHandle, Vec<u8>)>;

/// Encoded parameter values of one interaction, keyed by parameter handle.
pub type ParameterValues = Vec<(ParameterHandle, Vec<u8>)>;

/// Delivery order of an update or interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportOrder {
    /// Time-stamp order: delivered only once logical time reaches the stamp.
    #[default]
    Timestamp,
    /// Receive order: delivered as soon as it arrives.
    Receive,
}

impl TransportOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportOrder::Timestamp => "timestamp",
            TransportOrder::Receive => "receive",
        }
    }
}

impl fmt::Display for TransportOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestamp" | "tso" | "timestamp_order" => Ok(TransportOrder::Timestamp),
            "receive" | "ro" | "receive_order" => Ok(TransportOrder::Receive),
            other => Err(format!("unknown transport order '{}'", other)),
        }
    }
}

/// Delivery information attached to a reflection or received interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryInfo {
    pub order: TransportOrder,
    /// Time stamp of a TSO delivery.
    pub time: Option<Int64Time>,
    /// Federate that produced the update.
    pub producer: FederateHandle,
}
