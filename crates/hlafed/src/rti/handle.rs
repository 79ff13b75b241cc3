// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Guarded access to the RTI ambassador.

use std::sync::Arc;

use super::ambassador::RtiAmbassador;
use super::fpu::FpuGuard;
use crate::error::Result;

/// Shared RTI ambassador whose every call runs under an [`FpuGuard`].
#[derive(Clone)]
pub struct RtiHandle {
    rti: Arc<dyn RtiAmbassador>,
    fpu_validate: bool,
}

impl RtiHandle {
    pub fn new(rti: Arc<dyn RtiAmbassador>, fpu_validate: bool) -> Self {
        Self { rti, fpu_validate }
    }

    /// Run one RTI service call.
    ///
    /// # Example
    /// ```ignore
    /// let handle = rti.call("get_object_class_handle", |r| r.get_object_class_handle(EXCO_CLASS))?;
    /// ```
    pub fn call<T>(
        &self,
        service: &'static str,
        f: impl FnOnce(&dyn RtiAmbassador) -> Result<T>,
    ) -> Result<T> {
        let _guard = FpuGuard::new(service, self.fpu_validate);
        let result = f(self.rti.as_ref());
        if let Err(e) = &result {
            log::debug!("[rti] {} failed: {}", service, e);
        }
        result
    }

    pub fn is_joined(&self) -> bool {
        let _guard = FpuGuard::new("is_joined", self.fpu_validate);
        self.rti.is_joined()
    }
}
