// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge between the federation core and the host simulation executive.
//!
//! The core never owns simulation state. It resolves variables by name,
//! asks the executive to grow dynamic buffers, reads the clocks and drives
//! the freeze/run/stop primitives. [`SimExecutive`] is a small stepping
//! executive used by tests, benches and stand-alone federates.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::codec::{new_variable_ref, SimVariable, VariableRef};
use crate::config::BASE_TIME_MULTIPLIER;

/// Storage allocator for simulation variables.
///
/// Dynamic arrays are only ever grown through this trait so a host with its
/// own allocator keeps track of every buffer it hands to the core.
pub trait MemoryManager: Send + Sync {
    /// Take ownership of a new variable and return a shared handle to it.
    fn allocate(&self, variable: SimVariable) -> VariableRef;

    /// Resize a dynamic variable to `count` elements.
    ///
    /// Returns `false` when the variable cannot be resized.
    fn resize(&self, variable: &mut SimVariable, count: usize) -> bool {
        variable.resize(count)
    }
}

/// Plain heap allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapMemoryManager;

impl MemoryManager for HeapMemoryManager {
    fn allocate(&self, variable: SimVariable) -> VariableRef {
        new_variable_ref(variable)
    }
}

/// Services the federation core needs from the simulation executive.
pub trait Executive: MemoryManager {
    /// Resolve a variable by name.
    fn lookup(&self, name: &str) -> Option<VariableRef>;

    /// Register a variable under its own name, replacing any previous one.
    fn register(&self, variable: SimVariable) -> VariableRef;

    /// Local simulation time in seconds.
    fn sim_time(&self) -> f64;

    /// Seconds of wall clock since the executive started.
    fn wall_clock(&self) -> f64;

    /// Period of the core job that calls the pre/post step hooks (seconds).
    fn core_cycle(&self) -> f64;

    fn software_frame(&self) -> f64;

    fn set_software_frame(&self, frame: f64);

    /// Freeze the executive once simulation time reaches `sim_time`.
    fn freeze_at(&self, sim_time: f64);

    /// Leave freeze.
    fn run(&self);

    /// Terminate the simulation.
    fn stop(&self);

    fn is_frozen(&self) -> bool;

    fn is_stopped(&self) -> bool;
}

/// Reference stepping executive.
///
/// Simulation time is held as an integer count of base time units so that
/// repeated steps stay aligned with HLA logical time.
pub struct SimExecutive {
    variables: DashMap<String, VariableRef>,
    sim_units: AtomicI64,
    core_cycle_units: i64,
    software_frame: Mutex<f64>,
    freeze_at: Mutex<Option<i64>>,
    frozen: AtomicBool,
    stopped: AtomicBool,
    started: Instant,
}

impl SimExecutive {
    /// Create an executive whose core job runs every `core_cycle` seconds.
    pub fn new(core_cycle: f64) -> Self {
        let core_cycle_units = (core_cycle * BASE_TIME_MULTIPLIER as f64).round() as i64;
        Self {
            variables: DashMap::new(),
            sim_units: AtomicI64::new(0),
            core_cycle_units: core_cycle_units.max(1),
            software_frame: Mutex::new(core_cycle),
            freeze_at: Mutex::new(None),
            frozen: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            started: Instant::now(),
        }
    }

    /// Shared handle, convenient when a federate and the host loop both
    /// hold the executive.
    pub fn shared(core_cycle: f64) -> Arc<Self> {
        Arc::new(Self::new(core_cycle))
    }

    /// Advance simulation time by one core cycle unless frozen or stopped.
    ///
    /// Returns `true` when time advanced.
    pub fn step(&self) -> bool {
        if self.is_stopped() || self.is_frozen() {
            return false;
        }
        let now = self.sim_units.fetch_add(self.core_cycle_units, Ordering::AcqRel)
            + self.core_cycle_units;

        let mut freeze_at = self.freeze_at.lock();
        if let Some(at) = *freeze_at {
            if now >= at {
                *freeze_at = None;
                self.frozen.store(true, Ordering::Release);
                log::debug!("[exec] frozen at sim time {:.6}", now as f64 / BASE_TIME_MULTIPLIER as f64);
            }
        }
        true
    }

    /// Jump simulation time (used when a run starts at a non-zero time).
    pub fn set_sim_time(&self, seconds: f64) {
        let units = (seconds * BASE_TIME_MULTIPLIER as f64).round() as i64;
        self.sim_units.store(units, Ordering::Release);
    }

    /// Number of registered variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

impl MemoryManager for SimExecutive {
    fn allocate(&self, variable: SimVariable) -> VariableRef {
        self.register(variable)
    }
}

impl Executive for SimExecutive {
    fn lookup(&self, name: &str) -> Option<VariableRef> {
        self.variables.get(name).map(|entry| Arc::clone(entry.value()))
    }

    fn register(&self, variable: SimVariable) -> VariableRef {
        let name = variable.name().to_string();
        let handle = new_variable_ref(variable);
        self.variables.insert(name, Arc::clone(&handle));
        handle
    }

    fn sim_time(&self) -> f64 {
        self.sim_units.load(Ordering::Acquire) as f64 / BASE_TIME_MULTIPLIER as f64
    }

    fn wall_clock(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn core_cycle(&self) -> f64 {
        self.core_cycle_units as f64 / BASE_TIME_MULTIPLIER as f64
    }

    fn software_frame(&self) -> f64 {
        *self.software_frame.lock()
    }

    fn set_software_frame(&self, frame: f64) {
        log::debug!("[exec] software frame set to {:.6}s", frame);
        *self.software_frame.lock() = frame;
    }

    fn freeze_at(&self, sim_time: f64) {
        let at = (sim_time * BASE_TIME_MULTIPLIER as f64).round() as i64;
        if at <= self.sim_units.load(Ordering::Acquire) {
            self.frozen.store(true, Ordering::Release);
            *self.freeze_at.lock() = None;
            log::debug!("[exec] frozen at sim time {:.6}", self.sim_time());
        } else {
            *self.freeze_at.lock() = Some(at);
        }
    }

    fn run(&self) {
        *self.freeze_at.lock() = None;
        self.frozen.store(false, Ordering::Release);
        log::debug!("[exec] running from sim time {:.6}", self.sim_time());
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        log::debug!("[exec] stopped at sim time {:.6}", self.sim_time());
    }

    fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
