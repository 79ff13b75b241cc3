// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Polling waits with periodic liveness checks.
//!
//! Every blocking wait of the federation core runs through
//! [`WaitPolicy::wait`]: poll, sleep a short interval, and every
//! `liveness_interval` ask the poll to verify federation membership as well.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::{LIVENESS_CHECK_INTERVAL, WAIT_SLEEP};
use crate::error::Result;

/// Information passed to each poll of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTick {
    /// The liveness interval elapsed: check membership on this poll.
    pub check_liveness: bool,
    /// Zero-based poll count.
    pub iteration: u64,
}

/// Sleep and liveness settings of blocking waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub sleep: Duration,
    pub liveness_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            sleep: WAIT_SLEEP,
            liveness_interval: LIVENESS_CHECK_INTERVAL,
        }
    }
}

impl WaitPolicy {
    pub fn new(sleep: Duration, liveness_interval: Duration) -> Self {
        Self {
            sleep,
            liveness_interval,
        }
    }

    /// Poll `step` until it returns `Ok(true)` or an error.
    ///
    /// `step` is responsible for aborting on shutdown and for checking
    /// membership when [`WaitTick::check_liveness`] is set.
    pub fn wait<F>(&self, what: &str, mut step: F) -> Result<()>
    where
        F: FnMut(WaitTick) -> Result<bool>,
    {
        let started = Instant::now();
        let mut last_liveness = started;
        let mut iteration = 0u64;
        loop {
            let check_liveness = last_liveness.elapsed() >= self.liveness_interval;
            if check_liveness {
                last_liveness = Instant::now();
                log::debug!(
                    "[exec] still waiting for {} after {:.1}s",
                    what,
                    started.elapsed().as_secs_f64()
                );
            }
            match step(WaitTick {
                check_liveness,
                iteration,
            }) {
                Ok(true) => {
                    if iteration > 0 {
                        log::trace!("[exec] {} after {} polls", what, iteration);
                    }
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => {
                    log::debug!("[exec] wait for {} aborted: {}", what, e);
                    return Err(e);
                }
            }
            iteration += 1;
            thread::sleep(self.sleep);
        }
    }
}
