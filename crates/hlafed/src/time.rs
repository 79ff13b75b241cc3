// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HLA logical time and the SpaceFOM timelines built on it.
//!
//! Logical time is an integer count of base time units
//! ([`BASE_TIME_MULTIPLIER`] units per second). Scenario time is the
//! physical timeline (`epoch + logical time`), and the optional common
//! timeline (CTE) is a shared wall clock.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::BASE_TIME_MULTIPLIER;

/// Point on the HLA logical timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Int64Time(i64);

/// Duration on the HLA logical timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "checkpoint-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Int64Interval(i64);

impl Int64Time {
    pub const ZERO: Int64Time = Int64Time(0);
    pub const MAX: Int64Time = Int64Time(i64::MAX);

    pub const fn from_base_units(units: i64) -> Self {
        Self(units)
    }

    /// Seconds rounded to the nearest base unit.
    pub fn from_seconds(seconds: f64) -> Self {
        Self(seconds_to_units(seconds))
    }

    pub const fn base_units(self) -> i64 {
        self.0
    }

    pub fn seconds(self) -> f64 {
        self.0 as f64 / BASE_TIME_MULTIPLIER as f64
    }

    /// Smallest multiple of `step` that is `>= self`.
    ///
    /// Non-positive steps return `self` unchanged.
    pub fn ceil_to_multiple(self, step: Int64Interval) -> Self {
        if step.0 <= 0 {
            return self;
        }
        let rem = self.0.rem_euclid(step.0);
        if rem == 0 {
            self
        } else {
            Self(self.0.saturating_add(step.0 - rem))
        }
    }

    pub fn is_multiple_of(self, step: Int64Interval) -> bool {
        step.0 > 0 && self.0 % step.0 == 0
    }
}

impl Int64Interval {
    pub const ZERO: Int64Interval = Int64Interval(0);

    pub const fn from_base_units(units: i64) -> Self {
        Self(units)
    }

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros * (BASE_TIME_MULTIPLIER / 1_000_000))
    }

    pub fn from_seconds(seconds: f64) -> Self {
        Self(seconds_to_units(seconds))
    }

    pub const fn base_units(self) -> i64 {
        self.0
    }

    pub fn seconds(self) -> f64 {
        self.0 as f64 / BASE_TIME_MULTIPLIER as f64
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Whether `self` is a whole multiple of `other` (`other > 0`).
    pub const fn is_multiple_of(self, other: Int64Interval) -> bool {
        other.0 > 0 && self.0 % other.0 == 0
    }

    pub const fn times(self, factor: i64) -> Self {
        Self(self.0.saturating_mul(factor))
    }
}

fn seconds_to_units(seconds: f64) -> i64 {
    (seconds * BASE_TIME_MULTIPLIER as f64).round() as i64
}

impl Add<Int64Interval> for Int64Time {
    type Output = Int64Time;

    fn add(self, rhs: Int64Interval) -> Int64Time {
        Int64Time(self.0.saturating_add(rhs.0))
    }
}

impl Sub<Int64Interval> for Int64Time {
    type Output = Int64Time;

    fn sub(self, rhs: Int64Interval) -> Int64Time {
        Int64Time(self.0.saturating_sub(rhs.0))
    }
}

impl Sub for Int64Time {
    type Output = Int64Interval;

    fn sub(self, rhs: Int64Time) -> Int64Interval {
        Int64Interval(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Int64Interval {
    type Output = Int64Interval;

    fn add(self, rhs: Int64Interval) -> Int64Interval {
        Int64Interval(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Int64Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.seconds())
    }
}

impl fmt::Display for Int64Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.seconds())
    }
}

/// Mapping between local simulation time, HLA logical time and scenario
/// time.
///
/// `hla = sim + offset`, `scenario = epoch + hla`. Early joiners start with
/// a zero offset; late joiners compute it from their first grant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScenarioTimeline {
    epoch: f64,
    offset: f64,
}

impl ScenarioTimeline {
    pub fn new(epoch: f64) -> Self {
        Self { epoch, offset: 0.0 }
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn set_epoch(&mut self, epoch: f64) {
        self.epoch = epoch;
    }

    /// Seconds between local simulation time and HLA logical time.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: f64) {
        self.offset = offset;
    }

    pub fn hla_from_sim(&self, sim_time: f64) -> f64 {
        sim_time + self.offset
    }

    pub fn sim_from_hla(&self, hla_time: f64) -> f64 {
        hla_time - self.offset
    }

    pub fn scenario_from_hla(&self, hla_time: f64) -> f64 {
        self.epoch + hla_time
    }

    pub fn hla_from_scenario(&self, scenario_time: f64) -> f64 {
        scenario_time - self.epoch
    }

    pub fn scenario_from_sim(&self, sim_time: f64) -> f64 {
        self.scenario_from_hla(self.hla_from_sim(sim_time))
    }
}

/// Common-timeline (CTE) clock shared by every federate.
pub trait CteClock: Send + Sync {
    /// Current CTE time in seconds.
    fn now(&self) -> f64;
}

/// CTE clock backed by the host system clock (seconds since the Unix
/// epoch).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCteClock;

impl CteClock for SystemCteClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_roundtrip() {
        let t = Int64Time::from_seconds(10.25);
        assert_eq!(t.base_units(), 10_250_000);
        assert_eq!(t.seconds(), 10.25);
        assert_eq!(Int64Interval::from_micros(250_000).seconds(), 0.25);
    }

    #[test]
    fn test_ceil_to_multiple() {
        let step = Int64Interval::from_micros(1_000);
        assert_eq!(
            Int64Time::from_base_units(12_345).ceil_to_multiple(step),
            Int64Time::from_base_units(13_000)
        );
        assert_eq!(
            Int64Time::from_base_units(13_000).ceil_to_multiple(step),
            Int64Time::from_base_units(13_000)
        );
        assert_eq!(
            Int64Time::from_base_units(-1_500).ceil_to_multiple(step),
            Int64Time::from_base_units(-1_000)
        );
    }

    #[test]
    fn test_interval_multiple() {
        let lcts = Int64Interval::from_micros(250_000);
        let padding = Int64Interval::from_micros(1_000_000);
        assert!(padding.is_multiple_of(lcts));
        assert!(!lcts.is_multiple_of(Int64Interval::from_micros(300_000)));
        assert!(!lcts.is_multiple_of(Int64Interval::ZERO));
    }

    #[test]
    fn test_timeline_offsets() {
        let mut timeline = ScenarioTimeline::new(1000.0);
        timeline.set_offset(2.5);
        assert_eq!(timeline.hla_from_sim(10.0), 12.5);
        assert_eq!(timeline.scenario_from_sim(10.0), 1012.5);
        assert_eq!(timeline.sim_from_hla(12.5), 10.0);
        assert_eq!(timeline.hla_from_scenario(1012.5), 12.5);
    }

    #[test]
    fn test_time_arithmetic_saturates() {
        let t = Int64Time::MAX + Int64Interval::from_base_units(1);
        assert_eq!(t, Int64Time::MAX);
        let d = Int64Time::from_base_units(5) - Int64Time::from_base_units(2);
        assert_eq!(d.base_units(), 3);
    }
}
