// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution configuration object (ExCO).
//!
//! Published by the master, reflected by everyone else. Every attribute is
//! little-endian except the root frame name, which is an HLAunicodeString:
//!
//! | Attribute                 | Wire type            |
//! |---------------------------|----------------------|
//! | `root_frame_name`         | HLAunicodeString     |
//! | `scenario_time_epoch`     | f64 LE (seconds)     |
//! | `next_mode_scenario_time` | f64 LE (seconds)     |
//! | `next_mode_cte_time`      | f64 LE (seconds)     |
//! | `current_execution_mode`  | i16 LE               |
//! | `next_execution_mode`     | i16 LE               |
//! | `least_common_time_step`  | i64 LE (microseconds)|

use crate::codec::{decode_unicode_string, encode_unicode_string, CodecError, CodecResult};
use crate::config::{
    EXCO_CURRENT_EXECUTION_MODE, EXCO_LEAST_COMMON_TIME_STEP, EXCO_NEXT_EXECUTION_MODE,
    EXCO_NEXT_MODE_CTE_TIME, EXCO_NEXT_MODE_SCENARIO_TIME, EXCO_ROOT_FRAME_NAME,
    EXCO_SCENARIO_TIME_EPOCH,
};
use crate::error::{Error, Result};
use crate::exec::ExecutionMode;
use crate::executive::Executive;
use crate::time::Int64Interval;

/// Federation-wide execution configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfiguration {
    pub root_frame_name: String,
    pub scenario_time_epoch: f64,
    pub next_mode_scenario_time: f64,
    pub next_mode_cte_time: f64,
    pub current_execution_mode: ExecutionMode,
    pub next_execution_mode: ExecutionMode,
    pub least_common_time_step: Int64Interval,
}

impl ExecutionConfiguration {
    /// Encode one attribute by FOM name.
    pub fn encode_attribute(&self, name: &str) -> CodecResult<Vec<u8>> {
        let mut out = Vec::with_capacity(8);
        match name {
            EXCO_ROOT_FRAME_NAME => encode_unicode_string(&self.root_frame_name, &mut out)?,
            EXCO_SCENARIO_TIME_EPOCH => out.extend_from_slice(&self.scenario_time_epoch.to_le_bytes()),
            EXCO_NEXT_MODE_SCENARIO_TIME => {
                out.extend_from_slice(&self.next_mode_scenario_time.to_le_bytes())
            }
            EXCO_NEXT_MODE_CTE_TIME => out.extend_from_slice(&self.next_mode_cte_time.to_le_bytes()),
            EXCO_CURRENT_EXECUTION_MODE => {
                out.extend_from_slice(&self.current_execution_mode.as_i16().to_le_bytes())
            }
            EXCO_NEXT_EXECUTION_MODE => {
                out.extend_from_slice(&self.next_execution_mode.as_i16().to_le_bytes())
            }
            EXCO_LEAST_COMMON_TIME_STEP => {
                out.extend_from_slice(&self.least_common_time_step.base_units().to_le_bytes())
            }
            other => {
                return Err(CodecError::InvalidData {
                    reason: format!("unknown ExCO attribute '{}'", other),
                })
            }
        }
        Ok(out)
    }

    /// Decode one attribute by FOM name into `self`.
    ///
    /// On error `self` is unchanged.
    pub fn apply_attribute(&mut self, name: &str, bytes: &[u8]) -> CodecResult<()> {
        match name {
            EXCO_ROOT_FRAME_NAME => self.root_frame_name = decode_unicode_string(bytes)?,
            EXCO_SCENARIO_TIME_EPOCH => self.scenario_time_epoch = f64::from_le_bytes(exact(bytes)?),
            EXCO_NEXT_MODE_SCENARIO_TIME => {
                self.next_mode_scenario_time = f64::from_le_bytes(exact(bytes)?)
            }
            EXCO_NEXT_MODE_CTE_TIME => self.next_mode_cte_time = f64::from_le_bytes(exact(bytes)?),
            EXCO_CURRENT_EXECUTION_MODE => self.current_execution_mode = decode_mode(bytes)?,
            EXCO_NEXT_EXECUTION_MODE => self.next_execution_mode = decode_mode(bytes)?,
            EXCO_LEAST_COMMON_TIME_STEP => {
                self.least_common_time_step =
                    Int64Interval::from_base_units(i64::from_le_bytes(exact(bytes)?))
            }
            other => {
                return Err(CodecError::InvalidData {
                    reason: format!("unknown ExCO attribute '{}'", other),
                })
            }
        }
        Ok(())
    }

    /// Whether a federate with `lookahead` can step on this LCTS: the
    /// lookahead must not exceed it and must divide it.
    pub fn accepts_lookahead(&self, lookahead: Int64Interval) -> bool {
        let lcts = self.least_common_time_step;
        lcts >= lookahead && (!lookahead.is_positive() || lcts.is_multiple_of(lookahead))
    }

    /// Check the timing relationships before the master sends.
    pub fn validate_for_send(&self, lookahead: Int64Interval, software_frame: f64) -> Result<()> {
        let lcts = self.least_common_time_step;
        if !lcts.is_positive() {
            return Err(Error::InvalidTiming(format!(
                "ExCO least common time step {} must be positive",
                lcts
            )));
        }
        if lcts < lookahead {
            return Err(Error::InvalidTiming(format!(
                "ExCO least common time step {} is below lookahead {}",
                lcts, lookahead
            )));
        }
        if !self.accepts_lookahead(lookahead) {
            return Err(Error::InvalidTiming(format!(
                "ExCO least common time step {} is not a multiple of lookahead {}",
                lcts, lookahead
            )));
        }
        let frame = Int64Interval::from_seconds(software_frame);
        if !frame.is_positive() || !lcts.is_multiple_of(frame) {
            return Err(Error::InvalidTiming(format!(
                "software frame {:.6}s is not an integer submultiple of LCTS {}",
                software_frame, lcts
            )));
        }
        Ok(())
    }

    /// Reconcile a received configuration with local timing.
    ///
    /// Violations are clamped with a warning rather than rejected. Returns
    /// `true` when the software frame was rewritten.
    pub fn reconcile_on_receive(&self, lookahead: Int64Interval, executive: &dyn Executive) -> bool {
        let lcts = self.least_common_time_step;
        if !lcts.is_positive() {
            log::warn!("[exco] received non-positive LCTS {}, ignored", lcts);
            return false;
        }
        if lcts < lookahead {
            log::warn!(
                "[exco] received LCTS {} below local lookahead {}",
                lcts,
                lookahead
            );
        } else if !self.accepts_lookahead(lookahead) {
            log::warn!(
                "[exco] received LCTS {} is not a multiple of local lookahead {}",
                lcts,
                lookahead
            );
        }
        let software_frame = executive.software_frame();
        let frame = Int64Interval::from_seconds(software_frame);
        if frame > lcts || !lcts.is_multiple_of(frame) {
            log::warn!(
                "[exco] software frame {:.6}s incompatible with LCTS {}, using LCTS",
                software_frame,
                lcts
            );
            executive.set_software_frame(lcts.seconds());
            return true;
        }
        false
    }
}

fn exact<const N: usize>(bytes: &[u8]) -> CodecResult<[u8; N]> {
    bytes.try_into().map_err(|_| CodecError::LengthMismatch {
        expected: N,
        actual: bytes.len(),
    })
}

fn decode_mode(bytes: &[u8]) -> CodecResult<ExecutionMode> {
    let value = i16::from_le_bytes(exact(bytes)?);
    ExecutionMode::from_i16(value).ok_or_else(|| CodecError::InvalidData {
        reason: format!("unknown execution mode {}", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EXCO_ATTRIBUTES;
    use crate::executive::SimExecutive;

    fn sample() -> ExecutionConfiguration {
        ExecutionConfiguration {
            root_frame_name: "SolarSystemBarycentricInertial".into(),
            scenario_time_epoch: 2_460_000.5,
            next_mode_scenario_time: 6.0,
            next_mode_cte_time: 0.0,
            current_execution_mode: ExecutionMode::Running,
            next_execution_mode: ExecutionMode::Freeze,
            least_common_time_step: Int64Interval::from_micros(250_000),
        }
    }

    #[test]
    fn test_attribute_byte_layout() {
        let exco = sample();
        assert_eq!(
            exco.encode_attribute(EXCO_CURRENT_EXECUTION_MODE)
                .expect("encode should succeed"),
            vec![2, 0]
        );
        assert_eq!(
            exco.encode_attribute(EXCO_LEAST_COMMON_TIME_STEP)
                .expect("encode should succeed"),
            250_000i64.to_le_bytes().to_vec()
        );
        assert_eq!(
            exco.encode_attribute(EXCO_NEXT_MODE_SCENARIO_TIME)
                .expect("encode should succeed"),
            6.0f64.to_le_bytes().to_vec()
        );
        let name = exco
            .encode_attribute(EXCO_ROOT_FRAME_NAME)
            .expect("encode should succeed");
        assert_eq!(&name[..4], &30u32.to_be_bytes());
        assert_eq!(&name[4..6], &[0, b'S']);
    }

    #[test]
    fn test_all_attributes_transfer() {
        let source = sample();
        let mut target = ExecutionConfiguration::default();
        for name in EXCO_ATTRIBUTES {
            let bytes = source.encode_attribute(name).expect("encode should succeed");
            target
                .apply_attribute(name, &bytes)
                .expect("apply should succeed");
        }
        assert_eq!(target, source);
    }

    #[test]
    fn test_bad_mode_leaves_value() {
        let mut exco = sample();
        let err = exco
            .apply_attribute(EXCO_NEXT_EXECUTION_MODE, &9i16.to_le_bytes())
            .expect_err("mode 9 is unknown");
        assert!(matches!(err, CodecError::InvalidData { .. }));
        assert_eq!(exco.next_execution_mode, ExecutionMode::Freeze);

        let err = exco
            .apply_attribute(EXCO_SCENARIO_TIME_EPOCH, &[0u8; 4])
            .expect_err("short epoch");
        assert_eq!(err, CodecError::LengthMismatch { expected: 8, actual: 4 });
    }

    #[test]
    fn test_send_validation_is_strict() {
        let exco = sample();
        assert!(exco
            .validate_for_send(Int64Interval::from_micros(250_000), 0.25)
            .is_ok());
        assert!(matches!(
            exco.validate_for_send(Int64Interval::from_micros(500_000), 0.25),
            Err(Error::InvalidTiming(_))
        ));
        assert!(matches!(
            exco.validate_for_send(Int64Interval::from_micros(250_000), 0.1),
            Err(Error::InvalidTiming(_))
        ));
    }

    #[test]
    fn test_lookahead_must_divide_lcts() {
        let mut exco = sample();
        exco.least_common_time_step = Int64Interval::from_micros(1_000_000);
        let lookahead = Int64Interval::from_micros(300_000);

        assert!(!exco.accepts_lookahead(lookahead));
        assert!(exco.accepts_lookahead(Int64Interval::from_micros(250_000)));
        assert!(exco.accepts_lookahead(Int64Interval::ZERO));
        assert!(matches!(
            exco.validate_for_send(lookahead, 0.5),
            Err(Error::InvalidTiming(_))
        ));

        // Receive side warns and keeps going; a compatible frame is untouched.
        let exec = SimExecutive::new(0.5);
        assert!(!exco.reconcile_on_receive(lookahead, &exec));
        assert_eq!(exec.software_frame(), 0.5);
    }

    #[test]
    fn test_receive_clamps_software_frame() {
        let exco = sample();
        let exec = SimExecutive::new(0.25);

        exec.set_software_frame(0.125);
        assert!(!exco.reconcile_on_receive(Int64Interval::from_micros(250_000), &exec));
        assert_eq!(exec.software_frame(), 0.125);

        exec.set_software_frame(0.5);
        assert!(exco.reconcile_on_receive(Int64Interval::from_micros(250_000), &exec));
        assert_eq!(exec.software_frame(), 0.25);

        exec.set_software_frame(0.1);
        assert!(exco.reconcile_on_receive(Int64Interval::from_micros(250_000), &exec));
        assert_eq!(exec.software_frame(), 0.25);
    }
}
