// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Mode transition request (MTR) interaction payload.
//!
//! The single `execution_mode` parameter is an i16 little-endian using the
//! [`ExecutionMode`] discriminants.

use crate::error::{Error, Result};
use crate::exec::ExecutionMode;

/// Encode a requested mode.
pub fn encode_mtr(mode: ExecutionMode) -> Vec<u8> {
    mode.as_i16().to_le_bytes().to_vec()
}

/// Decode a received request.
///
/// Anything other than RUN, FREEZE or SHUTDOWN is unrecognised.
pub fn decode_mtr(bytes: &[u8]) -> Result<ExecutionMode> {
    let raw: [u8; 2] = bytes
        .try_into()
        .map_err(|_| Error::InvalidState(format!("MTR payload of {} bytes", bytes.len())))?;
    let value = i16::from_le_bytes(raw);
    match ExecutionMode::from_i16(value) {
        Some(mode) if mode.is_requestable() => Ok(mode),
        _ => Err(Error::UnknownModeTransition(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mtr_wire_format() {
        assert_eq!(encode_mtr(ExecutionMode::Freeze), vec![3, 0]);
        assert_eq!(
            decode_mtr(&[4, 0]).expect("decode should succeed"),
            ExecutionMode::Shutdown
        );
    }

    #[test]
    fn test_unrecognised_requests() {
        assert!(matches!(decode_mtr(&[1, 0]), Err(Error::UnknownModeTransition(1))));
        assert!(matches!(decode_mtr(&[7, 0]), Err(Error::UnknownModeTransition(7))));
        assert!(matches!(decode_mtr(&[2]), Err(Error::InvalidState(_))));
    }
}
