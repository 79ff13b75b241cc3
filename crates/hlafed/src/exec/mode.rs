// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution modes and the transitions allowed between them.

use std::fmt;

use crate::config::{SP_MTR_FREEZE, SP_MTR_RUN, SP_MTR_SHUTDOWN};
use crate::error::{Error, Result};

/// Federation execution mode.
///
/// The discriminants are the values carried on the wire by the execution
/// configuration object and by mode transition requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i16)]
pub enum ExecutionMode {
    #[default]
    Uninitialized = 0,
    Initializing = 1,
    Running = 2,
    Freeze = 3,
    Shutdown = 4,
}

impl ExecutionMode {
    pub const fn as_i16(self) -> i16 {
        self as i16
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(ExecutionMode::Uninitialized),
            1 => Some(ExecutionMode::Initializing),
            2 => Some(ExecutionMode::Running),
            3 => Some(ExecutionMode::Freeze),
            4 => Some(ExecutionMode::Shutdown),
            _ => None,
        }
    }

    /// Whether the federation may move from `self` to `to`.
    pub fn can_transition_to(self, to: ExecutionMode) -> bool {
        use ExecutionMode::*;
        matches!(
            (self, to),
            (Uninitialized, Initializing)
                | (Initializing, Running)
                | (Initializing, Freeze)
                | (Running, Freeze)
                | (Freeze, Running)
                | (Uninitialized | Initializing | Running | Freeze, Shutdown)
        )
    }

    /// Check that `to` is a legal mode transition request from `self`.
    ///
    /// Only RUN, FREEZE and SHUTDOWN may be requested.
    pub fn validate_request(self, to: ExecutionMode) -> Result<()> {
        if !to.is_requestable() {
            return Err(Error::UnknownModeTransition(to.as_i16()));
        }
        if !self.can_transition_to(to) {
            return Err(Error::InvalidModeTransition { from: self, to });
        }
        Ok(())
    }

    pub fn is_requestable(self) -> bool {
        matches!(
            self,
            ExecutionMode::Running | ExecutionMode::Freeze | ExecutionMode::Shutdown
        )
    }

    /// Synchronisation point that carries a transition into this mode.
    pub fn sync_point(self) -> Option<&'static str> {
        match self {
            ExecutionMode::Running => Some(SP_MTR_RUN),
            ExecutionMode::Freeze => Some(SP_MTR_FREEZE),
            ExecutionMode::Shutdown => Some(SP_MTR_SHUTDOWN),
            _ => None,
        }
    }

    /// Mode carried by a transition synchronisation point label.
    pub fn from_sync_point(label: &str) -> Option<Self> {
        match label {
            SP_MTR_RUN => Some(ExecutionMode::Running),
            SP_MTR_FREEZE => Some(ExecutionMode::Freeze),
            SP_MTR_SHUTDOWN => Some(ExecutionMode::Shutdown),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Uninitialized => "UNINITIALIZED",
            ExecutionMode::Initializing => "INITIALIZING",
            ExecutionMode::Running => "RUNNING",
            ExecutionMode::Freeze => "FREEZE",
            ExecutionMode::Shutdown => "SHUTDOWN",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        for value in 0..=4 {
            let mode = ExecutionMode::from_i16(value).expect("valid mode");
            assert_eq!(mode.as_i16(), value);
        }
        assert_eq!(ExecutionMode::from_i16(5), None);
        assert_eq!(ExecutionMode::from_i16(-1), None);
    }

    #[test]
    fn test_transition_table() {
        use ExecutionMode::*;
        assert!(Running.can_transition_to(Freeze));
        assert!(Freeze.can_transition_to(Running));
        assert!(Running.can_transition_to(Shutdown));
        assert!(!Running.can_transition_to(Running));
        assert!(!Shutdown.can_transition_to(Running));
        assert!(!Freeze.can_transition_to(Initializing));
    }

    #[test]
    fn test_validate_request() {
        use ExecutionMode::*;
        assert!(Running.validate_request(Freeze).is_ok());
        assert!(matches!(
            Running.validate_request(Running),
            Err(Error::InvalidModeTransition { from: Running, to: Running })
        ));
        assert!(matches!(
            Running.validate_request(Initializing),
            Err(Error::UnknownModeTransition(1))
        ));
    }

    #[test]
    fn test_sync_point_mapping() {
        assert_eq!(ExecutionMode::Freeze.sync_point(), Some(SP_MTR_FREEZE));
        assert_eq!(ExecutionMode::from_sync_point(SP_MTR_RUN), Some(ExecutionMode::Running));
        assert_eq!(ExecutionMode::from_sync_point("phase_one"), None);
        assert_eq!(ExecutionMode::Initializing.sync_point(), None);
    }
}
