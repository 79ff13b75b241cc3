// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every hlafed subsystem.
//!
//! Variants are grouped by the five error families of the federation core:
//!
//! | Family        | Severity                       | Example                          |
//! |---------------|--------------------------------|----------------------------------|
//! | Configuration | fatal at initialisation        | illegal encoding for a variable  |
//! | Protocol      | fatal                          | invalid mode transition          |
//! | Data          | recoverable (warn, skip update)| decoded length too large         |
//! | Environment   | triggers the shutdown path     | federation membership lost       |
//! | Internal      | fatal                          | missing execution configuration  |
//!
//! Use [`Error::is_fatal`] to decide whether an error must terminate the
//! federate.

use crate::codec::CodecError;
use crate::exec::ExecutionMode;

/// Errors returned by hlafed operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Generic configuration error.
    Config(String),
    /// Encoding is not legal for the bound variable's element type or shape.
    UnsupportedAttributeType {
        /// FOM attribute or parameter name.
        fom_name: String,
        /// Executive variable name.
        var_name: String,
        /// Why the combination was rejected.
        reason: String,
    },
    /// Executive variable could not be resolved by name.
    MissingVariable {
        /// FOM attribute or parameter name.
        fom_name: String,
        /// Executive variable name.
        var_name: String,
    },
    /// Attribute cycle time is not an integer multiple of the core cycle.
    InvalidCycleTime {
        /// FOM attribute name.
        fom_name: String,
        /// Requested attribute cycle (seconds).
        cycle_time: f64,
        /// Executive core job cycle (seconds).
        core_cycle: f64,
    },
    /// LCTS, lookahead or time padding violates the timing invariants.
    InvalidTiming(String),
    /// Configuration file not found at the given path.
    ConfigFileNotFound(String),
    /// Configuration file could not be parsed.
    ConfigParse(String),

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Requested execution mode transition is not allowed.
    InvalidModeTransition {
        /// Current mode.
        from: ExecutionMode,
        /// Requested mode.
        to: ExecutionMode,
    },
    /// Mode transition request carried an unrecognised value.
    UnknownModeTransition(i16),
    /// Execution configuration received from a federate that is not master.
    ExcoNotFromMaster,
    /// Synchronization point registration was refused by the RTI.
    SyncPointRegistrationFailed(String),
    /// Operation not valid in the current state.
    InvalidState(String),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Encoding or decoding failure (recoverable unless `CodecError::is_fatal`).
    Codec {
        /// FOM attribute or parameter name.
        fom_name: String,
        /// Underlying codec error.
        source: CodecError,
    },
    /// Bounded queue refused an item.
    QueueFull(String),

    // ========================================================================
    // Reference Frame Errors
    // ========================================================================
    /// Frame name not present in the tree.
    FrameNotFound(String),
    /// Frame already present in the tree.
    DuplicateFrame(String),
    /// No path exists between two frames (disconnected or cyclic tree).
    NoTransformPath {
        /// Source frame name.
        from: String,
        /// Express frame name.
        to: String,
    },

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// This federate is no longer a member of the federation execution.
    FederationMembershipLost,
    /// RTI reported an exception.
    Rti(String),
    /// A blocking wait was aborted because shutdown was announced.
    ShutdownRequested,
    /// I/O error with underlying cause.
    IoError(std::io::Error),

    // ========================================================================
    // Internal Errors
    // ========================================================================
    /// Reference frame handle was unexpectedly absent.
    NullReferenceFrame(String),
    /// Execution configuration object was unexpectedly absent.
    MissingExco,
}

impl Error {
    /// Whether this error must terminate the federate.
    ///
    /// Data errors and frame lookups are recoverable: the caller keeps the
    /// last good value. A codec error is fatal only when it would corrupt
    /// logical time.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Codec { source, .. } => source.is_fatal(),
            Error::QueueFull(_)
            | Error::FrameNotFound(_)
            | Error::DuplicateFrame(_)
            | Error::NoTransformPath { .. } => false,
            _ => true,
        }
    }

    /// Whether this error should route the federate to the shutdown path.
    pub fn is_environment(&self) -> bool {
        matches!(
            self,
            Error::FederationMembershipLost
                | Error::Rti(_)
                | Error::ShutdownRequested
                | Error::IoError(_)
        )
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::UnsupportedAttributeType {
                fom_name,
                var_name,
                reason,
            } => write!(
                f,
                "Unsupported attribute type for FOM name '{}' (variable '{}'): {}",
                fom_name, var_name, reason
            ),
            Error::MissingVariable { fom_name, var_name } => write!(
                f,
                "Variable '{}' bound to FOM name '{}' not found",
                var_name, fom_name
            ),
            Error::InvalidCycleTime {
                fom_name,
                cycle_time,
                core_cycle,
            } => write!(
                f,
                "Cycle time {} s of '{}' is not an integer multiple of the core cycle {} s",
                cycle_time, fom_name, core_cycle
            ),
            Error::InvalidTiming(msg) => write!(f, "Invalid timing: {}", msg),
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            Error::ConfigParse(msg) => write!(f, "Config parse error: {}", msg),
            // Protocol
            Error::InvalidModeTransition { from, to } => {
                write!(f, "Invalid mode transition: {} -> {}", from, to)
            }
            Error::UnknownModeTransition(value) => {
                write!(f, "Unknown mode transition request: {}", value)
            }
            Error::ExcoNotFromMaster => {
                write!(f, "Execution configuration received from a non-master owner")
            }
            Error::SyncPointRegistrationFailed(label) => {
                write!(f, "Sync point registration failed: {}", label)
            }
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            // Data
            Error::Codec { fom_name, source } => write!(f, "Codec error on '{}': {}", fom_name, source),
            Error::QueueFull(msg) => write!(f, "Queue full: {}", msg),
            // Frames
            Error::FrameNotFound(name) => write!(f, "Reference frame not found: {}", name),
            Error::DuplicateFrame(name) => write!(f, "Duplicate reference frame: {}", name),
            Error::NoTransformPath { from, to } => {
                write!(f, "No transform path from '{}' to '{}'", from, to)
            }
            // Environment
            Error::FederationMembershipLost => write!(f, "Federation membership lost"),
            Error::Rti(msg) => write!(f, "RTI exception: {}", msg),
            Error::ShutdownRequested => write!(f, "Shutdown requested"),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            // Internal
            Error::NullReferenceFrame(name) => write!(f, "Null reference frame: {}", name),
            Error::MissingExco => write!(f, "Execution configuration object missing"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::Codec { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
