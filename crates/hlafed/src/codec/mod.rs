// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HLA wire encoder: simulation variables to/from encoded attribute buffers.
//!
//! A binding is resolved once into a [`WireFormat`] (the encoding tag plus
//! element type, shape and count framing). [`pack`] and [`unpack`] then
//! dispatch on that tag for every update.

pub mod cursor;
pub mod encoding;
pub mod pack;
pub mod unpack;
pub mod variable;

pub use cursor::{Cursor, WireWriter};
pub use encoding::{ByteOrder, CharWidth, Encoding, WireFormat};
pub use pack::{encode_unicode_string, pack};
pub use unpack::{decode_unicode_string, unpack, DecodeOutcome};
pub use variable::{new_variable_ref, Element, ElementType, Shape, SimVariable, VarData, VariableRef};

use std::fmt;

/// Encoding/decoding error.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    WriteFailed { offset: usize, reason: String },
    ReadFailed { offset: usize, reason: String },
    /// Received size does not match the local storage size.
    LengthMismatch { expected: usize, actual: usize },
    /// Logical time payload is not exactly 8 bytes.
    LogicalTimeWidth { size: usize },
    InvalidData { reason: String },
}

impl CodecError {
    /// A logical-time width mismatch would corrupt time; everything else
    /// keeps the last good value.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CodecError::LogicalTimeWidth { .. })
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::WriteFailed { offset, reason } => {
                write!(f, "write failed at offset {}: {}", offset, reason)
            }
            CodecError::ReadFailed { offset, reason } => {
                write!(f, "read failed at offset {}: {}", offset, reason)
            }
            CodecError::LengthMismatch { expected, actual } => write!(
                f,
                "length mismatch: expected {} bytes, received {}",
                expected, actual
            ),
            CodecError::LogicalTimeWidth { size } => {
                write!(f, "logical time must be 8 bytes, received {}", size)
            }
            CodecError::InvalidData { reason } => write!(f, "invalid data: {}", reason),
        }
    }
}

impl std::error::Error for CodecError {}

pub type CodecResult<T> = core::result::Result<T, CodecError>;
