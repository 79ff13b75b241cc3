// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTI encodings and their resolved wire descriptors.
//!
//! Legal combinations, checked once by [`WireFormat::resolve`]:
//!
//! | Encoding          | Element types              | Shapes                          |
//! |-------------------|----------------------------|---------------------------------|
//! | `BigEndian`/`LittleEndian` | numeric, char, bool | any static; 1-D dynamic     |
//! | `Boolean`         | bool                       | any static; 1-D dynamic         |
//! | `LogicalTime`     | integer, float (units `s`) | scalar                          |
//! | `UnicodeString`/`AsciiString`/`OpaqueData`/`CString` | char (1-D) or string | any static; 1-D dynamic |
//! | `None`            | any fixed-size type        | static only                     |

use std::fmt;
use std::str::FromStr;

use super::variable::{ElementType, Shape};

/// Encoding requested for an attribute or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    BigEndian,
    LittleEndian,
    /// HLAboolean: 32-bit big-endian 0 or 1.
    Boolean,
    /// 8-byte big-endian count of base time units.
    LogicalTime,
    /// HLAunicodeString (UTF-16BE code units).
    UnicodeString,
    /// HLAASCIIstring.
    AsciiString,
    /// Concatenated null-terminated strings, no outer count.
    CString,
    /// HLAopaqueData.
    OpaqueData,
    /// Raw host bytes, fixed length.
    None,
}

impl Encoding {
    pub const fn as_str(self) -> &'static str {
        match self {
            Encoding::BigEndian => "big_endian",
            Encoding::LittleEndian => "little_endian",
            Encoding::Boolean => "boolean",
            Encoding::LogicalTime => "logical_time",
            Encoding::UnicodeString => "unicode_string",
            Encoding::AsciiString => "ascii_string",
            Encoding::CString => "c_string",
            Encoding::OpaqueData => "opaque_data",
            Encoding::None => "none",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let encoding = match normalized.trim_start_matches("encoding_") {
            "big_endian" => Encoding::BigEndian,
            "little_endian" => Encoding::LittleEndian,
            "boolean" => Encoding::Boolean,
            "logical_time" => Encoding::LogicalTime,
            "unicode_string" => Encoding::UnicodeString,
            "ascii_string" => Encoding::AsciiString,
            "c_string" => Encoding::CString,
            "opaque_data" => Encoding::OpaqueData,
            "none" => Encoding::None,
            _ => return Err(format!("unknown encoding '{}'", s)),
        };
        Ok(encoding)
    }
}

/// Byte order of fixed-size numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
    /// Host order (raw pass-through).
    Native,
}

/// Code unit width of HLA string encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharWidth {
    /// 8-bit units.
    Ascii,
    /// UTF-16BE units.
    Utf16,
}

impl CharWidth {
    pub const fn unit_size(self) -> usize {
        match self {
            CharWidth::Ascii => 1,
            CharWidth::Utf16 => 2,
        }
    }
}

/// Resolved per-binding wire descriptor.
///
/// The tag selects the encoder path; each variant carries what that path
/// needs. An outer element count is present for every runtime-sized
/// array and for arrays of strings.
#[derive(Debug, Clone, PartialEq)]
pub enum WireFormat {
    Primitive {
        element: ElementType,
        order: ByteOrder,
        shape: Shape,
    },
    Boolean {
        shape: Shape,
    },
    LogicalTime {
        element: ElementType,
    },
    Text {
        width: CharWidth,
        element: ElementType,
        shape: Shape,
    },
    CString {
        element: ElementType,
        shape: Shape,
    },
    Opaque {
        element: ElementType,
        shape: Shape,
    },
    Raw {
        element: ElementType,
        shape: Shape,
    },
}

impl WireFormat {
    /// Validate `encoding` against a variable's type, shape and units.
    ///
    /// Returns the rejection reason on an illegal combination.
    pub fn resolve(
        encoding: Encoding,
        element: ElementType,
        shape: &Shape,
        units: &str,
    ) -> Result<Self, String> {
        if shape.dynamic && !shape.dims.is_empty() {
            return Err("dynamic arrays must have exactly one dimension".into());
        }

        match encoding {
            Encoding::BigEndian | Encoding::LittleEndian => {
                if element == ElementType::String {
                    return Err(format!(
                        "{} requires a fixed-size element type, found string",
                        encoding
                    ));
                }
                let order = if encoding == Encoding::BigEndian {
                    ByteOrder::Big
                } else {
                    ByteOrder::Little
                };
                Ok(WireFormat::Primitive {
                    element,
                    order,
                    shape: shape.clone(),
                })
            }
            Encoding::Boolean => {
                if element != ElementType::Bool {
                    return Err(format!("boolean requires a bool element, found {}", element));
                }
                Ok(WireFormat::Boolean {
                    shape: shape.clone(),
                })
            }
            Encoding::LogicalTime => {
                if !(element.is_integer() || element.is_float()) {
                    return Err(format!(
                        "logical_time requires a numeric element, found {}",
                        element
                    ));
                }
                if !shape.is_scalar() {
                    return Err("logical_time requires a scalar variable".into());
                }
                if units != "s" {
                    return Err(format!(
                        "logical_time requires units of seconds, found '{}'",
                        units
                    ));
                }
                Ok(WireFormat::LogicalTime { element })
            }
            Encoding::UnicodeString
            | Encoding::AsciiString
            | Encoding::CString
            | Encoding::OpaqueData => {
                check_character(encoding, element, shape)?;
                let shape = shape.clone();
                Ok(match encoding {
                    Encoding::UnicodeString => WireFormat::Text {
                        width: CharWidth::Utf16,
                        element,
                        shape,
                    },
                    Encoding::AsciiString => WireFormat::Text {
                        width: CharWidth::Ascii,
                        element,
                        shape,
                    },
                    Encoding::CString => WireFormat::CString { element, shape },
                    _ => WireFormat::Opaque { element, shape },
                })
            }
            Encoding::None => {
                if element == ElementType::String {
                    return Err("none requires a fixed-size element type, found string".into());
                }
                if shape.dynamic {
                    return Err("none requires a statically sized variable".into());
                }
                Ok(WireFormat::Raw {
                    element,
                    shape: shape.clone(),
                })
            }
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self {
            WireFormat::Primitive {
                order: ByteOrder::Little,
                ..
            } => Encoding::LittleEndian,
            WireFormat::Primitive { .. } => Encoding::BigEndian,
            WireFormat::Boolean { .. } => Encoding::Boolean,
            WireFormat::LogicalTime { .. } => Encoding::LogicalTime,
            WireFormat::Text {
                width: CharWidth::Utf16,
                ..
            } => Encoding::UnicodeString,
            WireFormat::Text { .. } => Encoding::AsciiString,
            WireFormat::CString { .. } => Encoding::CString,
            WireFormat::Opaque { .. } => Encoding::OpaqueData,
            WireFormat::Raw { .. } => Encoding::None,
        }
    }

    /// Whether an outer 32-bit element count precedes the payload.
    pub fn has_outer_count(&self) -> bool {
        match self {
            WireFormat::Primitive { shape, .. } | WireFormat::Boolean { shape } => shape.dynamic,
            WireFormat::Text { element, shape, .. } | WireFormat::Opaque { element, shape } => {
                *element == ElementType::String && !shape.is_scalar()
            }
            WireFormat::LogicalTime { .. } | WireFormat::CString { .. } | WireFormat::Raw { .. } => {
                false
            }
        }
    }
}

fn check_character(encoding: Encoding, element: ElementType, shape: &Shape) -> Result<(), String> {
    match element {
        ElementType::String => Ok(()),
        ElementType::Char if shape.rank() == 1 => Ok(()),
        ElementType::Char => Err(format!(
            "{} requires a one-dimensional character array",
            encoding
        )),
        other => Err(format!(
            "{} requires 8-bit character data, found {}",
            encoding, other
        )),
    }
}
