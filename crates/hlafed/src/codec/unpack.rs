// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decode a wire buffer into a simulation variable.
//!
//! Every path validates the whole buffer before touching the variable, so
//! an `Err` always leaves the last good value in place.

use super::cursor::Cursor;
use super::encoding::{ByteOrder, CharWidth, WireFormat};
use super::pack::{check_element, type_mismatch, ELEMENT_ALIGNMENT};
use super::variable::{ElementType, SimVariable, VarData};
use super::{CodecError, CodecResult};
use crate::config::BASE_TIME_MULTIPLIER;
use crate::executive::MemoryManager;

/// Result of a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    Complete,
    /// A declared length ran past the end of the buffer and was clamped.
    Clamped,
    /// More elements arrived than the static storage holds.
    Truncated { received: usize, capacity: usize },
}

impl DecodeOutcome {
    fn merge(self, other: DecodeOutcome) -> DecodeOutcome {
        match (self, other) {
            (t @ DecodeOutcome::Truncated { .. }, _) | (_, t @ DecodeOutcome::Truncated { .. }) => t,
            (DecodeOutcome::Clamped, _) | (_, DecodeOutcome::Clamped) => DecodeOutcome::Clamped,
            _ => DecodeOutcome::Complete,
        }
    }

    fn clamped_if(flag: bool) -> DecodeOutcome {
        if flag {
            DecodeOutcome::Clamped
        } else {
            DecodeOutcome::Complete
        }
    }
}

/// Decode `bytes` into `variable`.
///
/// Runtime-sized storage is resized through `memory`.
pub fn unpack(
    format: &WireFormat,
    bytes: &[u8],
    variable: &mut SimVariable,
    memory: &dyn MemoryManager,
) -> CodecResult<DecodeOutcome> {
    match format {
        WireFormat::Primitive {
            element,
            order,
            shape,
        } => {
            check_element(*element, variable)?;
            let size = element.size().ok_or_else(|| type_mismatch(*element, variable))?;
            if shape.dynamic {
                let mut cursor = Cursor::new(bytes);
                let (count, clamped) = cursor.read_count(size)?;
                let payload = cursor.read_bytes(count * size)?;
                memory.resize(variable, count);
                variable.data_mut().read_numeric(*order, payload);
                Ok(DecodeOutcome::clamped_if(clamped))
            } else {
                let expected = variable.len() * size;
                if bytes.len() != expected {
                    return Err(CodecError::LengthMismatch {
                        expected,
                        actual: bytes.len(),
                    });
                }
                variable.data_mut().read_numeric(*order, bytes);
                Ok(DecodeOutcome::Complete)
            }
        }
        WireFormat::Boolean { shape } => {
            check_element(ElementType::Bool, variable)?;
            let mut cursor = Cursor::new(bytes);
            let (count, clamped) = if shape.dynamic {
                cursor.read_count(4)?
            } else {
                let expected = variable.len() * 4;
                if bytes.len() != expected {
                    return Err(CodecError::LengthMismatch {
                        expected,
                        actual: bytes.len(),
                    });
                }
                (variable.len(), false)
            };
            let mut decoded = Vec::with_capacity(count);
            for _ in 0..count {
                decoded.push(cursor.read_u32_be()? != 0);
            }
            if shape.dynamic {
                memory.resize(variable, count);
            }
            variable.set_values(&decoded);
            Ok(DecodeOutcome::clamped_if(clamped))
        }
        WireFormat::LogicalTime { element } => {
            check_element(*element, variable)?;
            if bytes.len() != 8 {
                return Err(CodecError::LogicalTimeWidth { size: bytes.len() });
            }
            let units = Cursor::new(bytes).read_i64_be()?;
            store_time_units(variable.data_mut(), units);
            Ok(DecodeOutcome::Complete)
        }
        WireFormat::Text { width, element, .. } => {
            check_element(*element, variable)?;
            let unit = width.unit_size();
            let mut cursor = Cursor::new(bytes);
            if *element == ElementType::String && format.has_outer_count() {
                let (values, outcome) = read_string_array(&mut cursor, unit, |raw| {
                    decode_text(*width, raw)
                })?;
                Ok(outcome.merge(store_strings(variable, memory, values)))
            } else {
                let (count, clamped) = cursor.read_count(unit)?;
                let text = decode_text(*width, cursor.read_bytes(count * unit)?);
                let outcome = if *element == ElementType::String {
                    store_strings(variable, memory, vec![text])
                } else {
                    store_chars(variable, memory, text.as_bytes())
                };
                Ok(DecodeOutcome::clamped_if(clamped).merge(outcome))
            }
        }
        WireFormat::CString { element, .. } => {
            check_element(*element, variable)?;
            let mut segments: Vec<&[u8]> = bytes.split(|b| *b == 0).collect();
            if bytes.is_empty() || bytes.last() == Some(&0) {
                segments.pop();
            }
            if *element == ElementType::String {
                let values = segments
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect();
                Ok(store_strings(variable, memory, values))
            } else {
                let first = segments.first().copied().unwrap_or(&[]);
                Ok(store_chars(variable, memory, first))
            }
        }
        WireFormat::Opaque { element, .. } => {
            check_element(*element, variable)?;
            let mut cursor = Cursor::new(bytes);
            if *element == ElementType::String && format.has_outer_count() {
                let (values, outcome) = read_string_array(&mut cursor, 1, |raw| {
                    String::from_utf8_lossy(raw).into_owned()
                })?;
                Ok(outcome.merge(store_strings(variable, memory, values)))
            } else {
                let (count, clamped) = cursor.read_count(1)?;
                let raw = cursor.read_bytes(count)?;
                let outcome = if *element == ElementType::String {
                    store_strings(variable, memory, vec![String::from_utf8_lossy(raw).into_owned()])
                } else {
                    store_chars(variable, memory, raw)
                };
                Ok(DecodeOutcome::clamped_if(clamped).merge(outcome))
            }
        }
        WireFormat::Raw { element, .. } => {
            check_element(*element, variable)?;
            let expected = variable.byte_size();
            if bytes.len() != expected {
                return Err(CodecError::LengthMismatch {
                    expected,
                    actual: bytes.len(),
                });
            }
            variable.data_mut().read_numeric(ByteOrder::Native, bytes);
            Ok(DecodeOutcome::Complete)
        }
    }
}

/// Outer count, then per element a count, the units and 4-byte padding
/// (except after the last element).
fn read_string_array(
    cursor: &mut Cursor<'_>,
    unit: usize,
    decode: impl Fn(&[u8]) -> String,
) -> CodecResult<(Vec<String>, DecodeOutcome)> {
    let (count, mut clamped) = cursor.read_count(4)?;
    let mut values = Vec::with_capacity(count);
    for idx in 0..count {
        let (len, element_clamped) = cursor.read_count(unit)?;
        clamped |= element_clamped;
        values.push(decode(cursor.read_bytes(len * unit)?));
        if idx + 1 < count {
            cursor.skip_padding(ELEMENT_ALIGNMENT);
        }
    }
    Ok((values, DecodeOutcome::clamped_if(clamped)))
}

/// Decode one HLAunicodeString, clamping a count that overruns the buffer.
pub fn decode_unicode_string(bytes: &[u8]) -> CodecResult<String> {
    let mut cursor = Cursor::new(bytes);
    let (len, _) = cursor.read_count(2)?;
    Ok(decode_text(CharWidth::Utf16, cursor.read_bytes(len * 2)?))
}

fn decode_text(width: CharWidth, raw: &[u8]) -> String {
    match width {
        CharWidth::Ascii => String::from_utf8_lossy(raw).into_owned(),
        CharWidth::Utf16 => {
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
    }
}

fn store_strings(
    variable: &mut SimVariable,
    memory: &dyn MemoryManager,
    mut values: Vec<String>,
) -> DecodeOutcome {
    let mut outcome = DecodeOutcome::Complete;
    if variable.shape().dynamic {
        memory.resize(variable, values.len());
    } else {
        let capacity = variable.len();
        if values.len() > capacity {
            outcome = DecodeOutcome::Truncated {
                received: values.len(),
                capacity,
            };
        }
        values.resize(capacity, String::new());
    }
    variable.set_values(&values);
    outcome
}

fn store_chars(variable: &mut SimVariable, memory: &dyn MemoryManager, bytes: &[u8]) -> DecodeOutcome {
    let mut outcome = DecodeOutcome::Complete;
    if variable.shape().dynamic {
        memory.resize(variable, bytes.len());
    } else if bytes.len() > variable.len() {
        outcome = DecodeOutcome::Truncated {
            received: bytes.len(),
            capacity: variable.len(),
        };
    }
    variable.set_chars(bytes);
    outcome
}

/// Store a base-unit count, saturating integer targets to their range.
fn store_time_units(data: &mut VarData, units: i64) {
    let seconds = units / BASE_TIME_MULTIPLIER;
    macro_rules! saturate {
        ($values:expr, $ty:ty) => {
            if let Some(slot) = $values.first_mut() {
                *slot = <$ty>::try_from(seconds).unwrap_or(if seconds < 0 {
                    <$ty>::MIN
                } else {
                    <$ty>::MAX
                });
            }
        };
    }
    match data {
        VarData::I8(v) => saturate!(v, i8),
        VarData::U8(v) => saturate!(v, u8),
        VarData::I16(v) => saturate!(v, i16),
        VarData::U16(v) => saturate!(v, u16),
        VarData::I32(v) => saturate!(v, i32),
        VarData::U32(v) => saturate!(v, u32),
        VarData::I64(v) => saturate!(v, i64),
        VarData::U64(v) => saturate!(v, u64),
        VarData::F32(v) => {
            if let Some(slot) = v.first_mut() {
                *slot = (units as f64 / BASE_TIME_MULTIPLIER as f64) as f32;
            }
        }
        VarData::F64(v) => {
            if let Some(slot) = v.first_mut() {
                *slot = units as f64 / BASE_TIME_MULTIPLIER as f64;
            }
        }
        VarData::Bool(_) | VarData::Char(_) | VarData::String(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoding::Encoding;
    use crate::codec::pack::pack;
    use crate::codec::variable::Shape;
    use crate::executive::HeapMemoryManager;

    fn format_for(encoding: Encoding, variable: &SimVariable) -> WireFormat {
        WireFormat::resolve(
            encoding,
            variable.element_type(),
            variable.shape(),
            variable.units(),
        )
        .expect("resolve should succeed")
    }

    #[test]
    fn test_big_endian_negative_zero_keeps_sign() {
        let mut var = SimVariable::scalar("x", 1.0f64);
        let format = format_for(Encoding::BigEndian, &var);
        let bytes = (-0.0f64).to_be_bytes();
        unpack(&format, &bytes, &mut var, &HeapMemoryManager).expect("unpack should succeed");
        let value = var.value::<f64>().expect("f64");
        assert_eq!(value, 0.0);
        assert!(value.is_sign_negative());
    }

    #[test]
    fn test_static_length_mismatch_keeps_last_value() {
        let mut var = SimVariable::array("v", vec![1.0f64, 2.0, 3.0]);
        let format = format_for(Encoding::BigEndian, &var);
        let err = unpack(&format, &[0u8; 16], &mut var, &HeapMemoryManager)
            .expect_err("short buffer must be rejected");
        assert_eq!(
            err,
            CodecError::LengthMismatch {
                expected: 24,
                actual: 16
            }
        );
        assert_eq!(var.get::<f64>().expect("f64"), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_dynamic_array_resizes() {
        let source = SimVariable::dynamic("d", vec![1i16, -2, 3, -4]);
        let format = format_for(Encoding::LittleEndian, &source);
        let mut bytes = Vec::new();
        pack(&format, &source, &mut bytes).expect("pack should succeed");

        let mut target = SimVariable::dynamic::<i16>("d", vec![9]);
        let outcome =
            unpack(&format, &bytes, &mut target, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(outcome, DecodeOutcome::Complete);
        assert_eq!(target.get::<i16>().expect("i16"), &[1, -2, 3, -4]);
    }

    #[test]
    fn test_logical_time_wrong_width_is_fatal() {
        let mut var = SimVariable::scalar("t", 0i64).with_units("s");
        let format = format_for(Encoding::LogicalTime, &var);
        let err = unpack(&format, &[0u8; 4], &mut var, &HeapMemoryManager)
            .expect_err("4-byte time must be rejected");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_logical_time_saturates_small_integers() {
        let mut var = SimVariable::scalar("t", 0i8).with_units("s");
        let format = format_for(Encoding::LogicalTime, &var);
        let bytes = (1_000i64 * BASE_TIME_MULTIPLIER).to_be_bytes();
        unpack(&format, &bytes, &mut var, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(var.value::<i8>(), Some(i8::MAX));

        let mut var = SimVariable::scalar("t", 0.0f64).with_units("s");
        let format = format_for(Encoding::LogicalTime, &var);
        unpack(&format, &1_500_000i64.to_be_bytes(), &mut var, &HeapMemoryManager)
            .expect("unpack should succeed");
        assert_eq!(var.value::<f64>(), Some(1.5));
    }

    #[test]
    fn test_empty_unicode_array_decodes_to_empty() {
        let mut var = SimVariable::dynamic("names", vec!["old".to_string()]);
        let format = format_for(Encoding::UnicodeString, &var);
        unpack(&format, &[0, 0, 0, 0], &mut var, &HeapMemoryManager).expect("unpack should succeed");
        assert!(var.is_empty());
    }

    #[test]
    fn test_string_array_truncated_to_static_capacity() {
        let source = SimVariable::array(
            "names",
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        );
        let format = format_for(Encoding::AsciiString, &source);
        let mut bytes = Vec::new();
        pack(&format, &source, &mut bytes).expect("pack should succeed");

        let mut target = SimVariable::array("names", vec![String::new(); 2]);
        let outcome =
            unpack(&format, &bytes, &mut target, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(
            outcome,
            DecodeOutcome::Truncated {
                received: 3,
                capacity: 2
            }
        );
        assert_eq!(target.get::<String>().expect("strings"), &["a", "b"]);
    }

    #[test]
    fn test_opaque_length_clamped_to_buffer() {
        let mut var = SimVariable::chars("payload", b"");
        let format = format_for(Encoding::OpaqueData, &var);
        let mut bytes = 10i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"xyz");
        let outcome =
            unpack(&format, &bytes, &mut var, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(outcome, DecodeOutcome::Clamped);
        assert_eq!(var.char_bytes().expect("chars"), b"xyz");
    }

    #[test]
    fn test_opaque_grows_dynamic_char_buffer() {
        let source = SimVariable::chars("payload", b"abcdefg");
        let format = format_for(Encoding::OpaqueData, &source);
        let mut bytes = Vec::new();
        pack(&format, &source, &mut bytes).expect("pack should succeed");

        let mut target = SimVariable::chars("payload", b"xyz");
        unpack(&format, &bytes, &mut target, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(target.len(), 7);
        assert_eq!(target.char_bytes().expect("chars"), b"abcdefg");
    }

    #[test]
    fn test_static_char_array_truncates_long_text() {
        let mut var = SimVariable::char_array("name", 4, b"");
        let format = format_for(Encoding::AsciiString, &var);
        let mut bytes = 6i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"abcdef");
        let outcome =
            unpack(&format, &bytes, &mut var, &HeapMemoryManager).expect("unpack should succeed");
        assert!(matches!(outcome, DecodeOutcome::Truncated { received: 6, capacity: 4 }));
        assert_eq!(var.char_bytes().expect("chars"), b"abcd");
    }

    #[test]
    fn test_c_string_split() {
        let mut var = SimVariable::dynamic::<String>("tags", Vec::new());
        let format = format_for(Encoding::CString, &var);
        unpack(&format, b"one\0two\0", &mut var, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(var.get::<String>().expect("strings"), &["one", "two"]);
    }

    #[test]
    fn test_raw_exact_size_required() {
        let mut var = SimVariable::new("raw", Shape::fixed(&[4]), VarData::Char(b"abcd".to_vec()));
        let format = format_for(Encoding::None, &var);
        assert!(unpack(&format, b"abc", &mut var, &HeapMemoryManager).is_err());
        unpack(&format, b"wxyz", &mut var, &HeapMemoryManager).expect("unpack should succeed");
        assert_eq!(var.char_bytes().expect("chars"), b"wxyz");
    }

    #[test]
    fn test_reencode_reproduces_self_describing_bytes() {
        let mut bytes = Vec::new();
        let source = SimVariable::dynamic(
            "names",
            vec!["alpha".to_string(), "be".to_string(), String::new()],
        );
        let format = format_for(Encoding::UnicodeString, &source);
        pack(&format, &source, &mut bytes).expect("pack should succeed");

        let mut decoded = SimVariable::dynamic::<String>("names", Vec::new());
        unpack(&format, &bytes, &mut decoded, &HeapMemoryManager).expect("unpack should succeed");
        let mut again = Vec::new();
        pack(&format, &decoded, &mut again).expect("pack should succeed");
        assert_eq!(again, bytes);
    }
}
