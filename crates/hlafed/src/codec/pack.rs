// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encode a simulation variable into its wire representation.

use super::cursor::WireWriter;
use super::encoding::{ByteOrder, CharWidth, WireFormat};
use super::variable::{ElementType, SimVariable, VarData};
use super::{CodecError, CodecResult};
use crate::config::BASE_TIME_MULTIPLIER;

/// HLA arrays of variable-length elements align each element to 4 bytes.
pub(crate) const ELEMENT_ALIGNMENT: usize = 4;

/// Encode `variable` into `out`, replacing its previous contents.
///
/// `out` keeps its allocation across calls.
pub fn pack(format: &WireFormat, variable: &SimVariable, out: &mut Vec<u8>) -> CodecResult<()> {
    out.clear();
    match format {
        WireFormat::Primitive {
            element,
            order,
            shape,
        } => {
            check_element(*element, variable)?;
            if shape.dynamic {
                WireWriter::new(out).write_count(variable.len())?;
            }
            if !variable.data().write_numeric(*order, out) {
                return Err(type_mismatch(*element, variable));
            }
            Ok(())
        }
        WireFormat::Boolean { shape } => {
            let values = variable
                .get::<bool>()
                .ok_or_else(|| type_mismatch(ElementType::Bool, variable))?;
            let mut writer = WireWriter::new(out);
            if shape.dynamic {
                writer.write_count(values.len())?;
            }
            for value in values {
                writer.write_u32_be(u32::from(*value));
            }
            Ok(())
        }
        WireFormat::LogicalTime { element } => {
            check_element(*element, variable)?;
            let units = to_time_units(variable.data()).ok_or_else(|| CodecError::InvalidData {
                reason: format!("logical time variable '{}' is empty", variable.name()),
            })?;
            WireWriter::new(out).write_i64_be(units);
            Ok(())
        }
        WireFormat::Text { width, element, .. } => {
            check_element(*element, variable)?;
            let mut writer = WireWriter::new(out);
            match variable.data() {
                VarData::String(values) if format.has_outer_count() => {
                    writer.write_count(values.len())?;
                    for (idx, value) in values.iter().enumerate() {
                        write_text(&mut writer, *width, value.as_bytes())?;
                        if idx + 1 < values.len() {
                            writer.pad_to(ELEMENT_ALIGNMENT);
                        }
                    }
                }
                VarData::String(values) => {
                    let value = values.first().map(String::as_str).unwrap_or("");
                    write_text(&mut writer, *width, value.as_bytes())?;
                }
                VarData::Char(bytes) => write_text(&mut writer, *width, until_nul(bytes))?,
                _ => return Err(type_mismatch(*element, variable)),
            }
            Ok(())
        }
        WireFormat::CString { element, .. } => {
            check_element(*element, variable)?;
            let mut writer = WireWriter::new(out);
            match variable.data() {
                VarData::String(values) => {
                    for value in values {
                        writer.write_bytes(until_nul(value.as_bytes()));
                        writer.write_u8(0);
                    }
                }
                VarData::Char(bytes) => {
                    writer.write_bytes(until_nul(bytes));
                    writer.write_u8(0);
                }
                _ => return Err(type_mismatch(*element, variable)),
            }
            Ok(())
        }
        WireFormat::Opaque { element, .. } => {
            check_element(*element, variable)?;
            let mut writer = WireWriter::new(out);
            match variable.data() {
                VarData::String(values) if format.has_outer_count() => {
                    writer.write_count(values.len())?;
                    for (idx, value) in values.iter().enumerate() {
                        writer.write_count(value.len())?;
                        writer.write_bytes(value.as_bytes());
                        if idx + 1 < values.len() {
                            writer.pad_to(ELEMENT_ALIGNMENT);
                        }
                    }
                }
                VarData::String(values) => {
                    let value = values.first().map(String::as_bytes).unwrap_or(&[]);
                    writer.write_count(value.len())?;
                    writer.write_bytes(value);
                }
                VarData::Char(bytes) => {
                    writer.write_count(bytes.len())?;
                    writer.write_bytes(bytes);
                }
                _ => return Err(type_mismatch(*element, variable)),
            }
            Ok(())
        }
        WireFormat::Raw { element, .. } => {
            check_element(*element, variable)?;
            if !variable.data().write_numeric(ByteOrder::Native, out) {
                return Err(type_mismatch(*element, variable));
            }
            Ok(())
        }
    }
}

/// Append one HLAunicodeString (count, then UTF-16BE code units).
pub fn encode_unicode_string(value: &str, out: &mut Vec<u8>) -> CodecResult<()> {
    write_text(&mut WireWriter::new(out), CharWidth::Utf16, value.as_bytes())
}

fn write_text(writer: &mut WireWriter<'_>, width: CharWidth, bytes: &[u8]) -> CodecResult<()> {
    match width {
        CharWidth::Ascii => {
            writer.write_count(bytes.len())?;
            writer.write_bytes(bytes);
        }
        CharWidth::Utf16 => {
            let text = String::from_utf8_lossy(bytes);
            let units: Vec<u16> = text.encode_utf16().collect();
            writer.write_count(units.len())?;
            for unit in units {
                writer.write_u16_be(unit);
            }
        }
    }
    Ok(())
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

/// Scalar value as a count of base time units, saturating.
fn to_time_units(data: &VarData) -> Option<i64> {
    let scale = BASE_TIME_MULTIPLIER;
    match data {
        VarData::I8(v) => v.first().map(|x| i64::from(*x).saturating_mul(scale)),
        VarData::U8(v) => v.first().map(|x| i64::from(*x).saturating_mul(scale)),
        VarData::I16(v) => v.first().map(|x| i64::from(*x).saturating_mul(scale)),
        VarData::U16(v) => v.first().map(|x| i64::from(*x).saturating_mul(scale)),
        VarData::I32(v) => v.first().map(|x| i64::from(*x).saturating_mul(scale)),
        VarData::U32(v) => v.first().map(|x| i64::from(*x).saturating_mul(scale)),
        VarData::I64(v) => v.first().map(|x| x.saturating_mul(scale)),
        VarData::U64(v) => v
            .first()
            .map(|x| i64::try_from(*x).unwrap_or(i64::MAX).saturating_mul(scale)),
        VarData::F32(v) => v.first().map(|x| (f64::from(*x) * scale as f64).round() as i64),
        VarData::F64(v) => v.first().map(|x| (x * scale as f64).round() as i64),
        VarData::Bool(_) | VarData::Char(_) | VarData::String(_) => None,
    }
}

pub(crate) fn check_element(expected: ElementType, variable: &SimVariable) -> CodecResult<()> {
    if variable.element_type() == expected {
        Ok(())
    } else {
        Err(type_mismatch(expected, variable))
    }
}

pub(crate) fn type_mismatch(expected: ElementType, variable: &SimVariable) -> CodecError {
    CodecError::InvalidData {
        reason: format!(
            "variable '{}' holds {} but the binding expects {}",
            variable.name(),
            variable.element_type(),
            expected
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encoding::Encoding;
    use crate::codec::variable::Shape;

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
    fn test_big_endian_static_array_has_no_count() {
        let var = SimVariable::array("v", vec![1.0f64, -2.5, 3.14159265358979]);
        let mut out = Vec::new();
        pack(&format_for(Encoding::BigEndian, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(out.len(), 24);
        assert_eq!(&out[..8], &1.0f64.to_be_bytes());
        assert_eq!(&out[8..16], &(-2.5f64).to_be_bytes());
    }

    #[test]
    fn test_dynamic_array_has_count_prefix() {
        let var = SimVariable::dynamic("d", vec![7i32, 8]);
        let mut out = Vec::new();
        pack(&format_for(Encoding::LittleEndian, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(out, vec![0, 0, 0, 2, 7, 0, 0, 0, 8, 0, 0, 0]);
    }

    #[test]
    fn test_boolean_is_32_bit_big_endian() {
        let var = SimVariable::array("flags", vec![true, false]);
        let mut out = Vec::new();
        pack(&format_for(Encoding::Boolean, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(out, vec![0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_logical_time_scales_integer_seconds() {
        let var = SimVariable::scalar("t", 3i64).with_units("s");
        let mut out = Vec::new();
        pack(&format_for(Encoding::LogicalTime, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(out, 3_000_000i64.to_be_bytes().to_vec());

        let var = SimVariable::scalar("t", 0.25f64).with_units("s");
        pack(&format_for(Encoding::LogicalTime, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(out, 250_000i64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_unicode_string_array_pads_all_but_last() {
        let var = SimVariable::array("names", vec!["ab".to_string(), "c".to_string()]);
        let mut out = Vec::new();
        pack(&format_for(Encoding::UnicodeString, &var), &var, &mut out)
            .expect("pack should succeed");
        assert_eq!(
            out,
            vec![
                0, 0, 0, 2, // element count
                0, 0, 0, 2, 0, b'a', 0, b'b', // "ab", already aligned
                0, 0, 0, 1, 0, b'c', // "c", last element unpadded
            ]
        );
    }

    #[test]
    fn test_ascii_array_padding() {
        let var = SimVariable::array("names", vec!["x".to_string(), "yz".to_string()]);
        let mut out = Vec::new();
        pack(&format_for(Encoding::AsciiString, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(
            out,
            vec![0, 0, 0, 2, 0, 0, 0, 1, b'x', 0, 0, 0, 0, 0, 0, 2, b'y', b'z']
        );
    }

    #[test]
    fn test_empty_unicode_array_is_count_only() {
        let var = SimVariable::dynamic::<String>("names", Vec::new());
        let mut out = Vec::new();
        pack(&format_for(Encoding::UnicodeString, &var), &var, &mut out)
            .expect("pack should succeed");
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_c_string_concatenation() {
        let var = SimVariable::array("tags", vec!["a".to_string(), "bc".to_string()]);
        let mut out = Vec::new();
        pack(&format_for(Encoding::CString, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(out, b"a\0bc\0".to_vec());
    }

    #[test]
    fn test_opaque_char_buffer_sends_whole_storage() {
        let var = SimVariable::chars("payload", b"abcdefg");
        let mut out = Vec::new();
        pack(&format_for(Encoding::OpaqueData, &var), &var, &mut out).expect("pack should succeed");
        assert_eq!(&out[..4], &[0, 0, 0, 7]);
        assert_eq!(&out[4..], b"abcdefg");
    }

    #[test]
    fn test_raw_uses_host_order() {
        let var = SimVariable::new("raw", Shape::fixed(&[2]), VarData::U16(vec![1, 2]));
        let mut out = Vec::new();
        pack(&format_for(Encoding::None, &var), &var, &mut out).expect("pack should succeed");
        let mut expected = 1u16.to_ne_bytes().to_vec();
        expected.extend_from_slice(&2u16.to_ne_bytes());
        assert_eq!(out, expected);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let var = SimVariable::scalar("x", 1.0f64);
        let format = WireFormat::Boolean {
            shape: Shape::scalar(),
        };
        let mut out = Vec::new();
        let err = pack(&format, &var, &mut out).expect_err("f64 into boolean must fail");
        assert!(matches!(err, CodecError::InvalidData { .. }));
    }
}
