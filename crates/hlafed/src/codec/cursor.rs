// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read/write cursors for HLA wire buffers.
//!
//! HLA mixes byte orders inside one payload (counts are always big-endian,
//! numeric fields follow the declared encoding), so both cursors expose
//! explicit `_be` / `_le` accessors instead of a mode flag.

use super::{CodecError, CodecResult};

/// Generate read methods for one primitive and one byte order.
///
/// Each generated method:
/// 1. Checks buffer bounds (returns `CodecError::ReadFailed` if overflow)
/// 2. Reads N bytes from buffer
/// 3. Converts bytes to value via the given `from_*_bytes`
/// 4. Advances offset
macro_rules! impl_read {
    ($name:ident, $type:ty, $size:expr, $from:ident) => {
        pub fn $name(&mut self) -> CodecResult<$type> {
            let bytes = self.read_bytes($size)?;
            let mut raw = [0u8; $size];
            raw.copy_from_slice(bytes);
            Ok(<$type>::$from(raw))
        }
    };
}

/// Generate append methods for one primitive and one byte order.
macro_rules! impl_write {
    ($name:ident, $type:ty, $to:ident) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.$to());
        }
    };
}

/// Growable writer appending to an attribute buffer.
///
/// The attribute owns the `Vec` so its capacity survives between packs.
pub struct WireWriter<'a> {
    buffer: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> WireWriter<'a> {
    /// Writer that appends after the current end of `buffer`.
    pub fn new(buffer: &'a mut Vec<u8>) -> Self {
        let start = buffer.len();
        Self { buffer, start }
    }

    impl_write!(write_u16_be, u16, to_be_bytes);
    impl_write!(write_u16_le, u16, to_le_bytes);
    impl_write!(write_i16_le, i16, to_le_bytes);
    impl_write!(write_u32_be, u32, to_be_bytes);
    impl_write!(write_i32_be, i32, to_be_bytes);
    impl_write!(write_i64_be, i64, to_be_bytes);
    impl_write!(write_i64_le, i64, to_le_bytes);
    impl_write!(write_f64_le, f64, to_le_bytes);

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// HLA variable array count (32-bit big-endian).
    pub fn write_count(&mut self, count: usize) -> CodecResult<()> {
        let count = u32::try_from(count).map_err(|_| CodecError::WriteFailed {
            offset: self.offset(),
            reason: "element count exceeds 32 bits".into(),
        })?;
        self.write_u32_be(count);
        Ok(())
    }

    /// Zero-pad so the next byte is `alignment`-aligned relative to the
    /// start of this writer.
    pub fn pad_to(&mut self, alignment: usize) {
        if alignment <= 1 {
            return;
        }
        let rem = self.offset() % alignment;
        if rem != 0 {
            let pad = alignment - rem;
            self.buffer.resize(self.buffer.len() + pad, 0);
        }
    }

    /// Bytes written by this writer.
    pub fn offset(&self) -> usize {
        self.buffer.len() - self.start
    }
}

/// Immutable cursor for reading (bounds-checked, zero-copy).
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read!(read_u16_be, u16, 2, from_be_bytes);
    impl_read!(read_i16_le, i16, 2, from_le_bytes);
    impl_read!(read_u16_le, u16, 2, from_le_bytes);
    impl_read!(read_u32_be, u32, 4, from_be_bytes);
    impl_read!(read_i32_be, i32, 4, from_be_bytes);
    impl_read!(read_i64_be, i64, 8, from_be_bytes);
    impl_read!(read_i64_le, i64, 8, from_le_bytes);
    impl_read!(read_f64_le, f64, 8, from_le_bytes);

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::ReadFailed {
                offset: self.offset,
                reason: "unexpected end of buffer".into(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Read an HLA count and clamp it to `[0, remaining / unit]`.
    ///
    /// Returns the clamped count and whether clamping happened. Counts are
    /// transmitted as signed 32-bit big-endian integers.
    pub fn read_count(&mut self, unit: usize) -> CodecResult<(usize, bool)> {
        let declared = self.read_i32_be()?;
        if declared < 0 {
            return Ok((0, true));
        }
        let declared = declared as usize;
        let max = self.remaining() / unit.max(1);
        if declared > max {
            Ok((max, true))
        } else {
            Ok((declared, false))
        }
    }

    /// Skip padding up to the next `alignment` boundary (clamped to the end).
    pub fn skip_padding(&mut self, alignment: usize) {
        if alignment <= 1 {
            return;
        }
        let rem = self.offset % alignment;
        if rem != 0 {
            self.offset = (self.offset + alignment - rem).min(self.buffer.len());
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_read_overflow_reports_offset() {
        let buffer = [0u8; 3];
        let mut cursor = Cursor::new(&buffer);
        assert_eq!(cursor.read_u16_be().expect("Read u16 should succeed"), 0);

        let err = cursor.read_u16_be().unwrap_err();
        match err {
            CodecError::ReadFailed { offset, reason } => {
                assert_eq!(offset, 2);
                assert_eq!(reason, "unexpected end of buffer");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_writer_pads_relative_to_start() {
        let mut buffer = vec![0xAA];
        let mut writer = WireWriter::new(&mut buffer);
        writer.write_u8(1);
        writer.pad_to(4);
        assert_eq!(writer.offset(), 4);
        assert_eq!(buffer, vec![0xAA, 1, 0, 0, 0]);
    }

    #[test]
    fn test_mixed_byte_order_roundtrip() {
        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            writer.write_count(3).expect("count should fit");
            writer.write_i16_le(-2);
            writer.write_f64_le(6.25);
            writer.write_i64_be(-1_000_000);
        }
        assert_eq!(&buffer[..4], &[0, 0, 0, 3]);

        let mut cursor = Cursor::new(&buffer);
        assert_eq!(cursor.read_u32_be().expect("count"), 3);
        assert_eq!(cursor.read_i16_le().expect("i16"), -2);
        assert_eq!(cursor.read_f64_le().expect("f64"), 6.25);
        assert_eq!(cursor.read_i64_be().expect("i64"), -1_000_000);
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_read_count_clamps_negative_and_oversized() {
        let negative = (-5i32).to_be_bytes();
        let mut cursor = Cursor::new(&negative);
        assert_eq!(cursor.read_count(1).expect("count"), (0, true));

        let mut oversized = 100i32.to_be_bytes().to_vec();
        oversized.extend_from_slice(&[1, 2, 3]);
        let mut cursor = Cursor::new(&oversized);
        assert_eq!(cursor.read_count(1).expect("count"), (3, true));
    }

    #[test]
    fn test_skip_padding_clamps_to_end() {
        let buffer = [0u8; 6];
        let mut cursor = Cursor::new(&buffer);
        cursor.read_bytes(5).expect("read");
        cursor.skip_padding(4);
        assert!(cursor.is_eof());
        assert_eq!(cursor.offset(), 6);
    }
}
