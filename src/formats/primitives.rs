//! Little-endian primitive decoding shared by the BPM, EGT and GTC decoders.
//!
//! All readers are generic over [`std::io::Read`] and fail with
//! [`BeadchipError::Truncated`] when the input ends before the declared
//! width; a short value is never returned.
//!
//! # String encoding
//!
//! Strings carry a variable-length byte-count prefix. Each prefix byte with
//! the high bit set contributes its low 7 bits, shifted by `7 * group`, and
//! another byte follows. The first byte without the high bit ends the prefix
//! and contributes its full 8-bit value, also shifted by `7 * group`:
//!
//! ```text
//! 0x05              -> 5
//! 0x80 0x01         -> 128
//! 0x80 0x80 0x01    -> 16384
//! ```
//!
//! ```
//! use beadchip::formats::primitives::{read_string, write_string};
//!
//! let mut buf = Vec::new();
//! write_string(&mut buf, "rs12345").unwrap();
//! assert_eq!(read_string(&mut buf.as_slice()).unwrap(), "rs12345");
//! ```

use crate::error::{BeadchipError, Result};
use std::io::{self, Read, Write};

/// Longest accepted string-length prefix, in bytes.
const MAX_LENGTH_GROUPS: u32 = 5;

/// Fill `buf` completely or report how many bytes were available.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], context: &'static str) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(BeadchipError::Truncated {
                    context,
                    expected: buf.len(),
                    actual: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn read_array_of<R: Read, const N: usize>(reader: &mut R, context: &'static str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_full(reader, &mut buf, context)?;
    Ok(buf)
}

/// Read a single byte.
pub fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let [byte] = read_array_of::<R, 1>(reader, "byte")?;
    Ok(byte)
}

/// Read a little-endian int16.
pub fn read_i16<R: Read>(reader: &mut R) -> Result<i16> {
    Ok(i16::from_le_bytes(read_array_of(reader, "int16")?))
}

/// Read a little-endian uint16.
pub fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array_of(reader, "uint16")?))
}

/// Read a little-endian int32.
pub fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array_of(reader, "int32")?))
}

/// Read a little-endian IEEE-754 float32.
pub fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    Ok(f32::from_le_bytes(read_array_of(reader, "float32")?))
}

/// Read an int32 element count. Negative counts are a format error.
pub fn read_count<R: Read>(reader: &mut R) -> Result<usize> {
    let count = read_i32(reader)?;
    usize::try_from(count)
        .map_err(|_| BeadchipError::format(format!("negative element count: {}", count)))
}

/// Read exactly `len` raw bytes.
///
/// The buffer grows with the data actually read, so a corrupt length cannot
/// force a huge up-front allocation.
pub fn read_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    read_bytes_for(reader, len, "byte array")
}

fn read_bytes_for<R: Read>(reader: &mut R, len: usize, context: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let actual = reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if actual < len {
        return Err(BeadchipError::Truncated {
            context,
            expected: len,
            actual,
        });
    }
    Ok(buf)
}

/// Consume and discard exactly `len` bytes.
pub fn skip_bytes<R: Read>(reader: &mut R, len: usize) -> Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
    if skipped < len as u64 {
        return Err(BeadchipError::Truncated {
            context: "reserved bytes",
            expected: len,
            actual: skipped as usize,
        });
    }
    Ok(())
}

/// Decode the variable-length string-length prefix.
///
/// This is not LEB128: the terminal byte is added unmasked.
pub fn read_string_length<R: Read>(reader: &mut R) -> Result<usize> {
    let mut total: u64 = 0;
    let mut group: u32 = 0;
    let mut byte = read_u8(reader)?;

    while byte & 0x80 != 0 {
        total += u64::from(byte & 0x7F) << (7 * group);
        group += 1;
        if group >= MAX_LENGTH_GROUPS {
            return Err(BeadchipError::format(format!(
                "string length prefix longer than {} bytes",
                MAX_LENGTH_GROUPS
            )));
        }
        byte = read_u8(reader)?;
    }
    total += u64::from(byte) << (7 * group);

    usize::try_from(total)
        .map_err(|_| BeadchipError::format(format!("string length {} exceeds platform limit", total)))
}

/// Read a length-prefixed string.
///
/// Valid UTF-8 is kept as is; any other byte sequence is decoded as
/// Latin-1 so that every byte maps to exactly one character.
pub fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_string_length(reader)?;
    if len == 0 {
        return Ok(String::new());
    }
    let bytes = read_bytes_for(reader, len, "string")?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| char::from(b)).collect(),
    })
}

/// Encode a string-length prefix (7-bit groups, low group first).
pub fn encode_string_length(mut len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(2);
    loop {
        let low = (len & 0x7F) as u8;
        len >>= 7;
        if len == 0 {
            out.push(low);
            return out;
        }
        out.push(low | 0x80);
    }
}

/// Write a length-prefixed string in the encoding [`read_string`] accepts.
pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    writer.write_all(&encode_string_length(value.len()))?;
    writer.write_all(value.as_bytes())
}

fn read_le_array<R: Read, T, const W: usize>(
    reader: &mut R,
    count: usize,
    context: &'static str,
    decode: fn([u8; W]) -> T,
) -> Result<Vec<T>> {
    let byte_len = count
        .checked_mul(W)
        .ok_or_else(|| BeadchipError::format(format!("{} of {} elements is too large", context, count)))?;
    let bytes = read_bytes_for(reader, byte_len, context)?;

    Ok(bytes
        .chunks_exact(W)
        .map(|chunk| {
            let mut element = [0u8; W];
            element.copy_from_slice(chunk);
            decode(element)
        })
        .collect())
}

/// Read `count` little-endian int16 values.
pub fn read_i16_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i16>> {
    read_le_array(reader, count, "int16 array", i16::from_le_bytes)
}

/// Read `count` little-endian uint16 values.
pub fn read_u16_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u16>> {
    read_le_array(reader, count, "uint16 array", u16::from_le_bytes)
}

/// Read `count` little-endian int32 values.
pub fn read_i32_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<i32>> {
    read_le_array(reader, count, "int32 array", i32::from_le_bytes)
}

/// Read `count` little-endian float32 values.
pub fn read_f32_array<R: Read>(reader: &mut R, count: usize) -> Result<Vec<f32>> {
    read_le_array(reader, count, "float32 array", f32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_little_endian() {
        let mut data: &[u8] = &[0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x80, 0x3F];
        assert_eq!(read_i16(&mut data).unwrap(), 0x1234);
        assert_eq!(read_u16(&mut data).unwrap(), 0xFFFE);
        assert_eq!(read_i32(&mut data).unwrap(), 0x1234_5678);
        assert_eq!(read_f32(&mut data).unwrap(), 1.0);
        assert!(data.is_empty());
    }

    #[test]
    fn test_truncated_int32() {
        let mut data: &[u8] = &[0x01, 0x02, 0x03];
        match read_i32(&mut data) {
            Err(BeadchipError::Truncated {
                context,
                expected,
                actual,
            }) => {
                assert_eq!(context, "int32");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_string_length_terminal_byte_unmasked() {
        // 0x81 contributes 1, terminal 0x02 contributes 2 << 7.
        let mut data: &[u8] = &[0x81, 0x02];
        assert_eq!(read_string_length(&mut data).unwrap(), 1 + (2 << 7));
    }

    #[test]
    fn test_string_length_groups() {
        assert_eq!(read_string_length(&mut &[0x05u8][..]).unwrap(), 5);
        assert_eq!(read_string_length(&mut &[0x80u8, 0x01][..]).unwrap(), 128);
        assert_eq!(read_string_length(&mut &[0x80u8, 0x80, 0x01][..]).unwrap(), 16384);
    }

    #[test]
    fn test_string_length_prefix_too_long() {
        let mut data: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert!(matches!(
            read_string_length(&mut data),
            Err(BeadchipError::Format { .. })
        ));
    }

    #[test]
    fn test_string_round_trip_boundaries() {
        for len in [0usize, 1, 127, 128, 16384] {
            let value: String = (0..len).map(|i| (b'a' + (i % 26) as u8) as char).collect();
            let mut buf = Vec::new();
            write_string(&mut buf, &value).unwrap();

            let mut cursor = buf.as_slice();
            assert_eq!(read_string(&mut cursor).unwrap(), value, "length {}", len);
            assert!(cursor.is_empty(), "length {} left trailing bytes", len);
        }
    }

    #[test]
    fn test_encode_string_length() {
        assert_eq!(encode_string_length(0), vec![0x00]);
        assert_eq!(encode_string_length(127), vec![0x7F]);
        assert_eq!(encode_string_length(128), vec![0x80, 0x01]);
        assert_eq!(encode_string_length(16384), vec![0x80, 0x80, 0x01]);
    }

    #[test]
    fn test_truncated_string_body() {
        let mut data: &[u8] = &[0x05, b'a', b'b'];
        assert!(matches!(
            read_string(&mut data),
            Err(BeadchipError::Truncated {
                context: "string",
                expected: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_latin1_fallback() {
        let mut data: &[u8] = &[0x02, b'A', 0xE9];
        assert_eq!(read_string(&mut data).unwrap(), "A\u{e9}");
    }

    #[test]
    fn test_arrays() {
        let mut data = Vec::new();
        for v in [-2i16, 0, 300] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.5f32, -1.25] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let mut cursor = data.as_slice();
        assert_eq!(read_i16_array(&mut cursor, 3).unwrap(), vec![-2, 0, 300]);
        assert_eq!(read_f32_array(&mut cursor, 2).unwrap(), vec![0.5, -1.25]);
        assert!(read_u16_array(&mut cursor, 1).is_err());
    }

    #[test]
    fn test_negative_count() {
        let bytes = (-1i32).to_le_bytes();
        assert!(matches!(
            read_count(&mut &bytes[..]),
            Err(BeadchipError::Format { .. })
        ));
    }

    #[test]
    fn test_skip_bytes() {
        let mut data: &[u8] = &[1, 2, 3, 4];
        skip_bytes(&mut data, 3).unwrap();
        assert_eq!(data, &[4]);
        assert!(skip_bytes(&mut data, 2).is_err());
    }
}
