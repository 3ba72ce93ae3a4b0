//! # Variable-Length Integer Encoding
//!
//! Length prefixes in the serialized datum format use a staged varint: a
//! marker byte selects the width, so small values (string lengths, element
//! counts) cost one byte while the full u64 range stays representable.
//!
//! | Value range          | Bytes | Layout                                |
//! |----------------------|-------|---------------------------------------|
//! | 0 - 240              | 1     | `[value]`                             |
//! | 241 - 2287           | 2     | `[241 + (v-240)>>8, (v-240) & 0xFF]`  |
//! | 2288 - 67823         | 3     | `[249, (v-2288)>>8, (v-2288) & 0xFF]` |
//! | 67824 - 0xFF_FFFF    | 4     | `[250, 3-byte big-endian]`            |
//! | up to 0xFFFF_FFFF    | 5     | `[251, 4-byte big-endian]`            |
//! | up to u64::MAX       | 9     | `[255, 8-byte big-endian]`            |
//!
//! Markers 252-254 are reserved. Decoding resumes at arbitrary offsets of a
//! serialized blob, so `read_varint` takes a plain slice and reports how many
//! bytes it consumed.

use eyre::{bail, ensure, Result};

/// Number of bytes `write_varint` will append for `value`.
pub fn varint_len(value: u64) -> usize {
    match value {
        0..=240 => 1,
        241..=2287 => 2,
        2288..=67823 => 3,
        67824..=0xFF_FFFF => 4,
        0x100_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

pub fn write_varint(value: u64, out: &mut Vec<u8>) {
    match value {
        0..=240 => out.push(value as u8),
        241..=2287 => {
            let v = value - 240;
            out.push(241 + (v >> 8) as u8);
            out.push((v & 0xFF) as u8);
        }
        2288..=67823 => {
            let v = value - 2288;
            out.push(249);
            out.push((v >> 8) as u8);
            out.push((v & 0xFF) as u8);
        }
        67824..=0xFF_FFFF => {
            out.push(250);
            out.extend_from_slice(&value.to_be_bytes()[5..]);
        }
        0x100_0000..=0xFFFF_FFFF => {
            out.push(251);
            out.extend_from_slice(&value.to_be_bytes()[4..]);
        }
        _ => {
            out.push(255);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Decodes a varint from the front of `buf`, returning `(value, bytes_read)`.
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize)> {
    ensure!(!buf.is_empty(), "empty buffer for varint decode");
    let marker = buf[0];
    match marker {
        0..=240 => Ok((marker as u64, 1)),
        241..=248 => {
            ensure!(buf.len() >= 2, "truncated 2-byte varint");
            Ok((240 + (((marker - 241) as u64) << 8) + buf[1] as u64, 2))
        }
        249 => {
            ensure!(buf.len() >= 3, "truncated 3-byte varint");
            Ok((2288 + ((buf[1] as u64) << 8) + buf[2] as u64, 3))
        }
        250 => {
            ensure!(buf.len() >= 4, "truncated 4-byte varint");
            let v = ((buf[1] as u64) << 16) | ((buf[2] as u64) << 8) | buf[3] as u64;
            Ok((v, 4))
        }
        251 => {
            ensure!(buf.len() >= 5, "truncated 5-byte varint");
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&buf[1..5]);
            Ok((u32::from_be_bytes(bytes) as u64, 5))
        }
        255 => {
            ensure!(buf.len() >= 9, "truncated 9-byte varint");
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[1..9]);
            Ok((u64::from_be_bytes(bytes), 9))
        }
        _ => bail!("invalid varint marker: {}", marker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: u64) -> usize {
        let mut buf = Vec::new();
        write_varint(value, &mut buf);
        assert_eq!(buf.len(), varint_len(value));
        let (decoded, read) = read_varint(&buf).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(read, buf.len());
        buf.len()
    }

    #[test]
    fn boundary_values_round_trip_at_the_documented_widths() {
        assert_eq!(round_trip(0), 1);
        assert_eq!(round_trip(240), 1);
        assert_eq!(round_trip(241), 2);
        assert_eq!(round_trip(2287), 2);
        assert_eq!(round_trip(2288), 3);
        assert_eq!(round_trip(67823), 3);
        assert_eq!(round_trip(67824), 4);
        assert_eq!(round_trip(0xFF_FFFF), 4);
        assert_eq!(round_trip(0x100_0000), 5);
        assert_eq!(round_trip(u32::MAX as u64), 5);
        assert_eq!(round_trip(u32::MAX as u64 + 1), 9);
        assert_eq!(round_trip(u64::MAX), 9);
    }

    #[test]
    fn decode_rejects_reserved_markers() {
        for marker in 252..=254u8 {
            assert!(read_varint(&[marker, 0, 0]).is_err());
        }
    }

    #[test]
    fn decode_rejects_truncated_input() {
        assert!(read_varint(&[]).is_err());
        assert!(read_varint(&[249, 1]).is_err());
        assert!(read_varint(&[255, 0, 0, 0]).is_err());
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let (value, read) = read_varint(&[7, 99, 99]).unwrap();
        assert_eq!((value, read), (7, 1));
    }
}
