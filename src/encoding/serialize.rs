//! # Serialized Datum Format
//!
//! Byte layout for datums persisted as blobs. Containers carry fixed-width
//! offset tables so buffer-backed arrays and objects answer size and element
//! queries without materializing anything; strings and binaries decode to
//! windows over the blob, not copies.
//!
//! ## Layout
//!
//! ```text
//! datum    := tag payload
//! tag      := 0x01 NULL | 0x02 FALSE | 0x03 TRUE | 0x04 NUM | 0x05 STR
//!           | 0x06 BINARY | 0x07 ARRAY | 0x08 OBJECT
//! NUM      := f64, 8 bytes little-endian
//! STR      := varint length ‖ bytes
//! BINARY   := varint length ‖ bytes
//! ARRAY    := varint count ‖ count × u32 LE offsets ‖ elements
//! OBJECT   := varint count ‖ count × u32 LE offsets ‖ pairs
//! pair     := varint key-length ‖ key bytes ‖ datum
//! ```
//!
//! Offsets are measured from the container's own tag byte, so a nested
//! container is addressed by the sub-window starting at its offset and the
//! same reader works at every depth.

use eyre::{bail, ensure, Result};

use crate::buffer::SharedBufRef;
use crate::datum::string::DatumString;
use crate::datum::{Datum, DatumType, ThrowMode};
use crate::encoding::varint::{read_varint, write_varint};

pub const TAG_NULL: u8 = 0x01;
pub const TAG_FALSE: u8 = 0x02;
pub const TAG_TRUE: u8 = 0x03;
pub const TAG_NUM: u8 = 0x04;
pub const TAG_STR: u8 = 0x05;
pub const TAG_BINARY: u8 = 0x06;
pub const TAG_ARRAY: u8 = 0x07;
pub const TAG_OBJECT: u8 = 0x08;

/// Serializes a datum into a standalone blob.
pub fn serialize_datum(datum: &Datum) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_datum(datum, &mut out)?;
    Ok(out)
}

fn write_datum(datum: &Datum, out: &mut Vec<u8>) -> Result<()> {
    match datum.get_type() {
        DatumType::Uninitialized => bail!("cannot serialize an uninitialized datum"),
        DatumType::Null => out.push(TAG_NULL),
        DatumType::Bool => out.push(if datum.as_bool()? { TAG_TRUE } else { TAG_FALSE }),
        DatumType::Num => {
            out.push(TAG_NUM);
            out.extend_from_slice(&datum.as_num()?.to_le_bytes());
        }
        DatumType::Str => {
            let bytes = datum.as_str()?.as_bytes();
            out.push(TAG_STR);
            write_varint(bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }
        DatumType::Binary => {
            let bytes = datum.as_binary()?.as_bytes();
            out.push(TAG_BINARY);
            write_varint(bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }
        DatumType::Array => {
            let start = out.len();
            out.push(TAG_ARRAY);
            let count = datum.arr_size()?;
            write_varint(count as u64, out);
            let table_pos = out.len();
            out.resize(table_pos + 4 * count, 0);
            for i in 0..count {
                let offset = u32::try_from(out.len() - start)?;
                out[table_pos + 4 * i..table_pos + 4 * (i + 1)]
                    .copy_from_slice(&offset.to_le_bytes());
                write_datum(&datum.get(i, ThrowMode::Throw)?, out)?;
            }
        }
        DatumType::Object => {
            let start = out.len();
            out.push(TAG_OBJECT);
            let count = datum.obj_size()?;
            write_varint(count as u64, out);
            let table_pos = out.len();
            out.resize(table_pos + 4 * count, 0);
            for i in 0..count {
                let offset = u32::try_from(out.len() - start)?;
                out[table_pos + 4 * i..table_pos + 4 * (i + 1)]
                    .copy_from_slice(&offset.to_le_bytes());
                let (key, value) = datum.get_pair(i)?;
                write_varint(key.len() as u64, out);
                out.extend_from_slice(key.as_bytes());
                write_datum(&value, out)?;
            }
        }
    }
    Ok(())
}

fn container_header(buf: &SharedBufRef) -> Result<(u64, usize)> {
    let bytes = buf.as_bytes();
    ensure!(!bytes.is_empty(), "empty datum blob");
    ensure!(
        bytes[0] == TAG_ARRAY || bytes[0] == TAG_OBJECT,
        "datum blob window does not start with a container tag (0x{:02x})",
        bytes[0]
    );
    let (count, varint_len) = read_varint(&bytes[1..])?;
    Ok((count, 1 + varint_len))
}

/// Element count of a serialized array, or pair count of a serialized
/// object.
pub fn array_size(buf: &SharedBufRef) -> Result<u32> {
    let (count, _) = container_header(buf)?;
    Ok(u32::try_from(count)?)
}

/// Offset of element `index` relative to the container's window start.
pub fn element_offset(buf: &SharedBufRef, index: usize) -> Result<u32> {
    let (count, table_pos) = container_header(buf)?;
    ensure!(
        (index as u64) < count,
        "element index {} out of bounds for serialized container of size {}",
        index,
        count
    );
    let bytes = buf.as_bytes();
    let entry = table_pos + 4 * index;
    ensure!(bytes.len() >= entry + 4, "truncated container offset table");
    let mut le = [0u8; 4];
    le.copy_from_slice(&bytes[entry..entry + 4]);
    Ok(u32::from_le_bytes(le))
}

/// Decodes the datum starting at `offset` of the window. Scalars
/// materialize; strings, binaries and containers wrap sub-windows.
pub fn deserialize_value(buf: &SharedBufRef, offset: u32) -> Result<Datum> {
    let offset = offset as usize;
    let bytes = buf.as_bytes();
    ensure!(offset < bytes.len(), "datum offset out of bounds");
    match bytes[offset] {
        TAG_NULL => Ok(Datum::null()),
        TAG_FALSE => Ok(Datum::boolean(false)),
        TAG_TRUE => Ok(Datum::boolean(true)),
        TAG_NUM => {
            ensure!(bytes.len() >= offset + 9, "truncated number payload");
            let mut le = [0u8; 8];
            le.copy_from_slice(&bytes[offset + 1..offset + 9]);
            Datum::num(f64::from_le_bytes(le))
        }
        TAG_STR => {
            let (window, _) = payload_window(buf, offset)?;
            Ok(Datum::from_buf(DatumType::Str, window))
        }
        TAG_BINARY => {
            let (window, _) = payload_window(buf, offset)?;
            Ok(Datum::from_buf(DatumType::Binary, window))
        }
        TAG_ARRAY => Ok(Datum::from_buf(DatumType::Array, buf.slice_from(offset))),
        TAG_OBJECT => Ok(Datum::from_buf(DatumType::Object, buf.slice_from(offset))),
        tag => bail!("unknown serialized datum tag: 0x{:02x}", tag),
    }
}

/// Decodes the key/value pair starting at `offset` of an object window.
pub fn deserialize_pair(buf: &SharedBufRef, offset: u32) -> Result<(DatumString, Datum)> {
    let offset = offset as usize;
    let bytes = buf.as_bytes();
    ensure!(offset < bytes.len(), "pair offset out of bounds");
    let (key_len, varint_len) = read_varint(&bytes[offset..])?;
    let key_start = offset + varint_len;
    let key_end = key_start + usize::try_from(key_len)?;
    ensure!(bytes.len() >= key_end, "truncated object key");
    let key = DatumString::from_buf(buf.slice(key_start..key_end));
    let value = deserialize_value(buf, u32::try_from(key_end)?)?;
    Ok((key, value))
}

/// Wraps a whole serialized blob as a datum without materializing it.
pub fn wrap_datum(buf: SharedBufRef) -> Result<Datum> {
    deserialize_value(&buf, 0)
}

fn payload_window(buf: &SharedBufRef, offset: usize) -> Result<(SharedBufRef, usize)> {
    let bytes = buf.as_bytes();
    let (len, varint_len) = read_varint(&bytes[offset + 1..])?;
    let start = offset + 1 + varint_len;
    let end = start + usize::try_from(len)?;
    ensure!(bytes.len() >= end, "truncated byte-string payload");
    Ok((buf.slice(start..end), end))
}
