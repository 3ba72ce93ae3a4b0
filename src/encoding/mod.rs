//! Byte-level encodings: index keys, serialized datum blobs, and the
//! varint length prefixes the blob format uses.

pub mod key;
pub mod serialize;
pub mod varint;
