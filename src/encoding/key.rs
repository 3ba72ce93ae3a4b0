//! # Index Key Encoding
//!
//! Datums become byte keys whose plain `memcmp` order equals the datum
//! order under the latest comparison version. Each encodable variant gets a
//! one-byte tag that also ranks variants against each other:
//!
//! ```text
//! 'A' (0x41)  ARRAY      element encodings, each NUL-terminated
//! 'B' (0x42)  BOOL       't' or 'f'
//! 'N' (0x4E)  NUMBER     16 hex digits of the sign-mangled IEEE bits,
//!                        then '#' and a readable decimal for debugging
//! 'P' (0x50)  PTYPE      "PBINARY:" escaped bytes / "PTIME:" mangled epoch
//! 'S' (0x53)  STRING     raw bytes
//! ```
//!
//! NULL and plain objects cannot be keys. Tag order, pseudotype-name order
//! and the modern cross-variant rank all coincide; `cmp_with(V1_16, ..)`
//! and key comparison must never disagree.
//!
//! ## Number mangling
//!
//! A negative double has its bits flipped entirely; a non-negative double
//! has only the sign bit flipped. Negative values then sort below positive
//! ones, and more negative below less negative, under plain byte order.
//!
//! ## Secondary keys
//!
//! A secondary index entry packs the indexed value, the primary key it
//! points at, and an optional multi-index tag:
//!
//! ```text
//! truncated secondary ‖ primary ‖ tag (8 bytes LE, optional) ‖ pk_off ‖ tag_off
//! ```
//!
//! The two trailing bytes locate the primary key and tag, so the entry is
//! self-delimiting from the right. From v1_14 on the secondary part gets a
//! NUL terminator (counted by `pk_off`) before composition so that a value
//! is never a bare prefix of a longer value's entry. The secondary part is
//! cut at `trunc_size(primary.len())` to fit `MAX_KEY_SIZE`; readers detect
//! truncation by total length and re-filter exact matches.

use eyre::Result;

use crate::config::{MAX_KEY_SIZE, MAX_PRIMARY_KEY_SIZE, TAG_SIZE};
use crate::datum::cmp::ReqlVersion;
use crate::datum::string::DatumString;
use crate::datum::{Datum, DatumType, ThrowMode};
use crate::error::generic_error;
use crate::pseudo;

/// A raw storage key. Ordering is plain byte order, the same order the
/// B-tree applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey(Vec<u8>);

impl StoreKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        StoreKey(bytes)
    }

    /// Sorts before every encodable datum.
    pub fn min() -> Self {
        StoreKey(Vec::new())
    }

    /// Sorts after every encodable datum.
    pub fn max() -> Self {
        StoreKey(vec![0xFF; MAX_KEY_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Bytes available for the value part of a secondary key that carries a
/// primary key of the given length.
pub fn trunc_size(primary_key_len: usize) -> usize {
    MAX_KEY_SIZE - primary_key_len - TAG_SIZE - 2
}

/// The worst-case (most truncated) value budget: what remains when the
/// primary key is as long as primary keys get.
pub fn max_trunc_size() -> usize {
    trunc_size(MAX_PRIMARY_KEY_SIZE)
}

fn mangle_double(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & (1u64 << 63) != 0 {
        !bits
    } else {
        bits ^ (1u64 << 63)
    }
}

fn unmangle_double(mangled: u64) -> f64 {
    if mangled & (1u64 << 63) != 0 {
        f64::from_bits(mangled ^ (1u64 << 63))
    } else {
        f64::from_bits(!mangled)
    }
}

fn num_to_key(value: f64, out: &mut Vec<u8>) {
    out.push(b'N');
    // The hex field is load-bearing for ordering; the '#' suffix is for
    // humans reading keys in debug dumps and round-trips losslessly because
    // the decimal form is the shortest reconstructable rendering.
    out.extend_from_slice(format!("{:016x}", mangle_double(value)).as_bytes());
    out.push(b'#');
    out.extend_from_slice(format!("{}", value).as_bytes());
}

fn str_to_key(s: &DatumString, out: &mut Vec<u8>) {
    out.push(b'S');
    let budget = MAX_KEY_SIZE.saturating_sub(out.len());
    let to_append = budget.min(s.len());
    out.extend_from_slice(&s.as_bytes()[..to_append]);
}

const BINARY_KEY_PREFIX: &[u8] = b"PBINARY:";

fn binary_to_key(data: &DatumString, out: &mut Vec<u8>) {
    out.extend_from_slice(BINARY_KEY_PREFIX);
    let budget = MAX_KEY_SIZE.saturating_sub(out.len());
    let to_append = budget.min(data.len());
    // NUL bytes are escaped so NUL stays usable as the array separator:
    // 0x00 -> 0x01 0x01 and 0x01 -> 0x01 0x02. Escaping preserves byte
    // order because 0x01 0x01 < 0x01 0x02 < any 0x02.. byte.
    for &byte in &data.as_bytes()[..to_append] {
        match byte {
            0x00 => out.extend_from_slice(&[0x01, 0x01]),
            0x01 => out.extend_from_slice(&[0x01, 0x02]),
            other => out.push(other),
        }
    }
}

fn bool_to_key(value: bool, out: &mut Vec<u8>) {
    out.push(b'B');
    out.push(if value { b't' } else { b'f' });
}

const TIME_KEY_PREFIX: &[u8] = b"PTIME:";

fn ptype_to_key(datum: &Datum, out: &mut Vec<u8>) -> Result<()> {
    match datum.reql_type()?.as_str() {
        pseudo::time::NAME => {
            out.extend_from_slice(TIME_KEY_PREFIX);
            let epoch = pseudo::time::epoch_time(datum)?;
            out.extend_from_slice(format!("{:016x}", mangle_double(epoch)).as_bytes());
            Ok(())
        }
        pseudo::geometry::NAME => Err(generic_error(
            "Cannot use a geometry value as a key value in a primary or \
             non-geospatial secondary index.",
        )),
        _ => Err(generic_error(format!(
            "Cannot use pseudotype {} as a primary or secondary key value.",
            datum.type_name()
        ))),
    }
}

// Arrays encode each element followed by a NUL, including the last one, so
// no array's encoding is a prefix of a longer sibling's.
fn array_to_key(datum: &Datum, out: &mut Vec<u8>) -> Result<()> {
    out.push(b'A');
    let size = datum.arr_size()?;
    for i in 0..size {
        if out.len() >= MAX_KEY_SIZE {
            break;
        }
        let item = datum.get(i, ThrowMode::NoThrow)?;
        match item.get_type() {
            DatumType::Num => num_to_key(item.as_num()?, out),
            DatumType::Str => str_to_key(item.as_str()?, out),
            DatumType::Binary => binary_to_key(item.as_binary()?, out),
            DatumType::Bool => bool_to_key(item.as_bool()?, out),
            DatumType::Array => array_to_key(&item, out)?,
            DatumType::Object if item.is_ptype() => ptype_to_key(&item, out)?,
            _ => {
                return Err(generic_error(format!(
                    "Array keys can only contain numbers, strings, bools, \
                     pseudotypes, or arrays (got {} of type {}).",
                    item.print(),
                    item.type_name()
                )));
            }
        }
        out.push(0x00);
    }
    Ok(())
}

fn encode_key_value(datum: &Datum, out: &mut Vec<u8>, key_kind: &str) -> Result<()> {
    match datum.get_type() {
        DatumType::Num => num_to_key(datum.as_num()?, out),
        DatumType::Str => str_to_key(datum.as_str()?, out),
        DatumType::Binary => binary_to_key(datum.as_binary()?, out),
        DatumType::Bool => bool_to_key(datum.as_bool()?, out),
        DatumType::Array => array_to_key(datum, out)?,
        DatumType::Object if datum.is_ptype() => ptype_to_key(datum, out)?,
        _ => {
            return Err(generic_error(format!(
                "{} must be either a number, string, bool, pseudotype \
                 or array (got type {}):\n{}",
                key_kind,
                datum.type_name(),
                datum.trunc_print()
            )));
        }
    }
    Ok(())
}

/// Canonical primary key of a datum. Fails on unkeyable variants and on
/// encodings past `MAX_PRIMARY_KEY_SIZE`.
pub fn primary_key(datum: &Datum) -> Result<StoreKey> {
    let mut out = Vec::with_capacity(32);
    encode_key_value(datum, &mut out, "Primary keys")?;
    if out.len() > MAX_PRIMARY_KEY_SIZE {
        return Err(generic_error(format!(
            "Primary key too long (max {} characters): {}",
            MAX_PRIMARY_KEY_SIZE - 1,
            datum.print()
        )));
    }
    Ok(StoreKey(out))
}

/// The value part of a secondary key, before version framing, truncation
/// and composition.
pub fn secondary_key_value(datum: &Datum) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(MAX_KEY_SIZE);
    encode_key_value(datum, &mut out, "Secondary keys")?;
    Ok(out)
}

/// The 8 tag bytes, written little-endian on every host.
pub fn encode_tag_num(tag_num: u64) -> [u8; TAG_SIZE] {
    tag_num.to_le_bytes()
}

fn mangle_secondary(secondary: &[u8], primary: &[u8], tag: &[u8]) -> StoreKey {
    assert!(secondary.len() < u8::MAX as usize);
    assert!(secondary.len() + primary.len() < u8::MAX as usize);
    let pk_offset = secondary.len() as u8;
    let tag_offset = pk_offset + primary.len() as u8;

    let mut out = Vec::with_capacity(secondary.len() + primary.len() + tag.len() + 2);
    out.extend_from_slice(secondary);
    out.extend_from_slice(primary);
    out.extend_from_slice(tag);
    out.push(pk_offset);
    out.push(tag_offset);
    assert!(out.len() <= MAX_KEY_SIZE);
    StoreKey(out)
}

/// Packs an already-encoded secondary value with its primary key and
/// optional tag, truncating the value part to fit `MAX_KEY_SIZE`.
pub fn compose_secondary(
    secondary_key: &[u8],
    primary_key: &StoreKey,
    tag_num: Option<u64>,
) -> Result<StoreKey> {
    if primary_key.len() > MAX_PRIMARY_KEY_SIZE {
        return Err(generic_error(format!(
            "Primary key too long (max {} characters): {}",
            MAX_PRIMARY_KEY_SIZE - 1,
            String::from_utf8_lossy(primary_key.as_bytes())
        )));
    }
    let tag_bytes = match tag_num {
        Some(tag) => encode_tag_num(tag).to_vec(),
        None => Vec::new(),
    };
    let cut = secondary_key.len().min(trunc_size(primary_key.len()));
    Ok(mangle_secondary(
        &secondary_key[..cut],
        primary_key.as_bytes(),
        &tag_bytes,
    ))
}

/// Full secondary-key encoding of a datum. From v1_14 on the value part is
/// NUL-terminated before composition.
pub fn secondary_key(
    datum: &Datum,
    version: ReqlVersion,
    primary_key: &StoreKey,
    tag_num: Option<u64>,
) -> Result<StoreKey> {
    let mut value = secondary_key_value(datum)?;
    match version {
        ReqlVersion::V1_13 => {}
        ReqlVersion::V1_14 | ReqlVersion::V1_16 => value.push(0x00),
    }
    compose_secondary(&value, primary_key, tag_num)
}

/// The parts a secondary key splits back into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryComponents {
    pub secondary: Vec<u8>,
    pub primary: Vec<u8>,
    pub tag_num: Option<u64>,
}

/// Splits a composed secondary key. Panics on malformed input: every key
/// this sees was produced by `compose_secondary` and stored verbatim.
pub fn parse_secondary(key: &[u8]) -> SecondaryComponents {
    assert!(key.len() >= 2, "secondary key too short to carry offsets");
    let start_of_tag = key[key.len() - 1] as usize;
    let start_of_primary = key[key.len() - 2] as usize;
    assert!(
        start_of_primary < start_of_tag && start_of_tag <= key.len() - 2,
        "secondary key offsets out of order"
    );

    let secondary = key[..start_of_primary].to_vec();
    let primary = key[start_of_primary..start_of_tag].to_vec();
    let tag_bytes = &key[start_of_tag..key.len() - 2];
    let tag_num = match tag_bytes.len() {
        0 => None,
        TAG_SIZE => {
            let mut bytes = [0u8; TAG_SIZE];
            bytes.copy_from_slice(tag_bytes);
            Some(u64::from_le_bytes(bytes))
        }
        n => panic!("secondary key carries a {}-byte tag", n),
    };
    SecondaryComponents {
        secondary,
        primary,
        tag_num,
    }
}

pub fn extract_primary(key: &[u8]) -> Vec<u8> {
    parse_secondary(key).primary
}

pub fn extract_secondary(key: &[u8]) -> Vec<u8> {
    parse_secondary(key).secondary
}

pub fn extract_tag(key: &[u8]) -> Option<u64> {
    parse_secondary(key).tag_num
}

/// Whether a composed secondary key had its value part cut. A truncated key
/// uses every byte the layout allows, so length is the test.
pub fn key_is_truncated(key: &[u8]) -> bool {
    if extract_tag(key).is_some() {
        key.len() == MAX_KEY_SIZE
    } else {
        key.len() == MAX_KEY_SIZE - TAG_SIZE
    }
}

/// The search prefix for an exact-value secondary lookup: the value
/// encoding cut at the worst-case truncation budget. Truncation depends on
/// the (unknown) primary key length, so lookups use the maximum cut and
/// re-filter.
pub fn truncated_secondary(datum: &Datum) -> Result<StoreKey> {
    let mut value = secondary_key_value(datum)?;
    value.truncate(max_trunc_size());
    Ok(StoreKey(value))
}

// Nesting bound for decoding. Far beyond anything a 250-byte key can
// legitimately hold; exists so hostile input cannot recurse the stack away.
const MAX_DECODE_DEPTH: usize = 64;

struct KeyParser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> KeyParser<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(generic_error("Truncated key encoding."));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_hex16(&mut self) -> Result<u64> {
        let digits = self.take(16)?;
        let text = std::str::from_utf8(digits)
            .map_err(|_| generic_error("Malformed hex digits in key encoding."))?;
        u64::from_str_radix(text, 16)
            .map_err(|_| generic_error("Malformed hex digits in key encoding."))
    }

    /// Bytes up to the enclosing array's separator, or the rest of the key
    /// at top level.
    fn take_until_terminator(&mut self, in_array: bool) -> &'a [u8] {
        let start = self.pos;
        while self.pos < self.buf.len() && !(in_array && self.buf[self.pos] == 0x00) {
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }

    fn parse_value(&mut self, in_array: bool, depth: usize) -> Result<Datum> {
        if depth > MAX_DECODE_DEPTH {
            return Err(generic_error("Key encoding nests too deeply."));
        }
        match self.take(1)?[0] {
            b'N' => {
                let value = unmangle_double(self.take_hex16()?);
                if self.peek() == Some(b'#') {
                    self.pos += 1;
                    self.take_until_terminator(in_array);
                }
                Datum::num(value)
            }
            b'S' => {
                let bytes = self.take_until_terminator(in_array);
                Ok(Datum::str_unchecked(DatumString::from_bytes(
                    bytes.to_vec(),
                )))
            }
            b'B' => match self.take(1)?[0] {
                b't' => Ok(Datum::boolean(true)),
                b'f' => Ok(Datum::boolean(false)),
                _ => Err(generic_error("Malformed bool in key encoding.")),
            },
            b'A' => {
                let mut elements = Vec::new();
                while let Some(byte) = self.peek() {
                    if in_array && byte == 0x00 {
                        break;
                    }
                    elements.push(self.parse_value(true, depth + 1)?);
                    match self.take(1)?[0] {
                        0x00 => {}
                        _ => return Err(generic_error("Missing array separator in key.")),
                    }
                }
                // Keys may legally encode arrays that predate the current
                // size limit, so reconstruction skips the check.
                Ok(Datum::array_unchecked(elements))
            }
            b'P' => {
                let name_start = self.pos;
                while self.peek().map(|b| b != b':').unwrap_or(false) {
                    self.pos += 1;
                }
                let name = &self.buf[name_start..self.pos];
                self.take(1)?; // ':'
                match name {
                    b"BINARY" => {
                        let escaped = self.take_until_terminator(in_array);
                        let mut bytes = Vec::with_capacity(escaped.len());
                        let mut i = 0;
                        while i < escaped.len() {
                            match escaped[i] {
                                0x01 => {
                                    let next = *escaped.get(i + 1).ok_or_else(|| {
                                        generic_error("Truncated escape in binary key.")
                                    })?;
                                    bytes.push(match next {
                                        0x01 => 0x00,
                                        0x02 => 0x01,
                                        _ => {
                                            return Err(generic_error(
                                                "Malformed escape in binary key.",
                                            ))
                                        }
                                    });
                                    i += 2;
                                }
                                other => {
                                    bytes.push(other);
                                    i += 1;
                                }
                            }
                        }
                        Ok(Datum::binary(DatumString::from_bytes(bytes)))
                    }
                    b"TIME" => {
                        let epoch = unmangle_double(self.take_hex16()?);
                        // The timezone is not part of the key; UTC is as
                        // good as any display zone and compares equal.
                        pseudo::time::make_time(epoch, "+00:00")
                    }
                    other => Err(generic_error(format!(
                        "Unknown pseudotype `{}` in key encoding.",
                        String::from_utf8_lossy(other)
                    ))),
                }
            }
            tag => Err(generic_error(format!(
                "Unknown key tag byte `0x{:02x}`.",
                tag
            ))),
        }
    }
}

/// Reconstructs the datum a primary key encodes. Inverse of [`primary_key`]
/// for every encoding that was not truncated.
pub fn decode_primary(key: &[u8]) -> Result<Datum> {
    let mut parser = KeyParser { buf: key, pos: 0 };
    let datum = parser.parse_value(false, 0)?;
    if parser.pos != key.len() {
        return Err(generic_error("Trailing bytes after key encoding."));
    }
    Ok(datum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfiguredLimits;
    use crate::datum::cmp::{ReqlVersion, LATEST_VERSION};

    fn n(value: f64) -> Datum {
        Datum::num(value).unwrap()
    }

    fn s(text: &str) -> Datum {
        Datum::string(text, LATEST_VERSION).unwrap()
    }

    fn arr(elements: Vec<Datum>) -> Datum {
        Datum::array(elements, &ConfiguredLimits::default()).unwrap()
    }

    #[test]
    fn negative_numbers_sort_below_positive_ones_by_memcmp() {
        let neg = primary_key(&n(-1.0)).unwrap();
        let pos = primary_key(&n(1.0)).unwrap();
        assert!(neg < pos);
        assert!(neg.as_bytes().starts_with(b"N400fffffffffffff#-1"));
        assert!(pos.as_bytes().starts_with(b"Nbff0000000000000#1"));
    }

    #[test]
    fn number_key_order_matches_numeric_order() {
        let values = [
            f64::MIN,
            -1.0e10,
            -2.5,
            -1.0,
            -f64::MIN_POSITIVE,
            0.0,
            f64::MIN_POSITIVE,
            0.5,
            1.0,
            2.5,
            1.0e10,
            f64::MAX,
        ];
        for pair in values.windows(2) {
            let a = secondary_key_value(&n(pair[0])).unwrap();
            let b = secondary_key_value(&n(pair[1])).unwrap();
            assert!(a < b, "{} should encode below {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn bool_and_string_keys_use_their_tags() {
        assert_eq!(primary_key(&Datum::boolean(true)).unwrap().as_bytes(), b"Bt");
        assert_eq!(
            primary_key(&Datum::boolean(false)).unwrap().as_bytes(),
            b"Bf"
        );
        assert_eq!(primary_key(&s("abc")).unwrap().as_bytes(), b"Sabc");
    }

    #[test]
    fn binary_keys_escape_low_bytes() {
        let key = primary_key(&Datum::binary(b"\x00\x01x".to_vec())).unwrap();
        assert_eq!(key.as_bytes(), b"PBINARY:\x01\x01\x01\x02x");
    }

    #[test]
    fn array_keys_terminate_every_element() {
        let key = primary_key(&arr(vec![n(1.0), s("ab")])).unwrap();
        let mut expected = b"A".to_vec();
        expected.extend_from_slice(b"Nbff0000000000000#1");
        expected.push(0);
        expected.extend_from_slice(b"Sab");
        expected.push(0);
        assert_eq!(key.as_bytes(), &expected[..]);
    }

    #[test]
    fn null_and_plain_objects_are_not_keyable() {
        assert!(primary_key(&Datum::null()).is_err());
        assert!(primary_key(&Datum::empty_object()).is_err());
        let nested_null = arr(vec![Datum::null()]);
        assert!(primary_key(&nested_null).is_err());
    }

    #[test]
    fn geometry_is_rejected_as_a_key() {
        use crate::datum::string::DatumString;
        let geo = Datum::object(
            vec![
                (
                    DatumString::from("$reql_type$"),
                    Datum::str_unchecked(DatumString::from("GEOMETRY")),
                ),
                (
                    DatumString::from("coordinates"),
                    Datum::empty_array(),
                ),
                (
                    DatumString::from("type"),
                    Datum::str_unchecked(DatumString::from("Point")),
                ),
            ],
            &[],
        )
        .unwrap();
        let err = primary_key(&geo).unwrap_err();
        assert!(err.to_string().contains("geometry"));
    }

    #[test]
    fn oversized_primary_keys_are_rejected() {
        let long = s(&"x".repeat(MAX_PRIMARY_KEY_SIZE + 10));
        let err = primary_key(&long).unwrap_err();
        assert!(err.to_string().contains("Primary key too long"));
    }

    #[test]
    fn time_keys_are_fixed_width_and_ordered() {
        let early = crate::pseudo::time::make_time(100.0, "+00:00").unwrap();
        let late = crate::pseudo::time::make_time(200.0, "-07:00").unwrap();
        let early_key = primary_key(&early).unwrap();
        let late_key = primary_key(&late).unwrap();
        assert_eq!(early_key.len(), TIME_KEY_PREFIX.len() + 16);
        assert_eq!(early_key.len(), late_key.len());
        assert!(early_key < late_key);
    }

    #[test]
    fn secondary_layout_places_offsets_last() {
        let value = s("abc");
        let primary = StoreKey::new(b"pk".to_vec());
        let key = secondary_key(&value, ReqlVersion::V1_14, &primary, Some(7)).unwrap();
        // "Sabc" + NUL terminator, then "pk", the LE tag, and both offsets.
        let expected = [
            b'S', b'a', b'b', b'c', 0x00, b'p', b'k', 7, 0, 0, 0, 0, 0, 0, 0, 5, 7,
        ];
        assert_eq!(key.as_bytes(), &expected[..]);
    }

    #[test]
    fn v1_13_secondary_keys_omit_the_terminator() {
        let value = s("abc");
        let primary = StoreKey::new(b"pk".to_vec());
        let key = secondary_key(&value, ReqlVersion::V1_13, &primary, None).unwrap();
        assert_eq!(key.as_bytes(), b"Sabcpk\x04\x06");
    }

    #[test]
    fn parse_secondary_inverts_compose() {
        let value = s("hello");
        let primary = primary_key(&s("the-key")).unwrap();
        for tag in [None, Some(0u64), Some(7), Some(u64::MAX)] {
            let composed = secondary_key(&value, LATEST_VERSION, &primary, tag).unwrap();
            let parts = parse_secondary(composed.as_bytes());
            assert_eq!(parts.secondary, b"Shello\x00");
            assert_eq!(parts.primary, primary.as_bytes());
            assert_eq!(parts.tag_num, tag);
        }
    }

    #[test]
    fn long_values_truncate_to_the_primary_dependent_budget() {
        let value = s(&"v".repeat(MAX_KEY_SIZE));
        let primary = StoreKey::new(b"p".repeat(20));
        let key = secondary_key(&value, LATEST_VERSION, &primary, Some(1)).unwrap();
        assert_eq!(key.len(), MAX_KEY_SIZE);
        assert!(key_is_truncated(key.as_bytes()));
        let parts = parse_secondary(key.as_bytes());
        assert_eq!(parts.secondary.len(), trunc_size(20));
        assert_eq!(parts.primary, primary.as_bytes());

        let untagged = secondary_key(&value, LATEST_VERSION, &primary, None).unwrap();
        assert_eq!(untagged.len(), MAX_KEY_SIZE - TAG_SIZE);
        assert!(key_is_truncated(untagged.as_bytes()));
    }

    #[test]
    fn short_values_are_not_flagged_truncated() {
        let key = secondary_key(
            &s("short"),
            LATEST_VERSION,
            &StoreKey::new(b"pk".to_vec()),
            Some(3),
        )
        .unwrap();
        assert!(!key_is_truncated(key.as_bytes()));
    }

    #[test]
    fn truncated_secondary_uses_the_worst_case_budget() {
        let value = s(&"q".repeat(MAX_KEY_SIZE));
        let prefix = truncated_secondary(&value).unwrap();
        assert_eq!(prefix.len(), max_trunc_size());
    }

    #[test]
    fn primary_keys_decode_back_to_their_datum() {
        let samples = vec![
            n(0.0),
            n(-12345.6789),
            n(3.0e40),
            Datum::boolean(false),
            Datum::boolean(true),
            s(""),
            s("plain text"),
            Datum::binary(b"\x00\x01\x02escaped\xff".to_vec()),
            arr(vec![]),
            arr(vec![n(1.0), s("two"), Datum::boolean(true)]),
            arr(vec![arr(vec![n(1.0)]), arr(vec![])]),
            crate::pseudo::time::make_time(1234.5, "+00:00").unwrap(),
        ];
        for datum in samples {
            let key = primary_key(&datum).unwrap();
            let decoded = decode_primary(key.as_bytes()).unwrap();
            assert_eq!(decoded, datum, "round trip failed for {}", datum.print());
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_primary(b"").is_err());
        assert!(decode_primary(b"Q").is_err());
        assert!(decode_primary(b"Nnothexdigits####").is_err());
        assert!(decode_primary(b"Bx").is_err());
    }
}
