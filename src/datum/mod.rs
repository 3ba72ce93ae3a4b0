//! # Datum — the Query-Language Value
//!
//! This module provides `Datum`, the tagged value that flows through the
//! query engine, is persisted by the storage layer, and defines index keys.
//!
//! ## Variants
//!
//! | Variant | Payload | Notes |
//! |---------|---------|-------|
//! | Uninitialized | - | placeholder only; never persisted or compared |
//! | Null | - | |
//! | Bool | bool | |
//! | Num | f64 | always finite |
//! | Str | byte string | NUL-free; UTF-8 validated under v1_14+ |
//! | Binary | byte string | wire form is the BINARY pseudotype object |
//! | Array | shared slice of datums | size-limited at construction |
//! | Object | shared sorted pair slice | keys ascending, unique |
//!
//! ## Physical forms
//!
//! Arrays and objects have two physical forms: materialized (an `Arc`'d
//! slice) and buffer-backed (a [`SharedBufRef`] window over a serialized
//! blob, decoded element-by-element on demand). Both behave identically
//! through every accessor; `get_type` collapses them.
//!
//! ## Sharing
//!
//! `Datum` is a small value with refcounted interior. Clones are O(1) and
//! thread-safe; there is no mutation after construction. New values are made
//! with the constructors here or with the builders in [`crate::builder`].

pub mod cmp;
pub mod merge;
pub mod string;

use std::sync::Arc;

use eyre::Result;

use crate::buffer::SharedBufRef;
use crate::config::{ConfiguredLimits, TRUNC_LEN};
use crate::datum::cmp::ReqlVersion;
use crate::datum::string::DatumString;
use crate::encoding::serialize;
use crate::error::{generic_error, non_existence_error, too_large_error};
use crate::pseudo;

/// Largest double that still falls in the contiguous integer range.
pub const MAX_DBL_INT: f64 = 9_007_199_254_740_992.0; // 2^53
/// Smallest double that still falls in the contiguous integer range.
pub const MIN_DBL_INT: f64 = -9_007_199_254_740_992.0; // -2^53

/// Logical variant of a datum. Buffer-backed containers report `Array` /
/// `Object` like their materialized twins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatumType {
    Uninitialized,
    Null,
    Bool,
    Num,
    Str,
    Binary,
    Array,
    Object,
}

impl DatumType {
    pub fn raw_name(self) -> &'static str {
        match self {
            DatumType::Uninitialized => "UNINITIALIZED",
            DatumType::Null => "NULL",
            DatumType::Bool => "BOOL",
            DatumType::Num => "NUMBER",
            DatumType::Str => "STRING",
            DatumType::Binary => "PTYPE<BINARY>",
            DatumType::Array => "ARRAY",
            DatumType::Object => "OBJECT",
        }
    }
}

/// Whether a lookup miss raises `NonExistence` or yields the uninitialized
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrowMode {
    Throw,
    NoThrow,
}

#[derive(Clone)]
pub(crate) enum Repr {
    Uninitialized,
    Null,
    Bool(bool),
    Num(f64),
    Str(DatumString),
    Binary(DatumString),
    Array(Arc<[Datum]>),
    Object(Arc<[(DatumString, Datum)]>),
    BufArray(SharedBufRef),
    BufObject(SharedBufRef),
}

#[derive(Clone)]
pub struct Datum {
    pub(crate) repr: Repr,
}

/// Rejects byte strings that cannot be stored: anything containing NUL
/// (the key encoder uses NUL as its array separator).
pub(crate) fn check_str_validity(bytes: &[u8]) -> Result<()> {
    if let Some(pos) = bytes.iter().position(|&b| b == 0) {
        let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(20)]);
        return Err(generic_error(format!(
            "String `{}` (truncated) contains NULL byte at offset {}.",
            prefix, pos
        )));
    }
    Ok(())
}

/// Version-gated UTF-8 validation for strings and object keys.
pub(crate) fn fail_if_invalid(version: ReqlVersion, bytes: &[u8]) -> Result<()> {
    match version {
        ReqlVersion::V1_13 => Ok(()),
        ReqlVersion::V1_14 | ReqlVersion::V1_16 => match std::str::from_utf8(bytes) {
            Ok(_) => Ok(()),
            Err(e) => {
                let cut = e.valid_up_to().min(20);
                let prefix = String::from_utf8_lossy(&bytes[..cut]);
                Err(generic_error(format!(
                    "String `{}` (truncated) is not a UTF-8 string; invalid byte at position {}.",
                    prefix,
                    e.valid_up_to()
                )))
            }
        },
    }
}

pub(crate) fn number_as_integer(d: f64) -> Option<i64> {
    if (MIN_DBL_INT..=MAX_DBL_INT).contains(&d) {
        let i = d as i64;
        if i as f64 == d {
            return Some(i);
        }
    }
    None
}

impl Datum {
    // ---- constructors ----

    /// The "no value" sentinel returned by non-throwing lookups.
    pub fn uninitialized() -> Datum {
        Datum {
            repr: Repr::Uninitialized,
        }
    }

    pub fn null() -> Datum {
        Datum { repr: Repr::Null }
    }

    pub fn boolean(value: bool) -> Datum {
        Datum {
            repr: Repr::Bool(value),
        }
    }

    pub fn num(value: f64) -> Result<Datum> {
        if !value.is_finite() {
            return Err(generic_error(format!("Non-finite number: {}", value)));
        }
        Ok(Datum {
            repr: Repr::Num(value),
        })
    }

    /// Builds a STR datum, rejecting NUL bytes always and invalid UTF-8
    /// under v1_14 and later.
    pub fn string(s: impl Into<DatumString>, version: ReqlVersion) -> Result<Datum> {
        let s = s.into();
        check_str_validity(s.as_bytes())?;
        fail_if_invalid(version, s.as_bytes())?;
        Ok(Datum { repr: Repr::Str(s) })
    }

    /// STR constructor for bytes already admitted under some version
    /// (key decode, buffer decode).
    pub(crate) fn str_unchecked(s: DatumString) -> Datum {
        Datum { repr: Repr::Str(s) }
    }

    pub fn binary(data: impl Into<DatumString>) -> Datum {
        Datum {
            repr: Repr::Binary(data.into()),
        }
    }

    pub fn array(elements: Vec<Datum>, limits: &ConfiguredLimits) -> Result<Datum> {
        if elements.len() > limits.array_size_limit() {
            return Err(too_large_error(format!(
                "Array over size limit `{}`.",
                limits.array_size_limit()
            )));
        }
        Ok(Self::array_unchecked(elements))
    }

    /// Array constructor without the size check. Exists so values that were
    /// legally written under an older limit can be reconstructed; see
    /// `ArrayBuilder::to_datum`.
    pub fn array_unchecked(elements: Vec<Datum>) -> Datum {
        Datum {
            repr: Repr::Array(elements.into()),
        }
    }

    pub fn empty_array() -> Datum {
        Self::array_unchecked(Vec::new())
    }

    pub fn empty_object() -> Datum {
        Datum {
            repr: Repr::Object(Vec::new().into()),
        }
    }

    /// Builds an OBJECT datum: sorts the pairs by key bytes, rejects
    /// duplicate keys, then runs pseudotype sanitization with `allowed`
    /// naming the pseudotypes that are legal in this position.
    pub fn object(
        mut pairs: Vec<(DatumString, Datum)>,
        allowed: &[&str],
    ) -> Result<Datum> {
        for (key, _) in &pairs {
            check_str_validity(key.as_bytes())?;
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        for window in pairs.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(generic_error(format!(
                    "Duplicate key `{}` in object.",
                    window[0].0.to_utf8_lossy()
                )));
            }
        }
        pseudo::maybe_sanitize(Self::object_presorted_unchecked(pairs), allowed)
    }

    /// Wraps pairs that are already sorted, deduplicated and key-validated.
    /// Skips sanitization; callers are responsible for pseudotype hygiene.
    pub(crate) fn object_presorted_unchecked(pairs: Vec<(DatumString, Datum)>) -> Datum {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));
        Datum {
            repr: Repr::Object(pairs.into()),
        }
    }

    /// Wraps a serialized blob window without materializing it. `STR` and
    /// `BINARY` windows must span exactly the payload bytes; `ARRAY` and
    /// `OBJECT` windows span the whole serialized container.
    ///
    /// Panics on a scalar type; scalars are always materialized.
    pub fn from_buf(datum_type: DatumType, buf: SharedBufRef) -> Datum {
        let repr = match datum_type {
            DatumType::Str => Repr::Str(DatumString::from_buf(buf)),
            DatumType::Binary => Repr::Binary(DatumString::from_buf(buf)),
            DatumType::Array => Repr::BufArray(buf),
            DatumType::Object => Repr::BufObject(buf),
            other => panic!("from_buf does not support {:?}", other),
        };
        Datum { repr }
    }

    // ---- type queries ----

    pub fn has(&self) -> bool {
        !matches!(self.repr, Repr::Uninitialized)
    }

    pub fn get_type(&self) -> DatumType {
        match self.repr {
            Repr::Uninitialized => DatumType::Uninitialized,
            Repr::Null => DatumType::Null,
            Repr::Bool(_) => DatumType::Bool,
            Repr::Num(_) => DatumType::Num,
            Repr::Str(_) => DatumType::Str,
            Repr::Binary(_) => DatumType::Binary,
            Repr::Array(_) | Repr::BufArray(_) => DatumType::Array,
            Repr::Object(_) | Repr::BufObject(_) => DatumType::Object,
        }
    }

    /// The buffer window backing this container, if it is buffer-backed.
    pub fn buf_ref(&self) -> Option<&SharedBufRef> {
        match &self.repr {
            Repr::BufArray(buf) | Repr::BufObject(buf) => Some(buf),
            _ => None,
        }
    }

    /// True for BINARY and for objects carrying a `$reql_type$` field.
    pub fn is_ptype(&self) -> bool {
        self.get_type() == DatumType::Binary
            || (self.get_type() == DatumType::Object
                && self
                    .get_field(pseudo::REQL_TYPE_FIELD, ThrowMode::NoThrow)
                    .map(|d| d.has())
                    .unwrap_or(false))
    }

    pub fn is_ptype_of(&self, reql_type: &str) -> bool {
        self.is_ptype() && self.reql_type().map(|t| t == reql_type).unwrap_or(false)
    }

    /// The pseudotype name. Only call on pseudotypes (`is_ptype`).
    pub fn reql_type(&self) -> Result<String> {
        assert!(self.is_ptype(), "reql_type called on a non-pseudotype");
        if self.get_type() == DatumType::Binary {
            return Ok(pseudo::binary::NAME.to_owned());
        }
        let field = self.get_field(pseudo::REQL_TYPE_FIELD, ThrowMode::NoThrow)?;
        if field.get_type() != DatumType::Str {
            return Err(generic_error(format!(
                "Error: Field `{}` must be a string (got `{}` of type {}):\n{}",
                pseudo::REQL_TYPE_FIELD,
                field.trunc_print(),
                field.type_name(),
                self.trunc_print()
            )));
        }
        Ok(field.as_str()?.to_utf8_lossy().into_owned())
    }

    /// Human-readable type name, `PTYPE<NAME>` for pseudotypes.
    pub fn type_name(&self) -> String {
        if self.is_ptype() {
            match self.reql_type() {
                Ok(name) => format!("PTYPE<{}>", name),
                Err(_) => self.get_type().raw_name().to_owned(),
            }
        } else {
            self.get_type().raw_name().to_owned()
        }
    }

    pub(crate) fn type_error(&self, msg: String) -> eyre::Report {
        generic_error(msg)
    }

    pub(crate) fn check_type(&self, desired: DatumType) -> Result<()> {
        if self.get_type() != desired {
            return Err(self.type_error(format!(
                "Expected type {} but found {}.",
                desired.raw_name(),
                self.type_name()
            )));
        }
        Ok(())
    }

    // ---- scalar accessors ----

    pub fn as_bool(&self) -> Result<bool> {
        match self.repr {
            Repr::Bool(b) => Ok(b),
            _ => Err(self.type_error(format!(
                "Expected type BOOL but found {}.",
                self.type_name()
            ))),
        }
    }

    pub fn as_num(&self) -> Result<f64> {
        match self.repr {
            Repr::Num(n) => Ok(n),
            _ => Err(self.type_error(format!(
                "Expected type NUMBER but found {}.",
                self.type_name()
            ))),
        }
    }

    /// The integer value of a NUM, failing outside the contiguous integer
    /// range of doubles.
    pub fn as_int(&self) -> Result<i64> {
        let d = self.as_num()?;
        number_as_integer(d).ok_or_else(|| {
            let qualifier = if d < MIN_DBL_INT {
                " (<-2^53)"
            } else if d > MAX_DBL_INT {
                " (>2^53)"
            } else {
                ""
            };
            generic_error(format!("Number not an integer{}: {}", qualifier, d))
        })
    }

    pub fn as_str(&self) -> Result<&DatumString> {
        match &self.repr {
            Repr::Str(s) => Ok(s),
            _ => Err(self.type_error(format!(
                "Expected type STRING but found {}.",
                self.type_name()
            ))),
        }
    }

    pub fn as_binary(&self) -> Result<&DatumString> {
        match &self.repr {
            Repr::Binary(b) => Ok(b),
            _ => Err(self.type_error(format!(
                "Expected type PTYPE<BINARY> but found {}.",
                self.type_name()
            ))),
        }
    }

    // ---- array accessors ----

    pub fn arr_size(&self) -> Result<usize> {
        match &self.repr {
            Repr::Array(elements) => Ok(elements.len()),
            Repr::BufArray(buf) => Ok(serialize::array_size(buf)? as usize),
            _ => Err(self.type_error(format!(
                "Expected type ARRAY but found {}.",
                self.type_name()
            ))),
        }
    }

    pub fn get(&self, index: usize, mode: ThrowMode) -> Result<Datum> {
        let size = self.arr_size()?;
        if index < size {
            Ok(self.unchecked_get(index))
        } else if mode == ThrowMode::Throw {
            Err(non_existence_error(format!(
                "Index out of bounds: {}",
                index
            )))
        } else {
            Ok(Datum::uninitialized())
        }
    }

    /// Element read without the bounds check. Callers have verified
    /// `index < arr_size()`.
    pub(crate) fn unchecked_get(&self, index: usize) -> Datum {
        match &self.repr {
            Repr::Array(elements) => elements[index].clone(),
            Repr::BufArray(buf) => {
                let offset = trust_buf(serialize::element_offset(buf, index));
                trust_buf(serialize::deserialize_value(buf, offset))
            }
            _ => unreachable!("unchecked_get on a non-array"),
        }
    }

    // ---- object accessors ----

    pub fn obj_size(&self) -> Result<usize> {
        match &self.repr {
            Repr::Object(pairs) => Ok(pairs.len()),
            Repr::BufObject(buf) => Ok(serialize::array_size(buf)? as usize),
            _ => Err(self.type_error(format!(
                "Expected type OBJECT but found {}.",
                self.type_name()
            ))),
        }
    }

    /// The `index`-th key/value pair in ascending key order. Panics when
    /// `index >= obj_size()`; positional iteration is an internal-invariant
    /// affair, unlike keyed lookup.
    pub fn get_pair(&self, index: usize) -> Result<(DatumString, Datum)> {
        let size = self.obj_size()?;
        assert!(index < size, "pair index {} out of bounds ({})", index, size);
        Ok(self.unchecked_get_pair(index))
    }

    pub(crate) fn unchecked_get_pair(&self, index: usize) -> (DatumString, Datum) {
        match &self.repr {
            Repr::Object(pairs) => pairs[index].clone(),
            Repr::BufObject(buf) => {
                let offset = trust_buf(serialize::element_offset(buf, index));
                trust_buf(serialize::deserialize_pair(buf, offset))
            }
            _ => unreachable!("unchecked_get_pair on a non-object"),
        }
    }

    /// Field lookup by binary search over the sorted key sequence.
    pub fn get_field(&self, key: impl AsRef<[u8]>, mode: ThrowMode) -> Result<Datum> {
        let key = key.as_ref();
        let mut range_beg = 0;
        let mut range_end = self.obj_size()?;
        while range_beg < range_end {
            let center = range_beg + (range_end - range_beg) / 2;
            let (center_key, center_val) = self.unchecked_get_pair(center);
            match key.cmp(center_key.as_bytes()) {
                std::cmp::Ordering::Equal => return Ok(center_val),
                std::cmp::Ordering::Less => range_end = center,
                std::cmp::Ordering::Greater => range_beg = center + 1,
            }
        }
        if mode == ThrowMode::Throw {
            Err(non_existence_error(format!(
                "No attribute `{}` in object:\n{}",
                String::from_utf8_lossy(key),
                self.print()
            )))
        } else {
            Ok(Datum::uninitialized())
        }
    }

    // ---- printing ----

    /// Canonical JSON rendering. BINARY prints as its base64 pseudotype
    /// object; the uninitialized sentinel prints as `UNINITIALIZED`.
    pub fn print(&self) -> String {
        if !self.has() {
            return "UNINITIALIZED".to_owned();
        }
        self.to_json().to_string()
    }

    /// `print()` bounded to `TRUNC_LEN` bytes with a trailing ellipsis.
    pub fn trunc_print(&self) -> String {
        let mut s = self.print();
        if s.len() > TRUNC_LEN {
            let mut cut = TRUNC_LEN - 3;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            s.truncate(cut);
            s.push_str("...");
        }
        s
    }

    // ---- replace validation ----

    /// Checks that this replacement document keeps the primary key intact:
    /// the document must carry `pkey`, and when an old row (or its original
    /// key) exists, the values must match.
    pub fn validate_replace(
        &self,
        old_val: &Datum,
        orig_key: &Datum,
        pkey: impl AsRef<[u8]>,
    ) -> Result<()> {
        let pkey = pkey.as_ref();
        let pk = self.get_field(pkey, ThrowMode::NoThrow)?;
        if !pk.has() {
            return Err(generic_error(format!(
                "Inserted object must have primary key `{}`:\n{}",
                String::from_utf8_lossy(pkey),
                self.print()
            )));
        }
        if old_val.has() {
            let old_pk = if old_val.get_type() != DatumType::Null {
                let field = old_val.get_field(pkey, ThrowMode::NoThrow)?;
                assert!(field.has(), "stored row is missing its primary key");
                field
            } else {
                orig_key.clone()
            };
            if old_pk.has() && old_pk != pk {
                return Err(generic_error(format!(
                    "Primary key `{}` cannot be changed (`{}` -> `{}`).",
                    String::from_utf8_lossy(pkey),
                    old_val.print(),
                    self.print()
                )));
            }
        } else {
            assert!(!orig_key.has(), "original key without an original row");
        }
        Ok(())
    }
}

/// Unwraps a read from a serialized blob. The serializer contract guarantees
/// the bytes are well formed; a failure here means the blob was corrupted
/// underneath us, which is fatal.
pub(crate) fn trust_buf<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("serialized datum blob violated the serializer contract: {e}"),
    }
}

impl std::fmt::Debug for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Uninitialized => write!(f, "Datum(uninitialized)"),
            Repr::BufArray(buf) => write!(f, "Datum(buf array, {} bytes)", buf.len()),
            Repr::BufObject(buf) => write!(f, "Datum(buf object, {} bytes)", buf.len()),
            _ => write!(f, "Datum({})", self.trunc_print()),
        }
    }
}
