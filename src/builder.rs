//! # Object and Array Builders
//!
//! Datums are immutable; builders are the mutation story. An
//! `ObjectBuilder` accumulates keyed fields (plus the `warnings` /
//! `errors` / `first_error` bookkeeping write results use) and an
//! `ArrayBuilder` accumulates elements under the configured size limit.
//! Both produce a fresh datum and leave previously built values untouched.
//!
//! `ArrayBuilder::to_datum` deliberately skips the size check: `insert` and
//! `splice` under the oldest protocol version never enforced the limit, so
//! index entries larger than the limit exist in the wild and must remain
//! reconstructible. The checks on `add` (always) and on `insert`/`splice`
//! (v1_14 and later) keep new data bounded.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use eyre::Result;

use crate::config::ConfiguredLimits;
use crate::datum::cmp::{ReqlVersion, LATEST_VERSION};
use crate::datum::string::DatumString;
use crate::datum::{check_str_validity, Datum, ThrowMode};
use crate::error::{generic_error, non_existence_error, too_large_error};
use crate::pseudo;

pub const ERRORS_FIELD: &str = "errors";
pub const FIRST_ERROR_FIELD: &str = "first_error";
pub const WARNINGS_FIELD: &str = "warnings";

#[derive(Default)]
pub struct ObjectBuilder {
    map: BTreeMap<DatumString, Datum>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_datum(copy_from: &Datum) -> Result<Self> {
        let mut map = BTreeMap::new();
        for i in 0..copy_from.obj_size()? {
            let (key, value) = copy_from.get_pair(i)?;
            map.insert(key, value);
        }
        Ok(Self { map })
    }

    /// Adds a field unless it exists. Returns `true` when the key was
    /// already present (and the existing value was kept).
    pub fn add(&mut self, key: impl Into<DatumString>, val: Datum) -> Result<bool> {
        let key = key.into();
        check_str_validity(key.as_bytes())?;
        assert!(val.has(), "adding an uninitialized datum to an object");
        if self.map.contains_key(&key) {
            return Ok(true);
        }
        self.map.insert(key, val);
        Ok(false)
    }

    /// Sets a field, replacing any existing value.
    pub fn overwrite(&mut self, key: impl Into<DatumString>, val: Datum) -> Result<()> {
        let key = key.into();
        check_str_validity(key.as_bytes())?;
        assert!(val.has(), "adding an uninitialized datum to an object");
        self.map.insert(key, val);
        Ok(())
    }

    #[must_use = "callers usually care whether the field existed"]
    pub fn delete_field(&mut self, key: impl AsRef<[u8]>) -> bool {
        let key = DatumString::from_bytes(key.as_ref().to_vec());
        self.map.remove(&key).is_some()
    }

    pub fn try_get(&self, key: impl AsRef<[u8]>) -> Option<Datum> {
        let key = DatumString::from_bytes(key.as_ref().to_vec());
        self.map.get(&key).cloned()
    }

    /// Appends `msg` to the `warnings` array unless it is already there.
    pub fn add_warning(&mut self, msg: &str, limits: &ConfiguredLimits) -> Result<()> {
        let key = DatumString::from(WARNINGS_FIELD);
        match self.map.get(&key) {
            Some(warnings) => {
                let size = warnings.arr_size()?;
                // The warnings array stays small; a scan beats bookkeeping.
                for i in 0..size {
                    if warnings.get(i, ThrowMode::Throw)?.as_str()?.as_bytes()
                        == msg.as_bytes()
                    {
                        return Ok(());
                    }
                }
                if size + 1 > limits.array_size_limit() {
                    return Err(generic_error(format!(
                        "Warnings would exceed array size limit {}; \
                         increase it to see warnings",
                        limits.array_size_limit()
                    )));
                }
                let mut out = ArrayBuilder::from_datum(warnings, limits)?;
                out.add(Datum::string(msg, LATEST_VERSION)?)?;
                self.map.insert(key, out.to_datum());
            }
            None => {
                let mut out = ArrayBuilder::new(limits);
                out.add(Datum::string(msg, LATEST_VERSION)?)?;
                self.map.insert(key, out.to_datum());
            }
        }
        Ok(())
    }

    /// Batch form of `add_warning` with a single limit check.
    pub fn add_warnings(
        &mut self,
        msgs: &BTreeSet<String>,
        limits: &ConfiguredLimits,
    ) -> Result<()> {
        if msgs.is_empty() {
            return Ok(());
        }
        let key = DatumString::from(WARNINGS_FIELD);
        match self.map.get(&key) {
            Some(warnings) => {
                let size = warnings.arr_size()?;
                if size + msgs.len() > limits.array_size_limit() {
                    return Err(generic_error(format!(
                        "Warnings would exceed array size limit {}; \
                         increase it to see warnings",
                        limits.array_size_limit()
                    )));
                }
                let mut out = ArrayBuilder::from_datum(warnings, limits)?;
                for msg in msgs {
                    let mut seen = false;
                    for i in 0..size {
                        if warnings.get(i, ThrowMode::Throw)?.as_str()?.as_bytes()
                            == msg.as_bytes()
                        {
                            seen = true;
                            break;
                        }
                    }
                    if !seen {
                        out.add(Datum::string(msg.as_str(), LATEST_VERSION)?)?;
                    }
                }
                self.map.insert(key, out.to_datum());
            }
            None => {
                let mut out = ArrayBuilder::new(limits);
                for msg in msgs {
                    out.add(Datum::string(msg.as_str(), LATEST_VERSION)?)?;
                }
                self.map.insert(key, out.to_datum());
            }
        }
        Ok(())
    }

    /// Bumps the `errors` counter and records `first_error` on the first
    /// call only.
    pub fn add_error(&mut self, msg: &str) -> Result<()> {
        let errors_key = DatumString::from(ERRORS_FIELD);
        let count = match self.map.get(&errors_key) {
            Some(existing) => existing.as_num()?,
            None => 0.0,
        };
        self.map.insert(errors_key, Datum::num(count + 1.0)?);

        let first_error_key = DatumString::from(FIRST_ERROR_FIELD);
        if !self.map.contains_key(&first_error_key) {
            self.map
                .insert(first_error_key, Datum::string(msg, LATEST_VERSION)?);
        }
        Ok(())
    }

    /// Finishes without pseudotype sanitization. Use when the fields are
    /// known to be plain data (write results, internal bookkeeping).
    pub fn to_datum(self) -> Datum {
        Datum::object_presorted_unchecked(self.map.into_iter().collect())
    }

    /// Finishes with sanitization, `allowed` naming the pseudotypes that
    /// are legal in this position.
    pub fn to_datum_with(self, allowed: &[&str]) -> Result<Datum> {
        pseudo::maybe_sanitize(
            Datum::object_presorted_unchecked(self.map.into_iter().collect()),
            allowed,
        )
    }
}

pub struct ArrayBuilder {
    vector: Vec<Datum>,
    limits: ConfiguredLimits,
}

impl ArrayBuilder {
    pub fn new(limits: &ConfiguredLimits) -> Self {
        Self {
            vector: Vec::new(),
            limits: limits.clone(),
        }
    }

    pub fn from_datum(copy_from: &Datum, limits: &ConfiguredLimits) -> Result<Self> {
        let size = copy_from.arr_size()?;
        let mut vector = Vec::with_capacity(size);
        for i in 0..size {
            vector.push(copy_from.get(i, ThrowMode::Throw)?);
        }
        let builder = Self {
            vector,
            limits: limits.clone(),
        };
        builder.check_size()?;
        Ok(builder)
    }

    fn check_size(&self) -> Result<()> {
        if self.vector.len() > self.limits.array_size_limit() {
            return Err(too_large_error(format!(
                "Array over size limit `{}`.",
                self.limits.array_size_limit()
            )));
        }
        Ok(())
    }

    fn check_index(&self, index: usize, inclusive: bool) -> Result<()> {
        let ok = if inclusive {
            index <= self.vector.len()
        } else {
            index < self.vector.len()
        };
        if !ok {
            return Err(non_existence_error(format!(
                "Index `{}` out of bounds for array of size: `{}`.",
                index,
                self.vector.len()
            )));
        }
        Ok(())
    }

    pub fn reserve(&mut self, n: usize) {
        self.vector.reserve(n);
    }

    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    pub fn add(&mut self, val: Datum) -> Result<()> {
        self.vector.push(val);
        self.check_size()
    }

    pub fn change(&mut self, index: usize, val: Datum) -> Result<()> {
        self.check_index(index, false)?;
        self.vector[index] = val;
        Ok(())
    }

    /// Inserts at `index`. The size limit applies from v1_14 on; the v1_13
    /// behavior is load-bearing for old index entries.
    pub fn insert(&mut self, version: ReqlVersion, index: usize, val: Datum) -> Result<()> {
        self.check_index(index, true)?;
        self.vector.insert(index, val);
        match version {
            ReqlVersion::V1_13 => Ok(()),
            ReqlVersion::V1_14 | ReqlVersion::V1_16 => self.check_size(),
        }
    }

    /// Splices all elements of `values` in at `index`. Size-limit gating as
    /// for `insert`.
    pub fn splice(&mut self, version: ReqlVersion, index: usize, values: &Datum) -> Result<()> {
        self.check_index(index, true)?;
        let size = values.arr_size()?;
        let mut incoming = Vec::with_capacity(size);
        for i in 0..size {
            incoming.push(values.get(i, ThrowMode::Throw)?);
        }
        self.vector.splice(index..index, incoming);
        match version {
            ReqlVersion::V1_13 => Ok(()),
            ReqlVersion::V1_14 | ReqlVersion::V1_16 => self.check_size(),
        }
    }

    pub fn erase(&mut self, index: usize) -> Result<()> {
        self.check_index(index, false)?;
        self.vector.remove(index);
        Ok(())
    }

    /// Erases `[start, end)`. v1_13 demanded `start < len` even for empty
    /// ranges at the end of the array; later versions allow `start == len`.
    pub fn erase_range(
        &mut self,
        version: ReqlVersion,
        start: usize,
        end: usize,
    ) -> Result<()> {
        match version {
            ReqlVersion::V1_13 => self.check_index(start, false)?,
            ReqlVersion::V1_14 | ReqlVersion::V1_16 => self.check_index(start, true)?,
        }
        self.check_index(end, true)?;
        if start > end {
            return Err(generic_error(format!(
                "Start index `{}` is greater than end index `{}`.",
                start, end
            )));
        }
        self.vector.drain(start..end);
        Ok(())
    }

    /// Finishes without a size check; see the module docs for why.
    pub fn to_datum(self) -> Datum {
        Datum::array_unchecked(self.vector)
    }
}
