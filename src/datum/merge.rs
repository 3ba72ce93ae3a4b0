//! # Merge and Literal Semantics
//!
//! `merge` implements the update/replace composition rule: objects merge
//! recursively, everything else is overwritten by the right-hand side. The
//! `$reql_type$: LITERAL` reserved form punches through the recursion — a
//! literal with a `value` replaces the target subtree wholesale, a literal
//! without one deletes the field.
//!
//! `drop_literals` strips literal wrappers from a tree that has already
//! passed the allowlist check. Literals never nest (the query layer rejects
//! that before values reach this crate), so finding one inside a literal's
//! `value` is an internal-invariant violation, not a user error.
//!
//! `merge_with` is the resolver-parameterized variant used for combining
//! write-result statistics; `stats_merge` is its canonical resolver.

use std::collections::BTreeSet;

use eyre::Result;

use crate::builder::{ArrayBuilder, ObjectBuilder};
use crate::config::ConfiguredLimits;
use crate::datum::string::DatumString;
use crate::datum::{Datum, DatumType, ThrowMode};
use crate::error::generic_error;
use crate::pseudo::literal;

impl Datum {
    /// Right-biased recursive merge with literal handling.
    pub fn merge(&self, rhs: &Datum) -> Result<Datum> {
        if self.get_type() != DatumType::Object || rhs.get_type() != DatumType::Object {
            return Ok(rhs.clone());
        }

        let mut d = ObjectBuilder::from_datum(self)?;
        let rhs_size = rhs.obj_size()?;
        for i in 0..rhs_size {
            let (key, value) = rhs.unchecked_get_pair(i);
            let sub_lhs = d.try_get(key.as_bytes());
            let is_literal = value.is_ptype_of(literal::NAME);

            if value.get_type() == DatumType::Object && sub_lhs.is_some() && !is_literal {
                let merged = sub_lhs.expect("checked above").merge(&value)?;
                d.overwrite(key, merged)?;
            } else {
                let mut val = if is_literal {
                    value.get_field(literal::VALUE_FIELD, ThrowMode::NoThrow)?
                } else {
                    value
                };
                if val.has() {
                    let (dropped, encountered) = val.drop_literals_flag()?;
                    // Literal values carry no further literals; the query
                    // layer rejects nesting before data gets here.
                    assert!(
                        !encountered || !is_literal,
                        "literal nested inside a literal value"
                    );
                    val = dropped;
                }
                if val.has() {
                    d.overwrite(key, val)?;
                } else {
                    assert!(is_literal, "merge dropped a non-literal value");
                    let _ = d.delete_field(key.as_bytes());
                }
            }
        }
        Ok(d.to_datum())
    }

    /// Merge with a caller-supplied conflict resolver: on key collision the
    /// resolver decides the stored value; fresh keys copy over unchanged.
    pub fn merge_with<F>(
        &self,
        rhs: &Datum,
        resolver: F,
        limits: &ConfiguredLimits,
        conditions_out: &mut BTreeSet<String>,
    ) -> Result<Datum>
    where
        F: Fn(
            &DatumString,
            &Datum,
            &Datum,
            &ConfiguredLimits,
            &mut BTreeSet<String>,
        ) -> Result<Datum>,
    {
        let mut d = ObjectBuilder::from_datum(self)?;
        let rhs_size = rhs.obj_size()?;
        for i in 0..rhs_size {
            let (key, value) = rhs.unchecked_get_pair(i);
            let left = self.get_field(key.as_bytes(), ThrowMode::NoThrow)?;
            if left.has() {
                let resolved = resolver(&key, &left, &value, limits, conditions_out)?;
                d.overwrite(key, resolved)?;
            } else {
                let duplicate = d.add(key, value)?;
                assert!(!duplicate, "missing field reported as a collision");
            }
        }
        Ok(d.to_datum())
    }

    /// Strips literal wrappers from the tree. A bare literal (no `value`)
    /// dissolves into the uninitialized sentinel, which object and array
    /// walks drop.
    pub fn drop_literals(&self) -> Result<Datum> {
        Ok(self.drop_literals_flag()?.0)
    }

    /// `drop_literals` plus whether any literal was encountered. The result
    /// shares `self` when nothing changed; a copy is only built from the
    /// first literal onward.
    pub(crate) fn drop_literals_flag(&self) -> Result<(Datum, bool)> {
        // Dropping literals never grows an array, so re-checking sizes here
        // could only re-reject data that was already admitted.
        let limits = ConfiguredLimits::unlimited();

        if self.is_ptype_of(literal::NAME) {
            let val = self.get_field(literal::VALUE_FIELD, ThrowMode::NoThrow)?;
            if val.has() {
                let (inner, encountered) = val.drop_literals_flag()?;
                assert!(!encountered, "literal nested inside a literal value");
                return Ok((inner, true));
            }
            return Ok((val, true));
        }

        match self.get_type() {
            DatumType::Object => {
                let mut need_to_copy = false;
                let mut builder = ObjectBuilder::new();
                let size = self.obj_size()?;
                for i in 0..size {
                    let (key, value) = self.unchecked_get_pair(i);
                    let (val, encountered) = value.drop_literals_flag()?;

                    if encountered && !need_to_copy {
                        need_to_copy = true;
                        for copy_i in 0..i {
                            let (copy_key, copy_val) = self.unchecked_get_pair(copy_i);
                            let conflict = builder.add(copy_key, copy_val)?;
                            assert!(!conflict, "duplicate key while copying an object");
                        }
                    }
                    if need_to_copy && val.has() {
                        let conflict = builder.add(key, val)?;
                        assert!(!conflict, "duplicate key while copying an object");
                    }
                    // A bare literal's field is simply omitted.
                }
                if need_to_copy {
                    Ok((builder.to_datum(), true))
                } else {
                    Ok((self.clone(), false))
                }
            }
            DatumType::Array => {
                let mut need_to_copy = false;
                let mut builder = ArrayBuilder::new(&limits);
                let size = self.arr_size()?;
                for i in 0..size {
                    let (val, encountered) =
                        self.get(i, ThrowMode::Throw)?.drop_literals_flag()?;

                    if encountered && !need_to_copy {
                        need_to_copy = true;
                        for copy_i in 0..i {
                            builder.add(self.get(copy_i, ThrowMode::Throw)?)?;
                        }
                    }
                    if need_to_copy && val.has() {
                        builder.add(val)?;
                    }
                }
                if need_to_copy {
                    Ok((builder.to_datum(), true))
                } else {
                    Ok((self.clone(), false))
                }
            }
            _ => Ok((self.clone(), false)),
        }
    }
}

/// Canonical resolver for combining write-result statistics: numbers add,
/// arrays concatenate (truncating at the limit and recording a condition),
/// strings keep the left side.
pub fn stats_merge(
    _key: &DatumString,
    left: &Datum,
    right: &Datum,
    limits: &ConfiguredLimits,
    conditions: &mut BTreeSet<String>,
) -> Result<Datum> {
    if left.get_type() == DatumType::Num && right.get_type() == DatumType::Num {
        return Datum::num(left.as_num()? + right.as_num()?);
    }
    if left.get_type() == DatumType::Array && right.get_type() == DatumType::Array {
        let left_size = left.arr_size()?;
        let right_size = right.arr_size()?;
        let limit = limits.array_size_limit();
        let mut arr = ArrayBuilder::new(limits);
        if left_size + right_size > limit {
            conditions.insert(format!(
                "Too many changes, array truncated to {}.",
                limit
            ));
            let mut so_far = 0;
            for i in 0..left_size.min(limit) {
                arr.add(left.get(i, ThrowMode::Throw)?)?;
                so_far += 1;
            }
            let mut i = 0;
            while i < right_size && so_far < limit {
                arr.add(right.get(i, ThrowMode::Throw)?)?;
                so_far += 1;
                i += 1;
            }
        } else {
            for i in 0..left_size {
                arr.add(left.get(i, ThrowMode::Throw)?)?;
            }
            for i in 0..right_size {
                arr.add(right.get(i, ThrowMode::Throw)?)?;
            }
        }
        return Ok(arr.to_datum());
    }
    if left.get_type() == DatumType::Str && right.get_type() == DatumType::Str {
        // Left-preferential on strings; both sides describe the same thing.
        return Ok(left.clone());
    }
    Err(generic_error(format!(
        "Cannot merge statistics `{}` (type {}) and `{}` (type {}).",
        left.trunc_print(),
        left.type_name(),
        right.trunc_print(),
        right.type_name()
    )))
}
