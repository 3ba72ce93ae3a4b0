//! # Version-Aware Total Ordering
//!
//! Datum comparison is parameterized by the protocol compatibility version,
//! because two things changed across releases: how pseudotypes rank against
//! plain values, and which cross-variant rank applies.
//!
//! - Under `V1_13`, pseudotypes sort after every plain value, and plain
//!   variants rank NULL < BOOL < NUM < STR < ARRAY < OBJECT.
//! - Under `V1_14` and later, two non-GEOMETRY pseudotypes compare by
//!   `$reql_type$` name and then by their pseudotype-specific rule; a
//!   pseudotype against a plain value compares by full type-name string;
//!   plain variants rank ARRAY < BOOL < NULL < NUM < OBJECT < STR. That
//!   rank is the one the key encoder's tag bytes produce (`'A'` < `'B'` <
//!   `'N'` < `'P'` < `'S'`), which is what keeps in-memory comparison and
//!   index byte order in agreement.
//!
//! The order is total over every constructible datum: pseudotype carriers
//! that escaped sanitization (possible through the non-sanitizing builder
//! path) fall back to plain object comparison rather than failing, so
//! sorting never aborts mid-query.

use std::cmp::Ordering;

use crate::datum::{Datum, DatumType};
use crate::pseudo;

/// Protocol compatibility regime. `V1_15` never existed as a distinct
/// regime — it behaves exactly like `V1_14` — so it has no variant here.
/// Any future change to comparison, validation or key framing gets a new
/// variant; none of the existing arms may silently change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReqlVersion {
    V1_13,
    V1_14,
    V1_16,
}

/// The regime new data is written under.
pub const LATEST_VERSION: ReqlVersion = ReqlVersion::V1_16;

fn v1_13_rank(t: DatumType) -> u8 {
    match t {
        DatumType::Null => 0,
        DatumType::Bool => 1,
        DatumType::Num => 2,
        DatumType::Str => 3,
        DatumType::Array => 4,
        // BINARY only meets other pseudotypes here; it keeps its historical
        // place just below OBJECT.
        DatumType::Binary => 5,
        DatumType::Object => 6,
        DatumType::Uninitialized => unreachable!("rank of uninitialized datum"),
    }
}

fn modern_rank(t: DatumType) -> u8 {
    match t {
        DatumType::Array => 0,
        DatumType::Bool => 1,
        DatumType::Null => 2,
        DatumType::Num => 3,
        DatumType::Object => 4,
        DatumType::Str => 5,
        DatumType::Binary => unreachable!("BINARY is dispatched as a pseudotype"),
        DatumType::Uninitialized => unreachable!("rank of uninitialized datum"),
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    // NaN is unreachable for valid datums.
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

impl Datum {
    /// True for pseudotypes that are compared through their plain object
    /// representation. Only GEOMETRY does this; its ordering is not
    /// meaningful, but it is stable, which is all indexing needs.
    pub fn pseudo_compares_as_obj(&self) -> bool {
        self.is_ptype_of(pseudo::geometry::NAME)
    }

    fn reql_type_for_cmp(&self) -> String {
        self.reql_type()
            .unwrap_or_else(|_| self.get_type().raw_name().to_owned())
    }

    /// Pseudotype-specific comparison, called with both sides carrying the
    /// same `$reql_type$`. `None` means the carrier is not comparable by a
    /// pseudotype rule and the caller falls back to object comparison.
    fn pseudo_cmp(&self, rhs: &Datum) -> Option<Ordering> {
        if self.get_type() == DatumType::Binary {
            let (a, b) = (self.as_binary().ok()?, rhs.as_binary().ok()?);
            return Some(a.as_bytes().cmp(b.as_bytes()));
        }
        if self.is_ptype_of(pseudo::time::NAME) {
            return pseudo::time::time_cmp(self, rhs);
        }
        None
    }

    /// Fallback for same-named pseudotype carriers the pseudotype rule
    /// cannot read (reachable only through the non-sanitizing builder
    /// path). Both sides are BINARY or OBJECT; order by variant first so
    /// a carrier object never gets traversed as if it were binary data.
    fn malformed_ptype_cmp(
        &self,
        rhs: &Datum,
        elem_cmp: &dyn Fn(&Datum, &Datum) -> Ordering,
    ) -> Ordering {
        match (self.get_type(), rhs.get_type()) {
            (DatumType::Object, DatumType::Object) => self.obj_pairwise_cmp(rhs, elem_cmp),
            (DatumType::Binary, DatumType::Binary) => self
                .as_binary()
                .expect("checked variant")
                .as_bytes()
                .cmp(rhs.as_binary().expect("checked variant").as_bytes()),
            (lhs_type, rhs_type) => v1_13_rank(lhs_type).cmp(&v1_13_rank(rhs_type)),
        }
    }

    fn obj_pairwise_cmp(
        &self,
        rhs: &Datum,
        elem_cmp: &dyn Fn(&Datum, &Datum) -> Ordering,
    ) -> Ordering {
        let sz = self.obj_size().expect("object comparison on a non-object");
        let rhs_sz = rhs.obj_size().expect("object comparison on a non-object");
        let mut i = 0;
        while i < sz && i < rhs_sz {
            let (key, val) = self.unchecked_get_pair(i);
            let (rhs_key, rhs_val) = rhs.unchecked_get_pair(i);
            let key_cmp = key.cmp(&rhs_key);
            if key_cmp != Ordering::Equal {
                return key_cmp;
            }
            let val_cmp = elem_cmp(&val, &rhs_val);
            if val_cmp != Ordering::Equal {
                return val_cmp;
            }
            i += 1;
        }
        sz.cmp(&rhs_sz)
    }

    fn array_lexicographic_cmp(
        &self,
        rhs: &Datum,
        elem_cmp: &dyn Fn(&Datum, &Datum) -> Ordering,
    ) -> Ordering {
        let sz = self.arr_size().expect("array comparison on a non-array");
        let rhs_sz = rhs.arr_size().expect("array comparison on a non-array");
        for i in 0..sz.min(rhs_sz) {
            let cmp = elem_cmp(&self.unchecked_get(i), &rhs.unchecked_get(i));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        sz.cmp(&rhs_sz)
    }

    fn v1_13_cmp(&self, rhs: &Datum) -> Ordering {
        match (self.is_ptype(), rhs.is_ptype()) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }

        if self.get_type() != rhs.get_type() {
            return v1_13_rank(self.get_type()).cmp(&v1_13_rank(rhs.get_type()));
        }
        match self.get_type() {
            DatumType::Null => Ordering::Equal,
            DatumType::Bool => self
                .as_bool()
                .expect("checked variant")
                .cmp(&rhs.as_bool().expect("checked variant")),
            DatumType::Num => cmp_f64(
                self.as_num().expect("checked variant"),
                rhs.as_num().expect("checked variant"),
            ),
            DatumType::Str => self
                .as_str()
                .expect("checked variant")
                .cmp(rhs.as_str().expect("checked variant")),
            DatumType::Binary => self
                .as_binary()
                .expect("checked variant")
                .as_bytes()
                .cmp(rhs.as_binary().expect("checked variant").as_bytes()),
            DatumType::Array => {
                self.array_lexicographic_cmp(rhs, &|a, b| a.v1_13_cmp(b))
            }
            DatumType::Object => {
                if self.is_ptype() && !self.pseudo_compares_as_obj() {
                    let (lname, rname) = (self.reql_type_for_cmp(), rhs.reql_type_for_cmp());
                    if lname != rname {
                        return lname.cmp(&rname);
                    }
                    if let Some(ord) = self.pseudo_cmp(rhs) {
                        return ord;
                    }
                    return self.malformed_ptype_cmp(rhs, &|a, b| a.v1_13_cmp(b));
                }
                self.obj_pairwise_cmp(rhs, &|a, b| a.v1_13_cmp(b))
            }
            DatumType::Uninitialized => unreachable!("comparison of uninitialized datum"),
        }
    }

    fn modern_cmp(&self, rhs: &Datum) -> Ordering {
        let lhs_ptype = self.is_ptype() && !self.pseudo_compares_as_obj();
        let rhs_ptype = rhs.is_ptype() && !rhs.pseudo_compares_as_obj();
        if lhs_ptype && rhs_ptype {
            let (lname, rname) = (self.reql_type_for_cmp(), rhs.reql_type_for_cmp());
            if lname != rname {
                return lname.cmp(&rname);
            }
            if let Some(ord) = self.pseudo_cmp(rhs) {
                return ord;
            }
            return self.malformed_ptype_cmp(rhs, &|a, b| a.modern_cmp(b));
        } else if lhs_ptype || rhs_ptype {
            return self.type_name().cmp(&rhs.type_name());
        }

        if self.get_type() != rhs.get_type() {
            return modern_rank(self.get_type()).cmp(&modern_rank(rhs.get_type()));
        }
        match self.get_type() {
            DatumType::Null => Ordering::Equal,
            DatumType::Bool => self
                .as_bool()
                .expect("checked variant")
                .cmp(&rhs.as_bool().expect("checked variant")),
            DatumType::Num => cmp_f64(
                self.as_num().expect("checked variant"),
                rhs.as_num().expect("checked variant"),
            ),
            DatumType::Str => self
                .as_str()
                .expect("checked variant")
                .cmp(rhs.as_str().expect("checked variant")),
            DatumType::Array => {
                self.array_lexicographic_cmp(rhs, &|a, b| a.modern_cmp(b))
            }
            DatumType::Object => self.obj_pairwise_cmp(rhs, &|a, b| a.modern_cmp(b)),
            DatumType::Binary | DatumType::Uninitialized => {
                unreachable!("unexpected variant in modern comparison")
            }
        }
    }

    /// Total order under the given version. Both operands must be
    /// initialized.
    pub fn cmp_with(&self, version: ReqlVersion, rhs: &Datum) -> Ordering {
        assert!(
            self.has() && rhs.has(),
            "comparison of an uninitialized datum"
        );
        match version {
            ReqlVersion::V1_13 => self.v1_13_cmp(rhs),
            ReqlVersion::V1_14 | ReqlVersion::V1_16 => self.modern_cmp(rhs),
        }
    }

    pub fn compare_lt(&self, version: ReqlVersion, rhs: &Datum) -> bool {
        self.cmp_with(version, rhs) == Ordering::Less
    }

    pub fn compare_gt(&self, version: ReqlVersion, rhs: &Datum) -> bool {
        self.cmp_with(version, rhs) == Ordering::Greater
    }
}

/// Equality is comparison under the latest version. The uninitialized
/// sentinel equals only itself.
impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        if !self.has() || !other.has() {
            return self.has() == other.has();
        }
        self.modern_cmp(other) == Ordering::Equal
    }
}

impl Eq for Datum {}
