//! # Datum Ranges
//!
//! A `DatumRange` is an interval of datums with independently open or
//! closed ends, used by between-style scans. It answers membership through
//! the version-aware comparator and projects onto storage key ranges for
//! both primary and secondary indexes.
//!
//! The secondary projection is deliberately loose: secondary keys may be
//! truncated by an amount that depends on each entry's primary key, so the
//! projected range covers every entry whose value *could* match and callers
//! re-filter with [`DatumRange::contains`].

use eyre::Result;

use crate::config::MAX_KEY_SIZE;
use crate::datum::cmp::ReqlVersion;
use crate::datum::Datum;
use crate::encoding::key::{primary_key, truncated_secondary, StoreKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundType {
    Open,
    Closed,
}

/// A byte-key interval handed to the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub left_type: BoundType,
    pub left: StoreKey,
    pub right_type: BoundType,
    pub right: StoreKey,
}

#[derive(Debug, Clone)]
pub struct DatumRange {
    left_bound: Option<Datum>,
    left_bound_type: BoundType,
    right_bound: Option<Datum>,
    right_bound_type: BoundType,
}

impl DatumRange {
    pub fn new(
        left_bound: Option<Datum>,
        left_bound_type: BoundType,
        right_bound: Option<Datum>,
        right_bound_type: BoundType,
    ) -> Self {
        Self {
            left_bound,
            left_bound_type,
            right_bound,
            right_bound_type,
        }
    }

    /// The degenerate range holding exactly `val`.
    pub fn from_value(val: Datum) -> Self {
        Self::new(
            Some(val.clone()),
            BoundType::Closed,
            Some(val),
            BoundType::Closed,
        )
    }

    pub fn universe() -> Self {
        Self::new(None, BoundType::Open, None, BoundType::Open)
    }

    pub fn is_universe(&self) -> bool {
        self.left_bound.is_none()
            && self.right_bound.is_none()
            && self.left_bound_type == BoundType::Open
            && self.right_bound_type == BoundType::Open
    }

    pub fn left_bound(&self) -> Option<&Datum> {
        self.left_bound.as_ref()
    }

    pub fn right_bound(&self) -> Option<&Datum> {
        self.right_bound.as_ref()
    }

    pub fn with_left_bound(&self, d: Datum, bound_type: BoundType) -> Self {
        Self::new(
            Some(d),
            bound_type,
            self.right_bound.clone(),
            self.right_bound_type,
        )
    }

    pub fn with_right_bound(&self, d: Datum, bound_type: BoundType) -> Self {
        Self::new(
            self.left_bound.clone(),
            self.left_bound_type,
            Some(d),
            bound_type,
        )
    }

    pub fn contains(&self, version: ReqlVersion, val: &Datum) -> bool {
        let above_left = match &self.left_bound {
            None => true,
            Some(left) => {
                left.compare_lt(version, val)
                    || (left == val && self.left_bound_type == BoundType::Closed)
            }
        };
        let below_right = match &self.right_bound {
            None => true,
            Some(right) => {
                right.compare_gt(version, val)
                    || (right == val && self.right_bound_type == BoundType::Closed)
            }
        };
        above_left && below_right
    }

    /// Projects the range through the primary-key encoding.
    pub fn to_primary_keyrange(&self) -> Result<KeyRange> {
        let left = match &self.left_bound {
            Some(d) => primary_key(d)?,
            None => StoreKey::min(),
        };
        let right = match &self.right_bound {
            Some(d) => primary_key(d)?,
            None => StoreKey::max(),
        };
        Ok(KeyRange {
            left_type: self.left_bound_type,
            left,
            right_type: self.right_bound_type,
            right,
        })
    }

    /// Projects the range onto secondary-index keys. The right bound is
    /// padded to `MAX_KEY_SIZE` so every composed entry (any primary key,
    /// any tag, any truncation) sharing the bound's value prefix falls
    /// inside; both ends are closed for the same reason. Callers re-filter
    /// exact matches.
    pub fn to_sindex_keyrange(&self) -> Result<KeyRange> {
        let left = match &self.left_bound {
            Some(d) => truncated_secondary(d)?,
            None => StoreKey::min(),
        };
        let right = match &self.right_bound {
            Some(d) => {
                let mut bytes = truncated_secondary(d)?.into_bytes();
                bytes.resize(MAX_KEY_SIZE, 0xFF);
                StoreKey::new(bytes)
            }
            None => StoreKey::max(),
        };
        Ok(KeyRange {
            left_type: BoundType::Closed,
            left,
            right_type: BoundType::Closed,
            right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::cmp::LATEST_VERSION;
    use crate::encoding::key::secondary_key;

    fn n(value: f64) -> Datum {
        Datum::num(value).unwrap()
    }

    #[test]
    fn universe_contains_everything() {
        let range = DatumRange::universe();
        assert!(range.is_universe());
        for version in [ReqlVersion::V1_13, ReqlVersion::V1_14, ReqlVersion::V1_16] {
            assert!(range.contains(version, &Datum::null()));
            assert!(range.contains(version, &n(1.0)));
        }
    }

    #[test]
    fn bound_types_control_endpoint_membership() {
        let closed = DatumRange::new(
            Some(n(1.0)),
            BoundType::Closed,
            Some(n(3.0)),
            BoundType::Closed,
        );
        assert!(closed.contains(LATEST_VERSION, &n(1.0)));
        assert!(closed.contains(LATEST_VERSION, &n(3.0)));
        assert!(!closed.contains(LATEST_VERSION, &n(3.5)));

        let open = DatumRange::new(
            Some(n(1.0)),
            BoundType::Open,
            Some(n(3.0)),
            BoundType::Open,
        );
        assert!(!open.contains(LATEST_VERSION, &n(1.0)));
        assert!(!open.contains(LATEST_VERSION, &n(3.0)));
        assert!(open.contains(LATEST_VERSION, &n(2.0)));
    }

    #[test]
    fn from_value_is_the_degenerate_closed_range() {
        let range = DatumRange::from_value(n(5.0));
        assert!(range.contains(LATEST_VERSION, &n(5.0)));
        assert!(!range.contains(LATEST_VERSION, &n(5.1)));
    }

    #[test]
    fn with_bound_builders_replace_one_side() {
        let range = DatumRange::universe().with_left_bound(n(0.0), BoundType::Closed);
        assert!(range.contains(LATEST_VERSION, &n(0.0)));
        assert!(!range.contains(LATEST_VERSION, &n(-1.0)));
        let range = range.with_right_bound(n(10.0), BoundType::Open);
        assert!(!range.contains(LATEST_VERSION, &n(10.0)));
    }

    #[test]
    fn primary_projection_orders_its_endpoints() {
        let range = DatumRange::new(
            Some(n(1.0)),
            BoundType::Closed,
            Some(n(2.0)),
            BoundType::Open,
        );
        let keys = range.to_primary_keyrange().unwrap();
        assert!(keys.left < keys.right);
        assert_eq!(keys.left_type, BoundType::Closed);
        assert_eq!(keys.right_type, BoundType::Open);

        let universe = DatumRange::universe().to_primary_keyrange().unwrap();
        assert_eq!(universe.left, StoreKey::min());
        assert_eq!(universe.right, StoreKey::max());
    }

    #[test]
    fn sindex_projection_covers_composed_entries_for_in_range_values() {
        let range = DatumRange::new(
            Some(n(10.0)),
            BoundType::Closed,
            Some(n(20.0)),
            BoundType::Closed,
        );
        let keys = range.to_sindex_keyrange().unwrap();

        let primary = primary_key(&n(1.0)).unwrap();
        for value in [10.0, 15.0, 20.0] {
            let entry =
                secondary_key(&n(value), LATEST_VERSION, &primary, Some(3)).unwrap();
            assert!(
                keys.left <= entry && entry <= keys.right,
                "entry for {} should fall inside the projected range",
                value
            );
        }
        let outside =
            secondary_key(&n(21.0), LATEST_VERSION, &primary, Some(3)).unwrap();
        assert!(outside > keys.right);
    }
}
