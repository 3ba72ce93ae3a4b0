//! # Datum Core Configuration Constants
//!
//! This module centralizes the size constants shared by the key encoder,
//! the comparator and the builders. Constants that depend on each other are
//! co-located so a change to one is checked against the others.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_KEY_SIZE (250 bytes, storage-defined)
//!       │
//!       ├─> MAX_PRIMARY_KEY_SIZE (128, must leave room for the
//!       │     secondary-key envelope below)
//!       │
//!       └─> secondary key envelope:
//!             truncated secondary ‖ primary ‖ tag (8) ‖ pk_off (1) ‖ tag_off (1)
//!           The two offset bytes are u8, so a truncated secondary plus the
//!           primary key must stay under 255 bytes. This holds because
//!           trunc_size(pk) + pk = MAX_KEY_SIZE - TAG_SIZE - 2 < 255.
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `MAX_PRIMARY_KEY_SIZE + TAG_SIZE + 2 < MAX_KEY_SIZE` (a maximal primary
//!    key still leaves space for the secondary envelope)
//! 2. `MAX_KEY_SIZE < 255` (offset bytes are u8)
//!
//! Both are enforced by compile-time assertions below.

/// Maximum size of any storage key in bytes. The B-tree rejects longer keys.
pub const MAX_KEY_SIZE: usize = 250;

/// Maximum size of a primary key in bytes. Smaller than `MAX_KEY_SIZE` so
/// that a secondary key can always carry the full primary key it points at.
pub const MAX_PRIMARY_KEY_SIZE: usize = 128;

/// Size of the multi-index tag appended to secondary keys, in bytes.
/// The tag is a u64 written little-endian.
pub const TAG_SIZE: usize = 8;

/// Length at which `Datum::trunc_print` cuts user-facing value renderings.
pub const TRUNC_LEN: usize = 300;

/// Default bound on array sizes at construction time.
pub const DEFAULT_ARRAY_SIZE_LIMIT: usize = 100_000;

const _: () = assert!(
    MAX_PRIMARY_KEY_SIZE + TAG_SIZE + 2 < MAX_KEY_SIZE,
    "a maximal primary key must leave room for the secondary-key envelope"
);

const _: () = assert!(
    MAX_KEY_SIZE < 255,
    "secondary-key offsets are single bytes"
);

/// Runtime limits threaded through datum construction paths.
///
/// Carried by value because limits are small and construction sites are
/// frequently detached from any central configuration object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredLimits {
    array_size_limit: usize,
}

impl ConfiguredLimits {
    pub fn with_array_size_limit(array_size_limit: usize) -> Self {
        Self { array_size_limit }
    }

    /// Limits for internal tree walks that cannot grow arrays and must not
    /// re-reject data that was admitted when it was built.
    pub fn unlimited() -> Self {
        Self {
            array_size_limit: usize::MAX,
        }
    }

    pub fn array_size_limit(&self) -> usize {
        self.array_size_limit
    }
}

impl Default for ConfiguredLimits {
    fn default() -> Self {
        Self {
            array_size_limit: DEFAULT_ARRAY_SIZE_LIMIT,
        }
    }
}
