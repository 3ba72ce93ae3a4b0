//! # riverdb-datum — RiverDB's Query-Language Value Core
//!
//! This crate is the value layer of RiverDB: the tagged, self-describing
//! datum that query evaluation computes on, the storage engine persists,
//! and secondary indexes key by. It has no I/O, no locks and no runtime of
//! its own; everything here is pure data manipulation the rest of the
//! engine builds on.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  bridges: JSON tree / protobuf Datum message  │
//! ├───────────────────────────────────────────────┤
//! │  Datum: tagged value, accessors, printing     │
//! │  builders · merge & literals · pseudotypes    │
//! ├──────────────────────┬────────────────────────┤
//! │  comparator          │  key encoder           │
//! │  (version-aware)     │  (primary / secondary) │
//! ├──────────────────────┴────────────────────────┤
//! │  shared-buffer windows + serialized blobs     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Design invariants
//!
//! - Numbers are finite doubles; strings are NUL-free bytes, UTF-8 when
//!   admitted under v1_14 or later.
//! - Object fields are stored sorted by key bytes and looked up by binary
//!   search; there is no insertion-order mode.
//! - Datums are immutable and cheap to clone (refcounted interior).
//!   Mutation goes through [`builder::ObjectBuilder`] and
//!   [`builder::ArrayBuilder`], which produce fresh values.
//! - Under the latest comparison version, `a < b` exactly when
//!   `primary_key(a) < primary_key(b)` byte-wise. The comparator and the
//!   key encoder change together or not at all.
//! - Arrays and objects read from a serialized blob decode lazily through
//!   [`buffer::SharedBufRef`] windows and behave identically to their
//!   materialized twins.
//!
//! ## Module Overview
//!
//! - [`datum`]: the `Datum` type, comparison, merge/literal semantics
//! - [`pseudo`]: `$reql_type$` carriers (TIME, GEOMETRY, LITERAL, BINARY)
//! - [`encoding`]: index key encoding and the serialized blob format
//! - [`builder`]: object/array construction with limits and warnings
//! - [`bridge`]: JSON and protobuf conversion at value granularity
//! - [`range`]: datum intervals and their storage key projections
//! - [`config`]: size constants and runtime limits

pub mod bridge;
pub mod buffer;
pub mod builder;
pub mod config;
pub mod datum;
pub mod encoding;
pub mod error;
pub mod pseudo;
pub mod range;

pub use buffer::SharedBufRef;
pub use builder::{ArrayBuilder, ObjectBuilder};
pub use config::ConfiguredLimits;
pub use datum::cmp::{ReqlVersion, LATEST_VERSION};
pub use datum::merge::stats_merge;
pub use datum::string::DatumString;
pub use datum::{Datum, DatumType, ThrowMode};
pub use encoding::key::StoreKey;
pub use error::{error_kind, DatumError, ErrorKind};
pub use range::{BoundType, DatumRange, KeyRange};
