//! # Error Classification
//!
//! All fallible operations in this crate return `eyre::Result`. Errors that
//! callers dispatch on (the query layer maps them to distinct client error
//! codes) carry a [`DatumError`] as the report's root cause, so the kind can
//! be recovered with [`error_kind`] after any amount of context wrapping.
//!
//! Three kinds exist:
//!
//! - `Generic`: validation failures, type errors, unknown pseudotypes,
//!   oversized keys, stray literals.
//! - `NonExistence`: a missing field or out-of-bounds index requested in
//!   throwing mode.
//! - `TooLarge`: an array exceeding the configured size limit on a checking
//!   construction path.
//!
//! Broken internal invariants are not errors; they panic.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Generic,
    NonExistence,
    TooLarge,
}

/// Typed root cause for datum-core failures. The display form is the
/// user-facing message; callers truncate it for presentation.
#[derive(Debug)]
pub struct DatumError {
    kind: ErrorKind,
    msg: String,
}

impl DatumError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for DatumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for DatumError {}

/// Recovers the error kind from a report whose root cause is a [`DatumError`].
pub fn error_kind(report: &eyre::Report) -> Option<ErrorKind> {
    report.downcast_ref::<DatumError>().map(DatumError::kind)
}

pub(crate) fn generic_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(DatumError::new(ErrorKind::Generic, msg))
}

pub(crate) fn non_existence_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(DatumError::new(ErrorKind::NonExistence, msg))
}

pub(crate) fn too_large_error(msg: impl Into<String>) -> eyre::Report {
    eyre::Report::new(DatumError::new(ErrorKind::TooLarge, msg))
}
