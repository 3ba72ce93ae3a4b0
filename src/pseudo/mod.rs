//! # Pseudotype Registry
//!
//! A pseudotype is an OBJECT that the engine interprets specially because it
//! carries a STR field `$reql_type$`. Four names are recognized:
//!
//! | Name | Handling |
//! |------|----------|
//! | `TIME` | validated and normalized in place |
//! | `GEOMETRY` | syntactic shape check; semantics live in the geo subsystem |
//! | `LITERAL` | legal only where the caller allows it (merge/update) |
//! | `BINARY` | wire carrier; replaced by the BINARY variant on entry |
//!
//! Unknown names fail construction unless the caller's allowlist says
//! otherwise — it never does today, but the allowlist is also how LITERAL
//! is scoped to merge. Sanitization runs once, on the permissive object
//! construction paths; sanitizing an already-sanitized value is a no-op.

pub mod binary;
pub mod geometry;
pub mod literal;
pub mod time;

use eyre::Result;

use crate::datum::{Datum, DatumType};
use crate::error::generic_error;

/// The field that marks an object as a pseudotype carrier.
pub const REQL_TYPE_FIELD: &str = "$reql_type$";

/// Dispatches pseudotype handling for a freshly constructed object.
/// `allowed` names the pseudotypes that are legal in this position beyond
/// the always-legal ones (today that only ever means LITERAL, at the top
/// level of a merge or update payload).
pub(crate) fn maybe_sanitize(datum: Datum, allowed: &[&str]) -> Result<Datum> {
    if !datum.is_ptype() {
        return Ok(datum);
    }
    // A BINARY variant has already crossed the wire boundary.
    if datum.get_type() == DatumType::Binary {
        return Ok(datum);
    }
    let reql_type = datum.reql_type()?;
    match reql_type.as_str() {
        time::NAME => time::sanitize(datum),
        literal::NAME => {
            if !allowed.contains(&literal::NAME) {
                return Err(generic_error(
                    "Stray literal keyword found: literal is only legal inside of \
                     the object passed to merge or update and cannot nest inside \
                     other literals.",
                ));
            }
            literal::validate(&datum)?;
            Ok(datum)
        }
        geometry::NAME => {
            geometry::validate(&datum)?;
            Ok(datum)
        }
        binary::NAME => binary::from_ptype(&datum),
        _ => Err(generic_error(format!(
            "Unknown $reql_type$ `{}`.",
            datum.type_name()
        ))),
    }
}
