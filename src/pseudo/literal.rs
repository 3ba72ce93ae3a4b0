//! LITERAL pseudotype: `{$reql_type$: "LITERAL"}` or
//! `{$reql_type$: "LITERAL", value: <datum>}`.
//!
//! A literal is a reserved form, not a value: merge replaces (or, with no
//! `value`, deletes) the target field instead of recursing into it. It is
//! only admitted where the caller explicitly allows it — the top level of a
//! merge or update payload — and never nests inside another literal.

use eyre::Result;

use crate::datum::Datum;
use crate::error::generic_error;
use crate::pseudo::REQL_TYPE_FIELD;

pub const NAME: &str = "LITERAL";
pub const VALUE_FIELD: &str = "value";

/// Structural check: the carrier holds at most the single field `value`
/// next to the marker.
pub(crate) fn validate(datum: &Datum) -> Result<()> {
    let size = datum.obj_size()?;
    for i in 0..size {
        let (key, _) = datum.unchecked_get_pair(i);
        if key.as_bytes() != REQL_TYPE_FIELD.as_bytes()
            && key.as_bytes() != VALUE_FIELD.as_bytes()
        {
            return Err(generic_error(format!(
                "Invalid literal: unrecognized field `{}`; a literal carries at \
                 most the single field `{}`.",
                key.to_utf8_lossy(),
                VALUE_FIELD
            )));
        }
    }
    Ok(())
}
