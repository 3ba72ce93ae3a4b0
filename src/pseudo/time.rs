//! TIME pseudotype: `{$reql_type$: "TIME", epoch_time: NUM, timezone: STR}`.
//!
//! Sanitization validates the required fields, rejects unknown ones, and
//! normalizes the timezone to `±HH:MM`. Comparison and key encoding read
//! only `epoch_time`: two instants are the same moment regardless of the
//! timezone they are displayed in.

use std::cmp::Ordering;

use eyre::Result;

use crate::datum::string::DatumString;
use crate::datum::{Datum, DatumType, ThrowMode};
use crate::error::generic_error;
use crate::pseudo::REQL_TYPE_FIELD;

pub const NAME: &str = "TIME";
pub const EPOCH_TIME_FIELD: &str = "epoch_time";
pub const TIMEZONE_FIELD: &str = "timezone";

/// Accepts `Z`, `±HH:MM` and `±HHMM`, with hours up to 24 and minutes
/// under 60; returns the normalized `±HH:MM` form.
pub fn normalize_timezone(tz: &str) -> Result<String> {
    if tz == "Z" {
        return Ok("+00:00".to_owned());
    }
    let bad = || {
        generic_error(format!(
            "Invalid ISO 8601 timezone: `{}`. Expected `Z` or an offset of the form `[+-]HH:MM`.",
            tz
        ))
    };
    let mut chars = tz.chars();
    let sign = match chars.next() {
        Some(c @ ('+' | '-')) => c,
        _ => return Err(bad()),
    };
    let rest: String = chars.collect();
    let (hh, mm) = match rest.len() {
        4 => (&rest[..2], &rest[2..]),
        5 if rest.as_bytes()[2] == b':' => (&rest[..2], &rest[3..]),
        _ => return Err(bad()),
    };
    let hours: u32 = hh.parse().map_err(|_| bad())?;
    let minutes: u32 = mm.parse().map_err(|_| bad())?;
    if hours > 24 || minutes >= 60 || (hours == 24 && minutes != 0) {
        return Err(bad());
    }
    Ok(format!("{}{:02}:{:02}", sign, hours, minutes))
}

/// Validates a TIME carrier and rewrites the timezone to normal form.
pub(crate) fn sanitize(datum: Datum) -> Result<Datum> {
    let size = datum.obj_size()?;
    let mut epoch_seen = false;
    let mut normalized_tz: Option<(usize, String)> = None;
    for i in 0..size {
        let (key, value) = datum.unchecked_get_pair(i);
        match key.as_bytes() {
            k if k == REQL_TYPE_FIELD.as_bytes() => {}
            k if k == EPOCH_TIME_FIELD.as_bytes() => {
                if value.get_type() != DatumType::Num {
                    return Err(generic_error(format!(
                        "Invalid time object: field `{}` must be a number (got `{}`).",
                        EPOCH_TIME_FIELD,
                        value.trunc_print()
                    )));
                }
                epoch_seen = true;
            }
            k if k == TIMEZONE_FIELD.as_bytes() => {
                let tz = value.as_str().map_err(|_| {
                    generic_error(format!(
                        "Invalid time object: field `{}` must be a string (got `{}`).",
                        TIMEZONE_FIELD,
                        value.trunc_print()
                    ))
                })?;
                let normalized = normalize_timezone(&tz.to_utf8_lossy())?;
                if normalized.as_bytes() != tz.as_bytes() {
                    normalized_tz = Some((i, normalized));
                }
            }
            other => {
                return Err(generic_error(format!(
                    "Invalid time object: unrecognized field `{}`.",
                    String::from_utf8_lossy(other)
                )));
            }
        }
    }
    if !epoch_seen {
        return Err(generic_error(format!(
            "Invalid time object: missing field `{}`.",
            EPOCH_TIME_FIELD
        )));
    }
    let tz_present = datum
        .get_field(TIMEZONE_FIELD, ThrowMode::NoThrow)?
        .has();
    if !tz_present {
        return Err(generic_error(format!(
            "Invalid time object: missing field `{}`.",
            TIMEZONE_FIELD
        )));
    }

    match normalized_tz {
        None => Ok(datum),
        Some((index, normalized)) => {
            let mut pairs: Vec<(DatumString, Datum)> =
                (0..size).map(|i| datum.unchecked_get_pair(i)).collect();
            pairs[index].1 = Datum::str_unchecked(DatumString::from(normalized));
            Ok(Datum::object_presorted_unchecked(pairs))
        }
    }
}

/// Convenience constructor used by decoders and tests.
pub fn make_time(epoch_time: f64, timezone: &str) -> Result<Datum> {
    Datum::object(
        vec![
            (
                DatumString::from(REQL_TYPE_FIELD),
                Datum::str_unchecked(DatumString::from(NAME)),
            ),
            (
                DatumString::from(EPOCH_TIME_FIELD),
                Datum::num(epoch_time)?,
            ),
            (
                DatumString::from(TIMEZONE_FIELD),
                Datum::str_unchecked(DatumString::from(timezone)),
            ),
        ],
        &[],
    )
}

/// `epoch_time` of a sanitized TIME datum.
pub fn epoch_time(datum: &Datum) -> Result<f64> {
    datum
        .get_field(EPOCH_TIME_FIELD, ThrowMode::Throw)?
        .as_num()
}

/// Instant comparison; `None` when a carrier is malformed (possible only
/// through the non-sanitizing construction paths) so the caller can fall
/// back to object comparison.
pub(crate) fn time_cmp(lhs: &Datum, rhs: &Datum) -> Option<Ordering> {
    let a = epoch_time(lhs).ok()?;
    let b = epoch_time(rhs).ok()?;
    a.partial_cmp(&b)
}
