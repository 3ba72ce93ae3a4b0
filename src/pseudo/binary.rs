//! BINARY pseudotype: `{$reql_type$: "BINARY", data: <base64 STR>}`.
//!
//! BINARY is a wire-only carrier. In memory the value is the dedicated
//! BINARY variant; the object form exists only in JSON and structural
//! protobuf, and this module is the single place the two representations
//! cross.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use eyre::Result;

use crate::datum::string::DatumString;
use crate::datum::Datum;
use crate::error::generic_error;
use crate::pseudo::REQL_TYPE_FIELD;

pub const NAME: &str = "BINARY";
pub const DATA_FIELD: &str = "data";

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text)
        .map_err(|e| generic_error(format!("Invalid base64 format: {}.", e)))
}

/// Converts a wire carrier into the BINARY variant, rejecting carriers with
/// missing, mistyped or extra fields.
pub(crate) fn from_ptype(datum: &Datum) -> Result<Datum> {
    let size = datum.obj_size()?;
    let mut data: Option<Vec<u8>> = None;
    for i in 0..size {
        let (key, value) = datum.unchecked_get_pair(i);
        match key.as_bytes() {
            k if k == REQL_TYPE_FIELD.as_bytes() => {}
            k if k == DATA_FIELD.as_bytes() => {
                let text = value.as_str().map_err(|_| {
                    generic_error(format!(
                        "Invalid binary pseudotype: field `{}` must be a string.",
                        DATA_FIELD
                    ))
                })?;
                data = Some(decode_base64(&text.to_utf8_lossy())?);
            }
            other => {
                return Err(generic_error(format!(
                    "Invalid binary pseudotype: illegal field `{}`.",
                    String::from_utf8_lossy(other)
                )));
            }
        }
    }
    match data {
        Some(bytes) => Ok(Datum::binary(DatumString::from_bytes(bytes))),
        None => Err(generic_error(format!(
            "Invalid binary pseudotype: lacking `{}` key.",
            DATA_FIELD
        ))),
    }
}
