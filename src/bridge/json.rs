//! # JSON Bridge
//!
//! Converts between datums and `serde_json::Value` trees. Decoding applies
//! the full construction rules — finite numbers, NUL-free strings, UTF-8
//! from v1_14 on, duplicate-key rejection, pseudotype sanitization with
//! LITERAL allowed (client JSON is exactly where merge payloads come from).
//! Encoding renders BINARY as its base64 pseudotype object and integral
//! numbers as integers.

use eyre::Result;
use serde_json::Value;

use crate::builder::ObjectBuilder;
use crate::config::ConfiguredLimits;
use crate::datum::cmp::ReqlVersion;
use crate::datum::{number_as_integer, Datum, DatumType, ThrowMode};
use crate::error::generic_error;
use crate::pseudo;

impl Datum {
    pub fn from_json(
        value: &Value,
        limits: &ConfiguredLimits,
        version: ReqlVersion,
    ) -> Result<Datum> {
        match value {
            Value::Null => Ok(Datum::null()),
            Value::Bool(b) => Ok(Datum::boolean(*b)),
            Value::Number(n) => {
                let d = n
                    .as_f64()
                    .ok_or_else(|| generic_error(format!("Non-finite number: {}", n)))?;
                Datum::num(d)
            }
            Value::String(s) => Datum::string(s.as_str(), version),
            Value::Array(values) => {
                let mut elements = Vec::with_capacity(values.len());
                for v in values {
                    elements.push(Datum::from_json(v, limits, version)?);
                }
                Datum::array(elements, limits)
            }
            Value::Object(map) => {
                let mut builder = ObjectBuilder::new();
                for (key, v) in map {
                    let duplicate =
                        builder.add(key.as_str(), Datum::from_json(v, limits, version)?)?;
                    if duplicate {
                        return Err(generic_error(format!(
                            "Duplicate key `{}` in JSON.",
                            key
                        )));
                    }
                }
                builder.to_datum_with(&[pseudo::literal::NAME])
            }
        }
    }

    /// The JSON tree for this datum. Panics on the uninitialized sentinel,
    /// which has no JSON form.
    pub fn to_json(&self) -> Value {
        match self.get_type() {
            DatumType::Uninitialized => panic!("uninitialized datum has no JSON form"),
            DatumType::Null => Value::Null,
            DatumType::Bool => Value::Bool(self.as_bool().expect("checked variant")),
            DatumType::Num => {
                let n = self.as_num().expect("checked variant");
                match number_as_integer(n) {
                    Some(i) => Value::Number(i.into()),
                    None => serde_json::Number::from_f64(n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                }
            }
            DatumType::Str => Value::String(
                self.as_str()
                    .expect("checked variant")
                    .to_utf8_lossy()
                    .into_owned(),
            ),
            DatumType::Binary => {
                let data = self.as_binary().expect("checked variant");
                let mut map = serde_json::Map::new();
                map.insert(
                    pseudo::REQL_TYPE_FIELD.to_owned(),
                    Value::String(pseudo::binary::NAME.to_owned()),
                );
                map.insert(
                    pseudo::binary::DATA_FIELD.to_owned(),
                    Value::String(pseudo::binary::encode_base64(data.as_bytes())),
                );
                Value::Object(map)
            }
            DatumType::Array => {
                let size = self.arr_size().expect("checked variant");
                let mut values = Vec::with_capacity(size);
                for i in 0..size {
                    values.push(
                        self.get(i, ThrowMode::Throw)
                            .expect("index within size")
                            .to_json(),
                    );
                }
                Value::Array(values)
            }
            DatumType::Object => {
                let size = self.obj_size().expect("checked variant");
                let mut map = serde_json::Map::new();
                for i in 0..size {
                    let (key, value) = self.get_pair(i).expect("index within size");
                    map.insert(key.to_utf8_lossy().into_owned(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::cmp::LATEST_VERSION;
    use crate::error::{error_kind, ErrorKind};
    use serde_json::json;

    fn decode(value: &Value) -> Result<Datum> {
        Datum::from_json(value, &ConfiguredLimits::default(), LATEST_VERSION)
    }

    #[test]
    fn json_trees_round_trip() {
        let tree = json!({
            "id": 42,
            "name": "reader",
            "rate": -0.125,
            "flags": [true, false, null],
            "nested": {"deep": {"deeper": []}}
        });
        let datum = decode(&tree).unwrap();
        assert_eq!(datum.to_json(), tree);
    }

    #[test]
    fn integral_numbers_render_without_a_fraction() {
        let datum = decode(&json!(5.0)).unwrap();
        assert_eq!(datum.to_json().to_string(), "5");
        let frac = decode(&json!(5.5)).unwrap();
        assert_eq!(frac.to_json().to_string(), "5.5");
    }

    #[test]
    fn binary_crosses_as_the_base64_pseudotype_object() {
        let tree = json!({"$reql_type$": "BINARY", "data": "AAEC"});
        let datum = decode(&tree).unwrap();
        assert_eq!(datum.get_type(), DatumType::Binary);
        assert_eq!(datum.as_binary().unwrap().as_bytes(), &[0, 1, 2]);
        assert_eq!(datum.to_json(), tree);
    }

    #[test]
    fn literal_pseudotypes_are_legal_in_client_json() {
        let tree = json!({"patch": {"$reql_type$": "LITERAL", "value": 7}});
        let datum = decode(&tree).unwrap();
        let literal = datum
            .get_field("patch", crate::datum::ThrowMode::Throw)
            .unwrap();
        assert!(literal.is_ptype_of(pseudo::literal::NAME));
    }

    #[test]
    fn unknown_pseudotypes_fail_decoding() {
        let err = decode(&json!({"$reql_type$": "SHRUB"})).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Generic));
    }

    #[test]
    fn array_size_limit_applies_during_decoding() {
        let limits = ConfiguredLimits::with_array_size_limit(1);
        let err =
            Datum::from_json(&json!([1, 2]), &limits, LATEST_VERSION).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::TooLarge));
    }

    #[test]
    fn times_survive_a_json_round_trip() {
        let tree = json!({
            "$reql_type$": "TIME",
            "epoch_time": 1375147296.681,
            "timezone": "+00:00"
        });
        let datum = decode(&tree).unwrap();
        assert!(datum.is_ptype_of("TIME"));
        assert_eq!(datum.to_json(), tree);
    }
}
