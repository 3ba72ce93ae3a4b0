//! # Protobuf Bridge
//!
//! The wire protocol carries datums in a `Datum` message with one field per
//! variant plus `R_JSON`, a single JSON string. The message structs here are
//! hand-annotated `prost` types matching that schema field for field, so
//! they interoperate with every generated client.
//!
//! Encoding supports both forms: the structural tree (BINARY crosses as its
//! pseudotype object) and `R_JSON` (the compact `print()` rendering, far
//! cheaper for deep values). Decoding accepts both and routes `R_JSON`
//! through the JSON bridge.

use eyre::Result;
use prost::Message as _;

use crate::builder::ObjectBuilder;
use crate::config::ConfiguredLimits;
use crate::datum::cmp::ReqlVersion;
use crate::datum::{Datum, DatumType, ThrowMode};
use crate::error::generic_error;
use crate::pseudo;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoDatumType {
    RNull = 1,
    RBool = 2,
    RNum = 3,
    RStr = 4,
    RArray = 5,
    RObject = 6,
    RJson = 7,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDatum {
    #[prost(enumeration = "ProtoDatumType", optional, tag = "1")]
    pub datum_type: Option<i32>,
    #[prost(bool, optional, tag = "2")]
    pub r_bool: Option<bool>,
    #[prost(double, optional, tag = "3")]
    pub r_num: Option<f64>,
    #[prost(string, optional, tag = "4")]
    pub r_str: Option<String>,
    #[prost(message, repeated, tag = "5")]
    pub r_array: Vec<ProtoDatum>,
    #[prost(message, repeated, tag = "6")]
    pub r_object: Vec<ProtoAssocPair>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoAssocPair {
    #[prost(string, optional, tag = "1")]
    pub key: Option<String>,
    #[prost(message, optional, tag = "2")]
    pub val: Option<ProtoDatum>,
}

/// Which wire form `to_proto` emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtoFormat {
    Structural,
    Json,
}

fn typed(datum_type: ProtoDatumType) -> ProtoDatum {
    ProtoDatum {
        datum_type: Some(datum_type as i32),
        ..ProtoDatum::default()
    }
}

impl Datum {
    /// The wire message for this datum. Panics on the uninitialized
    /// sentinel, which never crosses the wire.
    pub fn to_proto(&self, format: ProtoFormat) -> ProtoDatum {
        if format == ProtoFormat::Json {
            let mut out = typed(ProtoDatumType::RJson);
            out.r_str = Some(self.print());
            return out;
        }
        match self.get_type() {
            DatumType::Uninitialized => panic!("uninitialized datum has no wire form"),
            DatumType::Null => typed(ProtoDatumType::RNull),
            DatumType::Bool => {
                let mut out = typed(ProtoDatumType::RBool);
                out.r_bool = Some(self.as_bool().expect("checked variant"));
                out
            }
            DatumType::Num => {
                let mut out = typed(ProtoDatumType::RNum);
                out.r_num = Some(self.as_num().expect("checked variant"));
                out
            }
            DatumType::Str => {
                let mut out = typed(ProtoDatumType::RStr);
                out.r_str = Some(
                    self.as_str()
                        .expect("checked variant")
                        .to_utf8_lossy()
                        .into_owned(),
                );
                out
            }
            DatumType::Binary => {
                // BINARY crosses the wire as its pseudotype object.
                let data = self.as_binary().expect("checked variant");
                let mut out = typed(ProtoDatumType::RObject);
                out.r_object = vec![
                    ProtoAssocPair {
                        key: Some(pseudo::REQL_TYPE_FIELD.to_owned()),
                        val: Some({
                            let mut v = typed(ProtoDatumType::RStr);
                            v.r_str = Some(pseudo::binary::NAME.to_owned());
                            v
                        }),
                    },
                    ProtoAssocPair {
                        key: Some(pseudo::binary::DATA_FIELD.to_owned()),
                        val: Some({
                            let mut v = typed(ProtoDatumType::RStr);
                            v.r_str = Some(pseudo::binary::encode_base64(data.as_bytes()));
                            v
                        }),
                    },
                ];
                out
            }
            DatumType::Array => {
                let size = self.arr_size().expect("checked variant");
                let mut out = typed(ProtoDatumType::RArray);
                out.r_array = (0..size)
                    .map(|i| {
                        self.get(i, ThrowMode::Throw)
                            .expect("index within size")
                            .to_proto(ProtoFormat::Structural)
                    })
                    .collect();
                out
            }
            DatumType::Object => {
                let size = self.obj_size().expect("checked variant");
                let mut out = typed(ProtoDatumType::RObject);
                out.r_object = (0..size)
                    .map(|i| {
                        let (key, value) = self.get_pair(i).expect("index within size");
                        ProtoAssocPair {
                            key: Some(key.to_utf8_lossy().into_owned()),
                            val: Some(value.to_proto(ProtoFormat::Structural)),
                        }
                    })
                    .collect();
                out
            }
        }
    }

    pub fn from_proto(
        proto: &ProtoDatum,
        limits: &ConfiguredLimits,
        version: ReqlVersion,
    ) -> Result<Datum> {
        let datum_type = proto
            .datum_type
            .and_then(|raw| ProtoDatumType::try_from(raw).ok())
            .ok_or_else(|| generic_error("Datum message is missing a valid type."))?;
        match datum_type {
            ProtoDatumType::RNull => Ok(Datum::null()),
            ProtoDatumType::RBool => Ok(Datum::boolean(proto.r_bool.ok_or_else(|| {
                generic_error("R_BOOL datum message without r_bool.")
            })?)),
            ProtoDatumType::RNum => Datum::num(
                proto
                    .r_num
                    .ok_or_else(|| generic_error("R_NUM datum message without r_num."))?,
            ),
            ProtoDatumType::RStr => {
                let s = proto
                    .r_str
                    .as_deref()
                    .ok_or_else(|| generic_error("R_STR datum message without r_str."))?;
                Datum::string(s, version)
            }
            ProtoDatumType::RJson => {
                let s = proto
                    .r_str
                    .as_deref()
                    .ok_or_else(|| generic_error("R_JSON datum message without r_str."))?;
                let tree: serde_json::Value = serde_json::from_str(s)
                    .map_err(|e| generic_error(format!("Failed to parse JSON: {}.", e)))?;
                Datum::from_json(&tree, limits, version)
            }
            ProtoDatumType::RArray => {
                let mut elements = Vec::with_capacity(proto.r_array.len());
                for element in &proto.r_array {
                    elements.push(Datum::from_proto(element, limits, version)?);
                }
                Datum::array(elements, limits)
            }
            ProtoDatumType::RObject => {
                let mut builder = ObjectBuilder::new();
                for pair in &proto.r_object {
                    let key = pair.key.as_deref().ok_or_else(|| {
                        generic_error("Datum pair message without a key.")
                    })?;
                    crate::datum::fail_if_invalid(version, key.as_bytes())?;
                    let val = pair.val.as_ref().ok_or_else(|| {
                        generic_error("Datum pair message without a value.")
                    })?;
                    let duplicate =
                        builder.add(key, Datum::from_proto(val, limits, version)?)?;
                    if duplicate {
                        return Err(generic_error(format!(
                            "Duplicate key {} in object.",
                            key
                        )));
                    }
                }
                builder.to_datum_with(&[pseudo::literal::NAME])
            }
        }
    }
}

/// Encodes a datum message to wire bytes.
pub fn encode_proto(proto: &ProtoDatum) -> Vec<u8> {
    proto.encode_to_vec()
}

/// Decodes a datum message from wire bytes.
pub fn decode_proto(bytes: &[u8]) -> Result<ProtoDatum> {
    ProtoDatum::decode(bytes)
        .map_err(|e| generic_error(format!("Malformed Datum message: {}.", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::cmp::LATEST_VERSION;
    use crate::datum::string::DatumString;
    use serde_json::json;

    fn round_trip(datum: &Datum, format: ProtoFormat) -> Datum {
        let wire = encode_proto(&datum.to_proto(format));
        let decoded = decode_proto(&wire).unwrap();
        Datum::from_proto(&decoded, &ConfiguredLimits::default(), LATEST_VERSION).unwrap()
    }

    fn sample() -> Datum {
        Datum::from_json(
            &json!({
                "id": 3,
                "tags": ["a", "b"],
                "ok": true,
                "meta": {"ratio": 0.5, "note": null}
            }),
            &ConfiguredLimits::default(),
            LATEST_VERSION,
        )
        .unwrap()
    }

    #[test]
    fn structural_form_round_trips() {
        let datum = sample();
        assert_eq!(round_trip(&datum, ProtoFormat::Structural), datum);
    }

    #[test]
    fn json_form_round_trips() {
        let datum = sample();
        assert_eq!(round_trip(&datum, ProtoFormat::Json), datum);
    }

    #[test]
    fn binary_crosses_the_wire_as_its_pseudotype() {
        let datum = Datum::binary(DatumString::from_bytes(vec![0, 255, 7]));
        let proto = datum.to_proto(ProtoFormat::Structural);
        assert_eq!(proto.datum_type, Some(ProtoDatumType::RObject as i32));
        assert_eq!(round_trip(&datum, ProtoFormat::Structural), datum);
        assert_eq!(round_trip(&datum, ProtoFormat::Json), datum);
    }

    #[test]
    fn duplicate_object_keys_are_rejected() {
        let pair = |k: &str| ProtoAssocPair {
            key: Some(k.to_owned()),
            val: Some(typed(ProtoDatumType::RNull)),
        };
        let proto = ProtoDatum {
            datum_type: Some(ProtoDatumType::RObject as i32),
            r_object: vec![pair("k"), pair("k")],
            ..ProtoDatum::default()
        };
        let err = Datum::from_proto(&proto, &ConfiguredLimits::default(), LATEST_VERSION)
            .unwrap_err();
        assert!(err.to_string().contains("Duplicate key"));
    }

    #[test]
    fn messages_without_a_type_are_rejected() {
        let proto = ProtoDatum::default();
        assert!(
            Datum::from_proto(&proto, &ConfiguredLimits::default(), LATEST_VERSION)
                .is_err()
        );
    }

    #[test]
    fn malformed_json_payloads_are_rejected() {
        let mut proto = typed(ProtoDatumType::RJson);
        proto.r_str = Some("{not json".to_owned());
        assert!(
            Datum::from_proto(&proto, &ConfiguredLimits::default(), LATEST_VERSION)
                .is_err()
        );
    }
}
