//! GEOMETRY pseudotype: a GeoJSON-shaped carrier
//! `{$reql_type$: "GEOMETRY", type: STR, coordinates: ARRAY}`.
//!
//! Only the carrier shape is checked here. Coordinate semantics (winding,
//! ranges, geodesic validity) are the geometry subsystem's business and are
//! validated when a geometry value is actually used.

use eyre::Result;

use crate::datum::{Datum, DatumType, ThrowMode};
use crate::error::generic_error;
use crate::pseudo::REQL_TYPE_FIELD;

pub const NAME: &str = "GEOMETRY";
pub const TYPE_FIELD: &str = "type";
pub const COORDINATES_FIELD: &str = "coordinates";

pub(crate) fn validate(datum: &Datum) -> Result<()> {
    let size = datum.obj_size()?;
    for i in 0..size {
        let (key, _) = datum.unchecked_get_pair(i);
        match key.as_bytes() {
            k if k == REQL_TYPE_FIELD.as_bytes() => {}
            k if k == TYPE_FIELD.as_bytes() => {}
            k if k == COORDINATES_FIELD.as_bytes() => {}
            other => {
                return Err(generic_error(format!(
                    "Invalid geometry object: unrecognized field `{}`.",
                    String::from_utf8_lossy(other)
                )));
            }
        }
    }

    let shape = datum.get_field(TYPE_FIELD, ThrowMode::NoThrow)?;
    if shape.get_type() != DatumType::Str {
        return Err(generic_error(
            "Invalid geometry object: field `type` must be a string.",
        ));
    }
    if shape.as_str()?.as_bytes() == b"GeometryCollection" {
        return Err(generic_error(
            "GeometryCollection is not supported as a value type.",
        ));
    }
    let coordinates = datum.get_field(COORDINATES_FIELD, ThrowMode::NoThrow)?;
    if coordinates.get_type() != DatumType::Array {
        return Err(generic_error(
            "Invalid geometry object: field `coordinates` must be an array.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::string::DatumString;

    fn geo_pairs(shape: &str, coordinates: Datum) -> Vec<(DatumString, Datum)> {
        vec![
            (
                DatumString::from(REQL_TYPE_FIELD),
                Datum::str_unchecked(DatumString::from(NAME)),
            ),
            (
                DatumString::from(TYPE_FIELD),
                Datum::str_unchecked(DatumString::from(shape)),
            ),
            (DatumString::from(COORDINATES_FIELD), coordinates),
        ]
    }

    #[test]
    fn well_shaped_carriers_are_accepted() {
        let point = Datum::object(
            geo_pairs(
                "Point",
                Datum::array_unchecked(vec![
                    Datum::num(1.0).unwrap(),
                    Datum::num(2.0).unwrap(),
                ]),
            ),
            &[],
        );
        assert!(point.is_ok());
    }

    #[test]
    fn missing_or_mistyped_fields_are_rejected() {
        let no_coords = Datum::object(
            vec![
                (
                    DatumString::from(REQL_TYPE_FIELD),
                    Datum::str_unchecked(DatumString::from(NAME)),
                ),
                (
                    DatumString::from(TYPE_FIELD),
                    Datum::str_unchecked(DatumString::from("Point")),
                ),
            ],
            &[],
        );
        assert!(no_coords.is_err());

        let bad_coords = Datum::object(geo_pairs("Point", Datum::null()), &[]);
        assert!(bad_coords.is_err());
    }

    #[test]
    fn geometry_collection_is_rejected() {
        let gc = Datum::object(
            geo_pairs("GeometryCollection", Datum::empty_array()),
            &[],
        );
        assert!(gc.unwrap_err().to_string().contains("GeometryCollection"));
    }
}
