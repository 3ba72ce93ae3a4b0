//! Cross-component acceptance tests: the comparator and the key encoder
//! must agree byte for byte, secondary keys must compose and parse exactly,
//! and merge must honor literal semantics.

use std::cmp::Ordering;

use riverdb_datum::encoding::key::{
    decode_primary, parse_secondary, primary_key, secondary_key,
};
use riverdb_datum::encoding::serialize::{serialize_datum, wrap_datum};
use riverdb_datum::pseudo::time::make_time;
use riverdb_datum::{
    error_kind, ConfiguredLimits, Datum, DatumString, ErrorKind, ReqlVersion,
    SharedBufRef, StoreKey, ThrowMode, LATEST_VERSION,
};

fn n(value: f64) -> Datum {
    Datum::num(value).unwrap()
}

fn s(text: &str) -> Datum {
    Datum::string(text, LATEST_VERSION).unwrap()
}

fn arr(elements: Vec<Datum>) -> Datum {
    Datum::array(elements, &ConfiguredLimits::default()).unwrap()
}

fn obj(pairs: Vec<(&str, Datum)>) -> Datum {
    Datum::object(
        pairs
            .into_iter()
            .map(|(k, v)| (DatumString::from(k), v))
            .collect(),
        &["LITERAL"],
    )
    .unwrap()
}

/// Every primary-key-encodable shape in one corpus: numbers across the
/// range, strings, escaped binaries, bools, nested arrays, times.
fn key_corpus() -> Vec<Datum> {
    vec![
        n(-1.0e9),
        n(-2.5),
        n(-1.0),
        n(0.0),
        n(0.5),
        n(1.0),
        n(2.5),
        n(1.0e9),
        Datum::boolean(false),
        Datum::boolean(true),
        s(""),
        s("a"),
        s("ab"),
        s("b"),
        s("{}"),
        Datum::binary(b"".to_vec()),
        Datum::binary(b"\x00".to_vec()),
        Datum::binary(b"\x00\x01".to_vec()),
        Datum::binary(b"\x02plain".to_vec()),
        arr(vec![]),
        arr(vec![n(1.0)]),
        arr(vec![n(1.0), n(2.0)]),
        arr(vec![n(2.0)]),
        arr(vec![s("a"), Datum::boolean(true)]),
        arr(vec![arr(vec![n(1.0)])]),
        make_time(-100.0, "+00:00").unwrap(),
        make_time(0.0, "-07:00").unwrap(),
        make_time(1375147296.681, "+05:30").unwrap(),
    ]
}

#[test]
fn value_order_and_key_byte_order_agree() {
    let corpus = key_corpus();
    for a in &corpus {
        let key_a = primary_key(a).unwrap();
        for b in &corpus {
            let key_b = primary_key(b).unwrap();
            assert_eq!(
                a.cmp_with(ReqlVersion::V1_16, b),
                key_a.cmp(&key_b),
                "comparator and key encoder disagree on {} vs {}",
                a.print(),
                b.print()
            );
        }
    }
}

#[test]
fn buffer_backed_values_compare_like_materialized_ones() {
    let corpus = key_corpus();
    let wrapped: Vec<Datum> = corpus
        .iter()
        .map(|d| wrap_datum(SharedBufRef::new(serialize_datum(d).unwrap())).unwrap())
        .collect();
    for (a, wrapped_a) in corpus.iter().zip(&wrapped) {
        for (b, wrapped_b) in corpus.iter().zip(&wrapped) {
            assert_eq!(
                a.cmp_with(LATEST_VERSION, b),
                wrapped_a.cmp_with(LATEST_VERSION, wrapped_b),
                "buffer-backed comparison diverged for {} vs {}",
                a.print(),
                b.print()
            );
        }
    }
}

#[test]
fn comparison_is_total_and_transitive_over_the_corpus() {
    let corpus = key_corpus();
    for version in [ReqlVersion::V1_13, ReqlVersion::V1_14, ReqlVersion::V1_16] {
        let mut sorted = corpus.clone();
        sorted.sort_by(|a, b| a.cmp_with(version, b));
        for pair in sorted.windows(2) {
            assert_ne!(
                pair[0].cmp_with(version, &pair[1]),
                Ordering::Greater,
                "sort produced an inversion under {:?}",
                version
            );
        }
    }
}

#[test]
fn primary_keys_round_trip_through_decode() {
    for datum in key_corpus() {
        let key = primary_key(&datum).unwrap();
        let decoded = decode_primary(key.as_bytes()).unwrap();
        assert_eq!(decoded, datum, "round trip failed for {}", datum.print());
    }
}

#[test]
fn secondary_keys_parse_back_into_their_components() {
    let primary = primary_key(&s("doc-id")).unwrap();
    for datum in key_corpus() {
        for tag in [None, Some(0), Some(12345), Some(u64::MAX)] {
            let composed =
                secondary_key(&datum, LATEST_VERSION, &primary, tag).unwrap();
            let parts = parse_secondary(composed.as_bytes());
            assert_eq!(parts.primary, primary.as_bytes());
            assert_eq!(parts.tag_num, tag);
            let mut expected_secondary =
                riverdb_datum::encoding::key::secondary_key_value(&datum).unwrap();
            expected_secondary.push(0x00);
            assert_eq!(parts.secondary, expected_secondary);
        }
    }
}

#[test]
fn secondary_key_layout_is_stable() {
    // STR("abc"), primary "pk", tag 7: the value part carries its v1_14 NUL
    // terminator, so the trailing offsets are 5 and 7.
    let key = secondary_key(
        &s("abc"),
        ReqlVersion::V1_14,
        &StoreKey::new(b"pk".to_vec()),
        Some(7),
    )
    .unwrap();
    assert_eq!(
        key.as_bytes(),
        &[
            0x53, 0x61, 0x62, 0x63, 0x00, // "Sabc" + terminator
            0x70, 0x6b, // "pk"
            0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // tag, LE
            0x05, 0x07, // pk_off, tag_off
        ]
    );
}

#[test]
fn encoded_negative_one_sorts_below_positive_one() {
    let neg = primary_key(&n(-1.0)).unwrap();
    let pos = primary_key(&n(1.0)).unwrap();
    assert_eq!(neg.as_bytes().cmp(pos.as_bytes()), Ordering::Less);
}

#[test]
fn nan_construction_fails_with_a_generic_error() {
    let err = Datum::num(f64::NAN).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::Generic));
}

#[test]
fn unordered_pair_lists_become_sorted_objects() {
    let datum = obj(vec![("b", n(2.0)), ("a", n(1.0))]);
    let (first_key, first_val) = datum.get_pair(0).unwrap();
    assert_eq!(first_key, "a");
    assert_eq!(first_val, n(1.0));
    let (second_key, second_val) = datum.get_pair(1).unwrap();
    assert_eq!(second_key, "b");
    assert_eq!(second_val, n(2.0));
    assert_eq!(datum.get_field("a", ThrowMode::Throw).unwrap(), n(1.0));
}

#[test]
fn merge_replaces_through_a_literal_with_value() {
    let left = obj(vec![("a", n(1.0)), ("b", n(2.0))]);
    let right = obj(vec![(
        "b",
        obj(vec![
            ("$reql_type$", s("LITERAL")),
            ("value", n(20.0)),
        ]),
    )]);
    let merged = left.merge(&right).unwrap();
    assert_eq!(merged, obj(vec![("a", n(1.0)), ("b", n(20.0))]));
}

#[test]
fn merge_deletes_through_a_bare_literal() {
    let left = obj(vec![("a", n(1.0))]);
    let right = obj(vec![("a", obj(vec![("$reql_type$", s("LITERAL"))]))]);
    let merged = left.merge(&right).unwrap();
    assert_eq!(merged.obj_size().unwrap(), 0);
}

#[test]
fn merge_is_idempotent_without_literals() {
    let value = obj(vec![
        ("id", n(7.0)),
        ("name", s("row")),
        ("tags", arr(vec![s("x"), s("y")])),
        ("child", obj(vec![("k", Datum::null())])),
    ]);
    assert_eq!(value.merge(&value).unwrap(), value);
}
