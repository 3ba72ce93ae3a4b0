//! Key encoding benchmarks.
//!
//! Index maintenance encodes a key per document per index, and range scans
//! compare keys constantly, so encode and compare costs show up directly in
//! write amplification and scan throughput.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use riverdb_datum::encoding::key::{decode_primary, primary_key, secondary_key};
use riverdb_datum::{ConfiguredLimits, Datum, LATEST_VERSION};

fn sample_values() -> Vec<(&'static str, Datum)> {
    let limits = ConfiguredLimits::default();
    vec![
        ("num", Datum::num(-1234.5678).unwrap()),
        (
            "short_str",
            Datum::string("user:4711", LATEST_VERSION).unwrap(),
        ),
        (
            "long_str",
            Datum::string("x".repeat(100), LATEST_VERSION).unwrap(),
        ),
        ("binary", Datum::binary(vec![0u8; 64])),
        (
            "array",
            Datum::array(
                vec![
                    Datum::num(1.0).unwrap(),
                    Datum::string("tag", LATEST_VERSION).unwrap(),
                    Datum::boolean(true),
                ],
                &limits,
            )
            .unwrap(),
        ),
    ]
}

fn bench_primary_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("primary_key_encode");
    for (name, datum) in sample_values() {
        group.bench_with_input(BenchmarkId::new("encode", name), &datum, |b, datum| {
            b.iter(|| primary_key(black_box(datum)).unwrap());
        });
    }
    group.finish();
}

fn bench_primary_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("primary_key_decode");
    for (name, datum) in sample_values() {
        let key = primary_key(&datum).unwrap();
        group.bench_with_input(BenchmarkId::new("decode", name), &key, |b, key| {
            b.iter(|| decode_primary(black_box(key.as_bytes())).unwrap());
        });
    }
    group.finish();
}

fn bench_secondary_compose(c: &mut Criterion) {
    let primary = primary_key(&Datum::string("doc-4711", LATEST_VERSION).unwrap()).unwrap();
    let value = Datum::string("indexed value", LATEST_VERSION).unwrap();
    c.bench_function("secondary_key_compose", |b| {
        b.iter(|| {
            secondary_key(
                black_box(&value),
                LATEST_VERSION,
                black_box(&primary),
                Some(3),
            )
            .unwrap()
        });
    });
}

fn bench_key_compare(c: &mut Criterion) {
    let keys: Vec<_> = sample_values()
        .iter()
        .map(|(_, d)| primary_key(d).unwrap())
        .collect();
    c.bench_function("key_memcmp_all_pairs", |b| {
        b.iter(|| {
            let mut less = 0usize;
            for a in &keys {
                for k in &keys {
                    if black_box(a) < black_box(k) {
                        less += 1;
                    }
                }
            }
            less
        });
    });
}

fn bench_datum_compare(c: &mut Criterion) {
    let values = sample_values();
    let long_a = Datum::string("y".repeat(200), LATEST_VERSION).unwrap();
    let long_b = Datum::string(format!("{}z", "y".repeat(199)), LATEST_VERSION).unwrap();
    c.bench_function("datum_cmp_all_pairs", |b| {
        b.iter(|| {
            let mut less = 0usize;
            for (_, a) in &values {
                for (_, k) in &values {
                    if a.cmp_with(LATEST_VERSION, black_box(k)) == std::cmp::Ordering::Less
                    {
                        less += 1;
                    }
                }
            }
            less
        });
    });
    c.bench_function("datum_cmp_long_common_prefix", |b| {
        b.iter(|| long_a.cmp_with(LATEST_VERSION, black_box(&long_b)));
    });
}

criterion_group!(
    benches,
    bench_primary_encode,
    bench_primary_decode,
    bench_secondary_compose,
    bench_key_compare,
    bench_datum_compare
);
criterion_main!(benches);
