use criterion::{black_box, criterion_group, criterion_main, Criterion};

use clipseek::config::MatchingConfig;
use clipseek::matcher::find_all_matches;
use clipseek::Fingerprint;

/// Synthetic 64-bit fingerprints cycling through byte patterns.
fn synthetic_sequence(len: usize) -> Vec<Fingerprint> {
    (0..len)
        .map(|i| {
            let b = (i % 251) as u8;
            let bytes = [b, b.wrapping_mul(3), b.wrapping_add(17), b ^ 0x5A, b, 0, !b, b >> 1];
            Fingerprint::from_bytes(&bytes).expect("valid hash bytes")
        })
        .collect()
}

/// Benchmark the sliding-window matcher on library-sized sequences
fn bench_find_all_matches(c: &mut Criterion) {
    let config = MatchingConfig::default();
    let reference = synthetic_sequence(2000);
    let query = reference[800..850].to_vec();

    c.bench_function("find_all_matches_2000x50", |b| {
        b.iter(|| {
            find_all_matches(
                black_box(&reference),
                black_box(&query),
                black_box(&config),
            )
        })
    });
}

fn bench_short_query(c: &mut Criterion) {
    let config = MatchingConfig::default();
    let reference = synthetic_sequence(2000);
    let query = reference[100..105].to_vec();

    c.bench_function("find_all_matches_2000x5", |b| {
        b.iter(|| {
            find_all_matches(
                black_box(&reference),
                black_box(&query),
                black_box(&config),
            )
        })
    });
}

criterion_group!(benches, bench_find_all_matches, bench_short_query);
criterion_main!(benches);
