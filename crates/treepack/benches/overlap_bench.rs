//! Criterion microbenches for the overlap hot path.
//!
//! - pairwise intersection: disjoint boxes (early reject) vs. true overlap;
//! - total overlap over grid configurations of growing size.
//!
//! Results live under `target/criterion`.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use treepack::prelude::*;

fn bench_pair(c: &mut Criterion) {
    let shape = BaseShape::tree();
    let mut group = c.benchmark_group("overlap_pair");
    let a = transform(&shape, Placement::new(0.0, 0.0, 0.0));
    for (label, p) in [
        ("disjoint", Placement::new(5.0, 5.0, 0.0)),
        ("touching_boxes", Placement::new(0.5, 1.2, 180.0)),
        ("overlapping", Placement::new(0.1, 0.05, 30.0)),
    ] {
        let b = transform(&shape, p);
        group.bench_function(BenchmarkId::new("intersection_area", label), |bench| {
            bench.iter(|| intersection_area(&a, &b))
        });
    }
    group.finish();
}

fn bench_total(c: &mut Criterion) {
    let shape = Arc::new(BaseShape::tree());
    let mut group = c.benchmark_group("overlap_total");
    for &n in &[10usize, 50, 200] {
        for (label, spacing) in [("spread", 1.5), ("packed", 0.6)] {
            let config = Configuration::grid(Arc::clone(&shape), n, spacing).unwrap();
            group.bench_with_input(BenchmarkId::new(label, n), &config, |b, config| {
                b.iter(|| total_overlap(config))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_pair, bench_total);
criterion_main!(benches);
