//! Criterion benches for annealing steps at a few group sizes.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use treepack::prelude::*;

fn bench_anneal(c: &mut Criterion) {
    let shape = Arc::new(BaseShape::tree());
    let mut group = c.benchmark_group("anneal");
    group.sample_size(20);
    for &n in &[5usize, 25, 100] {
        let cfg = AnnealCfg {
            iterations: 200,
            seed: 42,
            ..AnnealCfg::default()
        };
        group.bench_with_input(BenchmarkId::new("200_steps", n), &n, |b, &n| {
            b.iter_batched(
                || Configuration::grid(Arc::clone(&shape), n, 0.9).unwrap(),
                |config| {
                    let _report = anneal(config, cfg).unwrap();
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_anneal);
criterion_main!(benches);
