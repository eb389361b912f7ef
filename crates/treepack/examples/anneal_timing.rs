//! Anneal timing for one group size.
//!
//! Purpose
//! - Quick, reproducible data point for "how long does one restart take at
//!   N trees, and how far does it get from the grid seed?"
//!
//! Usage:
//!   cargo run --release -p treepack --example anneal_timing -- 25 20000
//!
//! Prints initial and best energy, side, score, and wall time.

use std::sync::Arc;
use std::time::Instant;

use treepack::prelude::*;

fn main() {
    let mut args = std::env::args().skip(1);
    let n: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(10);
    let iterations: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(10_000);

    let shape = Arc::new(BaseShape::tree());
    let start = Configuration::grid(shape, n, 1.5).expect("grid seed");
    let start_score = score(&start);
    let cfg = AnnealCfg {
        iterations,
        seed: 2025,
        ..AnnealCfg::default()
    };

    let t0 = Instant::now();
    let report = anneal(start, cfg).expect("valid schedule");
    let elapsed = t0.elapsed().as_secs_f64() * 1e3;

    println!("n={n} iterations={iterations}");
    println!(
        "initial energy={:.6} best energy={:.6}",
        report.initial_energy.total, report.best_energy.total
    );
    println!(
        "side={:.6} overlap={:.3e} score={:.6} (grid {:.6})",
        report.best_energy.side,
        report.best_energy.overlap,
        score(&report.best),
        start_score
    );
    match &report.best_valid {
        Some(c) => println!("best overlap-free score={:.6}", score(c)),
        None => println!("no overlap-free state reached"),
    }
    println!(
        "accepted={} improvements={} elapsed={elapsed:.1} ms",
        report.accepted, report.improvements
    );
}
