//! Criterion benchmarks for the hot paths.
//!
//! Benchmarks:
//! 1. Sector simulation
//! 2. Factor extraction over one window (the per-step cost of the rolling engine)
//! 3. Full pairwise backtest
//! 4. Rolling backtest over a short horizon

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use statarb_core::backtest::{run_pairwise, run_rolling, PairwiseConfig, RollingConfig};
use statarb_core::domain::PriceMatrix;
use statarb_core::factors::{FactorConfig, FactorExtractor};
use statarb_core::rng::RngHierarchy;
use statarb_core::simulate::{simulate_sector_matrix, Coupling, SectorSimConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn sector_config(instruments: usize, steps: usize) -> SectorSimConfig {
    SectorSimConfig {
        instruments,
        steps,
        coupling: Coupling::Scalar(0.02),
        sigma: 1.0,
        offset: 100.0,
    }
}

fn sector(instruments: usize, steps: usize) -> PriceMatrix {
    simulate_sector_matrix(
        &sector_config(instruments, steps),
        &mut RngHierarchy::new(42).rng_for("bench", 0),
    )
    .unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_simulate(c: &mut Criterion) {
    let cfg = sector_config(20, 1000);
    let hierarchy = RngHierarchy::new(42);
    c.bench_function("simulate_sector_20x1000", |b| {
        b.iter(|| {
            simulate_sector_matrix(black_box(&cfg), &mut hierarchy.rng_for("bench", 0)).unwrap()
        })
    });
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_window_400");
    let extractor = FactorExtractor::new(FactorConfig::default());
    for n in [10usize, 30, 60] {
        let m = sector(n, 399);
        group.bench_with_input(BenchmarkId::from_parameter(n), &m, |b, m| {
            b.iter(|| extractor.extract(black_box(m)).unwrap())
        });
    }
    group.finish();
}

fn bench_pairwise(c: &mut Criterion) {
    let m = sector(10, 1000);
    let factors = FactorConfig::default();
    let cfg = PairwiseConfig::default();
    c.bench_function("pairwise_10x1000", |b| {
        b.iter(|| run_pairwise(black_box(&m), &factors, &cfg).unwrap())
    });
}

fn bench_rolling(c: &mut Criterion) {
    let m = sector(10, 249);
    let cfg = RollingConfig {
        lookback: 100,
        warmup: 150,
        max_pos: 2,
        ..Default::default()
    };
    c.bench_function("rolling_10x250_100_steps", |b| {
        b.iter(|| run_rolling(black_box(&m), &cfg).unwrap())
    });
}

criterion_group!(benches, bench_simulate, bench_extract, bench_pairwise, bench_rolling);
criterion_main!(benches);
