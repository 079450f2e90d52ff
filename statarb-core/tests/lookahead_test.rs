//! Look-ahead contamination tests for the backtest engines.
//!
//! Invariant: the rolling engine's PnL at step t depends only on prices at
//! steps <= t. Method: run on a truncated matrix (steps 0..cut) and on the
//! full matrix, and assert the overlapping PnL entries are bit-identical.
//!
//! The pairwise engine is the opposite by construction: its z-scores are
//! standardised over the whole history, so changing the future changes the
//! past. That is checked here too so the leak stays visible.

use statarb_core::backtest::{run_rolling, RollingConfig};
use statarb_core::domain::PriceMatrix;
use statarb_core::factors::{FactorConfig, FactorExtractor};
use statarb_core::rng::RngHierarchy;
use statarb_core::signal::zscore;
use statarb_core::simulate::{simulate_sector_matrix, Coupling, SectorSimConfig};

fn sector(seed: u64, steps: usize) -> PriceMatrix {
    let cfg = SectorSimConfig {
        instruments: 8,
        steps,
        coupling: Coupling::Scalar(0.02),
        sigma: 1.0,
        offset: 100.0,
    };
    simulate_sector_matrix(&cfg, &mut RngHierarchy::new(seed).rng_for("sector", 0)).unwrap()
}

fn rolling_config() -> RollingConfig {
    RollingConfig {
        lookback: 60,
        warmup: 30,
        factors: FactorConfig {
            components: 2,
            use_log_prices: false,
        },
        max_pos: 2,
        initial_cash: 100_000.0,
    }
}

#[test]
fn rolling_pnl_prefix_unchanged_by_future() {
    let full = sector(42, 199);
    let cut = 120;
    let truncated = full.window(0, cut).unwrap();

    let cfg = rolling_config();
    let full_run = run_rolling(&full, &cfg).unwrap();
    let truncated_run = run_rolling(&truncated, &cfg).unwrap();

    let n = truncated_run.pnl.len();
    assert_eq!(n, cut - cfg.warmup);
    assert_eq!(truncated_run.pnl.as_slice(), &full_run.pnl.as_slice()[..n]);
    assert_eq!(truncated_run.steps, full_run.steps[..n].to_vec());
}

#[test]
fn rolling_pnl_prefix_unchanged_when_future_prices_move() {
    let original = sector(7, 159);
    let shock_from = 110;

    let shocked_series: Vec<Vec<f64>> = (0..original.n_instruments())
        .map(|i| {
            original
                .series(i)
                .iter()
                .enumerate()
                .map(|(t, &p)| if t >= shock_from { p * 1.5 } else { p })
                .collect()
        })
        .collect();
    let shocked = PriceMatrix::new(original.instruments().to_vec(), shocked_series).unwrap();

    let cfg = rolling_config();
    let a = run_rolling(&original, &cfg).unwrap();
    let b = run_rolling(&shocked, &cfg).unwrap();

    // pnl index k corresponds to step warmup + k
    let unaffected = shock_from - cfg.warmup;
    assert_eq!(a.pnl.as_slice()[..unaffected], b.pnl.as_slice()[..unaffected]);
    assert_ne!(a.pnl.as_slice()[unaffected..], b.pnl.as_slice()[unaffected..]);
}

#[test]
fn full_history_zscores_do_see_the_future() {
    let full = sector(3, 199);
    let truncated = full.window(0, 100).unwrap();
    let extractor = FactorExtractor::new(FactorConfig {
        components: 2,
        use_log_prices: false,
    });

    let z_full = zscore(&extractor.extract(&full).unwrap().residuals[0].values).unwrap();
    let z_cut = zscore(&extractor.extract(&truncated).unwrap().residuals[0].values).unwrap();

    let max_diff = z_cut
        .iter()
        .zip(&z_full)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f64, f64::max);
    assert!(max_diff > 1e-6, "pairwise z-scores unexpectedly causal");
}
