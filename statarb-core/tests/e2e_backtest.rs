//! End-to-end scenarios over simulated data.

use statarb_core::backtest::{
    run_pairwise, run_rolling, BacktestError, InvalidConfig, PairwiseConfig, RollingConfig,
};
use statarb_core::domain::PriceMatrix;
use statarb_core::factors::{pair_regression, FactorConfig, FactorExtractor, OmitReason};
use statarb_core::rng::RngHierarchy;
use statarb_core::signal::{latest_zscore, zscore};
use statarb_core::simulate::{
    simulate_pair, simulate_sector_matrix, Coupling, PairSimConfig, SectorSimConfig,
};

fn sector(seed: u64, instruments: usize, steps: usize) -> PriceMatrix {
    let cfg = SectorSimConfig {
        instruments,
        steps,
        coupling: Coupling::Scalar(0.02),
        sigma: 1.0,
        offset: 100.0,
    };
    simulate_sector_matrix(&cfg, &mut RngHierarchy::new(seed).rng_for("sector", 0)).unwrap()
}

fn factors(k: usize) -> FactorConfig {
    FactorConfig {
        components: k,
        use_log_prices: false,
    }
}

fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let ma = a.iter().sum::<f64>() / n;
    let mb = b.iter().sum::<f64>() / n;
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    cov / (va * vb).sqrt()
}

// ── Simulator ────────────────────────────────────────────────────────

#[test]
fn uncoupled_pair_increments_are_uncorrelated_on_average() {
    let hierarchy = RngHierarchy::new(2024);
    let cfg = PairSimConfig {
        steps: 500,
        initial: [100.0, 100.0],
        sigma: [1.0, 1.0],
        coupling: [0.0, 0.0],
    };

    let seeds = 200;
    let mut total = 0.0;
    for seed in 0..seeds {
        let [x, y] = simulate_pair(&cfg, &mut hierarchy.rng_for("pair", seed));
        let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
        total += correlation(&dx, &dy);
    }
    let mean = total / seeds as f64;
    assert!(mean.abs() < 0.02, "mean increment correlation {mean}");
}

// ── Pairwise engine ──────────────────────────────────────────────────

#[test]
fn pairwise_first_trade_matches_hand_computed_path() {
    let m = sector(11, 6, 400);
    let bandwidth = 2.0;
    let result = run_pairwise(&m, &factors(2), &PairwiseConfig { bandwidth }).unwrap();

    let extraction = FactorExtractor::new(factors(2)).extract(&m).unwrap();
    let mut checked = 0;
    for residual in &extraction.residuals {
        let z = zscore(&residual.values).unwrap();
        let Some(entry) = z.iter().position(|v| v.abs() > bandwidth) else {
            continue;
        };
        let side = z[entry];
        let Some(offset) = z[entry + 1..].iter().position(|v| v * side < 0.0) else {
            continue;
        };
        let exit = entry + 1 + offset;

        let trade = result
            .trades
            .iter()
            .find(|t| t.instrument == residual.instrument)
            .expect("trade recorded for instrument");
        assert_eq!(trade.entry_step, entry);
        assert_eq!(trade.exit_step, exit);

        let prices = m.series(residual.instrument);
        let expected = (prices[entry] - prices[exit]) * side.signum();
        assert!((trade.pnl - expected).abs() < 1e-9);
        checked += 1;
    }
    assert!(checked > 0, "no instrument crossed the band");
}

#[test]
fn degenerate_instrument_does_not_disturb_the_rest() {
    let clean = sector(5, 6, 300);
    let mut dirty = clean.clone();
    dirty.push_instrument("FLAT", vec![42.0; clean.n_steps()]).unwrap();

    let cfg = PairwiseConfig::default();
    let a = run_pairwise(&clean, &factors(3), &cfg).unwrap();
    let b = run_pairwise(&dirty, &factors(3), &cfg).unwrap();

    assert_eq!(b.omitted.len(), 1);
    assert_eq!(b.omitted[0].instrument, 6);
    assert_eq!(b.omitted[0].reason, OmitReason::ZeroVariance);
    assert!(b.trades.iter().all(|t| t.instrument != 6));

    assert_eq!(a.pnl.as_slice(), b.pnl.as_slice());
    assert_eq!(a.trades, b.trades);

    let ex_clean = FactorExtractor::new(factors(3)).extract(&clean).unwrap();
    let ex_dirty = FactorExtractor::new(factors(3)).extract(&dirty).unwrap();
    assert!(ex_dirty.residual(6).is_none());
    for r in &ex_clean.residuals {
        assert_eq!(r.values, ex_dirty.residual(r.instrument).unwrap().values);
    }
}

#[test]
fn degenerate_instrument_leaves_rolling_choices_unchanged() {
    let mut dirty = sector(9, 6, 150);
    dirty.push_instrument("FLAT", vec![42.0; dirty.n_steps()]).unwrap();
    let clean = dirty.without(6).unwrap();

    let cfg = RollingConfig {
        lookback: 50,
        warmup: 20,
        factors: factors(2),
        max_pos: 2,
        initial_cash: 70_000.0,
    };
    let result = run_rolling(&dirty, &cfg).unwrap();
    assert_eq!(result.pnl.len(), dirty.n_steps() - cfg.warmup);
    assert!(result.skipped_windows.is_empty());

    // Same window signals, bit for bit, at every evaluated step.
    let extractor = FactorExtractor::new(factors(2));
    for step in cfg.warmup..dirty.n_steps() {
        let start = step.saturating_sub(cfg.lookback);
        let ex_dirty = extractor.extract(&dirty.window(start, step).unwrap()).unwrap();
        let ex_clean = extractor.extract(&clean.window(start, step).unwrap()).unwrap();
        assert!(ex_dirty.is_omitted(6));
        assert_eq!(ex_dirty.residuals.len(), ex_clean.residuals.len());
        for (d, c) in ex_dirty.residuals.iter().zip(&ex_clean.residuals) {
            assert_eq!(d.instrument, c.instrument);
            assert_eq!(
                latest_zscore(&d.values).unwrap(),
                latest_zscore(&c.values).unwrap(),
                "step {step} instrument {}",
                d.instrument
            );
        }
    }

    // Same long/short book after each rebalance. PnL differs because
    // sizing divides the cash by the instrument count.
    for last in (cfg.warmup..dirty.n_steps()).step_by(13) {
        let with_flat = run_rolling(&dirty.window(0, last + 1).unwrap(), &cfg).unwrap();
        let without = run_rolling(&clean.window(0, last + 1).unwrap(), &cfg).unwrap();
        assert_eq!(with_flat.final_positions, without.final_positions, "step {last}");
        assert_eq!(with_flat.final_positions.len(), 2 * cfg.max_pos);
    }
}

// ── Reorder symmetry vs pair regression ──────────────────────────────

#[test]
fn pca_residuals_symmetric_pair_slope_is_not() {
    let m = sector(17, 5, 250);
    let mut swapped = m.clone();
    swapped.swap_instruments(0, 1).unwrap();

    let extractor = FactorExtractor::new(factors(2));
    let ex = extractor.extract(&m).unwrap();
    let ex_swapped = extractor.extract(&swapped).unwrap();

    let before = &ex.residual(0).unwrap().values;
    let after = &ex_swapped.residual(1).unwrap().values;
    for (x, y) in before.iter().zip(after) {
        assert!((x - y).abs() < 1e-6);
    }

    let forward = pair_regression(m.series(0), m.series(1)).unwrap();
    let backward = pair_regression(m.series(1), m.series(0)).unwrap();
    assert!((forward.slope - 1.0 / backward.slope).abs() > 1e-6);
}

// ── Rolling configuration ────────────────────────────────────────────

#[test]
fn rolling_rejects_oversized_max_pos_before_any_step() {
    let m = sector(1, 5, 100);
    let cfg = RollingConfig {
        max_pos: 3,
        warmup: 10,
        lookback: 20,
        factors: factors(2),
        initial_cash: 1_000.0,
    };
    match run_rolling(&m, &cfg) {
        Err(BacktestError::Config(InvalidConfig::MaxPosTooLarge { max_pos, instruments })) => {
            assert_eq!(max_pos, 3);
            assert_eq!(instruments, 5);
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn rolling_warmup_past_end_yields_empty_run() {
    let m = sector(2, 4, 30);
    let cfg = RollingConfig {
        warmup: 100,
        factors: factors(2),
        ..Default::default()
    };
    let result = run_rolling(&m, &cfg).unwrap();
    assert!(result.pnl.is_empty());
    assert!(result.final_positions.is_empty());
}

#[test]
fn rolling_short_early_windows_are_skipped_not_fatal() {
    let m = sector(3, 6, 80);
    let cfg = RollingConfig {
        lookback: 30,
        warmup: 2,
        factors: factors(3),
        max_pos: 1,
        initial_cash: 60_000.0,
    };
    let result = run_rolling(&m, &cfg).unwrap();
    // Windows of 2, 3 and 4 steps cannot carry 3 components (need 5).
    let skipped: Vec<usize> = result.skipped_windows.iter().map(|s| s.step).collect();
    assert_eq!(skipped, vec![2, 3, 4]);
    assert_eq!(result.pnl.len(), m.n_steps() - 2);
    assert!(result.pnl.as_slice()[..4].iter().all(|&p| p == 0.0));
}
