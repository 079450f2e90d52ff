//! Rolling walk-forward backtest.
//!
//! At every evaluated step `i` (from `warmup` to the last step):
//! 1. Extract factors and residuals from the window `[max(0, i - lookback), i)`.
//!    The window never includes step `i` itself.
//! 2. Standardise each residual and keep the z-score of its last value.
//! 3. Settle every open position at `price[i]` and clear the portfolio.
//! 4. Go long the `max_pos` lowest z-scores and short the `max_pos` highest,
//!    entering at `price[i]`.
//!
//! Positions are recorded as a signed entry price: positive is long,
//! negative is short. Sizing is `round((initial_cash / n_instruments) / entry)`
//! with ties to even, so a short entry gets a negative size and the settlement
//! `(price - |entry|) * size` works for both sides.
//!
//! A position whose exit price is missing (non-finite) is dropped without
//! pnl and reported in `failed_settlements`. Positions still open after the
//! last step are reported, not settled.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{BacktestError, InvalidConfig};
use crate::domain::{PnlSeries, PriceMatrix};
use crate::factors::{FactorConfig, FactorError, FactorExtractor};
use crate::signal::latest_zscore;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingConfig {
    /// Maximum number of past steps in each extraction window.
    pub lookback: usize,
    /// First evaluated step.
    pub warmup: usize,
    pub factors: FactorConfig,
    /// Instruments per side (long and short) at each rebalance.
    pub max_pos: usize,
    pub initial_cash: f64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            lookback: 400,
            warmup: 50,
            factors: FactorConfig::default(),
            max_pos: 1,
            initial_cash: 1_000_000.0,
        }
    }
}

impl RollingConfig {
    /// Check the configuration against the instrument universe.
    pub fn validate(&self, n_instruments: usize) -> Result<(), InvalidConfig> {
        if self.max_pos == 0 {
            return Err(InvalidConfig::ZeroMaxPos);
        }
        if 2 * self.max_pos > n_instruments {
            return Err(InvalidConfig::MaxPosTooLarge {
                max_pos: self.max_pos,
                instruments: n_instruments,
            });
        }
        if self.warmup == 0 {
            return Err(InvalidConfig::ZeroWarmup);
        }
        if self.lookback == 0 {
            return Err(InvalidConfig::ZeroLookback);
        }
        if self.factors.components >= n_instruments {
            return Err(InvalidConfig::TooManyComponents {
                components: self.factors.components,
                instruments: n_instruments,
            });
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(InvalidConfig::InitialCash(self.initial_cash));
        }
        Ok(())
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// A step whose window produced no usable factors.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedWindow {
    pub step: usize,
    pub error: FactorError,
}

/// A position dropped because its exit price was not a finite number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedSettlement {
    pub step: usize,
    pub instrument: usize,
    /// Signed entry price of the dropped position.
    pub entry: f64,
}

#[derive(Debug, Clone)]
pub struct RollingResult {
    /// One entry per evaluated step.
    pub pnl: PnlSeries,
    /// Running sum of `pnl`.
    pub cumulative: Vec<f64>,
    /// Step index of each `pnl` entry.
    pub steps: Vec<usize>,
    /// Steps at which no new positions were opened because extraction failed.
    pub skipped_windows: Vec<SkippedWindow>,
    pub failed_settlements: Vec<FailedSettlement>,
    /// Open positions after the last step, instrument -> signed entry price.
    pub final_positions: BTreeMap<usize, f64>,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Share count for a signed entry price.
pub fn position_size(initial_cash: f64, n_instruments: usize, signed_entry: f64) -> f64 {
    ((initial_cash / n_instruments as f64) / signed_entry).round_ties_even()
}

/// Realized pnl of closing a signed-entry position at `price`.
pub fn settle(initial_cash: f64, n_instruments: usize, signed_entry: f64, price: f64) -> f64 {
    let size = position_size(initial_cash, n_instruments, signed_entry);
    (price - signed_entry.abs()) * size
}

/// Rank `(instrument, z)` signals ascending by z, ties by instrument index.
fn rank(signals: &mut [(usize, f64)]) {
    signals.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
}

/// Latest z-score per instrument for the window ending before `step`.
fn window_signals(
    extractor: &FactorExtractor,
    prices: &PriceMatrix,
    step: usize,
    lookback: usize,
) -> Result<Vec<(usize, f64)>, BacktestError> {
    let window = prices.window(step.saturating_sub(lookback), step)?;
    let extraction = extractor.extract(&window)?;
    Ok(extraction
        .residuals
        .iter()
        .filter_map(|r| match latest_zscore(&r.values) {
            Ok(z) => Some((r.instrument, z)),
            Err(e) => {
                debug!(step, instrument = r.instrument, error = %e, "no z-score");
                None
            }
        })
        .collect())
}

pub fn run_rolling(
    prices: &PriceMatrix,
    config: &RollingConfig,
) -> Result<RollingResult, BacktestError> {
    let n = prices.n_instruments();
    config.validate(n)?;

    let extractor = FactorExtractor::new(config.factors);
    let steps = prices.n_steps();

    info!(
        instruments = n,
        steps,
        lookback = config.lookback,
        warmup = config.warmup,
        max_pos = config.max_pos,
        "starting rolling backtest"
    );

    let mut pnl = PnlSeries::with_capacity(steps.saturating_sub(config.warmup));
    let mut evaluated = Vec::with_capacity(steps.saturating_sub(config.warmup));
    let mut skipped_windows = Vec::new();
    let mut failed_settlements = Vec::new();
    let mut portfolio: BTreeMap<usize, f64> = BTreeMap::new();

    for i in config.warmup..steps {
        let mut signals = match window_signals(&extractor, prices, i, config.lookback) {
            Ok(signals) => signals,
            Err(BacktestError::Extraction(error)) => {
                warn!(step = i, %error, "skipping window");
                skipped_windows.push(SkippedWindow { step: i, error });
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let mut step_pnl = 0.0;
        for (&instrument, &entry) in &portfolio {
            let exit = prices.price(instrument, i);
            if exit.is_finite() {
                step_pnl += settle(config.initial_cash, n, entry, exit);
            } else {
                warn!(step = i, instrument, exit, "no exit price, dropping position");
                failed_settlements.push(FailedSettlement {
                    step: i,
                    instrument,
                    entry,
                });
            }
        }
        portfolio.clear();

        rank(&mut signals);
        let longs: Vec<usize> = signals.iter().take(config.max_pos).map(|s| s.0).collect();
        for &instrument in &longs {
            enter(&mut portfolio, instrument, prices.price(instrument, i), true, i);
        }
        // Fewer than 2 * max_pos signals: the cheap end wins any overlap.
        for &(instrument, _) in signals.iter().rev().take(config.max_pos) {
            if !longs.contains(&instrument) {
                enter(&mut portfolio, instrument, prices.price(instrument, i), false, i);
            }
        }

        debug!(step = i, pnl = step_pnl, positions = portfolio.len(), "rebalanced");
        pnl.push(step_pnl);
        evaluated.push(i);
    }

    info!(
        evaluated = evaluated.len(),
        skipped = skipped_windows.len(),
        failed_settlements = failed_settlements.len(),
        total_pnl = pnl.total(),
        "rolling backtest finished"
    );

    Ok(RollingResult {
        cumulative: pnl.cumulative(),
        pnl,
        steps: evaluated,
        skipped_windows,
        failed_settlements,
        final_positions: portfolio,
    })
}

/// Record a position at `price`. The sign of the stored entry carries the
/// side, so only strictly positive prices can be held.
fn enter(
    portfolio: &mut BTreeMap<usize, f64>,
    instrument: usize,
    price: f64,
    long: bool,
    step: usize,
) {
    if price.is_finite() && price > 0.0 {
        portfolio.insert(instrument, if long { price } else { -price });
    } else {
        debug!(step, instrument, price, "unsizeable entry price");
    }
}
