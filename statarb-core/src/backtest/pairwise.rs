//! Pairwise / full-history backtest.
//!
//! Per-instrument state machine over {FLAT, LONG, SHORT}:
//! - FLAT -> position when `|z| > bandwidth`. The side slot stores the
//!   triggering z-score itself; only its sign is ever read afterwards, the
//!   magnitude is discarded. Positive side = rich residual = short.
//! - position -> FLAT when `z * side < 0` (z crossed zero against the side).
//!   Realized pnl is `(entry - price) * sign(side)`.
//!
//! Entry is only checked while flat, so an instrument never enters and exits
//! on the same step. Every step appends exactly one PnL entry.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{BacktestError, InvalidConfig};
use crate::domain::{ClosedTrade, Holding, PnlSeries, PriceMatrix};
use crate::factors::{FactorConfig, FactorExtractor, Omitted};
use crate::signal::{zscores, SignalError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseConfig {
    /// Absolute z-score entry threshold.
    pub bandwidth: f64,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self { bandwidth: 2.0 }
    }
}

impl PairwiseConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if !self.bandwidth.is_finite() || self.bandwidth <= 0.0 {
            return Err(InvalidConfig::Bandwidth(self.bandwidth));
        }
        Ok(())
    }
}

/// A position still open when the run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub instrument: usize,
    pub entry_step: usize,
    pub entry_price: f64,
    /// Raw z-score stored at entry; only the sign matters.
    pub side: f64,
}

/// What happened during one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub step: usize,
    pub pnl: f64,
    pub opened: Vec<usize>,
    pub closed: Vec<ClosedTrade>,
}

/// Mutable state of one pairwise run.
#[derive(Debug, Clone)]
pub struct PairwiseState {
    side: Vec<f64>,
    entry_price: Vec<f64>,
    entry_step: Vec<usize>,
    step: usize,
    pnl: PnlSeries,
    trades: Vec<ClosedTrade>,
}

impl PairwiseState {
    pub fn new(n_instruments: usize) -> Self {
        Self {
            side: vec![0.0; n_instruments],
            entry_price: vec![0.0; n_instruments],
            entry_step: vec![0; n_instruments],
            step: 0,
            pnl: PnlSeries::new(),
            trades: Vec::new(),
        }
    }

    /// Index of the next step to be processed.
    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn holding(&self, instrument: usize) -> Holding {
        Holding::from_side(self.side[instrument])
    }

    /// Stored side slot (the raw entry z-score, 0.0 when flat).
    pub fn side(&self, instrument: usize) -> f64 {
        self.side[instrument]
    }

    pub fn pnl(&self) -> &PnlSeries {
        &self.pnl
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn open_positions(&self) -> Vec<OpenPosition> {
        self.side
            .iter()
            .enumerate()
            .filter(|(_, &s)| s != 0.0)
            .map(|(instrument, &side)| OpenPosition {
                instrument,
                entry_step: self.entry_step[instrument],
                entry_price: self.entry_price[instrument],
                side,
            })
            .collect()
    }

    /// Process one time step.
    ///
    /// `zscores[i]` is `None` when instrument `i` has no signal; it is then
    /// left untouched. `prices[i]` is the instrument's price at this step.
    pub fn step(&mut self, zscores: &[Option<f64>], prices: &[f64], bandwidth: f64) -> StepOutcome {
        let step = self.step;
        let mut outcome = StepOutcome {
            step,
            ..Default::default()
        };

        for (instrument, (z, &price)) in zscores.iter().zip(prices).enumerate() {
            let Some(z) = *z else { continue };
            let side = self.side[instrument];

            if side == 0.0 {
                if z.abs() > bandwidth {
                    // Store the raw z-score; later logic reads only its sign.
                    self.side[instrument] = z;
                    self.entry_price[instrument] = price;
                    self.entry_step[instrument] = step;
                    outcome.opened.push(instrument);
                }
            } else if z * side < 0.0 {
                let sign = side.signum();
                let entry_price = self.entry_price[instrument];
                let pnl = (entry_price - price) * sign;
                outcome.pnl += pnl;
                let trade = ClosedTrade {
                    instrument,
                    entry_step: self.entry_step[instrument],
                    exit_step: step,
                    entry_price,
                    exit_price: price,
                    side: sign,
                    pnl,
                };
                debug!(instrument, step, pnl, "closed position");
                self.trades.push(trade.clone());
                outcome.closed.push(trade);
                self.side[instrument] = 0.0;
            }
        }

        self.pnl.push(outcome.pnl);
        self.step += 1;
        outcome
    }
}

/// Result of a full pairwise run.
#[derive(Debug, Clone)]
pub struct PairwiseResult {
    /// One entry per time step of the input.
    pub pnl: PnlSeries,
    pub trades: Vec<ClosedTrade>,
    pub open_positions: Vec<OpenPosition>,
    /// Instruments without residuals.
    pub omitted: Vec<Omitted>,
    /// Instruments whose residual could not be standardised.
    pub unsignalled: Vec<(usize, SignalError)>,
}

/// Extract residuals over the full history once, z-score them, and run the
/// state machine over every step.
pub fn run_pairwise(
    prices: &PriceMatrix,
    factors: &FactorConfig,
    config: &PairwiseConfig,
) -> Result<PairwiseResult, BacktestError> {
    config.validate()?;

    let extraction = FactorExtractor::new(*factors).extract(prices)?;

    let n = prices.n_instruments();
    let mut z_by_instrument: Vec<Option<Vec<f64>>> = vec![None; n];
    let mut unsignalled = Vec::new();
    for signal in zscores(&extraction) {
        match signal.zscores {
            Ok(z) => z_by_instrument[signal.instrument] = Some(z),
            Err(e) => unsignalled.push((signal.instrument, e)),
        }
    }

    info!(
        instruments = n,
        steps = prices.n_steps(),
        omitted = extraction.omitted.len(),
        unsignalled = unsignalled.len(),
        bandwidth = config.bandwidth,
        "starting pairwise backtest"
    );

    let mut state = PairwiseState::new(n);
    for t in 0..prices.n_steps() {
        let row: Vec<Option<f64>> = z_by_instrument
            .iter()
            .map(|z| z.as_ref().map(|z| z[t]))
            .collect();
        state.step(&row, &prices.prices_at(t), config.bandwidth);
    }

    info!(
        trades = state.trades.len(),
        total_pnl = state.pnl.total(),
        "pairwise backtest finished"
    );

    Ok(PairwiseResult {
        open_positions: state.open_positions(),
        pnl: state.pnl,
        trades: state.trades,
        omitted: extraction.omitted,
        unsignalled,
    })
}
