//! Performance metrics — pure functions over a per-step PnL series.
//!
//! Every metric is a pure function: PnL (or cumulative PnL) in, scalar out.
//! Equity is `initial_cash + cumulative pnl`.

use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_pnl: f64,
    pub mean_step_pnl: f64,
    pub sharpe: f64,
    /// Largest peak-to-trough fall of cumulative PnL (<= 0).
    pub max_drawdown: f64,
    /// Same fall as a fraction of peak equity (<= 0).
    pub max_drawdown_pct: f64,
    pub hit_rate: f64,
    /// Steps with non-zero PnL.
    pub active_steps: usize,
    pub steps: usize,
    pub final_equity: f64,
}

impl PerformanceMetrics {
    pub fn compute(pnl: &[f64], initial_cash: f64) -> Self {
        let cumulative = cumulative(pnl);
        let total = cumulative.last().copied().unwrap_or(0.0);
        Self {
            total_pnl: total,
            mean_step_pnl: mean_f64(pnl),
            sharpe: sharpe_ratio(pnl),
            max_drawdown: max_drawdown(&cumulative),
            max_drawdown_pct: max_drawdown_pct(&cumulative, initial_cash),
            hit_rate: hit_rate(pnl),
            active_steps: pnl.iter().filter(|&&p| p != 0.0).count(),
            steps: pnl.len(),
            final_equity: initial_cash + total,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn cumulative(pnl: &[f64]) -> Vec<f64> {
    pnl.iter()
        .scan(0.0, |acc, p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// Annualized Sharpe ratio of step PnL.
///
/// Sharpe = mean(pnl) / std(pnl) * sqrt(252). Returns 0.0 if variance is
/// zero or there are fewer than 2 steps.
pub fn sharpe_ratio(pnl: &[f64]) -> f64 {
    if pnl.len() < 2 {
        return 0.0;
    }
    let std = std_dev(pnl);
    if std < 1e-15 {
        return 0.0;
    }
    (mean_f64(pnl) / std) * (252.0_f64).sqrt()
}

/// Maximum drawdown of cumulative PnL in absolute terms (negative or zero).
///
/// The curve starts from an implicit zero before the first step.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for &c in cumulative {
        peak = peak.max(c);
        max_dd = max_dd.min(c - peak);
    }
    max_dd
}

/// Maximum drawdown of equity as a negative fraction of the running peak.
pub fn max_drawdown_pct(cumulative: &[f64], initial_cash: f64) -> f64 {
    let mut peak = initial_cash;
    let mut max_dd = 0.0_f64;
    for &c in cumulative {
        let equity = initial_cash + c;
        peak = peak.max(equity);
        if peak > 0.0 {
            max_dd = max_dd.min((equity - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of non-zero steps with positive PnL.
pub fn hit_rate(pnl: &[f64]) -> f64 {
    let active: Vec<f64> = pnl.iter().copied().filter(|&p| p != 0.0).collect();
    if active.is_empty() {
        return 0.0;
    }
    active.iter().filter(|&&p| p > 0.0).count() as f64 / active.len() as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let variance = sum_sq / (values.len() - 1) as f64;
    variance.sqrt()
}
