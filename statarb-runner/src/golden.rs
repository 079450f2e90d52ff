//! Golden PnL comparison.
//!
//! A live run is compared step by step against a stored reference series.
//! Lengths must agree and every step must lie within an absolute tolerance;
//! two NaNs at the same step count as a match.

use serde::{Deserialize, Serialize};

/// Default absolute tolerance per step.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    pub step: usize,
    pub live: f64,
    pub golden: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlComparison {
    pub live_len: usize,
    pub golden_len: usize,
    pub tolerance: f64,
    /// Steps present in both series.
    pub compared: usize,
    pub mismatches: usize,
    pub first_mismatch: Option<Mismatch>,
    pub max_abs_diff: f64,
    pub live_total: f64,
    pub golden_total: f64,
}

impl PnlComparison {
    pub fn is_match(&self) -> bool {
        self.live_len == self.golden_len && self.mismatches == 0
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if self.is_match() {
            return format!(
                "match: {} steps within {:e} (max diff {:e})",
                self.compared, self.tolerance, self.max_abs_diff
            );
        }
        let mut parts = Vec::new();
        if self.live_len != self.golden_len {
            parts.push(format!("length {} vs golden {}", self.live_len, self.golden_len));
        }
        if let Some(m) = self.first_mismatch {
            parts.push(format!(
                "{} mismatched steps, first at {} (live {} vs golden {})",
                self.mismatches, m.step, m.live, m.golden
            ));
        }
        format!("MISMATCH: {}", parts.join("; "))
    }
}

fn same(live: f64, golden: f64, tolerance: f64) -> bool {
    if live.is_nan() || golden.is_nan() {
        return live.is_nan() && golden.is_nan();
    }
    live == golden || (live - golden).abs() <= tolerance
}

pub fn compare_pnl(live: &[f64], golden: &[f64], tolerance: f64) -> PnlComparison {
    let mut mismatches = 0;
    let mut first_mismatch = None;
    let mut max_abs_diff = 0.0_f64;

    for (step, (&l, &g)) in live.iter().zip(golden).enumerate() {
        let diff = (l - g).abs();
        if diff.is_finite() {
            max_abs_diff = max_abs_diff.max(diff);
        }
        if !same(l, g, tolerance) {
            mismatches += 1;
            first_mismatch.get_or_insert(Mismatch { step, live: l, golden: g });
        }
    }

    PnlComparison {
        live_len: live.len(),
        golden_len: golden.len(),
        tolerance,
        compared: live.len().min(golden.len()),
        mismatches,
        first_mismatch,
        max_abs_diff,
        live_total: live.iter().sum(),
        golden_total: golden.iter().sum(),
    }
}
