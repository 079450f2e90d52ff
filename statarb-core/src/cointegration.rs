//! Cointegration test seam.
//!
//! The test statistic itself (Engle-Granger, Johansen, ...) is supplied by the
//! caller through [`CointegrationTest`]. This module only defines the report
//! shape and a screening helper over every instrument pair.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceMatrix;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CointegrationError {
    #[error("series lengths differ: {y} vs {x}")]
    LengthMismatch { y: usize, x: usize },

    #[error("need at least {required} observations, got {actual}")]
    TooShort { required: usize, actual: usize },

    #[error("test failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationReport {
    pub statistic: f64,
    pub p_value: f64,
    pub critical_values: CriticalValues,
}

impl CointegrationReport {
    /// Null of no cointegration rejected at level `alpha`.
    pub fn is_cointegrated(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// A two-series cointegration test, `y` regressed on `x`.
pub trait CointegrationTest: Send + Sync {
    fn test(&self, y: &[f64], x: &[f64]) -> Result<CointegrationReport, CointegrationError>;
}

/// Outcome for one ordered pair `(y, x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairScreen {
    pub y: usize,
    pub x: usize,
    pub report: Result<CointegrationReport, CointegrationError>,
}

/// Test every pair `(i, j)` with `i < j`, `i` as the dependent series.
///
/// Successful reports come first sorted by ascending p-value (ties by pair
/// index); failures follow in pair order.
pub fn screen_pairs<T: CointegrationTest + ?Sized>(
    test: &T,
    prices: &PriceMatrix,
) -> Vec<PairScreen> {
    let n = prices.n_instruments();
    let mut screens = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for y in 0..n {
        for x in (y + 1)..n {
            screens.push(PairScreen {
                y,
                x,
                report: test.test(prices.series(y), prices.series(x)),
            });
        }
    }

    screens.sort_by(|a, b| match (&a.report, &b.report) {
        (Ok(ra), Ok(rb)) => ra
            .p_value
            .total_cmp(&rb.p_value)
            .then((a.y, a.x).cmp(&(b.y, b.x))),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => (a.y, a.x).cmp(&(b.y, b.x)),
    });
    screens
}
