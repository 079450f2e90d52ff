//! Single pairwise regression `y = alpha + beta * x`.
//!
//! Kept as a contrast to the PCA residuals: swapping `y` and `x` changes the
//! slope (it becomes `cov / var(y)` instead of `cov / var(x)`).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::linalg::{LeastSquares, LinalgError, NalgebraOls};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRegression {
    pub intercept: f64,
    pub slope: f64,
    pub residuals: Vec<f64>,
}

/// Regress `y` on `x` with an intercept.
pub fn pair_regression(y: &[f64], x: &[f64]) -> Result<PairRegression, LinalgError> {
    if y.len() != x.len() {
        return Err(LinalgError::DimensionMismatch {
            response: y.len(),
            design: x.len(),
        });
    }
    let design = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let fit = NalgebraOls.fit(&DVector::from_row_slice(y), &design)?;
    Ok(PairRegression {
        intercept: fit.coefficients[0],
        slope: fit.coefficients[1],
        residuals: fit.residuals.iter().copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_hedge_ratio() {
        let x: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let y: Vec<f64> = x.iter().map(|v| 10.0 + 2.0 * v).collect();
        let reg = pair_regression(&y, &x).unwrap();
        assert!((reg.slope - 2.0).abs() < 1e-9);
        assert!((reg.intercept - 10.0).abs() < 1e-6);
    }

    #[test]
    fn swapping_roles_changes_slope() {
        let x: Vec<f64> = (0..60).map(|i| (i as f64 * 0.2).sin() * 3.0).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 0.5 * v + (i as f64 * 1.7).cos())
            .collect();
        let forward = pair_regression(&y, &x).unwrap();
        let backward = pair_regression(&x, &y).unwrap();
        // Unless |corr| = 1, beta_yx * beta_xy = corr^2 < 1.
        assert!((forward.slope * backward.slope - 1.0).abs() > 1e-3);
        assert!((forward.slope - 1.0 / backward.slope).abs() > 1e-3);
    }

    #[test]
    fn length_mismatch_rejected() {
        assert!(pair_regression(&[1.0, 2.0], &[1.0]).is_err());
    }
}
