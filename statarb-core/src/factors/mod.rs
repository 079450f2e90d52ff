//! PCA factor extraction and per-instrument residuals.
//!
//! Pipeline for one price window:
//! 1. Screen out degenerate instruments (non-finite, non-positive under log,
//!    constant). They are reported in `Extraction::omitted` and never enter
//!    the PCA, so the rest of the computation is identical to a run without
//!    them.
//! 2. Transform: `ln(price)` in log mode, otherwise subtract each
//!    instrument's mean.
//! 3. Covariance -> eigendecomposition -> top `k` components by descending
//!    eigenvalue.
//! 4. Project the centred data onto the components and prepend a column of
//!    ones: the factor matrix.
//! 5. Regress every instrument on the factor matrix; the OLS residual is the
//!    instrument's mispricing series. A residual that is only rounding noise
//!    relative to its own series is omitted, whatever the price scale.
//!
//! Residuals are orthogonal to every factor column, and because the factors
//! come from a jointly estimated subspace, reordering instruments only
//! reorders the residuals. Compare [`pair_regression`], whose slope depends on
//! which series is the regressor.

mod pair;

pub use pair::{pair_regression, PairRegression};

use std::fmt;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::PriceMatrix;
use crate::linalg::{
    centre_columns, covariance, EigenSolver, LeastSquares, LinalgError, NalgebraEigen, NalgebraOls,
};

/// Residual std at or below this fraction of the transformed series' std is
/// treated as fully explained by the factors.
pub const DEGENERATE_RESIDUAL_RATIO: f64 = 1e-9;

/// Extraction settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorConfig {
    /// Number of principal components kept as factors.
    pub components: usize,
    /// Fit on `ln(price)` instead of mean-removed prices.
    pub use_log_prices: bool,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            components: 3,
            use_log_prices: false,
        }
    }
}

/// Window-level failures: nothing usable comes out of this window.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FactorError {
    #[error("at least one component is required")]
    NoComponents,

    #[error("{steps} time steps cannot support {components} components (need {required})")]
    TooFewSteps {
        steps: usize,
        components: usize,
        required: usize,
    },

    #[error("{usable} usable instruments cannot support {components} components")]
    TooFewInstruments { usable: usize, components: usize },

    #[error("eigendecomposition failed: {0}")]
    Eigen(#[source] LinalgError),
}

/// Why an instrument has no residual in this window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OmitReason {
    NonFinite,
    NonPositive,
    ZeroVariance,
    /// Residual indistinguishable from rounding noise.
    DegenerateResidual,
    RegressionFailed(String),
}

impl fmt::Display for OmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmitReason::NonFinite => write!(f, "non-finite price"),
            OmitReason::NonPositive => write!(f, "non-positive price under log transform"),
            OmitReason::ZeroVariance => write!(f, "constant series"),
            OmitReason::DegenerateResidual => write!(f, "residual fully explained by factors"),
            OmitReason::RegressionFailed(e) => write!(f, "regression failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Omitted {
    pub instrument: usize,
    pub reason: OmitReason,
}

/// Residual series of one instrument, aligned with the window's time steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residual {
    pub instrument: usize,
    pub values: Vec<f64>,
}

/// `T x (k + 1)` design matrix: intercept column first, then the factors.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    data: DMatrix<f64>,
}

impl FactorMatrix {
    pub fn n_steps(&self) -> usize {
        self.data.nrows()
    }

    /// Number of factors, not counting the intercept.
    pub fn n_factors(&self) -> usize {
        self.data.ncols() - 1
    }

    /// Column `j` (0 is the intercept).
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.data.column(j).iter().copied().collect()
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

/// Everything one extraction produces.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub factors: FactorMatrix,
    /// Successful residuals in instrument order.
    pub residuals: Vec<Residual>,
    /// Instruments with no residual, in instrument order.
    pub omitted: Vec<Omitted>,
    /// All eigenvalues of the covariance matrix, descending.
    pub eigenvalues: Vec<f64>,
    /// Share of total variance explained by each kept component.
    pub explained_variance_ratio: Vec<f64>,
}

impl Extraction {
    pub fn residual(&self, instrument: usize) -> Option<&Residual> {
        self.residuals.iter().find(|r| r.instrument == instrument)
    }

    pub fn is_omitted(&self, instrument: usize) -> bool {
        self.omitted.iter().any(|o| o.instrument == instrument)
    }
}

/// PCA factor extractor over pluggable numerical primitives.
#[derive(Clone)]
pub struct FactorExtractor {
    config: FactorConfig,
    eigen: Arc<dyn EigenSolver>,
    ols: Arc<dyn LeastSquares>,
}

impl fmt::Debug for FactorExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactorExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FactorExtractor {
    /// Extractor backed by the nalgebra primitives.
    pub fn new(config: FactorConfig) -> Self {
        Self::with_primitives(config, Arc::new(NalgebraEigen), Arc::new(NalgebraOls))
    }

    pub fn with_primitives(
        config: FactorConfig,
        eigen: Arc<dyn EigenSolver>,
        ols: Arc<dyn LeastSquares>,
    ) -> Self {
        Self { config, eigen, ols }
    }

    pub fn config(&self) -> &FactorConfig {
        &self.config
    }

    /// Run the full pipeline over `prices`.
    pub fn extract(&self, prices: &PriceMatrix) -> Result<Extraction, FactorError> {
        let k = self.config.components;
        if k == 0 {
            return Err(FactorError::NoComponents);
        }
        let steps = prices.n_steps();
        let required = k + 2;
        if steps < required {
            return Err(FactorError::TooFewSteps {
                steps,
                components: k,
                required,
            });
        }

        let (usable, mut omitted) = self.screen(prices);
        // k == usable spans the whole data space and leaves no residual.
        if usable.len() <= k {
            return Err(FactorError::TooFewInstruments {
                usable: usable.len(),
                components: k,
            });
        }

        let data = self.transformed(prices, &usable, steps);

        let eig = self
            .eigen
            .symmetric_eigen(&covariance(&data))
            .map_err(FactorError::Eigen)?;
        let mut order: Vec<usize> = (0..eig.values.len()).collect();
        order.sort_by(|&a, &b| eig.values[b].total_cmp(&eig.values[a]));
        let eigenvalues: Vec<f64> = order.iter().map(|&i| eig.values[i]).collect();

        let mut components = DMatrix::zeros(usable.len(), k);
        for (dst, &src) in order.iter().take(k).enumerate() {
            let mut v = eig.vectors.column(src).into_owned();
            normalise_sign(&mut v);
            components.set_column(dst, &v);
        }

        let scores = centre_columns(&data) * &components;
        let design = DMatrix::from_fn(steps, k + 1, |t, j| {
            if j == 0 {
                1.0
            } else {
                scores[(t, j - 1)]
            }
        });

        let fits: Vec<(usize, Result<Vec<f64>, OmitReason>)> = usable
            .par_iter()
            .enumerate()
            .map(|(col, &instrument)| {
                let y = data.column(col).into_owned();
                let fit = match self.ols.fit(&y, &design) {
                    Ok(fit) if is_degenerate(fit.residuals.as_slice(), y.as_slice()) => {
                        Err(OmitReason::DegenerateResidual)
                    }
                    Ok(fit) => Ok(fit.residuals.iter().copied().collect()),
                    Err(e) => Err(OmitReason::RegressionFailed(e.to_string())),
                };
                (instrument, fit)
            })
            .collect();

        let mut residuals = Vec::with_capacity(fits.len());
        for (instrument, fit) in fits {
            match fit {
                Ok(values) => residuals.push(Residual { instrument, values }),
                Err(reason) => {
                    debug!(instrument, %reason, "omitting instrument after regression");
                    omitted.push(Omitted { instrument, reason });
                }
            }
        }
        omitted.sort_by_key(|o| o.instrument);

        let total: f64 = eigenvalues.iter().filter(|v| **v > 0.0).sum();
        let explained_variance_ratio = eigenvalues
            .iter()
            .take(k)
            .map(|v| if total > 0.0 { v / total } else { 0.0 })
            .collect();

        Ok(Extraction {
            factors: FactorMatrix { data: design },
            residuals,
            omitted,
            eigenvalues,
            explained_variance_ratio,
        })
    }

    /// Split instruments into usable indices and omitted records.
    fn screen(&self, prices: &PriceMatrix) -> (Vec<usize>, Vec<Omitted>) {
        let mut usable = Vec::with_capacity(prices.n_instruments());
        let mut omitted = Vec::new();

        for instrument in 0..prices.n_instruments() {
            let series = prices.series(instrument);
            let reason = if series.iter().any(|v| !v.is_finite()) {
                Some(OmitReason::NonFinite)
            } else if self.config.use_log_prices && series.iter().any(|&v| v <= 0.0) {
                Some(OmitReason::NonPositive)
            } else if series.iter().all(|&v| v == series[0]) {
                Some(OmitReason::ZeroVariance)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    debug!(instrument, %reason, "omitting instrument from extraction");
                    omitted.push(Omitted { instrument, reason });
                }
                None => usable.push(instrument),
            }
        }

        (usable, omitted)
    }

    /// `T x m` matrix of transformed series for the usable instruments.
    fn transformed(&self, prices: &PriceMatrix, usable: &[usize], steps: usize) -> DMatrix<f64> {
        let mut data = DMatrix::zeros(steps, usable.len());
        for (col, &instrument) in usable.iter().enumerate() {
            let series = prices.series(instrument);
            if self.config.use_log_prices {
                // Log compresses scale already; fit on it directly.
                for (t, &p) in series.iter().enumerate() {
                    data[(t, col)] = p.ln();
                }
            } else {
                let mean = series.iter().sum::<f64>() / steps as f64;
                for (t, &p) in series.iter().enumerate() {
                    data[(t, col)] = p - mean;
                }
            }
        }
        data
    }
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Residual spread negligible next to the series it came from.
fn is_degenerate(residual: &[f64], series: &[f64]) -> bool {
    population_std(residual) <= DEGENERATE_RESIDUAL_RATIO * population_std(series)
}

/// Flip an eigenvector so its largest-magnitude loading is positive.
fn normalise_sign(v: &mut DVector<f64>) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        v.neg_mut();
    }
}
