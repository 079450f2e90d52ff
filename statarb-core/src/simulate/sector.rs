//! Multi-series (sector) cointegration generator.
//!
//! Causality matrix C (N x N), for coupling magnitudes `a_ij`:
//! - `C[i][j] = -a_ij` for `i < j` (later instruments pull down)
//! - `C[i][j] = +a_ij` for `i > j` (earlier instruments pull up)
//! - `C[i][i] = -a_ii` (self-damping)
//!
//! Each step every series moves by `C[i] . x + sigma * N(0, 1)`, with all
//! increments computed from the pre-step vector. Keep `a * N` well below 1;
//! larger products feed back on themselves and diverge.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{has_diverged, SimError};
use crate::domain::PriceMatrix;

/// Coupling magnitude: one scale for every pair, or one per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coupling {
    Scalar(f64),
    Matrix(Vec<Vec<f64>>),
}

/// Parameters of the sector generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorSimConfig {
    pub instruments: usize,
    /// Number of increments; each path has `steps + 1` values.
    pub steps: usize,
    pub coupling: Coupling,
    /// Noise scale of every series.
    pub sigma: f64,
    /// Added to every value of every path.
    pub offset: f64,
}

impl Default for SectorSimConfig {
    fn default() -> Self {
        Self {
            instruments: 10,
            steps: 1000,
            coupling: Coupling::Scalar(0.02),
            sigma: 1.0,
            offset: 0.0,
        }
    }
}

/// Build the signed causality matrix for `n` instruments.
pub fn causality_matrix(n: usize, coupling: &Coupling) -> Result<Vec<Vec<f64>>, SimError> {
    if n == 0 {
        return Err(SimError::NoInstruments);
    }
    if let Coupling::Matrix(rows) = coupling {
        if rows.len() != n {
            return Err(SimError::CouplingShape {
                expected: n,
                rows: rows.len(),
                bad_row: 0,
                cols: rows.first().map_or(0, Vec::len),
            });
        }
        if let Some((bad_row, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(SimError::CouplingShape {
                expected: n,
                rows: rows.len(),
                bad_row,
                cols: row.len(),
            });
        }
    }

    let magnitude = |i: usize, j: usize| match coupling {
        Coupling::Scalar(a) => *a,
        Coupling::Matrix(rows) => rows[i][j],
    };

    Ok((0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    let a = magnitude(i, j);
                    if i > j {
                        a
                    } else {
                        -a
                    }
                })
                .collect()
        })
        .collect())
}

/// Generate `instruments` paths of length `steps + 1`.
pub fn simulate_sector<R: Rng + ?Sized>(
    config: &SectorSimConfig,
    rng: &mut R,
) -> Result<Vec<Vec<f64>>, SimError> {
    let n = config.instruments;
    let c = causality_matrix(n, &config.coupling)?;

    let mut paths: Vec<Vec<f64>> = (0..n)
        .map(|_| {
            let mut p = Vec::with_capacity(config.steps + 1);
            p.push(0.0);
            p
        })
        .collect();
    let mut x = vec![0.0_f64; n];
    let mut dx = vec![0.0_f64; n];

    for _ in 0..config.steps {
        for (i, row) in c.iter().enumerate() {
            let pull: f64 = row.iter().zip(&x).map(|(cij, xj)| cij * xj).sum();
            let noise: f64 = rng.sample(StandardNormal);
            dx[i] = pull + config.sigma * noise;
        }
        for i in 0..n {
            x[i] += dx[i];
            paths[i].push(x[i]);
        }
    }

    if config.offset != 0.0 {
        for path in &mut paths {
            path.iter_mut().for_each(|v| *v += config.offset);
        }
    }

    if has_diverged(&paths) {
        warn!(
            instruments = n,
            coupling = ?config.coupling,
            "sector simulation diverged; reduce coupling"
        );
    }

    Ok(paths)
}

/// Same as [`simulate_sector`], wrapped as a price matrix named `S00..`.
pub fn simulate_sector_matrix<R: Rng + ?Sized>(
    config: &SectorSimConfig,
    rng: &mut R,
) -> Result<PriceMatrix, SimError> {
    let paths = simulate_sector(config, rng)?;
    Ok(PriceMatrix::from_series(paths)?)
}
