//! Pairwise cointegration generator.
//!
//! Paths are built from zero. At every step each series draws
//! `sigma[i] * N(0, 1)`; if its coupling `c[i]` is non-zero it is also pulled
//! toward the other series by `c[i] * (x_other - x_self)`, using the values
//! before the step. Both paths are offset by `initial` at the end, so the
//! pull acts on the zero-based gap.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::has_diverged;

/// Parameters of the pairwise generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairSimConfig {
    /// Number of increments; each path has `steps + 1` values.
    pub steps: usize,
    /// Offset added to each path.
    pub initial: [f64; 2],
    /// Per-series noise scale.
    pub sigma: [f64; 2],
    /// Per-series pull strength toward the other series. Not bounds-checked.
    pub coupling: [f64; 2],
}

impl Default for PairSimConfig {
    fn default() -> Self {
        Self {
            steps: 1000,
            initial: [100.0, 100.0],
            sigma: [1.0, 1.0],
            coupling: [0.1, 0.1],
        }
    }
}

/// Generate two coupled paths of length `steps + 1`.
pub fn simulate_pair<R: Rng + ?Sized>(config: &PairSimConfig, rng: &mut R) -> [Vec<f64>; 2] {
    let mut paths = [
        Vec::with_capacity(config.steps + 1),
        Vec::with_capacity(config.steps + 1),
    ];
    let mut x = [0.0_f64; 2];
    paths[0].push(x[0]);
    paths[1].push(x[1]);

    for _ in 0..config.steps {
        let mut dx = [0.0_f64; 2];
        for i in 0..2 {
            let j = 1 - i;
            let noise: f64 = rng.sample(StandardNormal);
            dx[i] = config.sigma[i] * noise;
            if config.coupling[i] != 0.0 {
                dx[i] += config.coupling[i] * (x[j] - x[i]);
            }
        }
        for i in 0..2 {
            x[i] += dx[i];
            paths[i].push(x[i]);
        }
    }

    for (path, offset) in paths.iter_mut().zip(config.initial) {
        path.iter_mut().for_each(|v| *v += offset);
    }

    if has_diverged(&paths) {
        warn!(coupling = ?config.coupling, "pair simulation diverged");
    }

    paths
}
