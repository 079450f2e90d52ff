//! Synthetic cointegrated price series.
//!
//! Two generators:
//! - `pair`: two series, each pulled toward the other by its own coupling.
//! - `sector`: N series driven by an asymmetric causality matrix.
//!
//! Neither generator damps itself. Strong coupling (large `c`, or a large
//! `a * N` product) oscillates or diverges; choosing stable parameters is the
//! caller's job. Divergence is logged, not rejected.

pub mod pair;
pub mod sector;

pub use pair::{simulate_pair, PairSimConfig};
pub use sector::{
    causality_matrix, simulate_sector, simulate_sector_matrix, Coupling, SectorSimConfig,
};

use crate::domain::MatrixError;
use thiserror::Error;

/// Errors from the simulators. Only shape problems are errors; unstable
/// parameters are not.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("sector simulation needs at least one instrument")]
    NoInstruments,

    #[error(
        "coupling matrix must be {expected}x{expected}, \
         got {rows} rows (row {bad_row} has {cols} columns)"
    )]
    CouplingShape {
        expected: usize,
        rows: usize,
        bad_row: usize,
        cols: usize,
    },

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// True if any value of any path is NaN or infinite.
pub(crate) fn has_diverged(paths: &[Vec<f64>]) -> bool {
    paths.iter().flatten().any(|v| !v.is_finite())
}
