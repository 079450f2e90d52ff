//! Backtest engines turning residual z-scores into positions and realized PnL.
//!
//! Two variants:
//! - `pairwise`: residuals computed once over the full history, then a
//!   per-instrument entry/exit state machine. Fast, but every z-score sees the
//!   whole series (look-ahead bias, kept for illustration).
//! - `rolling`: residuals recomputed from strictly past data at every step,
//!   portfolio fully rebalanced into the top/bottom `max_pos` instruments.
//!
//! Each run owns its position state and PnL accumulator; nothing is shared
//! between runs.

pub mod pairwise;
pub mod rolling;

pub use pairwise::{
    run_pairwise, OpenPosition, PairwiseConfig, PairwiseResult, PairwiseState, StepOutcome,
};
pub use rolling::{run_rolling, FailedSettlement, RollingConfig, RollingResult, SkippedWindow};

use thiserror::Error;

use crate::domain::MatrixError;
use crate::factors::FactorError;

/// Configuration problems. Always reported before the first step runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidConfig {
    #[error("bandwidth must be positive and finite, got {0}")]
    Bandwidth(f64),

    #[error("max_pos must be at least 1")]
    ZeroMaxPos,

    #[error("max_pos {max_pos} exceeds half of {instruments} instruments")]
    MaxPosTooLarge { max_pos: usize, instruments: usize },

    #[error("warmup must be at least 1 step")]
    ZeroWarmup,

    #[error("lookback must be at least 1 step")]
    ZeroLookback,

    #[error("{components} components leave no residual for {instruments} instruments")]
    TooManyComponents { components: usize, instruments: usize },

    #[error("initial cash must be positive, got {0}")]
    InitialCash(f64),
}

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("invalid configuration: {0}")]
    Config(#[from] InvalidConfig),

    #[error("factor extraction failed: {0}")]
    Extraction(#[from] FactorError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}
