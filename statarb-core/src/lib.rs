//! StatArb Core — price matrices, simulators, factor extraction, signals, backtest loops.
//!
//! This crate contains the computational heart of the toolkit:
//! - Domain types (price matrix, PnL series, closed trades)
//! - Deterministic RNG hierarchy
//! - Cointegrated series simulators (pairwise and sector)
//! - Eigendecomposition and least-squares primitives behind traits
//! - PCA factor extractor producing per-instrument residuals
//! - Z-score signal generator
//! - Pairwise (full-history) and rolling (walk-forward) backtest engines
//! - Cointegration-test seam for diagnostics

pub mod backtest;
pub mod cointegration;
pub mod domain;
pub mod factors;
pub mod linalg;
pub mod rng;
pub mod signal;
pub mod simulate;
