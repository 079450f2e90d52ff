//! StatArb Runner — experiment orchestration, data loading, metrics, artifacts.
//!
//! This crate builds on `statarb-core` to provide:
//! - TOML experiment configuration with content-addressed run ids
//! - Price-matrix loading from CSV / JSON, or simulation from the config seed
//! - Single-experiment runner for both backtest engines
//! - Performance metrics over per-step PnL
//! - Golden PnL comparison for regression checks
//! - JSON / CSV artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod golden;
pub mod metrics;
pub mod runner;

pub use config::{ConfigError, DataConfig, ExperimentConfig, RunId, StrategyConfig, StrategyKind};
pub use data_loader::{load_golden_pnl, load_prices, price_csv, LoadError, LoadedPrices};
pub use export::{load_artifacts, save_artifacts, ExportError};
pub use golden::{compare_pnl, Mismatch, PnlComparison, DEFAULT_TOLERANCE};
pub use metrics::PerformanceMetrics;
pub use runner::{
    load_data, run_experiment, run_on_prices, ExperimentResult, RunError, SCHEMA_VERSION,
};
