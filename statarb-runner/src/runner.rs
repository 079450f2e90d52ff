//! Experiment runner — wires together data, factor extraction, engine, and metrics.
//!
//! Two entry points:
//! - `run_experiment()`: resolves the data source from the config, then runs. Used by CLI.
//! - `run_on_prices()`: takes an already loaded price matrix. Used by tests and
//!   callers that reuse one dataset across configs.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use statarb_core::backtest::{run_pairwise, run_rolling, BacktestError, FailedSettlement};
use statarb_core::domain::{ClosedTrade, PriceMatrix};
use statarb_core::factors::Omitted;
use statarb_core::rng::RngHierarchy;
use statarb_core::simulate::{simulate_pair, simulate_sector_matrix, SimError};

use crate::config::{ConfigError, DataConfig, ExperimentConfig, RunId, StrategyKind};
use crate::data_loader::{load_prices, LoadError, LoadedPrices};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub config: ExperimentConfig,
    pub instruments: Vec<String>,
    /// Step index of each PnL entry.
    pub steps: Vec<usize>,
    /// Time label of each PnL entry.
    pub labels: Vec<String>,
    pub pnl: Vec<f64>,
    pub cumulative: Vec<f64>,
    pub metrics: PerformanceMetrics,
    /// Closed trades (pairwise engine only).
    #[serde(default)]
    pub trades: Vec<ClosedTrade>,
    /// Positions still open at the end of the run.
    pub open_positions: usize,
    /// Instruments without residuals over the full history (pairwise engine only).
    #[serde(default)]
    pub omitted: Vec<Omitted>,
    /// Instruments whose residual could not be standardised (pairwise engine only).
    #[serde(default)]
    pub unsignalled: Vec<usize>,
    /// Steps where factor extraction failed (rolling engine only).
    #[serde(default)]
    pub skipped_windows: Vec<usize>,
    /// Positions dropped for lack of an exit price (rolling engine only).
    #[serde(default)]
    pub failed_settlements: Vec<FailedSettlement>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Resolve the configured data source into a price matrix.
///
/// Simulated sources draw from the `"pair"` / `"sector"` streams of the
/// config seed, so the same config always produces the same prices.
pub fn load_data(config: &ExperimentConfig) -> Result<LoadedPrices, RunError> {
    let rng = RngHierarchy::new(config.seed);
    let loaded = match &config.data {
        DataConfig::Csv { path } | DataConfig::Json { path } => load_prices(path)?,
        DataConfig::Pair(pair) => {
            let [x, y] = simulate_pair(pair, &mut rng.rng_for("pair", 0));
            let matrix = PriceMatrix::new(vec!["X".into(), "Y".into()], vec![x, y])
                .map_err(SimError::from)?;
            LoadedPrices::from_matrix(matrix)
        }
        DataConfig::Sector(sector) => {
            let matrix = simulate_sector_matrix(sector, &mut rng.rng_for("sector", 0))?;
            LoadedPrices::from_matrix(matrix)
        }
    };
    Ok(loaded)
}

/// Validate, load data, and run the configured engine.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentResult, RunError> {
    config.validate()?;
    let prices = load_data(config)?;
    run_on_prices(config, &prices)
}

/// Run the configured engine on a loaded price matrix.
pub fn run_on_prices(
    config: &ExperimentConfig,
    prices: &LoadedPrices,
) -> Result<ExperimentResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let matrix = &prices.matrix;

    info!(
        run_id = %&run_id[..12],
        dataset = %&prices.dataset_hash[..12],
        instruments = matrix.n_instruments(),
        steps = matrix.n_steps(),
        engine = ?config.strategy.kind,
        "running experiment"
    );

    let mut result = ExperimentResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: prices.dataset_hash.clone(),
        config: config.clone(),
        instruments: matrix.instruments().to_vec(),
        steps: Vec::new(),
        labels: Vec::new(),
        pnl: Vec::new(),
        cumulative: Vec::new(),
        metrics: PerformanceMetrics::compute(&[], config.strategy.initial_cash),
        trades: Vec::new(),
        open_positions: 0,
        omitted: Vec::new(),
        unsignalled: Vec::new(),
        skipped_windows: Vec::new(),
        failed_settlements: Vec::new(),
    };

    match config.strategy.kind {
        StrategyKind::Pairwise => {
            let run = run_pairwise(matrix, &config.factors, &config.strategy.pairwise())?;
            result.steps = (0..run.pnl.len()).collect();
            result.pnl = run.pnl.as_slice().to_vec();
            result.trades = run.trades;
            result.open_positions = run.open_positions.len();
            result.omitted = run.omitted;
            result.unsignalled = run.unsignalled.iter().map(|(i, _)| *i).collect();
        }
        StrategyKind::Rolling => {
            if (0..matrix.n_instruments()).any(|i| matrix.series(i).iter().any(|&p| p <= 0.0)) {
                warn!("non-positive prices cannot be sized; those entries are skipped");
            }
            let run = run_rolling(matrix, &config.strategy.rolling(config.factors))?;
            result.steps = run.steps;
            result.pnl = run.pnl.as_slice().to_vec();
            result.open_positions = run.final_positions.len();
            result.skipped_windows = run.skipped_windows.iter().map(|s| s.step).collect();
            result.failed_settlements = run.failed_settlements;
        }
    }

    result.labels = result
        .steps
        .iter()
        .map(|&t| prices.labels.get(t).cloned().unwrap_or_else(|| t.to_string()))
        .collect();
    result.cumulative = crate::metrics::cumulative(&result.pnl);
    result.metrics = PerformanceMetrics::compute(&result.pnl, config.strategy.initial_cash);

    info!(
        total_pnl = result.metrics.total_pnl,
        sharpe = result.metrics.sharpe,
        max_drawdown = result.metrics.max_drawdown,
        trades = result.trades.len(),
        "experiment finished"
    );

    Ok(result)
}
