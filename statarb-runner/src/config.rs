//! Serializable experiment configuration.
//!
//! One TOML file describes a whole experiment: where prices come from, how
//! factors are extracted, and which backtest engine turns them into PnL.
//! Every section has defaults, so an empty file is a valid (simulated)
//! experiment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use statarb_core::backtest::{PairwiseConfig, RollingConfig};
use statarb_core::factors::FactorConfig;
use statarb_core::simulate::{Coupling, PairSimConfig, SectorSimConfig};

/// Unique identifier for an experiment (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config to TOML: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("failed to serialize config to JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

// ─── Sections ────────────────────────────────────────────────────────

/// Where the price matrix comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataConfig {
    /// CSV file: `step,<instrument>,...` header, one row per step.
    Csv { path: PathBuf },
    /// JSON file: `{ "instruments": [...], "prices": [[...], ...] }`.
    Json { path: PathBuf },
    /// Two simulated coupled series.
    Pair(PairSimConfig),
    /// N simulated series driven by a causality matrix.
    Sector(SectorSimConfig),
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig::Sector(SectorSimConfig {
            offset: 100.0,
            ..Default::default()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Pairwise,
    Rolling,
}

/// Engine selection plus the parameters of both engines. Parameters of the
/// engine not selected are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub bandwidth: f64,
    pub lookback: usize,
    pub warmup: usize,
    pub max_pos: usize,
    pub initial_cash: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let rolling = RollingConfig::default();
        Self {
            kind: StrategyKind::Rolling,
            bandwidth: PairwiseConfig::default().bandwidth,
            lookback: rolling.lookback,
            warmup: rolling.warmup,
            max_pos: rolling.max_pos,
            initial_cash: rolling.initial_cash,
        }
    }
}

impl StrategyConfig {
    pub fn pairwise(&self) -> PairwiseConfig {
        PairwiseConfig {
            bandwidth: self.bandwidth,
        }
    }

    pub fn rolling(&self, factors: FactorConfig) -> RollingConfig {
        RollingConfig {
            lookback: self.lookback,
            warmup: self.warmup,
            factors,
            max_pos: self.max_pos,
            initial_cash: self.initial_cash,
        }
    }
}

// ─── Experiment ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Master seed for every simulated stream.
    pub seed: u64,
    pub data: DataConfig,
    pub factors: FactorConfig,
    pub strategy: StrategyConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            data: DataConfig::default(),
            factors: FactorConfig::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks that do not depend on the loaded data. Instrument-count checks
    /// (e.g. `max_pos` against the universe) happen when the run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.factors.components == 0 {
            return Err(invalid("factors.components", "at least one component is required"));
        }

        match &self.data {
            DataConfig::Csv { path } | DataConfig::Json { path } => {
                if path.as_os_str().is_empty() {
                    return Err(invalid("data.path", "empty path"));
                }
            }
            DataConfig::Pair(pair) => {
                if pair.steps == 0 {
                    return Err(invalid("data.steps", "must be at least 1"));
                }
                if pair.sigma.iter().any(|s| !s.is_finite() || *s < 0.0) {
                    return Err(invalid("data.sigma", "must be finite and non-negative"));
                }
            }
            DataConfig::Sector(sector) => {
                if sector.instruments == 0 {
                    return Err(invalid("data.instruments", "must be at least 1"));
                }
                if sector.steps == 0 {
                    return Err(invalid("data.steps", "must be at least 1"));
                }
                if !sector.sigma.is_finite() || sector.sigma < 0.0 {
                    return Err(invalid("data.sigma", "must be finite and non-negative"));
                }
                if let Coupling::Matrix(rows) = &sector.coupling {
                    let n = sector.instruments;
                    if rows.len() != n || rows.iter().any(|r| r.len() != n) {
                        return Err(invalid(
                            "data.coupling",
                            format!("matrix must be {0}x{0}", sector.instruments),
                        ));
                    }
                }
            }
        }

        let s = &self.strategy;
        match s.kind {
            StrategyKind::Pairwise => {
                s.pairwise()
                    .validate()
                    .map_err(|e| invalid("strategy.bandwidth", e.to_string()))?;
            }
            StrategyKind::Rolling => {
                if s.lookback == 0 {
                    return Err(invalid("strategy.lookback", "must be at least 1"));
                }
                if s.warmup == 0 {
                    return Err(invalid("strategy.warmup", "must be at least 1"));
                }
                if s.max_pos == 0 {
                    return Err(invalid("strategy.max_pos", "must be at least 1"));
                }
            }
        }
        if !s.initial_cash.is_finite() || s.initial_cash <= 0.0 {
            return Err(invalid(
                "strategy.initial_cash",
                format!("must be positive, got {}", s.initial_cash),
            ));
        }
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form. Identical configs share
    /// a run id.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
