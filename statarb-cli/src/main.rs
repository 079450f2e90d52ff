//! StatArb CLI — simulate, run, and compare commands.
//!
//! Commands:
//! - `simulate pair|sector` — write a simulated price matrix to CSV or JSON
//! - `run` — execute an experiment from a TOML config and save artifacts
//! - `compare` — check a PnL series against a golden reference
//!
//! Logging goes to stderr through `tracing`; set `RUST_LOG` to override the
//! default `statarb=info` filter.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use statarb_core::domain::PriceMatrix;
use statarb_core::rng::RngHierarchy;
use statarb_core::simulate::{
    simulate_pair, simulate_sector_matrix, Coupling, PairSimConfig, SectorSimConfig,
};
use statarb_runner::{
    compare_pnl, load_golden_pnl, price_csv, run_experiment, save_artifacts, DataConfig,
    ExperimentConfig, ExperimentResult, LoadedPrices, PnlComparison, DEFAULT_TOLERANCE,
};

#[derive(Parser)]
#[command(name = "statarb", about = "StatArb CLI — PCA residual mean-reversion backtests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate cointegrated price series.
    Simulate {
        #[command(subcommand)]
        kind: SimulateKind,
    },
    /// Execute an experiment from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for result.json and pnl.csv.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Golden PnL (JSON or CSV) to check the run against.
        #[arg(long)]
        golden: Option<PathBuf>,

        /// Absolute per-step tolerance for the golden check.
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
    /// Compare two PnL series (JSON or CSV).
    Compare {
        #[arg(long)]
        live: PathBuf,

        #[arg(long)]
        golden: PathBuf,

        /// Absolute per-step tolerance.
        #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
    },
}

#[derive(Subcommand)]
enum SimulateKind {
    /// Two series, each pulled toward the other.
    Pair {
        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Pull strength of each series toward the other.
        #[arg(long, num_args = 2, default_values_t = [0.1, 0.1])]
        coupling: Vec<f64>,

        /// Noise scale of each series.
        #[arg(long, num_args = 2, default_values_t = [1.0, 1.0])]
        sigma: Vec<f64>,

        /// Starting level of each series.
        #[arg(long, num_args = 2, default_values_t = [100.0, 100.0])]
        initial: Vec<f64>,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output file (.csv or .json).
        #[arg(long)]
        out: PathBuf,
    },
    /// N series driven by an asymmetric causality matrix.
    Sector {
        #[arg(long, default_value_t = 10)]
        instruments: usize,

        #[arg(long, default_value_t = 1000)]
        steps: usize,

        /// Coupling magnitude for every pair. Keep instruments * coupling well below 1.
        #[arg(long, default_value_t = 0.02)]
        coupling: f64,

        #[arg(long, default_value_t = 1.0)]
        sigma: f64,

        /// Added to every value so prices stay positive.
        #[arg(long, default_value_t = 100.0)]
        offset: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output file (.csv or .json).
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("statarb=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { kind } => run_simulate(kind),
        Commands::Run {
            config,
            output_dir,
            golden,
            tolerance,
        } => run_experiment_cmd(&config, &output_dir, golden.as_deref(), tolerance),
        Commands::Compare {
            live,
            golden,
            tolerance,
        } => run_compare(&live, &golden, tolerance),
    }
}

fn pair_of(values: &[f64], name: &str) -> Result<[f64; 2]> {
    match values {
        [a, b] => Ok([*a, *b]),
        _ => bail!("--{name} takes exactly two values"),
    }
}

fn run_simulate(kind: SimulateKind) -> Result<()> {
    let (matrix, out) = match kind {
        SimulateKind::Pair {
            steps,
            coupling,
            sigma,
            initial,
            seed,
            out,
        } => {
            let cfg = PairSimConfig {
                steps,
                initial: pair_of(&initial, "initial")?,
                sigma: pair_of(&sigma, "sigma")?,
                coupling: pair_of(&coupling, "coupling")?,
            };
            let [x, y] = simulate_pair(&cfg, &mut RngHierarchy::new(seed).rng_for("pair", 0));
            (PriceMatrix::new(vec!["X".into(), "Y".into()], vec![x, y])?, out)
        }
        SimulateKind::Sector {
            instruments,
            steps,
            coupling,
            sigma,
            offset,
            seed,
            out,
        } => {
            let cfg = SectorSimConfig {
                instruments,
                steps,
                coupling: Coupling::Scalar(coupling),
                sigma,
                offset,
            };
            let mut rng = RngHierarchy::new(seed).rng_for("sector", 0);
            let matrix = simulate_sector_matrix(&cfg, &mut rng)?;
            (matrix, out)
        }
    };

    let loaded = LoadedPrices::from_matrix(matrix);
    let content = match out.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(&loaded.matrix)?,
        Some("csv") => price_csv(&loaded)?,
        _ => bail!("--out must end in .csv or .json: {}", out.display()),
    };
    std::fs::write(&out, content).with_context(|| format!("failed to write {}", out.display()))?;

    println!(
        "Wrote {} instruments x {} steps to {} (dataset {})",
        loaded.matrix.n_instruments(),
        loaded.matrix.n_steps(),
        out.display(),
        &loaded.dataset_hash[..12]
    );
    Ok(())
}

/// Resolve relative data paths against the config file's directory.
fn resolve_data_path(config: &mut ExperimentConfig, config_path: &Path) {
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    if let DataConfig::Csv { path } | DataConfig::Json { path } = &mut config.data {
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

fn run_experiment_cmd(
    config_path: &Path,
    output_dir: &Path,
    golden: Option<&Path>,
    tolerance: f64,
) -> Result<()> {
    let mut config = ExperimentConfig::from_file(config_path)?;
    resolve_data_path(&mut config, config_path);
    info!(config = %config_path.display(), seed = config.seed, "running experiment");

    let result = run_experiment(&config)?;
    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    if let Some(golden) = golden {
        let reference = load_golden_pnl(golden)?;
        let cmp = compare_pnl(&result.pnl, &reference, tolerance);
        report_comparison(&cmp);
    }
    Ok(())
}

fn run_compare(live: &Path, golden: &Path, tolerance: f64) -> Result<()> {
    let live =
        load_golden_pnl(live).with_context(|| format!("failed to load {}", live.display()))?;
    let reference =
        load_golden_pnl(golden).with_context(|| format!("failed to load {}", golden.display()))?;
    report_comparison(&compare_pnl(&live, &reference, tolerance));
    Ok(())
}

fn report_comparison(cmp: &PnlComparison) {
    println!("Golden check:   {}", cmp.summary());
    println!("Live total:     {:.6}", cmp.live_total);
    println!("Golden total:   {:.6}", cmp.golden_total);
    if !cmp.is_match() {
        warn!(mismatches = cmp.mismatches, "golden check failed");
        std::process::exit(1);
    }
}

fn print_summary(result: &ExperimentResult) {
    let m = &result.metrics;
    println!();
    println!("=== Experiment Result ===");
    println!("Run ID:         {}", &result.run_id[..16]);
    println!("Dataset:        {}", &result.dataset_hash[..16]);
    println!("Engine:         {:?}", result.config.strategy.kind);
    println!("Instruments:    {}", result.instruments.len());
    println!("Steps:          {} ({} active)", m.steps, m.active_steps);
    println!("Trades:         {}", result.trades.len());
    println!("Open positions: {}", result.open_positions);
    if !result.omitted.is_empty() {
        println!("Omitted:        {}", result.omitted.len());
    }
    if !result.skipped_windows.is_empty() {
        println!("Skipped windows: {}", result.skipped_windows.len());
    }
    if !result.failed_settlements.is_empty() {
        println!("Unsettled:      {}", result.failed_settlements.len());
    }
    println!();
    println!("--- Performance ---");
    println!("Total PnL:      {:.2}", m.total_pnl);
    println!("Mean step PnL:  {:.4}", m.mean_step_pnl);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Max Drawdown:   {:.2} ({:.2}%)", m.max_drawdown, m.max_drawdown_pct * 100.0);
    println!("Hit Rate:       {:.1}%", m.hit_rate * 100.0);
    println!("Final Equity:   {:.2}", m.final_equity);
}
