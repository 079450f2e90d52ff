//! Golden PnL regression: a saved run is the reference for the next one.
//!
//! If these tests fail, either a bug was introduced or the engine genuinely
//! changed and the golden artifacts need regenerating.

use std::fs;

use statarb_runner::{
    compare_pnl, load_artifacts, load_golden_pnl, run_experiment, save_artifacts, ExperimentConfig,
    StrategyKind, DEFAULT_TOLERANCE,
};

fn config(kind: StrategyKind) -> ExperimentConfig {
    let mut cfg = ExperimentConfig::from_toml(
        r#"
seed = 2024

[data]
source = "sector"
instruments = 8
steps = 200
coupling = 0.015
offset = 100.0

[factors]
components = 3
"#,
    )
    .unwrap();
    cfg.strategy.kind = kind;
    cfg.strategy.lookback = 100;
    cfg.strategy.warmup = 50;
    cfg.strategy.max_pos = 2;
    cfg
}

#[test]
fn saved_json_is_its_own_golden() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_experiment(&config(StrategyKind::Rolling)).unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    assert!(run_dir.join("result.json").exists());
    assert!(run_dir.join("pnl.csv").exists());

    let golden = load_golden_pnl(&run_dir.join("result.json")).unwrap();
    let cmp = compare_pnl(&result.pnl, &golden, DEFAULT_TOLERANCE);
    assert!(cmp.is_match(), "{}", cmp.summary());

    let rerun = run_experiment(&config(StrategyKind::Rolling)).unwrap();
    assert!(compare_pnl(&rerun.pnl, &golden, 0.0).is_match());
}

#[test]
fn saved_csv_is_its_own_golden() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_experiment(&config(StrategyKind::Pairwise)).unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    let golden = load_golden_pnl(&run_dir.join("pnl.csv")).unwrap();
    assert_eq!(golden.len(), result.pnl.len());
    assert!(compare_pnl(&result.pnl, &golden, DEFAULT_TOLERANCE).is_match());
}

#[test]
fn artifacts_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_experiment(&config(StrategyKind::Pairwise)).unwrap();
    let run_dir = save_artifacts(&result, dir.path()).unwrap();

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.run_id, result.run_id);
    assert_eq!(loaded.config, result.config);
    assert_eq!(loaded.pnl, result.pnl);
    assert_eq!(loaded.trades, result.trades);
}

#[test]
fn different_seed_breaks_the_golden() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_experiment(&config(StrategyKind::Rolling)).unwrap();
    let golden_path = dir.path().join("golden.json");
    fs::write(&golden_path, serde_json::json!({ "pnl": result.pnl }).to_string()).unwrap();

    let mut other = config(StrategyKind::Rolling);
    other.seed += 1;
    let live = run_experiment(&other).unwrap();

    let golden = load_golden_pnl(&golden_path).unwrap();
    let cmp = compare_pnl(&live.pnl, &golden, DEFAULT_TOLERANCE);
    assert!(!cmp.is_match());
    assert!(cmp.first_mismatch.is_some());
}
