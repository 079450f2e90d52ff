//! File-based data pipeline: config on disk -> prices on disk -> experiment.

use std::fs;

use statarb_core::domain::PriceMatrix;
use statarb_runner::{
    load_data, load_prices, price_csv, run_experiment, DataConfig, ExperimentConfig, LoadError,
    LoadedPrices, StrategyKind,
};

fn simulated_config() -> ExperimentConfig {
    ExperimentConfig::from_toml(
        r#"
seed = 99

[data]
source = "sector"
instruments = 6
steps = 160
coupling = 0.02
offset = 100.0

[factors]
components = 2

[strategy]
kind = "rolling"
lookback = 80
warmup = 40
max_pos = 2
initial_cash = 60000.0
"#,
    )
    .unwrap()
}

#[test]
fn config_file_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("experiment.toml");
    let cfg = simulated_config();
    fs::write(&path, cfg.to_toml().unwrap()).unwrap();

    let loaded = ExperimentConfig::from_file(&path).unwrap();
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.run_id().unwrap(), cfg.run_id().unwrap());
}

#[test]
fn csv_source_reproduces_simulated_run() {
    let dir = tempfile::tempdir().unwrap();
    let sim_cfg = simulated_config();
    let prices = load_data(&sim_cfg).unwrap();

    let csv_path = dir.path().join("prices.csv");
    fs::write(&csv_path, price_csv(&prices).unwrap()).unwrap();

    let mut csv_cfg = sim_cfg.clone();
    csv_cfg.data = DataConfig::Csv { path: csv_path.clone() };

    let reloaded = load_prices(&csv_path).unwrap();
    assert_eq!(reloaded.matrix, prices.matrix);
    assert_eq!(reloaded.dataset_hash, prices.dataset_hash);

    let from_sim = run_experiment(&sim_cfg).unwrap();
    let from_csv = run_experiment(&csv_cfg).unwrap();
    assert_eq!(from_sim.pnl, from_csv.pnl);
    assert_eq!(from_sim.dataset_hash, from_csv.dataset_hash);
    assert_ne!(from_sim.run_id, from_csv.run_id);
}

#[test]
fn json_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.json");
    let matrix = PriceMatrix::new(
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        (0..4)
            .map(|i| {
                (0..60)
                    .map(|t| 50.0 + i as f64 + ((t * (i + 1)) as f64 * 0.37).sin())
                    .collect()
            })
            .collect(),
    )
    .unwrap();
    fs::write(&path, serde_json::to_string(&matrix).unwrap()).unwrap();

    let mut cfg = ExperimentConfig {
        data: DataConfig::Json { path },
        ..simulated_config()
    };
    cfg.strategy.kind = StrategyKind::Pairwise;
    cfg.strategy.bandwidth = 1.5;

    let result = run_experiment(&cfg).unwrap();
    assert_eq!(result.instruments, vec!["A", "B", "C", "D"]);
    assert_eq!(result.pnl.len(), 60);
}

#[test]
fn missing_file_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_prices(&dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));

    let txt = dir.path().join("prices.txt");
    fs::write(&txt, "step,A\n0,1\n").unwrap();
    assert!(matches!(load_prices(&txt), Err(LoadError::UnknownFormat(_))));
}

#[test]
fn loaded_prices_from_matrix_labels_steps() {
    let m = PriceMatrix::from_series(vec![vec![1.0, 2.0, 3.0]]).unwrap();
    let loaded = LoadedPrices::from_matrix(m);
    assert_eq!(loaded.labels, vec!["0", "1", "2"]);
    assert_eq!(loaded.dataset_hash.len(), 64);
}
