//! Artifact export — JSON result and CSV PnL tape.
//!
//! All persisted results include a `schema_version` field. Newer versions
//! than this build understands are rejected on load.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::runner::{ExperimentResult, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported schema version {found} (max supported: {supported})")]
    SchemaVersion { found: u32, supported: u32 },
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ─── JSON ────────────────────────────────────────────────────────────

pub fn export_json(result: &ExperimentResult) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Deserialize a result, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ExperimentResult, ExportError> {
    let result: ExperimentResult = serde_json::from_str(json)?;
    if result.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: result.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(result)
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Columns: step, label, pnl, cumulative.
pub fn export_pnl_csv(result: &ExperimentResult) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["step", "label", "pnl", "cumulative"])?;
    for (i, (&pnl, &cum)) in result.pnl.iter().zip(&result.cumulative).enumerate() {
        let step = result.steps.get(i).copied().unwrap_or(i);
        let label = result.labels.get(i).map(String::as_str).unwrap_or("");
        wtr.write_record([step.to_string(), label.to_string(), pnl.to_string(), cum.to_string()])?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| io_error(Path::new("pnl.csv"), e.into_error()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

// ─── Artifact bundle ─────────────────────────────────────────────────

/// Save the artifact set for one experiment.
///
/// Creates `{output_dir}/{run_id prefix}/` containing:
/// - `result.json` — the full `ExperimentResult`
/// - `pnl.csv` — per-step PnL tape
///
/// Returns the path to the created directory.
pub fn save_artifacts(
    result: &ExperimentResult,
    output_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let prefix_len = result.run_id.len().min(16);
    let run_dir = output_dir.join(&result.run_id[..prefix_len]);
    std::fs::create_dir_all(&run_dir).map_err(|e| io_error(&run_dir, e))?;

    let json_path = run_dir.join("result.json");
    std::fs::write(&json_path, export_json(result)?).map_err(|e| io_error(&json_path, e))?;

    let csv_path = run_dir.join("pnl.csv");
    std::fs::write(&csv_path, export_pnl_csv(result)?).map_err(|e| io_error(&csv_path, e))?;

    info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a result from an artifact directory's `result.json`.
pub fn load_artifacts(dir: &Path) -> Result<ExperimentResult, ExportError> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
    import_json(&json)
}
