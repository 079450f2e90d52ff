//! Price-matrix and golden-PnL loading for the runner.
//!
//! Formats:
//! - CSV price matrix: header `step,<instrument>,...`, one row per time step.
//!   The first column is a free-form time label.
//! - JSON price matrix: `{ "instruments": [...], "prices": [[...], ...] }`,
//!   instrument-major, with optional `"labels"`.
//! - Golden PnL: JSON with a `"pnl"` array (a `result.json` artifact
//!   qualifies), or CSV with either a single column or a `pnl` column.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use statarb_core::domain::{MatrixError, PriceMatrix};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file extension for {0} (expected .csv or .json)")]
    UnknownFormat(PathBuf),

    #[error("file has no header row")]
    MissingHeader,

    #[error("file has no data rows")]
    NoRows,

    #[error("row {row}, column '{column}': cannot parse '{value}' as a number")]
    BadValue { row: usize, column: String, value: String },

    #[error("golden csv has {columns} columns and none is named 'pnl'")]
    AmbiguousGolden { columns: usize },

    #[error("{labels} labels for {steps} steps")]
    LabelCount { labels: usize, steps: usize },

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// A loaded price matrix with its time labels and content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPrices {
    /// One label per time step.
    pub labels: Vec<String>,
    pub matrix: PriceMatrix,
    /// BLAKE3 over instrument names and prices.
    pub dataset_hash: String,
}

impl LoadedPrices {
    /// Wrap a matrix with step-index labels.
    pub fn from_matrix(matrix: PriceMatrix) -> Self {
        let labels = (0..matrix.n_steps()).map(|t| t.to_string()).collect();
        Self::with_labels(labels, matrix)
    }

    fn with_labels(labels: Vec<String>, matrix: PriceMatrix) -> Self {
        let dataset_hash = dataset_hash(&matrix);
        Self {
            labels,
            matrix,
            dataset_hash,
        }
    }
}

/// Content hash of a price matrix. Same names and bit-identical prices give
/// the same hash.
pub fn dataset_hash(matrix: &PriceMatrix) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, name) in matrix.instruments().iter().enumerate() {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
        for p in matrix.series(i) {
            hasher.update(&p.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase())
}

fn parse_number(raw: &str, row: usize, column: &str) -> Result<f64, LoadError> {
    raw.trim().parse::<f64>().map_err(|_| LoadError::BadValue {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

// ─── Price matrices ──────────────────────────────────────────────────

/// Load a price matrix, choosing the format from the file extension.
pub fn load_prices(path: &Path) -> Result<LoadedPrices, LoadError> {
    let content = read(path)?;
    let loaded = match extension(path).as_deref() {
        Some("csv") => parse_price_csv(content.as_bytes())?,
        Some("json") => parse_price_json(&content)?,
        _ => return Err(LoadError::UnknownFormat(path.to_path_buf())),
    };
    debug!(
        path = %path.display(),
        instruments = loaded.matrix.n_instruments(),
        steps = loaded.matrix.n_steps(),
        hash = %loaded.dataset_hash,
        "loaded price matrix"
    );
    Ok(loaded)
}

/// Parse a step-major CSV price table.
pub fn parse_price_csv<R: io::Read>(reader: R) -> Result<LoadedPrices, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let header = rdr.headers()?.clone();
    if header.is_empty() {
        return Err(LoadError::MissingHeader);
    }
    let names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();

    let mut labels = Vec::new();
    let mut prices: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        labels.push(record.get(0).unwrap_or_default().to_string());
        for (col, raw) in record.iter().skip(1).enumerate() {
            prices[col].push(parse_number(raw, row, &names[col])?);
        }
    }
    if labels.is_empty() {
        return Err(LoadError::NoRows);
    }

    let matrix = PriceMatrix::new(names, prices)?;
    Ok(LoadedPrices::with_labels(labels, matrix))
}

#[derive(Deserialize)]
struct RawPriceJson {
    instruments: Vec<String>,
    prices: Vec<Vec<f64>>,
    #[serde(default)]
    labels: Option<Vec<String>>,
}

/// Parse an instrument-major JSON price matrix.
pub fn parse_price_json(content: &str) -> Result<LoadedPrices, LoadError> {
    let raw: RawPriceJson = serde_json::from_str(content)?;
    let matrix = PriceMatrix::new(raw.instruments, raw.prices)?;
    match raw.labels {
        Some(labels) if labels.len() != matrix.n_steps() => Err(LoadError::LabelCount {
            labels: labels.len(),
            steps: matrix.n_steps(),
        }),
        Some(labels) => Ok(LoadedPrices::with_labels(labels, matrix)),
        None => Ok(LoadedPrices::from_matrix(matrix)),
    }
}

/// Render a price matrix in the CSV layout `parse_price_csv` reads.
pub fn price_csv(prices: &LoadedPrices) -> Result<String, LoadError> {
    let matrix = &prices.matrix;
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["step".to_string()];
    header.extend(matrix.instruments().iter().cloned());
    wtr.write_record(&header)?;

    for (t, label) in prices.labels.iter().enumerate() {
        let mut row = Vec::with_capacity(matrix.n_instruments() + 1);
        row.push(label.clone());
        row.extend(matrix.prices_at(t).iter().map(|p| p.to_string()));
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().map_err(|e| LoadError::Io {
        path: PathBuf::from("<memory>"),
        source: e.into_error(),
    })?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

// ─── Golden PnL ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GoldenJson {
    pnl: Vec<f64>,
}

/// Load a reference PnL series.
pub fn load_golden_pnl(path: &Path) -> Result<Vec<f64>, LoadError> {
    let content = read(path)?;
    match extension(path).as_deref() {
        Some("csv") => parse_golden_csv(content.as_bytes()),
        Some("json") => parse_golden_json(&content),
        _ => Err(LoadError::UnknownFormat(path.to_path_buf())),
    }
}

pub fn parse_golden_json(content: &str) -> Result<Vec<f64>, LoadError> {
    let golden: GoldenJson = serde_json::from_str(content)?;
    Ok(golden.pnl)
}

/// Single-column CSV (optionally headed), or any CSV with a `pnl` column.
pub fn parse_golden_csv<R: io::Read>(reader: R) -> Result<Vec<f64>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = rdr.records();

    let Some(first) = records.next() else {
        return Err(LoadError::NoRows);
    };
    let first = first?;
    let headed = first.iter().any(|f| f.parse::<f64>().is_err());

    let (column, name, mut values) = if headed {
        let column = match first.iter().position(|f| f == "pnl") {
            Some(c) => c,
            None if first.len() == 1 => 0,
            None => return Err(LoadError::AmbiguousGolden { columns: first.len() }),
        };
        (column, first.get(column).unwrap_or("pnl").to_string(), Vec::new())
    } else {
        if first.len() != 1 {
            return Err(LoadError::AmbiguousGolden { columns: first.len() });
        }
        let name = "pnl".to_string();
        let value = parse_number(&first[0], 0, &name)?;
        (0, name, vec![value])
    };

    for (i, record) in records.enumerate() {
        let record = record?;
        let raw = record.get(column).unwrap_or_default();
        values.push(parse_number(raw, i + 1, &name)?);
    }
    Ok(values)
}
