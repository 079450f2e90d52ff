//! Price matrix: named instruments × chronological time steps.
//!
//! Storage is instrument-major (one `Vec<f64>` per instrument). Instrument
//! order is fixed at construction and defines the instrument index used by
//! every downstream component. Time order is never rearranged.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised when building or transforming a price matrix.
#[derive(Debug, Error, PartialEq)]
pub enum MatrixError {
    #[error("price matrix needs at least one instrument")]
    NoInstruments,

    #[error("{names} instrument names for {series} series")]
    NameCountMismatch { names: usize, series: usize },

    #[error("series '{instrument}' has {actual} steps, expected {expected}")]
    RaggedSeries {
        instrument: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate instrument name '{0}'")]
    DuplicateInstrument(String),

    #[error("instrument index {index} out of range (have {len})")]
    InstrumentOutOfRange { index: usize, len: usize },

    #[error("window [{start}, {end}) out of range for {steps} steps")]
    WindowOutOfRange { start: usize, end: usize, steps: usize },

}

/// Ordered set of instrument price series sharing one time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMatrix {
    instruments: Vec<String>,
    prices: Vec<Vec<f64>>,
}

impl PriceMatrix {
    /// Build from instrument names and instrument-major series.
    pub fn new(instruments: Vec<String>, prices: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        if instruments.is_empty() {
            return Err(MatrixError::NoInstruments);
        }
        if instruments.len() != prices.len() {
            return Err(MatrixError::NameCountMismatch {
                names: instruments.len(),
                series: prices.len(),
            });
        }

        let mut seen = HashSet::with_capacity(instruments.len());
        for name in &instruments {
            if !seen.insert(name.as_str()) {
                return Err(MatrixError::DuplicateInstrument(name.clone()));
            }
        }

        let expected = prices[0].len();
        for (name, series) in instruments.iter().zip(&prices) {
            if series.len() != expected {
                return Err(MatrixError::RaggedSeries {
                    instrument: name.clone(),
                    expected,
                    actual: series.len(),
                });
            }
        }

        Ok(Self {
            instruments,
            prices,
        })
    }

    /// Build with generated names `S00`, `S01`, ...
    pub fn from_series(prices: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let names = (0..prices.len()).map(|i| format!("S{i:02}")).collect();
        Self::new(names, prices)
    }

    pub fn instruments(&self) -> &[String] {
        &self.instruments
    }

    pub fn n_instruments(&self) -> usize {
        self.instruments.len()
    }

    pub fn n_steps(&self) -> usize {
        self.prices.first().map_or(0, Vec::len)
    }

    /// Full price history of one instrument.
    pub fn series(&self, instrument: usize) -> &[f64] {
        &self.prices[instrument]
    }

    pub fn price(&self, instrument: usize, step: usize) -> f64 {
        self.prices[instrument][step]
    }

    /// Cross-section of all instruments at one step, in instrument order.
    pub fn prices_at(&self, step: usize) -> Vec<f64> {
        self.prices.iter().map(|s| s[step]).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.instruments.iter().position(|n| n == name)
    }

    /// Half-open time slice `[start, end)` over every instrument.
    pub fn window(&self, start: usize, end: usize) -> Result<Self, MatrixError> {
        let steps = self.n_steps();
        if start > end || end > steps {
            return Err(MatrixError::WindowOutOfRange { start, end, steps });
        }
        Ok(Self {
            instruments: self.instruments.clone(),
            prices: self.prices.iter().map(|s| s[start..end].to_vec()).collect(),
        })
    }

    /// Keep only the given instruments, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Self, MatrixError> {
        let len = self.n_instruments();
        let mut instruments = Vec::with_capacity(indices.len());
        let mut prices = Vec::with_capacity(indices.len());
        for &index in indices {
            if index >= len {
                return Err(MatrixError::InstrumentOutOfRange { index, len });
            }
            instruments.push(self.instruments[index].clone());
            prices.push(self.prices[index].clone());
        }
        Self::new(instruments, prices)
    }

    /// Drop one instrument; later instruments shift down by one index.
    pub fn without(&self, index: usize) -> Result<Self, MatrixError> {
        let len = self.n_instruments();
        if index >= len {
            return Err(MatrixError::InstrumentOutOfRange { index, len });
        }
        let keep: Vec<usize> = (0..len).filter(|&i| i != index).collect();
        self.select(&keep)
    }

    /// Exchange the positions of two instruments (names and series).
    pub fn swap_instruments(&mut self, a: usize, b: usize) -> Result<(), MatrixError> {
        let len = self.n_instruments();
        for index in [a, b] {
            if index >= len {
                return Err(MatrixError::InstrumentOutOfRange { index, len });
            }
        }
        self.instruments.swap(a, b);
        self.prices.swap(a, b);
        Ok(())
    }

    /// Append one instrument at the end.
    pub fn push_instrument(&mut self, name: &str, series: Vec<f64>) -> Result<(), MatrixError> {
        if self.index_of(name).is_some() {
            return Err(MatrixError::DuplicateInstrument(name.to_string()));
        }
        if series.len() != self.n_steps() {
            return Err(MatrixError::RaggedSeries {
                instrument: name.to_string(),
                expected: self.n_steps(),
                actual: series.len(),
            });
        }
        self.instruments.push(name.to_string());
        self.prices.push(series);
        Ok(())
    }
}
