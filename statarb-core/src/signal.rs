//! Z-score signal generator.
//!
//! `z[i] = (x[i] - mean(x)) / std(x)` over the whole supplied series, with the
//! population standard deviation (divide by N). Not an online statistic: the
//! caller decides the window by what it passes in.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::factors::Extraction;

/// Standard deviations at or below this are treated as zero.
pub const MIN_STD_DEV: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalError {
    #[error("cannot z-score an empty series")]
    Empty,

    #[error("series contains NaN or infinite values")]
    NonFinite,

    #[error("series has zero standard deviation ({std_dev})")]
    ZeroVariance { std_dev: f64 },
}

/// Population mean and standard deviation.
pub fn mean_std(series: &[f64]) -> Result<(f64, f64), SignalError> {
    if series.is_empty() {
        return Err(SignalError::Empty);
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(SignalError::NonFinite);
    }
    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Ok((mean, variance.sqrt()))
}

/// Standardise the whole series.
pub fn zscore(series: &[f64]) -> Result<Vec<f64>, SignalError> {
    let (mean, std_dev) = checked_moments(series)?;
    Ok(series.iter().map(|v| (v - mean) / std_dev).collect())
}

/// Z-score of the last value, standardised against the whole series.
pub fn latest_zscore(series: &[f64]) -> Result<f64, SignalError> {
    let (mean, std_dev) = checked_moments(series)?;
    // checked_moments rejects empty input
    let last = series[series.len() - 1];
    Ok((last - mean) / std_dev)
}

fn checked_moments(series: &[f64]) -> Result<(f64, f64), SignalError> {
    let (mean, std_dev) = mean_std(series)?;
    if std_dev <= MIN_STD_DEV {
        return Err(SignalError::ZeroVariance { std_dev });
    }
    Ok((mean, std_dev))
}

/// Per-instrument signal outcome. Failures stay attached to their instrument
/// so the caller can skip them without losing unrelated errors.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSignal {
    pub instrument: usize,
    pub zscores: Result<Vec<f64>, SignalError>,
}

/// Z-score every residual of an extraction, in instrument order.
pub fn zscores(extraction: &Extraction) -> Vec<InstrumentSignal> {
    extraction
        .residuals
        .iter()
        .map(|r| InstrumentSignal {
            instrument: r.instrument,
            zscores: zscore(&r.values),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        // mean 3, population std sqrt(2)
        let z = zscore(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let s = 2.0_f64.sqrt();
        let expected = [-2.0 / s, -1.0 / s, 0.0, 1.0 / s, 2.0 / s];
        for (a, b) in z.iter().zip(expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn latest_matches_full_series() {
        let series = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let full = zscore(&series).unwrap();
        assert!((latest_zscore(&series).unwrap() - full[7]).abs() < 1e-15);
    }

    #[test]
    fn constant_series_fails() {
        assert!(matches!(
            zscore(&[2.0, 2.0, 2.0]).unwrap_err(),
            SignalError::ZeroVariance { .. }
        ));
    }

    #[test]
    fn empty_and_non_finite_fail() {
        assert_eq!(zscore(&[]).unwrap_err(), SignalError::Empty);
        assert_eq!(latest_zscore(&[]).unwrap_err(), SignalError::Empty);
        assert_eq!(zscore(&[1.0, f64::NAN]).unwrap_err(), SignalError::NonFinite);
    }

    #[test]
    fn population_not_sample_std() {
        let (_, std_dev) = mean_std(&[0.0, 2.0]).unwrap();
        assert!((std_dev - 1.0).abs() < 1e-15);
    }
}
