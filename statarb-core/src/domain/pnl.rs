use serde::{Deserialize, Serialize};

/// Realized profit/loss per processed step.
///
/// Append-only. Every processed step contributes exactly one entry, zero when
/// nothing closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlSeries {
    steps: Vec<f64>,
}

impl PnlSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            steps: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, pnl: f64) {
        self.steps.push(pnl);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.steps
    }

    pub fn total(&self) -> f64 {
        self.steps.iter().sum()
    }

    /// Running sum (the equity curve relative to zero).
    pub fn cumulative(&self) -> Vec<f64> {
        self.steps
            .iter()
            .scan(0.0, |acc, &p| {
                *acc += p;
                Some(*acc)
            })
            .collect()
    }
}

impl From<Vec<f64>> for PnlSeries {
    fn from(steps: Vec<f64>) -> Self {
        Self { steps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_is_running_sum() {
        let pnl = PnlSeries::from(vec![1.0, 0.0, -2.5, 4.0]);
        assert_eq!(pnl.cumulative(), vec![1.0, 1.0, -1.5, 2.5]);
        assert_eq!(pnl.total(), 2.5);
    }

    #[test]
    fn zero_steps_are_kept() {
        let mut pnl = PnlSeries::new();
        pnl.push(0.0);
        pnl.push(0.0);
        assert_eq!(pnl.len(), 2);
        assert_eq!(pnl.total(), 0.0);
    }
}
