use serde::{Deserialize, Serialize};

/// What an instrument currently holds in the pairwise engine.
///
/// The engine fades the residual: a positive z-score at entry means the
/// instrument is rich, so the position is short; a negative one is long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Holding {
    Flat,
    Long,
    Short,
}

impl Holding {
    /// Map a stored side slot (the triggering z-score) to a holding.
    pub fn from_side(side: f64) -> Self {
        if side > 0.0 {
            Holding::Short
        } else if side < 0.0 {
            Holding::Long
        } else {
            Holding::Flat
        }
    }
}

/// One completed round trip of the pairwise engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub instrument: usize,
    pub entry_step: usize,
    pub exit_step: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Sign of the z-score that opened the trade (+1.0 or -1.0).
    pub side: f64,
    /// `(entry_price - exit_price) * side`.
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn holding(&self) -> Holding {
        Holding::from_side(self.side)
    }

    pub fn holding_steps(&self) -> usize {
        self.exit_step - self.entry_step
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
