//! Domain types shared by the simulators, the factor extractor and the engines.

pub mod pnl;
pub mod price_matrix;
pub mod trade;

pub use pnl::PnlSeries;
pub use price_matrix::{MatrixError, PriceMatrix};
pub use trade::{ClosedTrade, Holding};
