pub mod indicators;
pub mod macd_momentum;
pub mod traits;
