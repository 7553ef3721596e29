pub mod error;
pub mod regression;
pub mod series;
pub mod signals;
pub mod types;

#[cfg(feature = "backtest")]
pub mod backtest;

#[cfg(feature = "sweep")]
pub mod sweep;

pub use error::StatArbError;
pub use types::*;

/// Standard result type for all stat-arb operations
pub type StatArbResult<T> = Result<T, StatArbError>;
