pub mod backtest;
pub mod fit;
pub mod sweep;
