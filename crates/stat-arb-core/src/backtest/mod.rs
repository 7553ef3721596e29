//! End-to-end pairs backtest: fit, spread, bands and one signal pass.

pub mod pipeline;
pub mod report;

pub use pipeline::{prepare_pair, run_pairs_backtest, PairsBacktestInput, PairsBacktestOutput, PreparedPair};
pub use report::{NullReporter, RunReporter};
