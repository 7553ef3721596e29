use clap::Args;
use serde_json::Value;

use stat_arb_core::backtest::{run_pairs_backtest, PairsBacktestInput};
use stat_arb_core::RunMode;

use crate::config::{load_config, PairArgs, TradeArgs};
use crate::report::open_reporter;

/// Arguments for a single backtest
#[derive(Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    #[command(flatten)]
    pub trade: TradeArgs,

    /// Write the run narrative to this file
    #[arg(long)]
    pub log_file: Option<String>,

    /// Echo the run narrative to stderr
    #[arg(long)]
    pub echo: bool,
}

pub fn run_backtest(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(args.pair.config.as_deref())?;
    let pair = config.resolve_pair(&args.pair)?;

    let input = PairsBacktestInput {
        dependent: pair.dependent,
        independent: pair.independent,
        sample_boundary: pair.sample_boundary,
        bands: config.bands(&args.trade),
        mode: config.mode(&args.trade, RunMode::OutOfSample),
        stop_rearm: config.stop_rearm(&args.trade),
        spread_name: pair.spread_name,
    };

    let log_file = args.log_file.as_deref().or(config.log_file.as_deref());
    let mut reporter = open_reporter(log_file, args.echo)?;
    let mut result = run_pairs_backtest(&input, reporter.as_mut())?;
    result.warnings.extend(pair.warnings);
    Ok(serde_json::to_value(result)?)
}
