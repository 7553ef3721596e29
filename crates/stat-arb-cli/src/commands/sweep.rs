use clap::Args;
use serde_json::Value;

use stat_arb_core::sweep::{run_band_sweep, SweepGrid, SweepInput};
use stat_arb_core::RunMode;

use crate::config::{load_config, ModeArg, PairArgs, RearmArg, TradeArgs};

/// Arguments for a band-multiplier sweep
#[derive(Args)]
pub struct SweepArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// First multiplier in the grid
    #[arg(long)]
    pub start: Option<f64>,

    /// Last multiplier in the grid (inclusive)
    #[arg(long)]
    pub stop: Option<f64>,

    /// Grid spacing
    #[arg(long)]
    pub step: Option<f64>,

    /// Window every combination is traded on (default: in-sample)
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// When entries are allowed again after a stop-loss
    #[arg(long, value_enum)]
    pub stop_rearm: Option<RearmArg>,

    /// Only report the best N combinations
    #[arg(long)]
    pub top: Option<usize>,
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = load_config(args.pair.config.as_deref())?;
    let pair = config.resolve_pair(&args.pair)?;

    let base = config.grid.unwrap_or_default();
    let grid = SweepGrid {
        start: args.start.unwrap_or(base.start),
        stop: args.stop.unwrap_or(base.stop),
        step: args.step.unwrap_or(base.step),
    };
    let trade = TradeArgs {
        mode: args.mode,
        stop_rearm: args.stop_rearm,
        ..Default::default()
    };

    let input = SweepInput {
        dependent: pair.dependent,
        independent: pair.independent,
        sample_boundary: pair.sample_boundary,
        grid,
        mode: config.mode(&trade, RunMode::InSample),
        stop_rearm: config.stop_rearm(&trade),
        spread_name: pair.spread_name,
        top: args.top,
    };

    let mut result = run_band_sweep(&input)?;
    result.warnings.extend(pair.warnings);
    Ok(serde_json::to_value(result)?)
}
