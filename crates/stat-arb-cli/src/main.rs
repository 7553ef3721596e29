mod commands;
mod config;
mod input;
mod output;
mod report;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use commands::backtest::BacktestArgs;
use commands::fit::FitArgs;
use commands::sweep::SweepArgs;

/// Band-crossing pairs-trading backtests
#[derive(Parser)]
#[command(
    name = "statarb",
    version,
    about = "Backtest a statistical-arbitrage pairs strategy",
    long_about = "Fits Y on X by ordinary least squares over an in-sample window, builds \
                  the residual spread and trades crossings of mean/trade/stop bands. \
                  Prices are read from date,value CSV files; settings may come from a \
                  JSON or YAML config file, piped JSON, or flags."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log run summaries to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log fits, statistics and individual trades to stderr
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single pairs backtest
    Backtest(BacktestArgs),
    /// Sweep band multipliers and rank them by total return
    Sweep(SweepArgs),
    /// Fit the hedge regression and report spread diagnostics
    Fit(FitArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool, debug: bool) {
    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout carries the formatted result only
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Backtest(args) => commands::backtest::run_backtest(args),
        Commands::Sweep(args) => commands::sweep::run_sweep(args),
        Commands::Fit(args) => commands::fit::run_fit(args),
        Commands::Version => {
            println!("statarb {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
