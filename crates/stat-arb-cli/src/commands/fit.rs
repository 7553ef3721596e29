use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use stat_arb_core::backtest::prepare_pair;
use stat_arb_core::regression::{OlsFit, SpreadDiagnostics};
use stat_arb_core::with_metadata;

use crate::config::{load_config, PairArgs};

/// Arguments for fitting the hedge regression
#[derive(Args)]
pub struct FitArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Comma-separated boundaries to refit at after the initial fit
    /// (e.g. "2014-06-30,2014-12-31")
    #[arg(long, value_delimiter = ',')]
    pub walk_forward: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WalkForwardFit {
    boundary: String,
    fit: Option<OlsFit>,
    error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FitOutput {
    dependent: String,
    independent: String,
    sample_boundary: Option<String>,
    alpha: f64,
    beta: f64,
    rho: f64,
    observations: usize,
    spread_mean: f64,
    spread_stddev: f64,
    diagnostics: SpreadDiagnostics,
    walk_forward: Vec<WalkForwardFit>,
}

pub fn run_fit(args: FitArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let config = load_config(args.pair.config.as_deref())?;
    let pair = config.resolve_pair(&args.pair)?;
    let mut warnings = pair.warnings.clone();

    let prepared = prepare_pair(
        &pair.dependent,
        &pair.independent,
        pair.sample_boundary.as_deref(),
        &pair.spread_name,
    )?;
    let fit = prepared.fit();

    let mut estimator = prepared.estimator.clone();
    let mut walk_forward = Vec::with_capacity(args.walk_forward.len());
    for boundary in &args.walk_forward {
        match estimator.set_sample_boundary(boundary) {
            Ok(refit) => walk_forward.push(WalkForwardFit {
                boundary: boundary.clone(),
                fit: Some(refit),
                error: None,
            }),
            Err(e) => {
                warnings.push(format!("Refit at {boundary} failed: {e}"));
                walk_forward.push(WalkForwardFit {
                    boundary: boundary.clone(),
                    fit: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let output = FitOutput {
        dependent: pair.dependent.name.clone(),
        independent: pair.independent.name.clone(),
        sample_boundary: pair.sample_boundary.clone(),
        alpha: fit.alpha,
        beta: fit.beta,
        rho: fit.rho,
        observations: fit.observations,
        spread_mean: prepared.spread.sample_mean()?,
        spread_stddev: prepared.spread.sample_stddev()?,
        diagnostics: prepared.diagnostics.clone(),
        walk_forward,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let result = with_metadata(
        "OLS hedge regression of Y on X (in-sample)",
        &serde_json::json!({
            "dependent": pair.dependent.name,
            "independent": pair.independent.name,
            "sample_boundary": pair.sample_boundary,
            "stddev": "population",
        }),
        warnings,
        elapsed,
        output,
    );
    Ok(serde_json::to_value(result)?)
}
