use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::regression::{OlsEstimator, OlsFit, SpreadDiagnostics};
use crate::series::{parse_date, DatedSeries, Series, SpreadSeries, Window};
use crate::signals::{
    BandMultipliers, BandSignalEngine, BandThresholds, Leg, RoundTrip, Side, SignalRun,
    StopRearm, TradeRecord,
};
use crate::types::*;
use crate::{StatArbError, StatArbResult};

use super::report::RunReporter;

fn default_spread_name() -> String {
    "Spread".to_string()
}

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Input for a single pairs backtest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsBacktestInput {
    /// Dependent instrument (Y)
    pub dependent: InstrumentInput,
    /// Independent instrument (X), date-aligned with Y
    pub independent: InstrumentInput,
    /// Last in-sample date (inclusive); `None` makes the whole history in-sample
    #[serde(default)]
    pub sample_boundary: Option<String>,
    #[serde(default)]
    pub bands: BandMultipliers,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub stop_rearm: StopRearm,
    #[serde(default = "default_spread_name")]
    pub spread_name: String,
}

/// Output of a single pairs backtest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairsBacktestOutput {
    pub dependent: String,
    pub independent: String,
    pub sample_boundary: Option<String>,
    pub mode: RunMode,
    pub regression: OlsFit,
    /// In-sample mean of the spread
    pub spread_mean: f64,
    /// In-sample population standard deviation of the spread
    pub spread_stddev: f64,
    pub thresholds: BandThresholds,
    pub diagnostics: SpreadDiagnostics,
    /// Observations in the traded window
    pub window_observations: usize,
    pub total_return: f64,
    pub round_trips: usize,
    pub trades: Vec<RoundTrip>,
    pub ledger: Vec<TradeRecord>,
}

/// The fitted pair and its spread, ready to be traded with any set of bands.
///
/// Fitting happens once; the spread's cached statistics stay valid for as
/// long as the boundary does not move.
#[derive(Debug, Clone)]
pub struct PreparedPair {
    pub estimator: OlsEstimator,
    pub spread: SpreadSeries,
    pub diagnostics: SpreadDiagnostics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl PreparedPair {
    pub fn fit(&self) -> OlsFit {
        self.estimator.fit()
    }

    pub fn engine(
        &self,
        bands: &BandMultipliers,
        stop_rearm: StopRearm,
    ) -> StatArbResult<BandSignalEngine> {
        Ok(BandSignalEngine::from_spread(&self.spread, bands, self.estimator.beta())?
            .with_stop_rearm(stop_rearm))
    }

    pub fn run(&self, engine: &BandSignalEngine, window: Window) -> StatArbResult<SignalRun> {
        engine.run(&self.spread, self.estimator.y(), self.estimator.x(), window)
    }
}

/// Load both instruments, check their alignment, fit Y on X over the
/// in-sample window and build the residual spread.
pub fn prepare_pair(
    dependent: &InstrumentInput,
    independent: &InstrumentInput,
    sample_boundary: Option<&str>,
    spread_name: &str,
) -> StatArbResult<PreparedPair> {
    let mut y = DatedSeries::from_points(&dependent.name, &dependent.points)?;
    let mut x = DatedSeries::from_points(&independent.name, &independent.points)?;
    check_alignment(&y, &x)?;

    if let Some(date) = sample_boundary {
        y.set_sample_boundary(date)?;
        x.set_sample_boundary(date)?;
    }

    let estimator = OlsEstimator::new(y, x)?;
    let fit = estimator.fit();
    tracing::debug!(
        y = %dependent.name,
        x = %independent.name,
        alpha = fit.alpha,
        beta = fit.beta,
        rho = fit.rho,
        n = fit.observations,
        "fitted pair"
    );

    let spread = SpreadSeries::new(estimator.residuals(spread_name));
    let diagnostics = SpreadDiagnostics::analyze(&spread.values(Window::InSample), &fit);

    Ok(PreparedPair {
        estimator,
        spread,
        diagnostics,
    })
}

/// Run one pairs backtest over the window selected by `input.mode`.
///
/// The narrative of the run goes to `reporter`; the structured result is
/// returned in the computation envelope.
pub fn run_pairs_backtest(
    input: &PairsBacktestInput,
    reporter: &mut dyn RunReporter,
) -> StatArbResult<ComputationOutput<PairsBacktestOutput>> {
    let start = Instant::now();
    let mut warnings = input.bands.ordering_warnings();
    for w in &warnings {
        tracing::warn!("{w}");
    }
    input.bands.validate()?;

    let pair = prepare_pair(
        &input.dependent,
        &input.independent,
        input.sample_boundary.as_deref(),
        &input.spread_name,
    )?;
    let fit = pair.fit();
    let engine = pair.engine(&input.bands, input.stop_rearm)?;
    let thresholds = *engine.thresholds();
    let spread_mean = pair.spread.sample_mean()?;
    let spread_stddev = pair.spread.sample_stddev()?;

    let names = LegNames {
        y: &input.dependent.name,
        x: &input.independent.name,
        spread: &input.spread_name,
    };
    report_setup(reporter, &names, &fit, spread_stddev, &thresholds);

    let window = Window::from(input.mode);
    if window == Window::OutOfSample && input.sample_boundary.is_none() {
        warnings.push(
            "No sample boundary set: the out-of-sample window is empty and no trades are made"
                .into(),
        );
    }
    reporter.record(&window_header(window, input.sample_boundary.as_deref())?);

    let run = pair.run(&engine, window)?;
    for record in &run.ledger.records {
        reporter.record(&trade_line(record, &names));
    }
    reporter.record(&format!("- total return: {:.6};", run.total_return));
    reporter.record(&format!("- round trips: {}.", run.round_trips));
    tracing::info!(
        y = %input.dependent.name,
        x = %input.independent.name,
        mode = ?input.mode,
        total_return = run.total_return,
        round_trips = run.round_trips,
        "backtest complete"
    );

    let output = PairsBacktestOutput {
        dependent: input.dependent.name.clone(),
        independent: input.independent.name.clone(),
        sample_boundary: input.sample_boundary.clone(),
        mode: input.mode,
        regression: fit,
        spread_mean,
        spread_stddev,
        thresholds,
        diagnostics: pair.diagnostics.clone(),
        window_observations: pair.spread.points(window).count(),
        total_return: run.total_return,
        round_trips: run.round_trips,
        trades: run.trades,
        ledger: run.ledger.records,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Pairs Trading Backtest (OLS spread, band crossings)",
        &serde_json::json!({
            "dependent": input.dependent.name,
            "independent": input.independent.name,
            "sample_boundary": input.sample_boundary,
            "bands": input.bands,
            "mode": input.mode,
            "stop_rearm": input.stop_rearm,
            "hedge": "1 unit Y against beta units X",
            "returns": "sum of sell minus buy log prices over both legs",
            "stddev": "population",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct LegNames<'a> {
    y: &'a str,
    x: &'a str,
    spread: &'a str,
}

fn check_alignment(y: &DatedSeries, x: &DatedSeries) -> StatArbResult<()> {
    if y.len() != x.len() {
        return Err(StatArbError::InvalidInput {
            field: "independent.points".into(),
            reason: format!(
                "{} has {} observations but {} has {}",
                x.name(),
                x.len(),
                y.name(),
                y.len()
            ),
        });
    }
    let mismatch = y
        .points(Window::Full)
        .zip(x.points(Window::Full))
        .find(|((ty, _), (tx, _))| ty != tx);
    if let Some(((_, py), (_, px))) = mismatch {
        return Err(StatArbError::InvalidInput {
            field: "independent.points".into(),
            reason: format!(
                "dates are not aligned: {} has {} where {} has {}",
                y.name(),
                py.date(),
                x.name(),
                px.date()
            ),
        });
    }
    Ok(())
}

fn report_setup(
    reporter: &mut dyn RunReporter,
    names: &LegNames<'_>,
    fit: &OlsFit,
    spread_stddev: f64,
    t: &BandThresholds,
) {
    reporter.record(&format!(
        "The linear regression is {} = {:.6} + {:.6}{}",
        names.y, fit.alpha, fit.beta, names.x
    ));
    reporter.record(&format!(
        "The standard deviation of the {} time series is {:.6}, so:",
        names.spread, spread_stddev
    ));
    for (label, level) in [
        ("upper stop", t.upper_stop),
        ("upper trade", t.upper_trade),
        ("upper mean", t.upper_mean),
        ("lower mean", t.lower_mean),
        ("lower trade", t.lower_trade),
        ("lower stop", t.lower_stop),
    ] {
        reporter.record(&format!("- {label} signal: {level:.6}"));
    }
    reporter.record("Here are the trading rules:");
    reporter.record(&format!(
        "- if {} crosses above the upper trade signal: sell 1 unit of {} and buy beta units of {};",
        names.spread, names.y, names.x
    ));
    reporter.record(&format!(
        "- if {} crosses below the lower trade signal: buy 1 unit of {} and sell beta units of {};",
        names.spread, names.y, names.x
    ));
    reporter.record(&format!(
        "- if {} crosses a stop signal: close the current position;",
        names.spread
    ));
    reporter.record(&format!(
        "- when {} returns to its mean area: close the current position (if any) and begin again.",
        names.spread
    ));
}

fn window_header(window: Window, boundary: Option<&str>) -> StatArbResult<String> {
    let header = match (window, boundary) {
        (Window::InSample, Some(date)) => {
            format!("Here are the backtesting results for the period ending in {date}:")
        }
        (Window::OutOfSample, Some(date)) => {
            let (day, _) = parse_date(date)?;
            let next = day.succ_opt().ok_or_else(|| StatArbError::MalformedDate {
                input: date.to_string(),
                reason: "no following calendar day".into(),
            })?;
            format!("Here are the results for the period starting on {next}:")
        }
        (Window::OutOfSample, None) => {
            "Here are the results for the out-of-sample period (empty, no boundary set):".into()
        }
        (Window::InSample | Window::Full, _) => {
            "Here are the backtesting results for the full history:".into()
        }
    };
    Ok(header)
}

fn trade_line(record: &TradeRecord, names: &LegNames<'_>) -> String {
    let side = match record.side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    };
    let leg = match record.leg {
        Leg::Y => names.y,
        Leg::X => names.x,
    };
    format!(
        "- {}: {side} {leg} at log price {:.6}",
        record.date, record.log_price
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::NullReporter;

    fn instrument(name: &str, values: &[f64]) -> InstrumentInput {
        InstrumentInput {
            name: name.into(),
            points: values
                .iter()
                .enumerate()
                .map(|(i, v)| PricePoint::new(format!("2014-10-{:02}", i + 1), *v))
                .collect(),
        }
    }

    fn input(y: &[f64], x: &[f64]) -> PairsBacktestInput {
        PairsBacktestInput {
            dependent: instrument("GE", y),
            independent: instrument("UTX", x),
            sample_boundary: Some("2014-10-06".into()),
            bands: BandMultipliers::new(0.5, 1.0, 2.0),
            mode: RunMode::OutOfSample,
            stop_rearm: StopRearm::AtMeanCross,
            spread_name: default_spread_name(),
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let inp = input(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
        let err = run_pairs_backtest(&inp, &mut NullReporter).unwrap_err();
        assert!(matches!(err, StatArbError::InvalidInput { .. }));
    }

    #[test]
    fn test_date_mismatch_rejected() {
        let mut inp = input(&[1.0, 2.0, 3.0], &[1.0, 2.5, 2.9]);
        inp.independent.points[2].date = "2014-10-09".into();
        let err = run_pairs_backtest(&inp, &mut NullReporter).unwrap_err();
        assert!(err.to_string().contains("not aligned"));
    }

    #[test]
    fn test_degenerate_fit_aborts_run() {
        let inp = input(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], &[3.0; 7]);
        let err = run_pairs_backtest(&inp, &mut NullReporter).unwrap_err();
        assert!(matches!(err, StatArbError::DegenerateRegression(_)));
    }

    #[test]
    fn test_reporter_narrative_order() {
        let inp = input(
            &[10.0, 10.4, 10.1, 10.9, 10.3, 10.6, 10.2, 10.8, 10.5, 10.7],
            &[20.0, 20.5, 20.3, 21.4, 20.4, 21.0, 20.9, 21.1, 20.6, 21.2],
        );
        let mut lines: Vec<String> = Vec::new();
        run_pairs_backtest(&inp, &mut lines).unwrap();

        assert!(lines[0].starts_with("The linear regression is GE = "));
        assert!(lines[0].ends_with("UTX"));
        assert!(lines[1].starts_with("The standard deviation of the Spread"));
        assert!(lines[2].starts_with("- upper stop signal:"));
        assert_eq!(lines[8], "Here are the trading rules:");
        assert_eq!(
            lines[13],
            "Here are the results for the period starting on 2014-10-07:"
        );
        assert!(lines[lines.len() - 2].starts_with("- total return:"));
        assert!(lines[lines.len() - 1].starts_with("- round trips:"));
    }

    #[test]
    fn test_out_of_sample_without_boundary_warns() {
        let mut inp = input(&[1.0, 2.1, 2.9, 4.2], &[1.0, 2.0, 3.0, 4.0]);
        inp.sample_boundary = None;
        let out = run_pairs_backtest(&inp, &mut NullReporter).unwrap();
        assert_eq!(out.result.window_observations, 0);
        assert_eq!(out.result.round_trips, 0);
        assert!(out.warnings.iter().any(|w| w.contains("out-of-sample window is empty")));
    }

    #[test]
    fn test_band_ordering_warning_is_not_fatal() {
        let mut inp = input(
            &[10.0, 10.4, 10.1, 10.9, 10.3, 10.6, 10.2, 10.8],
            &[20.0, 20.5, 20.3, 21.4, 20.4, 21.0, 20.9, 21.1],
        );
        inp.bands = BandMultipliers::new(1.0, 0.5, 2.0);
        let out = run_pairs_backtest(&inp, &mut NullReporter).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("mean < trade < stop")));
        assert_eq!(out.metadata.precision, "f64");
    }

    #[test]
    fn test_input_defaults_from_json() {
        let json = serde_json::json!({
            "dependent": {"name": "GE", "points": [{"date": "2014-01-02", "value": 1.0}]},
            "independent": {"name": "UTX", "points": [{"date": "2014-01-02", "value": 2.0}]},
        });
        let inp: PairsBacktestInput = serde_json::from_value(json).unwrap();
        assert_eq!(inp.bands, BandMultipliers::default());
        assert_eq!(inp.mode, RunMode::OutOfSample);
        assert_eq!(inp.stop_rearm, StopRearm::AtMeanCross);
        assert_eq!(inp.spread_name, "Spread");
    }
}
