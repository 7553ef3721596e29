use pretty_assertions::assert_eq;
use stat_arb_core::backtest::{run_pairs_backtest, NullReporter, PairsBacktestInput};
use stat_arb_core::signals::{BandMultipliers, Direction, ExitReason, Leg, Side, StopRearm};
use stat_arb_core::{InstrumentInput, PricePoint, RunMode, StatArbError};

// ===========================================================================
// Fixture: Y = 1 + 0.5 X + noise
// ===========================================================================
//
// In-sample noise is symmetric around the centre of X and sums to zero, so
// the fit is exactly alpha = 1, beta = 0.5 and the in-sample residuals are
// the noise itself: mean 0, population sd sqrt(0.16 / 6).
//
// Out-of-sample residuals 0, -0.2, -0.1, 0 cross the lower trade band on
// the 8th point and the lower mean band on the 10th.

const X: [f64; 10] = [10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0, 26.0, 28.0];
const NOISE: [f64; 10] = [0.2, -0.2, 0.0, 0.0, -0.2, 0.2, 0.0, -0.2, -0.1, 0.0];

fn dates() -> Vec<String> {
    (1..=10).map(|d| format!("2014-10-{d:02}")).collect()
}

fn pair_input(mode: RunMode) -> PairsBacktestInput {
    let dates = dates();
    let y: Vec<PricePoint> = X
        .iter()
        .zip(NOISE.iter())
        .zip(dates.iter())
        .map(|((x, n), d)| PricePoint::new(d.clone(), 1.0 + 0.5 * x + n))
        .collect();
    let x: Vec<PricePoint> = X
        .iter()
        .zip(dates.iter())
        .map(|(x, d)| PricePoint::new(d.clone(), *x))
        .collect();
    PairsBacktestInput {
        dependent: InstrumentInput {
            name: "Y".into(),
            points: y,
        },
        independent: InstrumentInput {
            name: "X".into(),
            points: x,
        },
        sample_boundary: Some("2014-10-06".into()),
        bands: BandMultipliers::new(0.5, 1.0, 2.0),
        mode,
        stop_rearm: StopRearm::AtMeanCross,
        spread_name: "Spread".into(),
    }
}

#[test]
fn test_fit_and_thresholds_from_in_sample() {
    let out = run_pairs_backtest(&pair_input(RunMode::OutOfSample), &mut NullReporter).unwrap();
    let r = &out.result;

    assert!((r.regression.alpha - 1.0).abs() < 1e-9);
    assert!((r.regression.beta - 0.5).abs() < 1e-9);
    assert_eq!(r.regression.observations, 6);
    assert!(r.spread_mean.abs() < 1e-9);

    let sd = (0.16f64 / 6.0).sqrt();
    assert!((r.spread_stddev - sd).abs() < 1e-9);
    assert!((r.thresholds.lower_trade + sd).abs() < 1e-9);
    assert!((r.thresholds.upper_stop - 2.0 * sd).abs() < 1e-9);
}

#[test]
fn test_out_of_sample_single_round_trip() {
    let out = run_pairs_backtest(&pair_input(RunMode::OutOfSample), &mut NullReporter).unwrap();
    let r = &out.result;

    assert_eq!(r.window_observations, 4);
    assert_eq!(r.round_trips, 1);

    // Long Y / short X on the 8th point, unwound on the 10th
    let expected = (15.0f64.ln() - 12.8f64.ln()) + (12.0f64.ln() - 14.0f64.ln());
    assert!((r.total_return - expected).abs() < 1e-9);

    let trip = &r.trades[0];
    assert_eq!(trip.direction, Direction::LongY);
    assert_eq!(trip.entry_date, "2014-10-08");
    assert_eq!(trip.exit_date, "2014-10-10");
    assert_eq!(trip.exit_reason, ExitReason::MeanReversion);

    let fills: Vec<(Leg, Side, &str)> = r
        .ledger
        .iter()
        .map(|t| (t.leg, t.side, t.date.as_str()))
        .collect();
    assert_eq!(
        fills,
        vec![
            (Leg::Y, Side::Buy, "2014-10-08"),
            (Leg::X, Side::Sell, "2014-10-08"),
            (Leg::Y, Side::Sell, "2014-10-10"),
            (Leg::X, Side::Buy, "2014-10-10"),
        ]
    );
}

#[test]
fn test_in_sample_priority_consumes_first_step() {
    // 0.2 -> -0.2 crosses both the upper mean and the lower trade band; the
    // mean rule wins, so the only trade opens on the 5th point.
    let out = run_pairs_backtest(&pair_input(RunMode::InSample), &mut NullReporter).unwrap();
    let r = &out.result;

    assert_eq!(r.window_observations, 6);
    assert_eq!(r.round_trips, 1);
    assert_eq!(r.trades[0].entry_date, "2014-10-05");
    assert_eq!(r.trades[0].exit_date, "2014-10-06");

    let expected = (11.2f64.ln() - 9.8f64.ln()) + (9.0f64.ln() - 10.0f64.ln());
    assert!((r.total_return - expected).abs() < 1e-9);
}

#[test]
fn test_forced_close_on_last_out_of_sample_point() {
    let mut input = pair_input(RunMode::OutOfSample);
    // Leave the spread below the lower mean band on the final point
    input.dependent.points[9].value = 1.0 + 0.5 * 28.0 - 0.15;
    let out = run_pairs_backtest(&input, &mut NullReporter).unwrap();
    let r = &out.result;

    assert_eq!(r.round_trips, 1);
    assert_eq!(r.trades[0].exit_reason, ExitReason::WindowEnd);
    assert_eq!(r.trades[0].exit_date, "2014-10-10");
    let expected = (14.85f64.ln() - 12.8f64.ln()) + (12.0f64.ln() - 14.0f64.ln());
    assert!((r.total_return - expected).abs() < 1e-9);
}

#[test]
fn test_narrative_is_recorded() {
    let mut lines: Vec<String> = Vec::new();
    run_pairs_backtest(&pair_input(RunMode::OutOfSample), &mut lines).unwrap();

    assert!(lines[0].starts_with("The linear regression is Y = 1.000000 + 0.500000X"));
    assert!(lines
        .iter()
        .any(|l| l == "Here are the results for the period starting on 2014-10-07:"));
    assert!(lines.iter().any(|l| l.contains("2014-10-08: buy Y")));
    assert_eq!(lines.last().map(String::as_str), Some("- round trips: 1."));
}

#[test]
fn test_malformed_boundary_aborts() {
    let mut input = pair_input(RunMode::OutOfSample);
    input.sample_boundary = Some("2014/10/06".into());
    let err = run_pairs_backtest(&input, &mut NullReporter).unwrap_err();
    assert!(matches!(err, StatArbError::MalformedDate { .. }));
}

#[test]
fn test_non_positive_price_aborts() {
    let mut input = pair_input(RunMode::OutOfSample);
    input.independent.points[7].value = -1.0;
    input.dependent.points[7].value = 1.0 + 0.5 * -1.0 - 0.2;
    let result = run_pairs_backtest(&input, &mut NullReporter);
    assert!(result.is_err());
}

#[test]
fn test_duplicate_input_date_rejected() {
    let mut input = pair_input(RunMode::OutOfSample);
    input.dependent.points[1].date = "2014-10-01".into();
    let err = run_pairs_backtest(&input, &mut NullReporter).unwrap_err();
    assert!(err.to_string().contains("duplicate date"));
}
