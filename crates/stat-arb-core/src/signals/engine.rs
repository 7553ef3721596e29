use serde::{Deserialize, Serialize};

use crate::series::{DataPoint, Series, SpreadSeries, Timestamp, Window};
use crate::{StatArbError, StatArbResult};

use super::bands::{BandMultipliers, BandThresholds};
use super::ledger::{Leg, RoundTrip, Side, TradeLedger, TradeRecord};
use super::position::{Direction, PositionMachine, StopRearm, Transition};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of one forward pass over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalRun {
    /// Sum of sell-minus-buy log prices over both legs
    pub total_return: f64,
    /// Completed Y-leg cycles, including the forced close at window end
    pub round_trips: usize,
    pub trades: Vec<RoundTrip>,
    pub ledger: TradeLedger,
}

/// Replays consecutive spread observations against fixed bands and trades
/// the pair: 1 unit of Y against `beta` units of X.
#[derive(Debug, Clone)]
pub struct BandSignalEngine {
    thresholds: BandThresholds,
    hedge_ratio: f64,
    stop_rearm: StopRearm,
}

#[derive(Debug, Clone)]
struct OpenPosition {
    direction: Direction,
    entry_date: String,
    y_side: Side,
    y_log_price: f64,
    x_side: Side,
    x_log_price: f64,
}

/// Ledger plus the position being carried between steps.
#[derive(Debug, Default)]
struct Book {
    ledger: TradeLedger,
    trades: Vec<RoundTrip>,
    open: Option<OpenPosition>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl BandSignalEngine {
    pub fn new(thresholds: BandThresholds, hedge_ratio: f64) -> StatArbResult<Self> {
        if !hedge_ratio.is_finite() || hedge_ratio == 0.0 {
            return Err(StatArbError::InvalidInput {
                field: "hedge_ratio".into(),
                reason: format!("must be finite and non-zero to price the X leg, got {hedge_ratio}"),
            });
        }
        Ok(Self {
            thresholds,
            hedge_ratio,
            stop_rearm: StopRearm::default(),
        })
    }

    /// Derive the six thresholds from the spread's in-sample mean and
    /// standard deviation.
    pub fn from_spread<S: Series>(
        spread: &SpreadSeries<S>,
        bands: &BandMultipliers,
        hedge_ratio: f64,
    ) -> StatArbResult<Self> {
        bands.validate()?;
        let thresholds =
            BandThresholds::from_stats(spread.sample_mean()?, spread.sample_stddev()?, bands);
        Self::new(thresholds, hedge_ratio)
    }

    pub fn with_stop_rearm(mut self, stop_rearm: StopRearm) -> Self {
        self.stop_rearm = stop_rearm;
        self
    }

    pub fn thresholds(&self) -> &BandThresholds {
        &self.thresholds
    }

    pub fn hedge_ratio(&self) -> f64 {
        self.hedge_ratio
    }

    /// Walk `window` of the spread and both legs in lockstep.
    ///
    /// Each step compares the previous and current spread values and trades
    /// at the current Y/X observations. A position still open after the last
    /// step is closed at the last observation of the window. Inputs are not
    /// modified.
    pub fn run<S, Y, X>(&self, spread: &S, y: &Y, x: &X, window: Window) -> StatArbResult<SignalRun>
    where
        S: Series + ?Sized,
        Y: Series + ?Sized,
        X: Series + ?Sized,
    {
        let mut machine = PositionMachine::new(self.stop_rearm);
        let mut book = Book::default();

        let mut steps = spread
            .points(window)
            .zip(y.points(window))
            .zip(x.points(window));

        let Some((((_, first), _), _)) = steps.next() else {
            return Ok(SignalRun::default());
        };
        let mut prev = first.value();

        for (((_, s), (ty, py)), (tx, px)) in steps {
            let curr = s.value();
            if let Some((rule, transition)) = machine.step(prev, curr, &self.thresholds) {
                tracing::debug!(?rule, date = %s.date(), prev, curr, "band crossed");
                if let Some(transition) = transition {
                    self.apply(&mut book, transition, (ty, py), (tx, px), y, x)?;
                }
            }
            prev = curr;
        }

        if let Some(transition) = machine.force_close() {
            let (last_y, last_x) = match (y.last(window), x.last(window)) {
                (Some(ly), Some(lx)) => (ly, lx),
                _ => {
                    return Err(StatArbError::InvalidInput {
                        field: "window".into(),
                        reason: "position open but a leg has no closing observation".into(),
                    })
                }
            };
            self.apply(&mut book, transition, last_y, last_x, y, x)?;
        }

        let run = SignalRun {
            total_return: book.ledger.total_return(),
            round_trips: book.ledger.round_trips(),
            trades: book.trades,
            ledger: book.ledger,
        };
        tracing::debug!(
            total_return = run.total_return,
            round_trips = run.round_trips,
            ?window,
            "signal pass complete"
        );
        Ok(run)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn apply<Y, X>(
        &self,
        book: &mut Book,
        transition: Transition,
        (ty, py): (Timestamp, &DataPoint),
        (tx, px): (Timestamp, &DataPoint),
        y: &Y,
        x: &X,
    ) -> StatArbResult<()>
    where
        Y: Series + ?Sized,
        X: Series + ?Sized,
    {
        let y_log = log_price(y.name(), py, 1.0)?;
        let x_log = log_price(x.name(), px, self.hedge_ratio.abs())?;

        match transition {
            Transition::Open(direction) => {
                let y_side = match direction {
                    Direction::LongY => Side::Buy,
                    Direction::ShortY => Side::Sell,
                };
                // A negative hedge ratio means the X leg trades the same way as Y
                let x_side = if self.hedge_ratio > 0.0 {
                    y_side.opposite()
                } else {
                    y_side
                };
                book.ledger.record(fill(ty, py, Leg::Y, y_side, y_log));
                book.ledger.record(fill(tx, px, Leg::X, x_side, x_log));
                book.open = Some(OpenPosition {
                    direction,
                    entry_date: py.date().to_string(),
                    y_side,
                    y_log_price: y_log,
                    x_side,
                    x_log_price: x_log,
                });
            }
            Transition::Close { direction, reason } => {
                let open = book.open.take().ok_or_else(|| StatArbError::InvalidInput {
                    field: "position".into(),
                    reason: format!("close of {direction:?} without an open position"),
                })?;
                book.ledger
                    .record(fill(ty, py, Leg::Y, open.y_side.opposite(), y_log));
                book.ledger
                    .record(fill(tx, px, Leg::X, open.x_side.opposite(), x_log));

                let y_return = leg_return(open.y_side, open.y_log_price, y_log);
                let x_return = leg_return(open.x_side, open.x_log_price, x_log);
                book.trades.push(RoundTrip {
                    direction: open.direction,
                    entry_date: open.entry_date,
                    exit_date: py.date().to_string(),
                    exit_reason: reason,
                    y_return,
                    x_return,
                    total_return: y_return + x_return,
                });
            }
        }
        Ok(())
    }
}

fn fill(timestamp: Timestamp, point: &DataPoint, leg: Leg, side: Side, log_price: f64) -> TradeRecord {
    TradeRecord {
        timestamp,
        date: point.date().to_string(),
        leg,
        side,
        log_price,
    }
}

fn log_price(series: &str, point: &DataPoint, units: f64) -> StatArbResult<f64> {
    let notional = units * point.value();
    if notional <= 0.0 || !notional.is_finite() {
        return Err(StatArbError::InvalidInput {
            field: format!("{series}.points"),
            reason: format!(
                "cannot take the log of a non-positive price {} on {}",
                point.value(),
                point.date()
            ),
        });
    }
    Ok(notional.ln())
}

/// Sell minus buy, whichever order the two fills happened in.
fn leg_return(open_side: Side, open_log: f64, close_log: f64) -> f64 {
    match open_side {
        Side::Buy => close_log - open_log,
        Side::Sell => open_log - close_log,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::DatedSeries;
    use crate::signals::position::ExitReason;

    fn series(name: &str, values: &[f64]) -> DatedSeries {
        let mut s = DatedSeries::new(name);
        for (i, v) in values.iter().enumerate() {
            s.insert(&format!("2014-11-{:02}", i + 1), *v).unwrap();
        }
        s
    }

    fn unit_engine(beta: f64) -> BandSignalEngine {
        let t = BandThresholds::from_stats(0.0, 1.0, &BandMultipliers::new(0.5, 1.0, 2.0));
        BandSignalEngine::new(t, beta).unwrap()
    }

    #[test]
    fn test_no_crossings_no_trades() {
        let spread = series("S", &[0.1, -0.1, 0.2, 0.0]);
        let y = series("Y", &[10.0; 4]);
        let x = series("X", &[20.0; 4]);
        let run = unit_engine(1.0).run(&spread, &y, &x, Window::Full).unwrap();
        assert_eq!(run, SignalRun::default());
    }

    #[test]
    fn test_short_round_trip_returns() {
        let spread = series("S", &[0.0, 1.5, 0.2]);
        let y = series("Y", &[10.0, 12.0, 11.0]);
        let x = series("X", &[20.0, 21.0, 23.0]);
        let run = unit_engine(0.5).run(&spread, &y, &x, Window::Full).unwrap();

        assert_eq!(run.round_trips, 1);
        // Short Y at 12, cover at 11; long X at 0.5*21, sell at 0.5*23
        let expected = (12f64.ln() - 11f64.ln()) + ((0.5f64 * 23.0).ln() - (0.5f64 * 21.0).ln());
        assert!((run.total_return - expected).abs() < 1e-12);
        assert_eq!(run.trades[0].direction, Direction::ShortY);
        assert_eq!(run.trades[0].exit_date, "2014-11-03");
        assert!((run.trades[0].total_return - expected).abs() < 1e-12);
        assert_eq!(run.ledger.records.len(), 4);
    }

    #[test]
    fn test_forced_close_uses_last_observation() {
        let spread = series("S", &[0.0, -1.5, -1.4, -1.3]);
        let y = series("Y", &[10.0, 9.0, 9.5, 9.8]);
        let x = series("X", &[5.0, 5.5, 5.2, 5.1]);
        let run = unit_engine(1.0).run(&spread, &y, &x, Window::Full).unwrap();

        assert_eq!(run.round_trips, 1);
        let trip = &run.trades[0];
        assert_eq!(trip.exit_reason, ExitReason::WindowEnd);
        assert_eq!(trip.exit_date, "2014-11-04");
        let expected = (9.8f64.ln() - 9.0f64.ln()) + (5.5f64.ln() - 5.1f64.ln());
        assert!((run.total_return - expected).abs() < 1e-12);
    }

    #[test]
    fn test_negative_hedge_ratio_flips_x_side() {
        let spread = series("S", &[0.0, -1.5, 0.0]);
        let y = series("Y", &[10.0, 9.0, 10.0]);
        let x = series("X", &[5.0, 4.0, 4.4]);
        let run = unit_engine(-2.0).run(&spread, &y, &x, Window::Full).unwrap();

        let x_fills: Vec<Side> = run
            .ledger
            .records
            .iter()
            .filter(|r| r.leg == Leg::X)
            .map(|r| r.side)
            .collect();
        assert_eq!(x_fills, vec![Side::Buy, Side::Sell]);
        assert!((run.trades[0].x_return - (4.4f64 / 4.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_zero_hedge_ratio_rejected() {
        let t = BandThresholds::from_stats(0.0, 1.0, &BandMultipliers::default());
        assert!(BandSignalEngine::new(t, 0.0).is_err());
        assert!(BandSignalEngine::new(t, f64::NAN).is_err());
    }

    #[test]
    fn test_non_positive_price_aborts() {
        let spread = series("S", &[0.0, 1.5]);
        let y = series("Y", &[10.0, -1.0]);
        let x = series("X", &[20.0, 21.0]);
        let err = unit_engine(1.0).run(&spread, &y, &x, Window::Full).unwrap_err();
        assert!(err.to_string().contains("non-positive price"));
    }

    #[test]
    fn test_single_observation_window() {
        let spread = series("S", &[3.0]);
        let y = series("Y", &[1.0]);
        let x = series("X", &[1.0]);
        let run = unit_engine(1.0).run(&spread, &y, &x, Window::Full).unwrap();
        assert_eq!(run.round_trips, 0);
    }
}
