//! Grid search over band multipliers for a single fitted pair.
//!
//! The pair is fitted and its spread built once. Each combination then gets
//! a fresh [`crate::signals::BandSignalEngine`] against the same spread, so cached spread
//! statistics are reused without ever crossing a boundary change.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::backtest::prepare_pair;
use crate::series::Window;
use crate::signals::{BandMultipliers, StopRearm};
use crate::types::*;
use crate::{StatArbError, StatArbResult};

fn default_sweep_mode() -> RunMode {
    RunMode::InSample
}

fn default_spread_name() -> String {
    "Spread".to_string()
}

/// Values swept for every multiplier, from `start` to `stop` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            start: 0.5,
            stop: 5.0,
            step: 0.5,
        }
    }
}

/// Input for a band-multiplier sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepInput {
    pub dependent: InstrumentInput,
    pub independent: InstrumentInput,
    #[serde(default)]
    pub sample_boundary: Option<String>,
    #[serde(default)]
    pub grid: SweepGrid,
    /// Window each combination is traded on (defaults to in-sample)
    #[serde(default = "default_sweep_mode")]
    pub mode: RunMode,
    #[serde(default)]
    pub stop_rearm: StopRearm,
    #[serde(default = "default_spread_name")]
    pub spread_name: String,
    /// Keep only the best `top` results in the output (all when `None`)
    #[serde(default)]
    pub top: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub bands: BandMultipliers,
    pub total_return: f64,
    pub round_trips: usize,
}

/// Output of a band-multiplier sweep, ranked by total return (best first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutput {
    pub beta: f64,
    pub combinations_evaluated: usize,
    pub combinations_failed: usize,
    pub best: Option<SweepResult>,
    pub best_total_return: Option<f64>,
    pub results: Vec<SweepResult>,
}

/// Generate `start, start + step, ... <= stop`.
///
/// Values are computed as `start + i * step` so that rounding does not
/// accumulate across the grid.
pub fn grid_values(grid: &SweepGrid) -> StatArbResult<Vec<f64>> {
    if !(grid.step.is_finite() && grid.step > 0.0) {
        return Err(StatArbError::InvalidInput {
            field: "grid.step".into(),
            reason: "Step must be positive".into(),
        });
    }
    if !grid.start.is_finite() || !grid.stop.is_finite() || grid.start > grid.stop {
        return Err(StatArbError::InvalidInput {
            field: "grid".into(),
            reason: "Start must be <= stop".into(),
        });
    }

    let tolerance = grid.step * 1e-9;
    let mut values = Vec::new();
    let mut i = 0u32;
    loop {
        let v = grid.start + f64::from(i) * grid.step;
        if v > grid.stop + tolerance {
            break;
        }
        values.push(v);
        i += 1;
    }
    Ok(values)
}

/// Every `(mean, trade, stop)` drawn from the grid with `mean < trade < stop`.
pub fn band_combinations(grid: &SweepGrid) -> StatArbResult<Vec<BandMultipliers>> {
    let values = grid_values(grid)?;
    let mut combos = Vec::new();
    for (i, &mean) in values.iter().enumerate() {
        for (j, &trade) in values.iter().enumerate().skip(i + 1) {
            for &stop in values.iter().skip(j + 1) {
                combos.push(BandMultipliers::new(mean, trade, stop));
            }
        }
    }
    Ok(combos)
}

/// Backtest every band combination against one fitted pair.
///
/// A combination that fails is skipped with a warning and counted; the
/// sweep itself only fails if the pair cannot be fitted.
pub fn run_band_sweep(input: &SweepInput) -> StatArbResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let combos = band_combinations(&input.grid)?;
    if combos.is_empty() {
        warnings.push("Grid yields fewer than three values; no combinations to evaluate".into());
    }

    let pair = prepare_pair(
        &input.dependent,
        &input.independent,
        input.sample_boundary.as_deref(),
        &input.spread_name,
    )?;
    let window = Window::from(input.mode);

    let mut results = Vec::with_capacity(combos.len());
    let mut failed = 0usize;
    for bands in &combos {
        let outcome = pair
            .engine(bands, input.stop_rearm)
            .and_then(|engine| pair.run(&engine, window));
        match outcome {
            Ok(run) => results.push(SweepResult {
                bands: *bands,
                total_return: run.total_return,
                round_trips: run.round_trips,
            }),
            Err(e) => {
                failed += 1;
                tracing::warn!(?bands, error = %e, "skipping band combination");
                warnings.push(format!(
                    "Evaluation failed at ({}, {}, {}): {e}",
                    bands.mean, bands.trade, bands.stop
                ));
            }
        }
    }

    results.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
    let evaluated = results.len();
    let best = results.first().cloned();
    if let Some(top) = input.top {
        results.truncate(top);
    }
    if let Some(b) = &best {
        tracing::info!(
            mean = b.bands.mean,
            trade = b.bands.trade,
            stop = b.bands.stop,
            total_return = b.total_return,
            evaluated,
            failed,
            "sweep complete"
        );
    }

    let output = SweepOutput {
        beta: pair.fit().beta,
        combinations_evaluated: evaluated,
        combinations_failed: failed,
        best_total_return: best.as_ref().map(|b| b.total_return),
        best,
        results,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Band Multiplier Grid Sweep (mean < trade < stop)",
        &serde_json::json!({
            "dependent": input.dependent.name,
            "independent": input.independent.name,
            "sample_boundary": input.sample_boundary,
            "grid": input.grid,
            "mode": input.mode,
            "stop_rearm": input.stop_rearm,
            "ranking": "total return, descending",
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_grid_values() {
        let values = grid_values(&SweepGrid::default()).unwrap();
        assert_eq!(values.len(), 10);
        assert!((values[0] - 0.5).abs() < 1e-12);
        assert!((values[9] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_includes_stop_despite_rounding() {
        let grid = SweepGrid {
            start: 0.1,
            stop: 0.3,
            step: 0.1,
        };
        assert_eq!(grid_values(&grid).unwrap().len(), 3);
    }

    #[test]
    fn test_combinations_are_strictly_ordered() {
        let combos = band_combinations(&SweepGrid::default()).unwrap();
        // C(10, 3)
        assert_eq!(combos.len(), 120);
        assert!(combos.iter().all(|b| b.mean < b.trade && b.trade < b.stop));
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let zero_step = SweepGrid {
            start: 0.5,
            stop: 1.0,
            step: 0.0,
        };
        assert!(grid_values(&zero_step).is_err());
        let inverted = SweepGrid {
            start: 2.0,
            stop: 1.0,
            step: 0.5,
        };
        assert!(grid_values(&inverted).is_err());
    }
}
