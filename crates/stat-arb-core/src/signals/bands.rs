use serde::{Deserialize, Serialize};

use crate::{StatArbError, StatArbResult};

/// Number of spread standard deviations for each band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandMultipliers {
    /// Mean-reversion exit band
    pub mean: f64,
    /// Entry band
    pub trade: f64,
    /// Stop-loss band
    pub stop: f64,
}

impl Default for BandMultipliers {
    fn default() -> Self {
        Self {
            mean: 0.5,
            trade: 1.0,
            stop: 2.5,
        }
    }
}

impl BandMultipliers {
    pub fn new(mean: f64, trade: f64, stop: f64) -> Self {
        Self { mean, trade, stop }
    }

    /// Reject multipliers that cannot produce a threshold at all.
    pub fn validate(&self) -> StatArbResult<()> {
        for (field, value) in [("mean", self.mean), ("trade", self.trade), ("stop", self.stop)] {
            if !value.is_finite() {
                return Err(StatArbError::InvalidInput {
                    field: format!("bands.{field}"),
                    reason: format!("multiplier must be finite, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Non-fatal problems with the band ordering. Signals still follow the
    /// fixed rule priority when these are present.
    pub fn ordering_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !(self.mean < self.trade && self.trade < self.stop) {
            warnings.push(format!(
                "Band multipliers should satisfy mean < trade < stop (got {} / {} / {}); \
                 signal ordering is undefined",
                self.mean, self.trade, self.stop
            ));
        }
        if self.mean < 0.0 {
            warnings.push(format!(
                "Negative mean multiplier {} places the upper mean band below the spread mean",
                self.mean
            ));
        }
        warnings
    }
}

/// The six absolute spread levels used by the signal engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub upper_stop: f64,
    pub upper_trade: f64,
    pub upper_mean: f64,
    pub lower_mean: f64,
    pub lower_trade: f64,
    pub lower_stop: f64,
}

impl BandThresholds {
    /// `mean ± k * sd` for each multiplier.
    pub fn from_stats(mean: f64, sd: f64, bands: &BandMultipliers) -> Self {
        Self {
            upper_stop: mean + bands.stop * sd,
            upper_trade: mean + bands.trade * sd,
            upper_mean: mean + bands.mean * sd,
            lower_mean: mean - bands.mean * sd,
            lower_trade: mean - bands.trade * sd,
            lower_stop: mean - bands.stop * sd,
        }
    }
}
