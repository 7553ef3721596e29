//! Band-crossing signal generation over a spread series.
//!
//! - `bands`: multipliers and the six thresholds derived from spread stats
//! - `position`: the position state machine and its fixed rule priority
//! - `ledger`: log-price entries per leg and completed round trips
//! - `engine`: the single forward pass that ties them together

pub mod bands;
pub mod engine;
pub mod ledger;
pub mod position;

pub use bands::{BandMultipliers, BandThresholds};
pub use engine::{BandSignalEngine, SignalRun};
pub use ledger::{Leg, RoundTrip, Side, TradeLedger, TradeRecord};
pub use position::{Direction, ExitReason, PositionMachine, PositionState, SignalRule, StopRearm};
