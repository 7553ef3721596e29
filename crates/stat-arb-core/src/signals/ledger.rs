use serde::{Deserialize, Serialize};

use crate::series::Timestamp;

use super::position::{Direction, ExitReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    Y,
    X,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// One fill in the chronological trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: Timestamp,
    pub date: String,
    pub leg: Leg,
    pub side: Side,
    pub log_price: f64,
}

/// A completed open-then-close cycle in both legs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub direction: Direction,
    pub entry_date: String,
    pub exit_date: String,
    pub exit_reason: ExitReason,
    /// Sell minus buy log price of the Y leg
    pub y_return: f64,
    /// Sell minus buy log price of the X leg
    pub x_return: f64,
    pub total_return: f64,
}

/// Buy and sell log prices of one leg, appended in matching pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegLedger {
    pub buys: Vec<f64>,
    pub sells: Vec<f64>,
}

impl LegLedger {
    pub fn push(&mut self, side: Side, log_price: f64) {
        match side {
            Side::Buy => self.buys.push(log_price),
            Side::Sell => self.sells.push(log_price),
        }
    }

    /// Number of matched buy/sell pairs.
    pub fn completed(&self) -> usize {
        self.buys.len().min(self.sells.len())
    }

    /// `sum(sell - buy)` over the matched pairs.
    pub fn total_return(&self) -> f64 {
        self.sells
            .iter()
            .zip(&self.buys)
            .map(|(sell, buy)| sell - buy)
            .sum()
    }
}

/// Append-only record of every fill, split by leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLedger {
    pub y: LegLedger,
    pub x: LegLedger,
    pub records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn record(&mut self, record: TradeRecord) {
        match record.leg {
            Leg::Y => self.y.push(record.side, record.log_price),
            Leg::X => self.x.push(record.side, record.log_price),
        }
        self.records.push(record);
    }

    pub fn total_return(&self) -> f64 {
        self.y.total_return() + self.x.total_return()
    }

    pub fn round_trips(&self) -> usize {
        self.y.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(leg: Leg, side: Side, log_price: f64) -> TradeRecord {
        TradeRecord {
            timestamp: 0,
            date: "2014-11-03".into(),
            leg,
            side,
            log_price,
        }
    }

    #[test]
    fn test_leg_return_pairs_in_order() {
        let mut leg = LegLedger::default();
        leg.push(Side::Sell, 2.0);
        leg.push(Side::Buy, 1.5);
        leg.push(Side::Buy, 1.0);
        assert_eq!(leg.completed(), 1);
        assert_eq!(leg.total_return(), 0.5);
        leg.push(Side::Sell, 0.75);
        assert_eq!(leg.total_return(), 0.25);
    }

    #[test]
    fn test_ledger_sums_both_legs() {
        let mut ledger = TradeLedger::default();
        ledger.record(fill(Leg::Y, Side::Buy, 3.0));
        ledger.record(fill(Leg::X, Side::Sell, 2.0));
        ledger.record(fill(Leg::Y, Side::Sell, 3.25));
        ledger.record(fill(Leg::X, Side::Buy, 2.5));
        assert_eq!(ledger.round_trips(), 1);
        assert_eq!(ledger.total_return(), 0.25 - 0.5);
        assert_eq!(ledger.records.len(), 4);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite().opposite(), Side::Sell);
    }
}
