use serde::{Deserialize, Serialize};

use super::bands::BandThresholds;

/// Direction of an open pair position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Long 1 unit of Y, short beta units of X
    LongY,
    /// Short 1 unit of Y, long beta units of X
    ShortY,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Flat,
    LongY,
    ShortY,
}

impl From<Direction> for PositionState {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::LongY => PositionState::LongY,
            Direction::ShortY => PositionState::ShortY,
        }
    }
}

impl PositionState {
    pub fn direction(self) -> Option<Direction> {
        match self {
            PositionState::Flat => None,
            PositionState::LongY => Some(Direction::LongY),
            PositionState::ShortY => Some(Direction::ShortY),
        }
    }
}

/// When the engine may open a new position after a stop-loss.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRearm {
    /// Stay out until the spread crosses back through a mean band
    #[default]
    AtMeanCross,
    /// Entries are allowed again on the next step
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    MeanReversion,
    StopLoss,
    WindowEnd,
}

/// Crossing rules, listed in evaluation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalRule {
    UpperStop,
    UpperTrade,
    UpperMean,
    LowerMean,
    LowerTrade,
    LowerStop,
}

impl SignalRule {
    pub const PRIORITY: [SignalRule; 6] = [
        SignalRule::UpperStop,
        SignalRule::UpperTrade,
        SignalRule::UpperMean,
        SignalRule::LowerMean,
        SignalRule::LowerTrade,
        SignalRule::LowerStop,
    ];
}

/// A position change produced by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Open(Direction),
    Close {
        direction: Direction,
        reason: ExitReason,
    },
}

fn crosses_up(prev: f64, curr: f64, level: f64) -> bool {
    prev < level && curr > level
}

fn crosses_down(prev: f64, curr: f64, level: f64) -> bool {
    prev > level && curr < level
}

/// Position state plus the stop-loss latch.
///
/// A stop-loss is a one-shot close: the state returns to `Flat` in the same
/// step. Under [`StopRearm::AtMeanCross`] the machine is then disarmed and
/// ignores entry bands until a mean band is crossed.
#[derive(Debug, Clone)]
pub struct PositionMachine {
    state: PositionState,
    armed: bool,
    rearm: StopRearm,
}

impl PositionMachine {
    pub fn new(rearm: StopRearm) -> Self {
        Self {
            state: PositionState::Flat,
            armed: true,
            rearm,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Evaluate one `(prev, curr)` pair. Returns the rule that consumed the
    /// step, if any, and the position change it caused.
    ///
    /// The mean-band rules match on the crossing alone, so they consume the
    /// step even when no matching position is open.
    pub fn step(
        &mut self,
        prev: f64,
        curr: f64,
        t: &BandThresholds,
    ) -> Option<(SignalRule, Option<Transition>)> {
        let flat_and_armed = self.state == PositionState::Flat && self.armed;

        for rule in SignalRule::PRIORITY {
            let fired = match rule {
                SignalRule::UpperStop => {
                    crosses_up(prev, curr, t.upper_stop) && self.state == PositionState::ShortY
                }
                SignalRule::UpperTrade => crosses_up(prev, curr, t.upper_trade) && flat_and_armed,
                SignalRule::UpperMean => crosses_down(prev, curr, t.upper_mean),
                SignalRule::LowerMean => crosses_up(prev, curr, t.lower_mean),
                SignalRule::LowerTrade => {
                    crosses_down(prev, curr, t.lower_trade) && flat_and_armed
                }
                SignalRule::LowerStop => {
                    crosses_down(prev, curr, t.lower_stop) && self.state == PositionState::LongY
                }
            };
            if fired {
                return Some((rule, self.apply(rule)));
            }
        }
        None
    }

    fn apply(&mut self, rule: SignalRule) -> Option<Transition> {
        match rule {
            SignalRule::UpperStop => self.stop_out(Direction::ShortY),
            SignalRule::LowerStop => self.stop_out(Direction::LongY),
            SignalRule::UpperTrade => self.open(Direction::ShortY),
            SignalRule::LowerTrade => self.open(Direction::LongY),
            SignalRule::UpperMean => self.revert(Direction::ShortY),
            SignalRule::LowerMean => self.revert(Direction::LongY),
        }
    }

    fn open(&mut self, direction: Direction) -> Option<Transition> {
        self.state = direction.into();
        Some(Transition::Open(direction))
    }

    fn stop_out(&mut self, direction: Direction) -> Option<Transition> {
        self.state = PositionState::Flat;
        self.armed = self.rearm == StopRearm::Immediate;
        Some(Transition::Close {
            direction,
            reason: ExitReason::StopLoss,
        })
    }

    // A mean crossing re-arms the machine; it only closes the position the
    // band belongs to and leaves the opposite position open.
    fn revert(&mut self, direction: Direction) -> Option<Transition> {
        self.armed = true;
        if self.state.direction() != Some(direction) {
            return None;
        }
        self.state = PositionState::Flat;
        Some(Transition::Close {
            direction,
            reason: ExitReason::MeanReversion,
        })
    }

    /// Close whatever is still open at the end of the window.
    pub fn force_close(&mut self) -> Option<Transition> {
        let direction = self.state.direction()?;
        self.state = PositionState::Flat;
        Some(Transition::Close {
            direction,
            reason: ExitReason::WindowEnd,
        })
    }
}
