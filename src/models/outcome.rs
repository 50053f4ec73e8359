//! Outcome of the previous trade and the daily trade log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Side;

/// Result of a closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Win,
    Loss,
}

/// Direction and outcome of the most recent trade.
///
/// `last_outcome` is cleared whenever a new trade is placed and only set
/// again once that trade's result is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TradeOutcomeState {
    pub last_direction: Option<Side>,
    pub last_outcome: Option<TradeOutcome>,
}

impl TradeOutcomeState {
    /// True when the previous trade lost and was taken in the other direction.
    pub fn boost_applies(&self, side: Side) -> bool {
        self.last_outcome == Some(TradeOutcome::Loss)
            && matches!(self.last_direction, Some(direction) if direction != side)
    }
}

/// One resolved trade in the daily log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub outcome: TradeOutcome,
    pub symbol: String,
    pub side: Side,
    pub recorded_at: DateTime<Utc>,
}
