//! Shared record of the last trade and the daily trade log.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::{Side, TradeLogEntry, TradeOutcome, TradeOutcomeState};

#[derive(Debug, Default)]
struct TrackerState {
    last: TradeOutcomeState,
    log: Vec<TradeLogEntry>,
}

/// Cloneable handle to the process-wide trade outcome state.
///
/// Lives only in memory: a restart starts from an empty state.
#[derive(Debug, Clone, Default)]
pub struct TradeOutcomeTracker {
    inner: Arc<RwLock<TrackerState>>,
}

impl TradeOutcomeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current direction/outcome pair.
    pub async fn snapshot(&self) -> TradeOutcomeState {
        self.inner.read().await.last
    }

    /// A new trade was placed; its outcome is unknown until it closes.
    pub async fn record_placement(&self, side: Side) {
        let mut state = self.inner.write().await;
        state.last = TradeOutcomeState {
            last_direction: Some(side),
            last_outcome: None,
        };
    }

    /// A trade closed with a known result. The closed trade's side becomes
    /// the last direction.
    pub async fn record_outcome(&self, symbol: &str, side: Side, outcome: TradeOutcome) {
        let mut state = self.inner.write().await;
        state.last = TradeOutcomeState {
            last_direction: Some(side),
            last_outcome: Some(outcome),
        };
        state.log.push(TradeLogEntry {
            outcome,
            symbol: symbol.to_string(),
            side,
            recorded_at: Utc::now(),
        });

        info!(symbol = %symbol, side = %side, outcome = ?outcome, "Trade outcome recorded");
    }

    /// Take every logged entry, leaving the log empty.
    pub async fn drain_log(&self) -> Vec<TradeLogEntry> {
        std::mem::take(&mut self.inner.write().await.log)
    }

    pub async fn log_len(&self) -> usize {
        self.inner.read().await.log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_placement_clears_outcome() {
        let tracker = TradeOutcomeTracker::new();
        tracker.record_outcome("TRXUSDT", Side::Sell, TradeOutcome::Loss).await;
        assert_eq!(tracker.snapshot().await.last_outcome, Some(TradeOutcome::Loss));

        tracker.record_placement(Side::Buy).await;
        let state = tracker.snapshot().await;
        assert_eq!(state.last_direction, Some(Side::Buy));
        assert_eq!(state.last_outcome, None);
    }

    #[tokio::test]
    async fn test_outcome_carries_closed_side() {
        let tracker = TradeOutcomeTracker::new();
        tracker.record_placement(Side::Buy).await;
        tracker.record_outcome("TRXUSDT", Side::Sell, TradeOutcome::Loss).await;

        let state = tracker.snapshot().await;
        assert_eq!(state.last_direction, Some(Side::Sell));
        assert_eq!(state.last_outcome, Some(TradeOutcome::Loss));
        assert!(!state.boost_applies(Side::Sell));
        assert!(state.boost_applies(Side::Buy));
    }

    #[tokio::test]
    async fn test_drain_empties_log() {
        let tracker = TradeOutcomeTracker::new();
        tracker.record_outcome("TRXUSDT", Side::Buy, TradeOutcome::Win).await;
        tracker.record_outcome("TRXUSDT", Side::Sell, TradeOutcome::Loss).await;

        let entries = tracker.drain_log().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].outcome, TradeOutcome::Win);
        assert_eq!(tracker.log_len().await, 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let tracker = TradeOutcomeTracker::new();
        let handle = tracker.clone();
        handle.record_placement(Side::Sell).await;

        assert_eq!(tracker.snapshot().await.last_direction, Some(Side::Sell));
    }
}
