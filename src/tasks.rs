//! Background loops: polling strategies, the daily summary, keep-alive.
//!
//! Every loop stops when the shutdown channel flips.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::notify::{summarize, SummaryNotifier};
use crate::strategy::PollingStrategy;
use crate::trading::TradeOutcomeTracker;

const KEEP_ALIVE_PERIOD: Duration = Duration::from_secs(3600);

/// Run `strategy` once per `period` until shutdown. Tick errors are logged and
/// the loop carries on.
pub async fn run_periodic<S: PollingStrategy>(
    mut strategy: S,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        strategy = strategy.name(),
        period_secs = period.as_secs(),
        "Starting strategy loop"
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = strategy.tick().await {
                    error!(strategy = strategy.name(), error = %e, "Error in strategy tick");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!(strategy = strategy.name(), "Strategy loop stopped");
}

/// Time left until the next 00:00 UTC.
pub fn duration_until_next_utc_midnight(now: DateTime<Utc>) -> Duration {
    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return Duration::from_secs(24 * 3600);
    };
    let midnight = tomorrow.and_time(NaiveTime::MIN).and_utc();

    (midnight - now).to_std().unwrap_or(Duration::ZERO)
}

/// Drain the trade log and email its summary. An empty log sends nothing.
pub async fn send_daily_summary(tracker: &TradeOutcomeTracker, notifier: &SummaryNotifier) {
    let entries = tracker.drain_log().await;
    match summarize(&entries) {
        Some(summary) => {
            info!(trades = entries.len(), "Sending daily summary");
            notifier.send_summary(&summary).await;
        }
        None => debug!("No trades today, summary skipped"),
    }
}

/// Sleep until each UTC midnight, then send the summary.
pub async fn daily_summary_loop(
    tracker: TradeOutcomeTracker,
    notifier: SummaryNotifier,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(email = notifier.is_enabled(), "Starting daily summary loop");

    loop {
        let wait = duration_until_next_utc_midnight(Utc::now());
        let pending = tracker.log_len().await;
        debug!(secs = wait.as_secs(), pending, "Next daily summary scheduled");

        tokio::select! {
            _ = sleep(wait) => send_daily_summary(&tracker, &notifier).await,
            _ = shutdown.changed() => break,
        }
    }

    info!("Daily summary loop stopped");
}

/// Liveness loop with no work of its own.
pub async fn keep_alive_loop(mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(KEEP_ALIVE_PERIOD);

    loop {
        tokio::select! {
            _ = ticker.tick() => debug!("Keep-alive"),
            _ = shutdown.changed() => break,
        }
    }
}
