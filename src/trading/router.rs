//! Signal routing: parse, pick the account, then size, target, and execute.

use std::sync::Arc;

use futures::future::join;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::api::AccountPair;
use crate::error::TradeError;
use crate::models::{Account, Signal, TradeLevels};

use super::{
    FundRebalancer, PositionSizer, TargetAdapter, TargetMode, TradeExecutor, TradeOutcomeTracker,
    TradingConfig,
};

/// Body returned to the webhook caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SignalResponse {
    Opened {
        status: String,
        #[serde(with = "rust_decimal::serde::float")]
        entry: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        tp: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        sl: Decimal,
        qty: u64,
        tp_mode: TargetMode,
    },
    Closed {
        status: String,
    },
}

/// Entry point for webhook signals.
pub struct SignalRouter {
    accounts: AccountPair,
    tracker: TradeOutcomeTracker,
    sizer: PositionSizer,
    targets: TargetAdapter,
    executor: TradeExecutor,
    // Signals are handled one at a time
    lock: Mutex<()>,
}

impl SignalRouter {
    pub fn new(
        config: TradingConfig,
        accounts: AccountPair,
        tracker: TradeOutcomeTracker,
        rebalancer: Arc<FundRebalancer>,
    ) -> Self {
        let executor = TradeExecutor::new(accounts.clone(), tracker.clone(), rebalancer);

        Self {
            accounts,
            tracker,
            sizer: PositionSizer::new(config.clone()),
            targets: TargetAdapter::new(config),
            executor,
            lock: Mutex::new(()),
        }
    }

    /// Handle one raw signal body.
    pub async fn handle(&self, body: &str) -> Result<SignalResponse, TradeError> {
        info!(body = %body.trim(), "Signal received");

        let result = self.route(body).await;
        if let Err(e) = &result {
            error!(error = %e, "Signal failed");
        }
        result
    }

    async fn route(&self, body: &str) -> Result<SignalResponse, TradeError> {
        let signal = Signal::parse(body)?;
        let account = Account::for_side(signal.side);

        let _guard = self.lock.lock().await;

        match signal.levels() {
            Some(levels) => self.open(&signal, account, levels).await,
            None => self.close(&signal, account).await,
        }
    }

    async fn open(
        &self,
        signal: &Signal,
        account: Account,
        levels: TradeLevels,
    ) -> Result<SignalResponse, TradeError> {
        let previous = self.tracker.snapshot().await;
        let target = self
            .targets
            .take_profit(signal.side, levels.entry, levels.stop_loss, &previous)?;

        let (account_equity, total_equity) = self.equities(account).await;
        let qty = self.sizer.calculate_quantity(
            total_equity,
            account_equity,
            levels.entry,
            levels.stop_loss,
        )?;

        info!(
            account = %account,
            symbol = %signal.symbol,
            side = %signal.side,
            entry = %levels.entry,
            tp = %target.price,
            sl = %levels.stop_loss,
            qty,
            mode = %target.mode,
            "Opening trade"
        );

        self.executor
            .open_trade(
                account,
                &signal.symbol,
                signal.side,
                qty,
                target.price,
                levels.stop_loss,
            )
            .await?;

        Ok(SignalResponse::Opened {
            status: "Trade placed".to_string(),
            entry: levels.entry,
            tp: target.price,
            sl: levels.stop_loss,
            qty,
            tp_mode: target.mode,
        })
    }

    async fn close(&self, signal: &Signal, account: Account) -> Result<SignalResponse, TradeError> {
        let closed = self.executor.close_trade(account, &signal.symbol).await?;

        let status = if closed.closed > 0 {
            format!("{account} trades closed and rebalanced")
        } else {
            info!(account = %account, symbol = %signal.symbol, "No trades to close");
            "No trades to close".to_string()
        };

        Ok(SignalResponse::Closed { status })
    }

    /// Equity of `account` and of both accounts combined. A failed balance
    /// query counts as zero equity.
    async fn equities(&self, account: Account) -> (Decimal, Decimal) {
        let (main, sub) = join(
            self.accounts.main.usdt_equity(),
            self.accounts.sub.usdt_equity(),
        )
        .await;

        let main = main.unwrap_or_else(|e| {
            warn!(account = %Account::Main, error = %e, "Balance query failed");
            Decimal::ZERO
        });
        let sub = sub.unwrap_or_else(|e| {
            warn!(account = %Account::Sub, error = %e, "Balance query failed");
            Decimal::ZERO
        });

        let selected = match account {
            Account::Main => main,
            Account::Sub => sub,
        };
        (selected, main + sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockExchange;
    use crate::api::{OrderType, PositionInfo};
    use crate::models::{Side, TradeOutcome};
    use futures::future::join;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        main: Arc<MockExchange>,
        sub: Arc<MockExchange>,
        tracker: TradeOutcomeTracker,
        router: SignalRouter,
    }

    fn fixture(main_equity: Decimal, sub_equity: Decimal) -> Fixture {
        let main = MockExchange::with_equity(main_equity);
        let sub = MockExchange::with_equity(sub_equity);
        let accounts = AccountPair::new(main.clone(), sub.clone());
        let config = TradingConfig::default();
        let tracker = TradeOutcomeTracker::new();
        let rebalancer = Arc::new(FundRebalancer::new(
            accounts.clone(),
            "sub-uid".to_string(),
            &config,
        ));
        let router = SignalRouter::new(config, accounts, tracker.clone(), rebalancer);

        Fixture {
            main,
            sub,
            tracker,
            router,
        }
    }

    const BUY_SIGNAL: &str = "TRXUSDT\nbuy\nentry:0.30\nsl:0.29\ntp:0.33";

    #[tokio::test]
    async fn test_buy_signal_normal_target() {
        let f = fixture(dec!(100), dec!(100));

        let response = f.router.handle(BUY_SIGNAL).await.unwrap();

        // risk = 200 * 0.1 / 0.01 = 2000; margin cap = 100 * 75 / 0.30 * 0.9 = 22500
        assert_eq!(
            response,
            SignalResponse::Opened {
                status: "Trade placed".to_string(),
                entry: dec!(0.30),
                tp: dec!(0.31),
                sl: dec!(0.29),
                qty: 2000,
                tp_mode: TargetMode::Normal,
            }
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "status": "Trade placed",
                "entry": 0.30,
                "tp": 0.31,
                "sl": 0.29,
                "qty": 2000,
                "tp_mode": "NORMAL",
            })
        );

        // Buys go to the sub account
        assert_eq!(f.sub.orders().len(), 3);
        assert!(f.main.orders().is_empty());
    }

    #[tokio::test]
    async fn test_buy_after_losing_sell_is_boosted() {
        let f = fixture(dec!(100), dec!(100));
        f.tracker.record_placement(Side::Sell).await;
        f.tracker.record_outcome("TRXUSDT", Side::Sell, TradeOutcome::Loss).await;

        let response = f.router.handle(BUY_SIGNAL).await.unwrap();

        match response {
            SignalResponse::Opened { tp, tp_mode, .. } => {
                assert_eq!(tp, dec!(0.3165));
                assert_eq!(tp_mode, TargetMode::Boosted);
            }
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(f.sub.orders()[1].price, Some(dec!(0.3165)));
    }

    #[tokio::test]
    async fn test_close_signal_closes_and_rebalances() {
        let f = fixture(dec!(150), dec!(50));
        f.main.positions.lock().unwrap().push(PositionInfo {
            symbol: "TRXUSDT".to_string(),
            side: Some(Side::Buy),
            size: dec!(300),
            unrealised_pnl: dec!(2.5),
        });

        let response = f.router.handle("TRXUSDT\nsell").await.unwrap();

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "status": "Main trades closed and rebalanced" })
        );
        let orders = f.main.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_type, OrderType::Market);
        assert!(orders[0].reduce_only);
        assert_eq!(f.main.transfers().len(), 1);
        assert_eq!(f.tracker.snapshot().await.last_outcome, Some(TradeOutcome::Win));
    }

    #[tokio::test]
    async fn test_close_signal_with_nothing_open() {
        let f = fixture(dec!(100), dec!(100));

        let response = f.router.handle("TRXUSDT\nbuy close").await.unwrap();

        assert_eq!(
            response,
            SignalResponse::Closed {
                status: "No trades to close".to_string()
            }
        );
        assert!(f.sub.transfers().is_empty() && f.main.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_bad_format_has_no_side_effects() {
        let f = fixture(dec!(100), dec!(100));

        let err = f.router.handle("TRXUSDT").await.unwrap_err();
        assert!(matches!(err, TradeError::BadFormat));
        assert!(f.main.orders().is_empty() && f.sub.orders().is_empty());
    }

    #[tokio::test]
    async fn test_degenerate_stop_places_nothing() {
        let f = fixture(dec!(100), dec!(100));

        let err = f
            .router
            .handle("TRXUSDT\nsell\nentry:0.30\nsl:0.30\ntp:0.28")
            .await
            .unwrap_err();

        assert!(matches!(err, TradeError::InvalidRiskParameters { .. }));
        assert!(f.main.orders().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_entry_surfaces_error() {
        let f = fixture(dec!(100), dec!(100));
        *f.sub.accept_orders.lock().unwrap() = Some(0);

        let err = f.router.handle(BUY_SIGNAL).await.unwrap_err();
        assert!(matches!(err, TradeError::Exchange(_)));
    }

    #[tokio::test]
    async fn test_failed_balance_counts_as_zero() {
        let f = fixture(dec!(100), dec!(100));
        *f.main.equity.lock().unwrap() = None;
        *f.sub.equity.lock().unwrap() = None;

        let response = f.router.handle(BUY_SIGNAL).await.unwrap();
        match response {
            SignalResponse::Opened { qty, .. } => assert_eq!(qty, 1),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_losing_close_then_same_side_is_normal() {
        let f = fixture(dec!(100), dec!(100));
        f.main.positions.lock().unwrap().push(PositionInfo {
            symbol: "TRXUSDT".to_string(),
            side: Some(Side::Sell),
            size: dec!(500),
            unrealised_pnl: dec!(-2),
        });
        f.tracker.record_placement(Side::Buy).await;

        f.router.handle("TRXUSDT\nsell").await.unwrap();
        assert_eq!(f.tracker.snapshot().await.last_direction, Some(Side::Sell));

        let response = f
            .router
            .handle("TRXUSDT\nsell\nentry:0.30\nsl:0.31\ntp:0.28")
            .await
            .unwrap();
        match response {
            SignalResponse::Opened { tp, tp_mode, .. } => {
                assert_eq!(tp, dec!(0.29));
                assert_eq!(tp_mode, TargetMode::Normal);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_losing_close_boosts_opposite_side() {
        let f = fixture(dec!(100), dec!(100));
        f.main.positions.lock().unwrap().push(PositionInfo {
            symbol: "TRXUSDT".to_string(),
            side: Some(Side::Sell),
            size: dec!(500),
            unrealised_pnl: dec!(-2),
        });

        f.router.handle("TRXUSDT\nsell").await.unwrap();
        let response = f.router.handle(BUY_SIGNAL).await.unwrap();

        match response {
            SignalResponse::Opened { tp_mode, .. } => assert_eq!(tp_mode, TargetMode::Boosted),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_prices_are_rejected() {
        let f = fixture(dec!(100), dec!(100));

        let err = f
            .router
            .handle("TRXUSDT\nbuy\nentry:70000000000000000000000000000\nsl:1\ntp:2")
            .await
            .unwrap_err();

        assert!(matches!(err, TradeError::InvalidRiskParameters { .. }));
        assert!(f.sub.orders().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_signals_do_not_interleave() {
        let f = fixture(dec!(100), dec!(100));
        *f.sub.latency.lock().unwrap() = Duration::from_millis(10);

        let (first, second) = join(f.router.handle(BUY_SIGNAL), f.router.handle(BUY_SIGNAL)).await;
        first.unwrap();
        second.unwrap();

        let kinds: Vec<OrderType> = f.sub.orders().iter().map(|o| o.order_type).collect();
        assert_eq!(
            kinds,
            [
                OrderType::Market,
                OrderType::Limit,
                OrderType::Limit,
                OrderType::Market,
                OrderType::Limit,
                OrderType::Limit,
            ]
        );
    }
}
