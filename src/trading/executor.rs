//! Order placement: entries with paired TP/SL orders, and position closes.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::api::{AccountPair, ExchangeError, OrderRequest};
use crate::models::{Account, Side, TradeOutcome};

use super::price::normalize_price;
use super::{FundRebalancer, RebalanceOutcome, TradeOutcomeTracker};

/// Orders placed for a new trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedTrade {
    pub entry_order_id: String,
    pub take_profit_price: Decimal,
    pub stop_loss_price: Decimal,
    pub rebalance: RebalanceOutcome,
}

/// Result of a close request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedTrades {
    /// Number of positions that received a closing order.
    pub closed: usize,
    pub rebalance: Option<RebalanceOutcome>,
}

/// Places orders on the account chosen by the router.
pub struct TradeExecutor {
    accounts: AccountPair,
    tracker: TradeOutcomeTracker,
    rebalancer: Arc<FundRebalancer>,
}

impl TradeExecutor {
    pub fn new(
        accounts: AccountPair,
        tracker: TradeOutcomeTracker,
        rebalancer: Arc<FundRebalancer>,
    ) -> Self {
        Self {
            accounts,
            tracker,
            rebalancer,
        }
    }

    /// Market entry followed by reduce-only take-profit and stop-loss limits.
    ///
    /// The entry is not rolled back if a protective order is rejected.
    pub async fn open_trade(
        &self,
        account: Account,
        symbol: &str,
        side: Side,
        quantity: u64,
        take_profit: Decimal,
        stop_loss: Decimal,
    ) -> Result<OpenedTrade, ExchangeError> {
        let client = self.accounts.get(account);

        let tick_size = client.tick_size(symbol).await?;
        let take_profit_price = normalize_price(take_profit, tick_size);
        let stop_loss_price = normalize_price(stop_loss, tick_size);

        let qty = Decimal::from(quantity);
        let entry = client
            .place_order(&OrderRequest::market(symbol, side, qty))
            .await?;

        info!(
            account = %account,
            symbol = %symbol,
            side = %side,
            qty = quantity,
            order_id = %entry.order_id,
            "Entry order placed"
        );

        for price in [take_profit_price, stop_loss_price] {
            let order = OrderRequest::protective_limit(symbol, side.opposite(), qty, price);
            if let Err(e) = client.place_order(&order).await {
                warn!(
                    account = %account,
                    symbol = %symbol,
                    price = %price,
                    error = %e,
                    "Protective order rejected, entry stays open"
                );
                return Err(e);
            }
        }

        info!(
            account = %account,
            tp = %take_profit_price,
            sl = %stop_loss_price,
            "Protective orders placed"
        );

        self.tracker.record_placement(side).await;
        let rebalance = self.rebalancer.rebalance().await;

        Ok(OpenedTrade {
            entry_order_id: entry.order_id,
            take_profit_price,
            stop_loss_price,
            rebalance,
        })
    }

    /// Market-close every open position on `symbol`. Finding nothing to close
    /// is a normal result, not an error.
    pub async fn close_trade(
        &self,
        account: Account,
        symbol: &str,
    ) -> Result<ClosedTrades, ExchangeError> {
        let client = self.accounts.get(account);
        let positions = client.positions(symbol).await?;

        let mut closed = 0;
        for position in positions {
            let Some(side) = position.side else { continue };
            if position.size <= Decimal::ZERO {
                continue;
            }

            let order = OrderRequest::reduce_only_market(symbol, side.opposite(), position.size);
            client.place_order(&order).await?;
            closed += 1;

            info!(
                account = %account,
                symbol = %symbol,
                side = %side,
                size = %position.size,
                "Position closed"
            );

            let outcome = if position.unrealised_pnl > Decimal::ZERO {
                TradeOutcome::Win
            } else {
                TradeOutcome::Loss
            };
            self.tracker.record_outcome(symbol, side, outcome).await;
        }

        let rebalance = if closed > 0 {
            Some(self.rebalancer.rebalance().await)
        } else {
            None
        };

        Ok(ClosedTrades { closed, rebalance })
    }
}
