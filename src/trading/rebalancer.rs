//! Keeps USDT equity even between the main and sub accounts.

use futures::future::join;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{AccountPair, ExchangeError, TransferDirection};

use super::TradingConfig;

/// What a rebalance pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceOutcome {
    /// Equities already within tolerance.
    Balanced,
    Transferred {
        direction: TransferDirection,
        amount: Decimal,
    },
    /// A balance query or the transfer failed; nothing was retried.
    Failed(String),
}

/// Transfer that would bring both accounts to the midpoint, if one is needed.
pub fn plan_transfer(
    main: Decimal,
    sub: Decimal,
    tolerance: Decimal,
) -> Option<(TransferDirection, Decimal)> {
    if (main - sub).abs() < tolerance {
        return None;
    }

    let target = (main + sub) / Decimal::TWO;
    let amount = (main - target).abs().round_dp(2);
    let direction = if main > target {
        TransferDirection::MainToSub
    } else {
        TransferDirection::SubToMain
    };

    Some((direction, amount))
}

/// Moves funds between the accounts after equity shifts.
pub struct FundRebalancer {
    accounts: AccountPair,
    sub_member_id: String,
    tolerance: Decimal,
    // One read-compute-transfer sequence at a time
    lock: Mutex<()>,
}

impl FundRebalancer {
    pub fn new(accounts: AccountPair, sub_member_id: String, config: &TradingConfig) -> Self {
        Self {
            accounts,
            sub_member_id,
            tolerance: config.rebalance_tolerance,
            lock: Mutex::new(()),
        }
    }

    /// Equalize the two accounts. Never fails: errors are logged and reported
    /// in the outcome so they cannot abort the trade that triggered it.
    pub async fn rebalance(&self) -> RebalanceOutcome {
        let _guard = self.lock.lock().await;

        match self.try_rebalance().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Rebalance failed");
                RebalanceOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_rebalance(&self) -> Result<RebalanceOutcome, ExchangeError> {
        let (main, sub) = join(
            self.accounts.main.usdt_equity(),
            self.accounts.sub.usdt_equity(),
        )
        .await;
        let (main, sub) = (main?, sub?);

        let Some((direction, amount)) = plan_transfer(main, sub, self.tolerance) else {
            info!(main = %main, sub = %sub, "Balance already even");
            return Ok(RebalanceOutcome::Balanced);
        };

        self.accounts
            .main
            .sub_member_transfer(direction, amount, &self.sub_member_id)
            .await?;

        info!(
            main = %main,
            sub = %sub,
            direction = %direction,
            amount = %amount,
            "Rebalanced main/sub"
        );

        Ok(RebalanceOutcome::Transferred { direction, amount })
    }
}
