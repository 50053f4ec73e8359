//! Webhook HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::info;

use crate::error::TradeError;
use crate::trading::{SignalResponse, SignalRouter};

pub type AppState = Arc<SignalRouter>;

pub fn app(router: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/signal", post(signal))
        .with_state(router)
}

/// Serve until the shutdown channel flips.
pub async fn serve(
    addr: SocketAddr,
    router: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "Webhook server listening");

    axum::serve(listener, app(router))
        .with_graceful_shutdown(async move {
            shutdown.changed().await.ok();
        })
        .await
        .context("webhook server failed")?;

    info!("Webhook server stopped");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "Bot is online" }))
}

/// Plain-text signal body in, JSON out.
async fn signal(
    State(router): State<AppState>,
    body: String,
) -> Result<Json<SignalResponse>, TradeError> {
    router.handle(&body).await.map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockExchange;
    use crate::api::AccountPair;
    use crate::trading::{FundRebalancer, TradeOutcomeTracker, TradingConfig};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use rust_decimal_macros::dec;

    fn state() -> AppState {
        let accounts = AccountPair::new(
            MockExchange::with_equity(dec!(100)),
            MockExchange::with_equity(dec!(100)),
        );
        let config = TradingConfig::default();
        let rebalancer = Arc::new(FundRebalancer::new(
            accounts.clone(),
            "sub-uid".to_string(),
            &config,
        ));
        Arc::new(SignalRouter::new(
            config,
            accounts,
            TradeOutcomeTracker::new(),
            rebalancer,
        ))
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body, json!({ "status": "Bot is online" }));
    }

    #[tokio::test]
    async fn test_signal_ok() {
        let response = signal(State(state()), "TRXUSDT\nbuy\nentry:0.30\nsl:0.29\ntp:0.33".into())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signal_bad_format() {
        let response = signal(State(state()), "TRXUSDT".into())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signal_parse_error() {
        let response = signal(State(state()), "TRXUSDT\nsell\nentry:abc\nsl:1\ntp:2".into())
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
