//! Error taxonomy for signal handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;
use serde_json::json;

use crate::api::ExchangeError;

/// Errors surfaced to the caller of the signal endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TradeError {
    /// Fewer than two lines in the signal body.
    #[error("Bad format")]
    BadFormat,

    #[error("could not parse {field} value {value:?}")]
    Parse { field: &'static str, value: String },

    /// Entry and stop loss leave no usable risk distance.
    #[error("invalid risk parameters: entry={entry}, stop_loss={stop_loss}")]
    InvalidRiskParameters { entry: Decimal, stop_loss: Decimal },

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl TradeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadFormat => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TradeError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (self.status_code(), axum::Json(body)).into_response()
    }
}
