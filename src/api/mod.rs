//! Exchange access: the capability trait the bot trades through and its Bybit v5 client.

mod bybit_client;
mod exchange;
#[cfg(test)]
pub mod mock;
mod types;

pub use bybit_client::{BybitClient, MAINNET_URL, TESTNET_URL};
pub use exchange::{
    AccountPair, Exchange, ExchangeError, OrderRequest, OrderType, PositionInfo, TransferDirection,
};
