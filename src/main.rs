//! Bybit Signal Trader
//!
//! Trades a main/sub futures account pair from webhook signals: buys on the
//! sub account, sells on the main account, keeping both funded evenly.
//! Optional polling strategies trade breakouts or report Heikin-Ashi color.

mod api;
mod config;
mod error;
mod models;
mod notify;
mod server;
mod strategy;
mod tasks;
mod trading;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{AccountPair, BybitClient, MAINNET_URL, TESTNET_URL};
use crate::config::AppConfig;
use crate::notify::SummaryNotifier;
use crate::strategy::{BreakoutConfig, BreakoutDetector, HeikinAshiClassifier};
use crate::trading::{FundRebalancer, SignalRouter, TradeOutcomeTracker, TradingConfig};

/// Bybit main/sub signal trading bot CLI.
#[derive(Parser)]
#[command(name = "sigtrader")]
#[command(about = "Trade webhook signals across a Bybit main/sub account pair", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Contract traded by the polling strategies
    #[arg(short, long, default_value = "TRXUSDT", env = "SYMBOL")]
    symbol: String,

    /// Use the Bybit testnet instead of mainnet
    #[arg(long)]
    testnet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server with the daily summary and keep-alive loops
    Serve {
        /// Also run the breakout detector
        #[arg(long)]
        with_breakout: bool,
    },

    /// Run the breakout detector on its own
    Breakout,

    /// Report the color of the latest Heikin-Ashi candle
    HeikinAshi {
        /// Keep reporting instead of exiting after one reading
        #[arg(short, long)]
        watch: bool,

        /// Seconds between readings with --watch
        #[arg(short, long, default_value = "60")]
        interval: u64,
    },

    /// Show the trading configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { with_breakout } => {
            let config = AppConfig::from_env()?;
            let accounts = connect(&config, cli.testnet)?;
            let shutdown = shutdown_channel();

            let trading_config = TradingConfig::default();
            let tracker = TradeOutcomeTracker::new();
            let rebalancer = Arc::new(FundRebalancer::new(
                accounts.clone(),
                config.sub_uid.clone(),
                &trading_config,
            ));
            let router = Arc::new(SignalRouter::new(
                trading_config,
                accounts.clone(),
                tracker.clone(),
                rebalancer,
            ));

            let notifier = SummaryNotifier::from_config(config.email.as_ref())?;
            if !notifier.is_enabled() {
                info!("Email not configured, daily summaries will only be logged");
            }

            info!(
                addr = %config.bind_addr,
                testnet = cli.testnet,
                breakout = with_breakout,
                "Starting signal trader"
            );

            let mut loops = vec![
                tokio::spawn(tasks::daily_summary_loop(
                    tracker,
                    notifier,
                    shutdown.clone(),
                )),
                tokio::spawn(tasks::keep_alive_loop(shutdown.clone())),
            ];

            if with_breakout {
                let breakout = BreakoutConfig::default();
                let period = Duration::from_secs(breakout.tick_secs);
                let detector = BreakoutDetector::new(accounts, &cli.symbol, breakout);
                loops.push(tokio::spawn(tasks::run_periodic(
                    detector,
                    period,
                    shutdown.clone(),
                )));
            }

            server::serve(config.bind_addr, router, shutdown).await?;

            for handle in loops {
                handle.await.ok();
            }
        }

        Commands::Breakout => {
            let config = AppConfig::from_env()?;
            let accounts = connect(&config, cli.testnet)?;

            let breakout = BreakoutConfig::default();
            let period = Duration::from_secs(breakout.tick_secs);

            println!("\n=== Breakout Detector ===");
            println!("Symbol:        {}", cli.symbol);
            println!("Lookback:      {} x 1m", breakout.lookback);
            println!("Confirmation:  {} x 1h", breakout.confirmation_candles);
            println!("Order qty:     {}", breakout.order_qty);
            println!("Poll interval: {}s", breakout.tick_secs);
            println!("\nPress Ctrl+C to stop.\n");

            let detector = BreakoutDetector::new(accounts, &cli.symbol, breakout);
            tasks::run_periodic(detector, period, shutdown_channel()).await;
        }

        Commands::HeikinAshi { watch, interval } => {
            let config = AppConfig::from_env()?;
            let accounts = connect(&config, cli.testnet)?;
            let classifier = HeikinAshiClassifier::new(accounts.main, &cli.symbol);

            if watch {
                let period = Duration::from_secs(interval);
                tasks::run_periodic(classifier, period, shutdown_channel()).await;
            } else {
                match classifier.classify().await? {
                    Some(candle) => println!(
                        "{} {} HA open={} close={} -> {:?}",
                        cli.symbol,
                        candle.time.format("%Y-%m-%d %H:%M"),
                        candle.open,
                        candle.close,
                        candle.color()
                    ),
                    None => println!("No candles returned for {}", cli.symbol),
                }
            }
        }

        Commands::Config => {
            let config = TradingConfig::default();
            let breakout = BreakoutConfig::default();

            println!("\n=== Trading Configuration ===\n");
            println!("Position Sizing:");
            println!("  Risk Fraction:        {}%", config.risk_fraction * dec!(100));
            println!("  Leverage:             {}x", config.leverage);
            println!("  Margin Utilization:   {}%", config.margin_utilization * dec!(100));

            println!("\nTake Profit:");
            println!("  Normal:               1R");
            println!(
                "  Boosted:              {}R + {}% of entry",
                config.boost_risk_multiple,
                config.boost_entry_skew * dec!(100)
            );

            println!("\nRebalancing:");
            println!("  Tolerance:            {} USDT", config.rebalance_tolerance);

            println!("\n=== Breakout Configuration ===\n");
            println!("  Lookback:             {} x 1m", breakout.lookback);
            println!("  Min Run Length:       {}", breakout.min_run_length);
            println!("  Confirmation:         {} x 1h", breakout.confirmation_candles);
            println!("  Order Quantity:       {}", breakout.order_qty);
            println!("  Poll Interval:        {}s", breakout.tick_secs);
        }
    }

    Ok(())
}

/// One signed client per account.
fn connect(config: &AppConfig, testnet: bool) -> Result<AccountPair> {
    let base_url = if testnet { TESTNET_URL } else { MAINNET_URL };

    let main = BybitClient::new(base_url, &config.main.key, &config.main.secret)
        .context("failed to create main account client")?;
    let sub = BybitClient::new(base_url, &config.sub.key, &config.sub.secret)
        .context("failed to create sub account client")?;

    Ok(AccountPair::new(Arc::new(main), Arc::new(sub)))
}

/// Flips to `true` on Ctrl+C.
fn shutdown_channel() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received");
        tx.send(true).ok();
    });
    rx
}
