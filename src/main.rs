// src/main.rs
use dotenvy::dotenv;
use macd_trader::config::AppConfig;
use macd_trader::connectors::binance::BinanceClient;
use macd_trader::core::engine::TradingEngine;
use macd_trader::core::supervisor::{RecoveryPolicy, Supervisor};
use macd_trader::strategies::macd_momentum::MacdMomentum;
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn setup_logging(log_dir: &str) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "macd_trader.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new()?;
    let _log_guard = setup_logging(&config.log_dir);

    info!("========================================");
    info!("       MACD TRADER - v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Target: {} ({})", config.pair(), config.interval);
    info!(
        "Mode:   {}",
        if config.live {
            "🚨 LIVE TRADING"
        } else {
            "📝 TESTNET"
        }
    );
    info!(
        "Risk: {} | Take profit: {} | Trailing stop: {}",
        config.strategy.risk_tolerance, config.strategy.take_profit, config.strategy.trailing_stop
    );
    info!("========================================");

    // 2. Initialize Components
    let client = BinanceClient::new(
        config.api_key.clone(),
        config.secret_key.clone(),
        config.base_url(),
        Duration::from_secs(config.execution.request_timeout_secs),
    )?
    .with_recv_window(config.execution.recv_window_ms);

    let strategy = MacdMomentum::new(
        config.strategy.take_profit,
        config.strategy.trailing_stop,
        config.indicators.warmup(),
    );
    let policy = RecoveryPolicy::from(&config.execution);

    // 3. Run Engine
    let engine = TradingEngine::start(config, client, strategy).await?;
    let mut supervisor = Supervisor::new(engine, policy);

    if let Err(e) = supervisor.run().await {
        error!("Fatal Engine Error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
