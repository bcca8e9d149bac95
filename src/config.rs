// src/config.rs

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StrategyConfig {
    pub risk_tolerance: Decimal,
    // 0 отключает тейк-профит / трейлинг-стоп
    pub take_profit: Decimal,
    pub trailing_stop: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorConfig {
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub sma_period: usize,
}

impl IndicatorConfig {
    /// Minimum number of candles before histogram values are trusted.
    pub fn warmup(&self) -> usize {
        self.macd_slow + self.macd_signal
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            macd_fast: 8,
            macd_slow: 21,
            macd_signal: 9,
            sma_period: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutionConfig {
    pub poll_interval_ms: u64,
    pub recovery_backoff_secs: u64,
    pub request_timeout_secs: u64,
    pub recv_window_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            recovery_backoff_secs: 5,
            request_timeout_secs: 10,
            recv_window_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub secret_key: String,
    pub live: bool,
    pub symbol: String,
    pub base_currency: String,
    pub interval: String,
    pub max_window: usize,
    pub log_dir: String,
    pub strategy: StrategyConfig,
    pub indicators: IndicatorConfig,
    pub execution: ExecutionConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("api_key", "")?
            .set_default("secret_key", "")?
            .set_default("live", false)?
            .set_default("symbol", "MANA")?
            .set_default("base_currency", "USDT")?
            .set_default("interval", "5m")?
            .set_default("max_window", 100)?
            .set_default("log_dir", "logs")?
            .set_default("strategy.risk_tolerance", "0.05")?
            .set_default("strategy.take_profit", "0.05")?
            .set_default("strategy.trailing_stop", "0.04")?
            .set_default("indicators.macd_fast", 8)?
            .set_default("indicators.macd_slow", 21)?
            .set_default("indicators.macd_signal", 9)?
            .set_default("indicators.sma_period", 5)?
            .set_default("execution.poll_interval_ms", 1000)?
            .set_default("execution.recovery_backoff_secs", 5)?
            .set_default("execution.request_timeout_secs", 10)?
            .set_default("execution.recv_window_ms", 5000)?
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.strategy;
        if s.risk_tolerance <= Decimal::ZERO {
            return Err(ConfigError::Message(
                "strategy.risk_tolerance must be greater than 0".into(),
            ));
        }
        if s.take_profit < Decimal::ZERO || s.trailing_stop < Decimal::ZERO {
            return Err(ConfigError::Message(
                "take_profit and trailing_stop must be >= 0".into(),
            ));
        }
        let warmup = self.indicators.warmup();
        if self.max_window < warmup {
            return Err(ConfigError::Message(format!(
                "max_window {} is below indicator warm-up length {}",
                self.max_window, warmup
            )));
        }
        Ok(())
    }

    pub fn pair(&self) -> String {
        format!("{}{}", self.symbol, self.base_currency)
    }

    pub fn base_url(&self) -> &'static str {
        if self.live {
            "https://api.binance.com"
        } else {
            "https://testnet.binance.vision"
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> AppConfig {
        AppConfig {
            api_key: String::new(),
            secret_key: String::new(),
            live: false,
            symbol: "MANA".into(),
            base_currency: "USDT".into(),
            interval: "5m".into(),
            max_window: 100,
            log_dir: "logs".into(),
            strategy: StrategyConfig {
                risk_tolerance: Decimal::new(5, 2),
                take_profit: Decimal::new(5, 2),
                trailing_stop: Decimal::new(4, 2),
            },
            indicators: IndicatorConfig::default(),
            execution: ExecutionConfig::default(),
        }
    }

    #[test]
    fn pair_joins_symbol_and_base() {
        assert_eq!(sample().pair(), "MANAUSDT");
    }

    #[test]
    fn sandbox_is_selected_unless_live() {
        let mut cfg = sample();
        assert_eq!(cfg.base_url(), "https://testnet.binance.vision");
        cfg.live = true;
        assert_eq!(cfg.base_url(), "https://api.binance.com");
    }

    #[test]
    fn rejects_non_positive_risk() {
        let mut cfg = sample();
        cfg.strategy.risk_tolerance = Decimal::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_window_shorter_than_warmup() {
        let mut cfg = sample();
        cfg.max_window = 20;
        assert!(cfg.validate().is_err());
        cfg.max_window = 30;
        assert!(cfg.validate().is_ok());
    }
}
