// src/core/risk.rs
use crate::connectors::traits::ExchangeGateway;
use crate::error::EngineError;
use crate::types::TradingRules;
use rust_decimal::Decimal;
use tracing::info;

/// Notional buffer for price drift and commission when deciding whether a
/// locked balance still counts as a position.
pub fn notional_buffer() -> Decimal {
    Decimal::new(1005, 3)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeLimits {
    /// Exchange-imposed floor on the risk tolerance.
    pub risk_tolerance_floor: Decimal,
    /// Effective risk tolerance: never below the configured one.
    pub risk_tolerance: Decimal,
    pub min_notional: Decimal,
    pub step_size: Decimal,
    pub quote_precision: u32,
}

impl ExchangeLimits {
    pub fn from_rules(configured_risk: Decimal, rules: &TradingRules) -> Self {
        let floor = rules.percent_price_multiplier_down;
        Self {
            risk_tolerance_floor: floor,
            risk_tolerance: configured_risk.max(floor),
            min_notional: rules.min_notional,
            step_size: rules.step_size,
            quote_precision: rules.quote_precision,
        }
    }

    /// Smallest locked notional still treated as an open position.
    pub fn holding_threshold(&self) -> Decimal {
        self.min_notional * notional_buffer()
    }
}

/// Fetches the pair's trading rules and floors the configured risk tolerance.
/// Must run before the first order is placed.
pub async fn calibrate<G>(
    gateway: &G,
    pair: &str,
    configured_risk: Decimal,
    at: i64,
) -> Result<ExchangeLimits, EngineError>
where
    G: ExchangeGateway + ?Sized,
{
    let rules = gateway.get_trading_rules(pair).await?;
    let limits = ExchangeLimits::from_rules(configured_risk, &rules);

    if limits.risk_tolerance > configured_risk {
        info!("NEW RISK_TOLERANCE: {}", limits.risk_tolerance);
    }
    info!("[{}] MIN_NOTIONAL: {}", at, limits.min_notional);
    Ok(limits)
}
