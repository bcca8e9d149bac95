// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// One OHLCV bar as returned by the exchange. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
}

/// Result of a market buy: the partial fills and the total base quantity bought.
#[derive(Debug, Clone)]
pub struct MarketBuyReceipt {
    pub order: OrderResponse,
    pub fills: Vec<Fill>,
    pub executed_qty: Decimal,
}

impl MarketBuyReceipt {
    /// Quantity-weighted average fill price. `None` when nothing was filled.
    pub fn average_price(&self) -> Option<Decimal> {
        let (notional, qty) = self
            .fills
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(n, q), f| {
                (n + f.price * f.qty, q + f.qty)
            });
        if qty.is_zero() {
            None
        } else {
            Some(notional / qty)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub free: Decimal,
    pub locked: Decimal,
}

/// Balances keyed by asset name, as reported by the exchange at query time.
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    pub balances: HashMap<String, AssetBalance>,
}

impl AccountSnapshot {
    pub fn balance(&self, asset: &str) -> AssetBalance {
        self.balances.get(asset).copied().unwrap_or_default()
    }

    pub fn free(&self, asset: &str) -> Decimal {
        self.balance(asset).free
    }

    pub fn locked(&self, asset: &str) -> Decimal {
        self.balance(asset).locked
    }
}

/// Exchange trading-rule metadata for a single pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingRules {
    /// Maximum downward price deviation as a fraction (already divided by 100).
    pub percent_price_multiplier_down: Decimal,
    pub min_notional: Decimal,
    pub step_size: Decimal,
    pub quote_precision: u32,
}

impl Default for TradingRules {
    fn default() -> Self {
        Self {
            percent_price_multiplier_down: Decimal::ZERO,
            min_notional: Decimal::ZERO,
            step_size: Decimal::ONE,
            quote_precision: 8,
        }
    }
}

/// An open long position created by a successful entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: Decimal,
    pub take_price: Option<Decimal>,
    pub executed_quantity: Decimal,
    pub stop_order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Holding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Momentum {
    Bullish,
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Advice(Side),
    Hold,
}
