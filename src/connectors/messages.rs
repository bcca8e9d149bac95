// src/connectors/messages.rs
//! Wire formats of the Binance spot REST API.
use crate::error::GatewayError;
use crate::types::{Candle, Fill};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Тело ошибки Binance: {"code": -2011, "msg": "Unknown order sent."}
#[derive(Debug, Deserialize)]
pub struct BinanceErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Returned by DELETE /api/v3/openOrders when nothing is open.
pub const UNKNOWN_ORDER_CODE: i64 = -2011;

#[derive(Debug, Deserialize)]
pub struct BinanceBalance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BinanceAccountInfo {
    pub balances: Vec<BinanceBalance>,
}

#[derive(Debug, Deserialize)]
pub struct BinanceFill {
    pub price: Decimal,
    pub qty: Decimal,
}

impl From<BinanceFill> for Fill {
    fn from(f: BinanceFill) -> Self {
        Fill {
            price: f.price,
            qty: f.qty,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BinanceOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(rename = "clientOrderId", default)]
    pub client_order_id: String,
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "executedQty", default)]
    pub executed_qty: Decimal,
    #[serde(default)]
    pub fills: Vec<BinanceFill>,
}

#[derive(Debug, Deserialize)]
pub struct BinanceTickerPrice {
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BinanceServerTime {
    #[serde(rename = "serverTime")]
    pub server_time: i64,
}

#[derive(Debug, Deserialize)]
pub struct BinanceExchangeInfo {
    pub symbols: Vec<BinanceSymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct BinanceSymbolInfo {
    pub symbol: String,
    #[serde(rename = "quoteAssetPrecision", default = "default_quote_precision")]
    pub quote_asset_precision: u32,
    pub filters: Vec<Value>,
}

fn default_quote_precision() -> u32 {
    8
}

/// Разбор строки kline: [openTime, open, high, low, close, volume, closeTime, ...]
pub fn parse_kline(row: &[Value]) -> Result<Candle, GatewayError> {
    if row.len() < 7 {
        return Err(GatewayError::Malformed(format!(
            "kline row has {} fields, expected at least 7",
            row.len()
        )));
    }

    let int_at = |i: usize| {
        row[i]
            .as_i64()
            .ok_or_else(|| GatewayError::Malformed(format!("kline field {} is not an integer", i)))
    };
    let dec_at = |i: usize| -> Result<Decimal, GatewayError> {
        let raw = row[i]
            .as_str()
            .ok_or_else(|| GatewayError::Malformed(format!("kline field {} is not a string", i)))?;
        Ok(Decimal::from_str(raw)?)
    };

    Ok(Candle {
        open_time: int_at(0)?,
        open: dec_at(1)?,
        high: dec_at(2)?,
        low: dec_at(3)?,
        close: dec_at(4)?,
        volume: dec_at(5)?,
        close_time: int_at(6)?,
    })
}

/// Pulls a decimal out of a filter object, e.g. `minNotional` of MIN_NOTIONAL.
pub fn filter_decimal(filter: &Value, key: &str) -> Option<Decimal> {
    filter
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| Decimal::from_str(s).ok())
}

pub fn filter_type(filter: &Value) -> Option<&str> {
    filter.get("filterType").and_then(|v| v.as_str())
}
