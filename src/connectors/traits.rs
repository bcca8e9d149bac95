// src/connectors/traits.rs
use crate::error::GatewayError;
use crate::types::{AccountSnapshot, Candle, MarketBuyReceipt, OrderResponse, TradingRules};
use async_trait::async_trait;
use rust_decimal::Decimal;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Everything the engine needs from an exchange. Any call may fail transiently.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Checks connectivity and returns the exchange server time (ms).
    async fn connect(&mut self) -> GatewayResult<i64>;

    /// Drops the current session and builds a fresh one.
    async fn reconnect(&mut self) -> GatewayResult<()>;

    /// Most recent candle last.
    async fn get_candles(&self, pair: &str, interval: &str, limit: usize)
        -> GatewayResult<Vec<Candle>>;

    async fn get_account_balances(&self) -> GatewayResult<AccountSnapshot>;

    async fn get_trading_rules(&self, pair: &str) -> GatewayResult<TradingRules>;

    async fn place_market_buy(
        &self,
        pair: &str,
        quote_amount: Decimal,
    ) -> GatewayResult<MarketBuyReceipt>;

    async fn place_market_sell(&self, pair: &str, quantity: Decimal)
        -> GatewayResult<OrderResponse>;

    /// Time-in-force is always GTC.
    async fn place_stop_limit_sell(
        &self,
        pair: &str,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> GatewayResult<OrderResponse>;

    /// Returns `GatewayError::NoOpenOrders` when there was nothing to cancel.
    async fn cancel_open_orders(&self, pair: &str) -> GatewayResult<()>;

    async fn get_current_price(&self, pair: &str) -> GatewayResult<Decimal>;
}
