#![allow(dead_code)]

use async_trait::async_trait;
use macd_trader::config::{AppConfig, ExecutionConfig, IndicatorConfig, StrategyConfig};
use macd_trader::connectors::traits::{ExchangeGateway, GatewayResult};
use macd_trader::error::GatewayError;
use macd_trader::types::{
    AccountSnapshot, AssetBalance, Candle, Fill, MarketBuyReceipt, OrderResponse, TradingRules,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::io::Write;
use std::sync::{Arc, Mutex};

pub const ASSET: &str = "MANA";
pub const BASE: &str = "USDT";
pub const INTERVAL_MS: i64 = 300_000;

pub fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn config() -> AppConfig {
    AppConfig {
        api_key: String::new(),
        secret_key: String::new(),
        live: false,
        symbol: ASSET.into(),
        base_currency: BASE.into(),
        interval: "5m".into(),
        max_window: 100,
        log_dir: "logs".into(),
        strategy: StrategyConfig {
            risk_tolerance: d("0.05"),
            take_profit: d("0.05"),
            trailing_stop: d("0.04"),
        },
        indicators: IndicatorConfig::default(),
        execution: ExecutionConfig {
            poll_interval_ms: 0,
            recovery_backoff_secs: 0,
            request_timeout_secs: 1,
            recv_window_ms: 5000,
        },
    }
}

fn candle(index: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    let dec = |v: f64| Decimal::from_str(&format!("{:.4}", v)).unwrap();
    Candle {
        open_time: index * INTERVAL_MS,
        open: dec(open),
        high: dec(high),
        low: dec(low),
        close: dec(close),
        volume: Decimal::from(1000),
        close_time: index * INTERVAL_MS + INTERVAL_MS - 1,
    }
}

/// 32 flat candles at 100 followed by eight +0.5 steps: the MACD histogram
/// rises over the last three candles and the close (104) sits above the
/// 5-period SMA (103), with a higher low and a narrow last bar.
pub fn bullish_series() -> Vec<Candle> {
    let mut candles: Vec<Candle> = (0..32)
        .map(|i| candle(i, 100.0, 100.2, 99.8, 100.0))
        .collect();
    let mut prev_close = 100.0;
    for step in 0..8 {
        let close = 100.5 + 0.5 * step as f64;
        candles.push(candle(32 + step, prev_close, close + 0.2, prev_close - 0.2, close));
        prev_close = close;
    }
    candles
}

/// A new candle closing at 101, below the previous candle's low (103.3).
pub fn breakdown_candle() -> Candle {
    candle(40, 104.0, 104.2, 100.8, 101.0)
}

/// Collects formatted log lines for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Routes this thread's tracing output into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Rewrites the still-forming last candle in place (same open time).
pub fn reshape_last(candles: &mut [Candle], high: &str, low: &str, close: &str) {
    if let Some(last) = candles.last_mut() {
        last.high = d(high);
        last.low = d(low);
        last.close = d(close);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Candles(usize),
    Balances,
    Buy(Decimal),
    Sell(Decimal),
    StopLimit {
        quantity: Decimal,
        stop: Decimal,
        limit: Decimal,
        free_at_call: Decimal,
    },
    Cancel,
    Price,
    Reconnect,
}

#[derive(Debug)]
pub struct MockState {
    pub candles: Vec<Candle>,
    pub account: AccountSnapshot,
    pub rules: TradingRules,
    pub fills: Vec<Fill>,
    /// Commission taken from the bought quantity.
    pub fee: Decimal,
    pub open_orders: usize,
    pub price: Decimal,
    pub fail_candles: usize,
    /// Fails only full-window fetches (limit > 2).
    pub fail_window: usize,
    pub fail_reconnect: bool,
    /// Cancels still apply on the exchange, but the reply times out.
    pub fail_cancel: bool,
    pub calls: Vec<Call>,
}

/// In-memory spot exchange: balances move the way the real one moves them
/// (stop orders lock quantity, cancels release it, fees shrink fills).
#[derive(Debug)]
pub struct MockGateway {
    pub state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new(candles: Vec<Candle>) -> Self {
        let mut account = AccountSnapshot::default();
        account.balances.insert(
            BASE.into(),
            AssetBalance {
                free: d("1000"),
                locked: Decimal::ZERO,
            },
        );
        Self {
            state: Mutex::new(MockState {
                candles,
                account,
                rules: TradingRules {
                    percent_price_multiplier_down: d("0.002"),
                    min_notional: d("10"),
                    step_size: d("1"),
                    quote_precision: 8,
                },
                fills: vec![
                    Fill {
                        price: d("103.9"),
                        qty: d("3"),
                    },
                    Fill {
                        price: d("104.1"),
                        qty: d("7"),
                    },
                ],
                fee: Decimal::ZERO,
                open_orders: 0,
                price: d("101"),
                fail_candles: 0,
                fail_window: 0,
                fail_reconnect: false,
                fail_cancel: false,
                calls: Vec::new(),
            }),
        }
    }

    pub fn with<F: FnOnce(&mut MockState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn update<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn balance(&self, asset: &str) -> AssetBalance {
        self.state.lock().unwrap().account.balance(asset)
    }
}

fn rejected(msg: &str) -> GatewayError {
    GatewayError::Api {
        status: 400,
        code: -2010,
        msg: msg.to_string(),
    }
}

fn order(id: usize) -> OrderResponse {
    OrderResponse {
        id: id.to_string(),
        client_order_id: format!("mock-{}", id),
        symbol: format!("{}{}", ASSET, BASE),
        status: "NEW".into(),
    }
}

impl MockState {
    fn balance_mut(&mut self, asset: &str) -> &mut AssetBalance {
        self.account.balances.entry(asset.to_string()).or_default()
    }
}

#[async_trait]
impl ExchangeGateway for MockGateway {
    async fn connect(&mut self) -> GatewayResult<i64> {
        Ok(1_700_000_000_000)
    }

    async fn reconnect(&mut self) -> GatewayResult<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Reconnect);
        if s.fail_reconnect {
            return Err(GatewayError::Timeout);
        }
        Ok(())
    }

    async fn get_candles(
        &self,
        _pair: &str,
        _interval: &str,
        limit: usize,
    ) -> GatewayResult<Vec<Candle>> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Candles(limit));
        if s.fail_candles > 0 {
            s.fail_candles -= 1;
            return Err(GatewayError::Timeout);
        }
        if limit > 2 && s.fail_window > 0 {
            s.fail_window -= 1;
            return Err(GatewayError::Api {
                status: 502,
                code: 0,
                msg: "Bad Gateway".into(),
            });
        }
        let start = s.candles.len().saturating_sub(limit);
        Ok(s.candles[start..].to_vec())
    }

    async fn get_account_balances(&self) -> GatewayResult<AccountSnapshot> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Balances);
        Ok(s.account.clone())
    }

    async fn get_trading_rules(&self, _pair: &str) -> GatewayResult<TradingRules> {
        Ok(self.state.lock().unwrap().rules.clone())
    }

    async fn place_market_buy(
        &self,
        _pair: &str,
        quote_amount: Decimal,
    ) -> GatewayResult<MarketBuyReceipt> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Buy(quote_amount));
        if s.account.free(BASE) < quote_amount {
            return Err(rejected("insufficient balance"));
        }
        let executed: Decimal = s.fills.iter().map(|f| f.qty).sum();
        let fee = s.fee;
        s.balance_mut(BASE).free -= quote_amount;
        s.balance_mut(ASSET).free += executed - fee;
        Ok(MarketBuyReceipt {
            order: order(1),
            fills: s.fills.clone(),
            executed_qty: executed,
        })
    }

    async fn place_market_sell(
        &self,
        _pair: &str,
        quantity: Decimal,
    ) -> GatewayResult<OrderResponse> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Sell(quantity));
        if quantity <= Decimal::ZERO || s.account.free(ASSET) < quantity {
            return Err(rejected("insufficient balance"));
        }
        let price = s.price;
        s.balance_mut(ASSET).free -= quantity;
        s.balance_mut(BASE).free += quantity * price;
        Ok(order(2))
    }

    async fn place_stop_limit_sell(
        &self,
        _pair: &str,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> GatewayResult<OrderResponse> {
        let mut s = self.state.lock().unwrap();
        let free = s.account.free(ASSET);
        s.calls.push(Call::StopLimit {
            quantity,
            stop: stop_price,
            limit: limit_price,
            free_at_call: free,
        });
        if quantity <= Decimal::ZERO || free < quantity {
            return Err(rejected("insufficient balance"));
        }
        let balance = s.balance_mut(ASSET);
        balance.free -= quantity;
        balance.locked += quantity;
        s.open_orders += 1;
        Ok(order(3))
    }

    async fn cancel_open_orders(&self, pair: &str) -> GatewayResult<()> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Cancel);
        let had_orders = s.open_orders > 0;
        s.open_orders = 0;
        let balance = s.balance_mut(ASSET);
        balance.free += balance.locked;
        balance.locked = Decimal::ZERO;

        if s.fail_cancel {
            return Err(GatewayError::Timeout);
        }
        if !had_orders {
            return Err(GatewayError::NoOpenOrders(pair.to_string()));
        }
        Ok(())
    }

    async fn get_current_price(&self, _pair: &str) -> GatewayResult<Decimal> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(Call::Price);
        Ok(s.price)
    }
}
