// src/connectors/binance.rs
use crate::connectors::messages::{
    filter_decimal, filter_type, parse_kline, BinanceAccountInfo, BinanceErrorBody,
    BinanceExchangeInfo, BinanceOrderResponse, BinanceServerTime, BinanceTickerPrice,
    UNKNOWN_ORDER_CODE,
};
use crate::connectors::traits::{ExchangeGateway, GatewayResult};
use crate::error::GatewayError;
use crate::types::{
    AccountSnapshot, AssetBalance, Candle, Fill, MarketBuyReceipt, OrderResponse, Side, TradingRules,
};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub struct BinanceClient {
    api_key: String,
    secret_key: String,
    http_client: Client,
    base_rest_url: String,
    timeout: Duration,
    recv_window_ms: u64,
}

impl BinanceClient {
    pub fn new(
        api_key: String,
        secret_key: String,
        base_rest_url: impl Into<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        Ok(Self {
            api_key,
            secret_key,
            http_client: Self::build_http_client(timeout)?,
            base_rest_url: base_rest_url.into().trim_end_matches('/').to_string(),
            timeout,
            recv_window_ms: 5000,
        })
    }

    pub fn with_recv_window(mut self, recv_window_ms: u64) -> Self {
        self.recv_window_ms = recv_window_ms;
        self
    }

    fn build_http_client(timeout: Duration) -> GatewayResult<Client> {
        Ok(Client::builder().timeout(timeout).build()?)
    }

    fn sign_and_build_query(&self, params: Vec<(&str, String)>) -> GatewayResult<String> {
        let mut params = params;
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", Utc::now().timestamp_millis().to_string()));

        let query_string = serde_urlencoded::to_string(&params)
            .map_err(|e| GatewayError::Signing(e.to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| GatewayError::Signing(e.to_string()))?;
        mac.update(query_string.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}&signature={}", query_string, signature))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> GatewayResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(map_transport)?;

        if !status.is_success() {
            let (code, msg) = match serde_json::from_str::<BinanceErrorBody>(&body) {
                Ok(err) => (err.code, err.msg),
                Err(_) => (0, body),
            };
            return Err(GatewayError::Api {
                status: status.as_u16(),
                code,
                msg,
            });
        }

        serde_json::from_str::<T>(&body).map_err(|e| GatewayError::Malformed(e.to_string()))
    }

    async fn send_public_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.base_rest_url, endpoint);
        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(map_transport)?;
        Self::decode(response).await
    }

    async fn send_signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(&str, String)>,
    ) -> GatewayResult<T> {
        let full_query = self.sign_and_build_query(params)?;
        let url = format!("{}{}?{}", self.base_rest_url, endpoint, full_query);

        let response = self
            .http_client
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(map_transport)?;
        Self::decode(response).await
    }

    async fn send_order(&self, params: Vec<(&str, String)>) -> GatewayResult<BinanceOrderResponse> {
        self.send_signed_request(Method::POST, "/api/v3/order", params)
            .await
    }

    fn order_params(pair: &str, side: Side, order_type: &str) -> Vec<(&'static str, String)> {
        vec![
            ("symbol", pair.to_string()),
            ("side", side.as_str().to_string()),
            ("type", order_type.to_string()),
            ("newClientOrderId", Uuid::new_v4().simple().to_string()),
        ]
    }
}

fn map_transport(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport(e)
    }
}

fn into_order_response(resp: BinanceOrderResponse) -> OrderResponse {
    OrderResponse {
        id: resp.order_id.to_string(),
        client_order_id: resp.client_order_id,
        symbol: resp.symbol,
        status: resp.status,
    }
}

#[async_trait]
impl ExchangeGateway for BinanceClient {
    async fn connect(&mut self) -> GatewayResult<i64> {
        let _: Value = self.send_public_request("/api/v3/ping", vec![]).await?;
        let time: BinanceServerTime = self.send_public_request("/api/v3/time", vec![]).await?;
        Ok(time.server_time)
    }

    async fn reconnect(&mut self) -> GatewayResult<()> {
        self.http_client = Self::build_http_client(self.timeout)?;
        let server_time = self.connect().await?;
        info!("Reconnected to {} (server time {})", self.base_rest_url, server_time);
        Ok(())
    }

    async fn get_candles(
        &self,
        pair: &str,
        interval: &str,
        limit: usize,
    ) -> GatewayResult<Vec<Candle>> {
        let rows: Vec<Vec<Value>> = self
            .send_public_request(
                "/api/v3/klines",
                vec![
                    ("symbol", pair.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn get_account_balances(&self) -> GatewayResult<AccountSnapshot> {
        let resp: BinanceAccountInfo = self
            .send_signed_request(Method::GET, "/api/v3/account", vec![])
            .await?;

        let balances = resp
            .balances
            .into_iter()
            .map(|b| {
                (
                    b.asset,
                    AssetBalance {
                        free: b.free,
                        locked: b.locked,
                    },
                )
            })
            .collect();

        Ok(AccountSnapshot { balances })
    }

    async fn get_trading_rules(&self, pair: &str) -> GatewayResult<TradingRules> {
        let info: BinanceExchangeInfo = self
            .send_public_request("/api/v3/exchangeInfo", vec![("symbol", pair.to_string())])
            .await?;

        let symbol = info
            .symbols
            .into_iter()
            .find(|s| s.symbol == pair)
            .ok_or_else(|| GatewayError::Malformed(format!("{} missing from exchangeInfo", pair)))?;

        let mut rules = TradingRules {
            quote_precision: symbol.quote_asset_precision,
            ..TradingRules::default()
        };
        let hundred = Decimal::from(100);

        for filter in &symbol.filters {
            match filter_type(filter) {
                // multiplierDown приходит в процентах
                Some("PERCENT_PRICE") => {
                    if let Some(down) = filter_decimal(filter, "multiplierDown") {
                        rules.percent_price_multiplier_down = down / hundred;
                    }
                }
                Some("PERCENT_PRICE_BY_SIDE") => {
                    if let Some(down) = filter_decimal(filter, "askMultiplierDown") {
                        rules.percent_price_multiplier_down = down / hundred;
                    }
                }
                Some("MIN_NOTIONAL") | Some("NOTIONAL") => {
                    if let Some(min) = filter_decimal(filter, "minNotional") {
                        rules.min_notional = min;
                    }
                }
                Some("LOT_SIZE") => {
                    if let Some(step) = filter_decimal(filter, "stepSize") {
                        if step > Decimal::ZERO {
                            rules.step_size = step.normalize();
                        }
                    }
                }
                _ => {}
            }
        }

        debug!("Trading rules for {}: {:?}", pair, rules);
        Ok(rules)
    }

    async fn place_market_buy(
        &self,
        pair: &str,
        quote_amount: Decimal,
    ) -> GatewayResult<MarketBuyReceipt> {
        let mut params = Self::order_params(pair, Side::Buy, "MARKET");
        params.push(("quoteOrderQty", quote_amount.to_string()));
        params.push(("newOrderRespType", "FULL".to_string()));

        info!("🚀 Sending Order: MARKET BUY {} {} (quote)", quote_amount, pair);
        let mut resp = self.send_order(params).await?;

        let fills = std::mem::take(&mut resp.fills)
            .into_iter()
            .map(Fill::from)
            .collect();
        let executed_qty = resp.executed_qty;

        Ok(MarketBuyReceipt {
            order: into_order_response(resp),
            fills,
            executed_qty,
        })
    }

    async fn place_market_sell(
        &self,
        pair: &str,
        quantity: Decimal,
    ) -> GatewayResult<OrderResponse> {
        let mut params = Self::order_params(pair, Side::Sell, "MARKET");
        params.push(("quantity", quantity.to_string()));

        info!("🚀 Sending Order: MARKET SELL {} {}", quantity, pair);
        let resp = self.send_order(params).await?;
        Ok(into_order_response(resp))
    }

    async fn place_stop_limit_sell(
        &self,
        pair: &str,
        quantity: Decimal,
        stop_price: Decimal,
        limit_price: Decimal,
    ) -> GatewayResult<OrderResponse> {
        let mut params = Self::order_params(pair, Side::Sell, "STOP_LOSS_LIMIT");
        params.push(("quantity", quantity.to_string()));
        params.push(("price", limit_price.to_string()));
        params.push(("stopPrice", stop_price.to_string()));
        params.push(("timeInForce", "GTC".to_string()));

        info!(
            "🚀 Sending Order: STOP_LOSS_LIMIT SELL {} {} stop {} limit {}",
            quantity, pair, stop_price, limit_price
        );
        let resp = self.send_order(params).await?;
        Ok(into_order_response(resp))
    }

    async fn cancel_open_orders(&self, pair: &str) -> GatewayResult<()> {
        let result: GatewayResult<Value> = self
            .send_signed_request(
                Method::DELETE,
                "/api/v3/openOrders",
                vec![("symbol", pair.to_string())],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(GatewayError::Api { code, .. }) if code == UNKNOWN_ORDER_CODE => {
                Err(GatewayError::NoOpenOrders(pair.to_string()))
            }
            Err(e) => {
                warn!("Cancel open orders on {} failed: {}", pair, e);
                Err(e)
            }
        }
    }

    async fn get_current_price(&self, pair: &str) -> GatewayResult<Decimal> {
        let ticker: BinanceTickerPrice = self
            .send_public_request("/api/v3/ticker/price", vec![("symbol", pair.to_string())])
            .await?;
        Ok(ticker.price)
    }
}
