// src/core/execution.rs
use crate::connectors::traits::{ExchangeGateway, GatewayResult};
use crate::error::{EngineError, GatewayError};
use crate::types::{MarketBuyReceipt, OrderResponse};
use crate::utils::precision::{normalize_quantity, round_price, truncate_quote};
use rust_decimal::Decimal;
use std::future::Future;
use tracing::{info, warn};

const PRICE_DP: u32 = 4;

/// Stop and limit prices for a protective sell below `reference_price`.
pub fn stop_limit_prices(
    reference_price: Decimal,
    risk_tolerance: Decimal,
    spread_tolerance: Decimal,
) -> (Decimal, Decimal) {
    let stop = round_price(reference_price * (Decimal::ONE - risk_tolerance), PRICE_DP);
    let limit = round_price(reference_price * (Decimal::ONE - spread_tolerance), PRICE_DP);
    (stop, limit)
}

/// An order that went through, with the quantity it was actually placed for.
#[derive(Debug, Clone)]
pub struct Placed {
    pub order: OrderResponse,
    pub quantity: Decimal,
    pub reconciled: bool,
}

/// Wraps single exchange calls for one pair, plus the quantity-reconciliation
/// retry used when the exchange-held quantity differs from what we computed.
#[derive(Debug, Clone)]
pub struct OrderExecutor {
    pair: String,
    asset: String,
    step_size: Decimal,
    quote_precision: u32,
}

impl OrderExecutor {
    pub fn new(pair: String, asset: String, step_size: Decimal, quote_precision: u32) -> Self {
        Self {
            pair,
            asset,
            step_size,
            quote_precision,
        }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub async fn market_buy<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        quote_amount: Decimal,
    ) -> GatewayResult<MarketBuyReceipt> {
        let amount = truncate_quote(quote_amount, self.quote_precision);
        gateway.place_market_buy(&self.pair, amount).await
    }

    pub async fn market_sell<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        quantity: Decimal,
    ) -> GatewayResult<OrderResponse> {
        gateway.place_market_sell(&self.pair, quantity).await
    }

    pub async fn stop_limit_sell<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        quantity: Decimal,
        reference_price: Decimal,
        risk_tolerance: Decimal,
        spread_tolerance: Decimal,
    ) -> GatewayResult<OrderResponse> {
        let (stop, limit) = stop_limit_prices(reference_price, risk_tolerance, spread_tolerance);
        gateway
            .place_stop_limit_sell(&self.pair, quantity, stop, limit)
            .await
    }

    /// Never fails: leftovers that cannot be cancelled are only logged.
    pub async fn cancel_open_orders<G: ExchangeGateway + ?Sized>(&self, gateway: &G, at: i64) {
        match gateway.cancel_open_orders(&self.pair).await {
            Ok(()) => info!("[{}] Cancelled open orders on {}", at, self.pair),
            Err(GatewayError::NoOpenOrders(_)) => info!("[{}] No open orders found.", at),
            Err(e) => warn!("[{}] Could not cancel open orders on {}: {}", at, self.pair, e),
        }
    }

    /// Free balance of the traded asset, floored to the lot step.
    /// The result never exceeds the queried free balance.
    pub async fn reconcile_quantity<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
    ) -> GatewayResult<Decimal> {
        let account = gateway.get_account_balances().await?;
        Ok(normalize_quantity(account.free(&self.asset), self.step_size))
    }

    /// Places an order for `quantity`; if that is rejected, re-reads the held
    /// balance and places it once more for the reconciled quantity.
    pub async fn place_reconciled<G, F, Fut>(
        &self,
        gateway: &G,
        label: &str,
        quantity: Decimal,
        at: i64,
        place: F,
    ) -> Result<Placed, EngineError>
    where
        G: ExchangeGateway + ?Sized,
        F: Fn(Decimal) -> Fut,
        Fut: Future<Output = GatewayResult<OrderResponse>>,
    {
        let first_error = match place(quantity).await {
            Ok(order) => {
                return Ok(Placed {
                    order,
                    quantity,
                    reconciled: false,
                })
            }
            Err(e) => e,
        };

        warn!("[{}] ERROR CAUGHT: {} {} ({})", at, label, quantity, first_error);
        let held = self.reconcile_quantity(gateway).await?;
        if held <= Decimal::ZERO {
            return Err(EngineError::EmptyBalance(self.asset.clone()));
        }

        warn!("[{}] Retrying {} with held quantity {}", at, label, held);
        let order = place(held).await.map_err(EngineError::Reconciliation)?;
        Ok(Placed {
            order,
            quantity: held,
            reconciled: true,
        })
    }

    /// Protective stop-limit sell for a fresh position.
    pub async fn protect<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        quantity: Decimal,
        entry_price: Decimal,
        risk_tolerance: Decimal,
        at: i64,
    ) -> Result<Placed, EngineError> {
        let spread = risk_tolerance * Decimal::from(2);
        self.place_reconciled(gateway, "STOP LOSS LIMIT", quantity, at, |qty| {
            self.stop_limit_sell(gateway, qty, entry_price, risk_tolerance, spread)
        })
        .await
    }

    /// Market sell of the position.
    pub async fn close<G: ExchangeGateway + ?Sized>(
        &self,
        gateway: &G,
        quantity: Decimal,
        at: i64,
    ) -> Result<Placed, EngineError> {
        self.place_reconciled(gateway, "MARKET SELL", quantity, at, |qty| {
            self.market_sell(gateway, qty)
        })
        .await
    }
}
