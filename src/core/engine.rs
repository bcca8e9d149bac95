// src/core/engine.rs
use crate::config::AppConfig;
use crate::connectors::traits::ExchangeGateway;
use crate::core::execution::OrderExecutor;
use crate::core::risk::{self, ExchangeLimits};
use crate::core::window::CandleWindow;
use crate::error::EngineError;
use crate::strategies::indicators::IndicatorSnapshot;
use crate::strategies::traits::{MarketView, Strategy};
use crate::types::{AccountSnapshot, Candle, Momentum, Position, PositionState, Side, Signal};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Mutable state owned by the evaluation path. Created once at startup and
/// only changed through balance reconciliation and position transitions.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub limits: ExchangeLimits,
    pub state: PositionState,
    pub position: Option<Position>,
    /// Free base-currency balance at the last evaluation.
    pub capital: Decimal,
    /// Open time of the newest candle seen by the supervisor.
    pub latest_time: i64,
    pub new_candle: bool,
    pub momentum: Option<Momentum>,
}

impl EngineContext {
    pub fn new(limits: ExchangeLimits) -> Self {
        Self {
            limits,
            state: PositionState::Flat,
            position: None,
            capital: Decimal::ZERO,
            latest_time: 0,
            new_candle: false,
            momentum: None,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.state == PositionState::Holding
    }

    pub fn take_price(&self) -> Option<Decimal> {
        self.position.as_ref().and_then(|p| p.take_price)
    }

    /// Re-derives the position state from balances. A position only exists if
    /// the locked asset is worth at least min_notional plus the buffer.
    pub fn reconcile(
        &mut self,
        account: &AccountSnapshot,
        asset: &str,
        base: &str,
        price: Decimal,
    ) {
        let locked = account.locked(asset);
        let holding = locked > Decimal::ZERO && locked * price >= self.limits.holding_threshold();

        self.capital = account.free(base);
        if holding {
            if self.new_candle {
                info!("[{}] Position: {}", self.latest_time, locked);
            }
            self.state = PositionState::Holding;
        } else {
            if self.position.take().is_some() {
                info!("[{}] Position no longer held on the exchange", self.latest_time);
            }
            self.state = PositionState::Flat;
        }
    }
}

/// Outcome of one strategy evaluation.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Not enough indicator history; nothing was decided.
    Warmup,
    Held,
    Entered(Position),
    Exited {
        quantity: Decimal,
        price: Option<Decimal>,
    },
}

pub struct TradingEngine<G, S> {
    config: AppConfig,
    gateway: G,
    strategy: S,
    executor: OrderExecutor,
    window: CandleWindow,
    ctx: EngineContext,
}

impl<G, S> TradingEngine<G, S>
where
    G: ExchangeGateway,
    S: Strategy,
{
    pub fn new(config: AppConfig, gateway: G, strategy: S, limits: ExchangeLimits) -> Self {
        let executor = OrderExecutor::new(
            config.pair(),
            config.symbol.clone(),
            limits.step_size,
            limits.quote_precision,
        );
        let window = CandleWindow::new(config.max_window);
        Self {
            config,
            gateway,
            strategy,
            executor,
            window,
            ctx: EngineContext::new(limits),
        }
    }

    /// Connects, calibrates risk against the exchange rules and builds the engine.
    pub async fn start(config: AppConfig, mut gateway: G, strategy: S) -> Result<Self, EngineError> {
        let server_time = gateway.connect().await?;
        info!("UNIX Timestamp: {}", server_time);

        // Ни одной свечи ещё не видели
        let limits = risk::calibrate(
            &gateway,
            &config.pair(),
            config.strategy.risk_tolerance,
            0,
        )
        .await?;
        info!(
            "Engine ready: {} on {} ({})",
            strategy.name(),
            config.pair(),
            config.interval
        );
        Ok(Self::new(config, gateway, strategy, limits))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Cheap gate on the two newest candles: is a full evaluation worth it?
    pub fn should_evaluate(&self, previous: &Candle, latest: &Candle) -> bool {
        let holding = self.ctx.is_holding();
        let new_candle = latest.open_time > self.ctx.latest_time;
        let break_low = previous.low > latest.low;
        let exit_pressure = holding && self.strategy.exit_pressure(latest, self.ctx.take_price());

        new_candle || break_low || exit_pressure || !holding
    }

    /// Records the newest open time and whether it is a candle not seen before.
    pub fn observe(&mut self, open_time: i64) {
        if open_time > self.ctx.latest_time {
            self.ctx.new_candle = true;
            self.ctx.latest_time = open_time;
            if self.ctx.capital > self.ctx.limits.min_notional && !self.ctx.is_holding() {
                info!("[{}] Balance: {}", open_time, self.ctx.capital);
            }
        } else {
            self.ctx.new_candle = false;
        }
    }

    /// Pulls the full window from the exchange into the rolling buffer.
    pub async fn refresh_window(&mut self) -> Result<(), EngineError> {
        let candles = self
            .gateway
            .get_candles(&self.config.pair(), &self.config.interval, self.config.max_window)
            .await?;
        self.window.extend(candles);
        Ok(())
    }

    /// Recomputes indicators, re-reads balances and runs the position state machine once.
    pub async fn evaluate(&mut self) -> Result<Transition, EngineError> {
        let Some(current) = self.window.latest().map(|c| c.close) else {
            return Ok(Transition::Warmup);
        };

        let account = self.gateway.get_account_balances().await?;
        self.ctx.reconcile(
            &account,
            &self.config.symbol,
            &self.config.base_currency,
            current,
        );
        if self.window.len() < self.strategy.warmup() {
            return Ok(Transition::Warmup);
        }

        let candles = self.window.candles();
        let indicators = IndicatorSnapshot::compute(candles, &self.config.indicators)?;
        let view = MarketView::new(candles, &indicators);

        let previous = self.ctx.momentum;
        self.ctx.momentum = self.strategy.momentum(&view);
        let Some(momentum) = self.ctx.momentum else {
            return Ok(Transition::Warmup);
        };
        if previous.is_some_and(|p| p != momentum) {
            info!("[{}] Momentum turned {:?}", self.ctx.latest_time, momentum);
        }

        let signal = self
            .strategy
            .decide(&view, self.ctx.state, self.ctx.take_price());
        debug!(
            "[{}] close {} momentum {:?} state {:?} -> {:?}",
            self.ctx.latest_time, current, momentum, self.ctx.state, signal
        );

        match signal {
            Signal::Advice(Side::Buy) => self.enter().await,
            Signal::Advice(Side::Sell) => self.exit().await,
            Signal::Hold => Ok(Transition::Held),
        }
    }

    /// FLAT -> HOLDING: market buy with all free capital, then a protective stop-limit sell.
    async fn enter(&mut self) -> Result<Transition, EngineError> {
        let capital = self.ctx.capital;
        if capital <= Decimal::ZERO || capital < self.ctx.limits.min_notional {
            warn!(
                "[{}] Entry signal ignored: balance {} below min notional {}",
                self.ctx.latest_time, capital, self.ctx.limits.min_notional
            );
            return Ok(Transition::Held);
        }

        // Снимаем остатки стоп-лимитов, если есть
        self.executor
            .cancel_open_orders(&self.gateway, self.ctx.latest_time)
            .await;

        let receipt = self.executor.market_buy(&self.gateway, capital).await?;
        self.ctx.state = PositionState::Holding;

        let entry_price = receipt
            .average_price()
            .ok_or_else(|| EngineError::EmptyFill(self.executor.pair().to_string()))?;
        let take_price = self.strategy.take_price(entry_price);
        if let Some(take) = take_price {
            info!("[{}] Profit taking at: {}", self.ctx.latest_time, take);
        }

        self.ctx.position = Some(Position {
            entry_price,
            take_price,
            executed_quantity: receipt.executed_qty,
            stop_order: None,
        });

        let stop = self
            .executor
            .protect(
                &self.gateway,
                receipt.executed_qty,
                entry_price,
                self.ctx.limits.risk_tolerance,
                self.ctx.latest_time,
            )
            .await?;
        if stop.reconciled {
            warn!(
                "[{}] Stop covers {} of {} bought",
                self.ctx.latest_time, stop.quantity, receipt.executed_qty
            );
        }

        let position = Position {
            entry_price,
            take_price,
            executed_quantity: receipt.executed_qty,
            stop_order: Some(stop.order.id),
        };
        self.ctx.position = Some(position.clone());

        info!("[{}] Approx. Buy Price: {}", self.ctx.latest_time, entry_price);
        Ok(Transition::Entered(position))
    }

    /// HOLDING -> FLAT: cancel the stop and market sell what was bought.
    async fn exit(&mut self) -> Result<Transition, EngineError> {
        self.executor
            .cancel_open_orders(&self.gateway, self.ctx.latest_time)
            .await;

        let quantity = match self.ctx.position.as_ref() {
            Some(position) => position.executed_quantity,
            // Позиция открыта не нами (рестарт, ручная покупка)
            None => self.executor.reconcile_quantity(&self.gateway).await?,
        };

        let sold = self
            .executor
            .close(&self.gateway, quantity, self.ctx.latest_time)
            .await?;
        if sold.reconciled {
            warn!(
                "[{}] Sold {} instead of {}",
                self.ctx.latest_time, sold.quantity, quantity
            );
        }
        self.ctx.state = PositionState::Flat;
        self.ctx.position = None;

        let price = match self.gateway.get_current_price(self.executor.pair()).await {
            Ok(price) => {
                info!("[{}] Approx. Sell Price: {}", self.ctx.latest_time, price);
                Some(price)
            }
            Err(e) => {
                warn!("[{}] Sold, but price lookup failed: {}", self.ctx.latest_time, e);
                None
            }
        };

        Ok(Transition::Exited {
            quantity: sold.quantity,
            price,
        })
    }
}
