// src/strategies/traits.rs
use crate::strategies::indicators::IndicatorSnapshot;
use crate::types::{Candle, Momentum, PositionState, Side, Signal};
use rust_decimal::Decimal;

/// Candle window plus the indicators computed over it.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    pub candles: &'a [Candle],
    pub indicators: &'a IndicatorSnapshot,
}

impl<'a> MarketView<'a> {
    pub fn new(candles: &'a [Candle], indicators: &'a IndicatorSnapshot) -> Self {
        Self {
            candles,
            indicators,
        }
    }

    /// Index of the latest candle, if candles and indicators line up.
    pub fn current_index(&self) -> Option<usize> {
        let len = self.candles.len();
        if len == 0 || self.indicators.len() != len {
            return None;
        }
        Some(len - 1)
    }
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    /// Number of candles required before any decision is taken.
    fn warmup(&self) -> usize;

    fn momentum(&self, view: &MarketView<'_>) -> Option<Momentum>;

    fn should_enter(&self, view: &MarketView<'_>) -> bool;

    fn should_exit(&self, view: &MarketView<'_>, take_price: Option<Decimal>) -> bool;

    /// Take-profit level for a fresh entry (None = disabled).
    fn take_price(&self, _entry_price: Decimal) -> Option<Decimal> {
        None
    }

    /// Cheap check on the latest candle alone; true means exit pressure
    /// (take-profit or trailing-stop breach) worth a full evaluation.
    fn exit_pressure(&self, _latest: &Candle, _take_price: Option<Decimal>) -> bool {
        false
    }

    /// Entry is only considered while flat, exit only while holding.
    fn decide(
        &self,
        view: &MarketView<'_>,
        state: PositionState,
        take_price: Option<Decimal>,
    ) -> Signal {
        match state {
            PositionState::Flat if self.should_enter(view) => Signal::Advice(Side::Buy),
            PositionState::Holding if self.should_exit(view, take_price) => {
                Signal::Advice(Side::Sell)
            }
            _ => Signal::Hold,
        }
    }
}
