// src/strategies/macd_momentum.rs
use crate::strategies::traits::{MarketView, Strategy};
use crate::types::{Candle, Momentum};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// MACD-histogram momentum with an SMA trend filter.
pub struct MacdMomentum {
    take_profit: Decimal,
    trailing_stop: Decimal,
    warmup: usize,
}

impl MacdMomentum {
    /// # Arguments
    /// * `take_profit` - Gain over entry that closes the position (0 disables).
    /// * `trailing_stop` - Max drop from the candle high, as a fraction (0 disables).
    /// * `warmup` - Candles needed before the histogram is trusted.
    pub fn new(take_profit: Decimal, trailing_stop: Decimal, warmup: usize) -> Self {
        Self {
            take_profit,
            trailing_stop,
            warmup,
        }
    }

    fn trailing_enabled(&self) -> bool {
        self.trailing_stop > Decimal::ZERO
    }

    fn take_profit_enabled(&self) -> bool {
        self.take_profit > Decimal::ZERO
    }

    /// Index of the latest candle once enough history exists (`index - 2 > 0`).
    fn ready_index(&self, view: &MarketView<'_>) -> Option<usize> {
        let i = view.current_index()?;
        if view.candles.len() < self.warmup || i < 3 {
            return None;
        }
        Some(i)
    }

    fn momentum_at(&self, view: &MarketView<'_>, i: usize) -> Momentum {
        let h = &view.indicators.histogram;
        let close = view.candles[i].close.to_f64().unwrap_or(f64::NAN);
        classify(h[i - 2], h[i - 1], h[i], close, view.indicators.sma[i])
    }

    fn trailing_breach(&self, high: Decimal, price: Decimal) -> bool {
        self.trailing_enabled() && drop_from_high(high, price) > self.trailing_stop
    }
}

/// Bullish iff the histogram is non-decreasing over three points and the close is above the SMA.
pub fn classify(macd_2: f64, macd_1: f64, macd_0: f64, close: f64, sma: f64) -> Momentum {
    if macd_2 <= macd_1 && macd_1 <= macd_0 && close > sma {
        Momentum::Bullish
    } else {
        Momentum::Bearish
    }
}

/// (high - price) / high, zero for a non-positive high.
pub fn drop_from_high(high: Decimal, price: Decimal) -> Decimal {
    if high <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (high - price) / high
}

impl Strategy for MacdMomentum {
    fn name(&self) -> String {
        "macd_momentum".to_string()
    }

    fn warmup(&self) -> usize {
        self.warmup
    }

    fn momentum(&self, view: &MarketView<'_>) -> Option<Momentum> {
        let i = self.ready_index(view)?;
        Some(self.momentum_at(view, i))
    }

    fn should_enter(&self, view: &MarketView<'_>) -> bool {
        let Some(i) = self.ready_index(view) else {
            return false;
        };
        let current = &view.candles[i];
        let previous = &view.candles[i - 1];

        // Не покупаем на свече, чей собственный диапазон уже больше трейлинг-стопа
        let whipsaw = self.trailing_breach(current.high, current.low);

        self.momentum_at(view, i) == Momentum::Bullish
            && previous.open < current.close
            && previous.low < current.low
            && !whipsaw
    }

    fn should_exit(&self, view: &MarketView<'_>, take_price: Option<Decimal>) -> bool {
        let Some(i) = self.ready_index(view) else {
            return false;
        };
        let current = &view.candles[i];
        let previous = &view.candles[i - 1];
        let before_previous = &view.candles[i - 2];

        let momentum_exit = self.momentum_at(view, i) == Momentum::Bearish
            && before_previous.open >= previous.close;
        // Overrides momentum: close broke the prior candle's low.
        let broke_low = previous.low > current.close;
        let take_profit = self.take_profit_enabled()
            && take_price.is_some_and(|take| current.close > take);
        let trailing = self.trailing_breach(current.high, current.close);

        momentum_exit || broke_low || take_profit || trailing
    }

    fn take_price(&self, entry_price: Decimal) -> Option<Decimal> {
        self.take_profit_enabled()
            .then(|| entry_price * (Decimal::ONE + self.take_profit))
    }

    fn exit_pressure(&self, latest: &Candle, take_price: Option<Decimal>) -> bool {
        let take_profit =
            self.take_profit_enabled() && take_price.is_some_and(|take| take < latest.close);
        take_profit || self.trailing_breach(latest.high, latest.close)
    }
}
