// src/core/window.rs
use crate::types::Candle;
use std::collections::VecDeque;

/// Bounded, open-time ordered candle window. Oldest candles fall off the front.
#[derive(Debug, Clone)]
pub struct CandleWindow {
    capacity: usize,
    candles: VecDeque<Candle>,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            candles: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Appends a candle. A candle with the same open time as the last one
    /// replaces it (the still-forming bar); older candles are ignored.
    pub fn push(&mut self, candle: Candle) {
        if let Some(last) = self.candles.back_mut() {
            if candle.open_time == last.open_time {
                *last = candle;
                return;
            }
            if candle.open_time < last.open_time {
                return;
            }
        }
        self.candles.push_back(candle);
        while self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
        self.candles.make_contiguous();
    }

    pub fn extend<I: IntoIterator<Item = Candle>>(&mut self, candles: I) {
        for candle in candles {
            self.push(candle);
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Oldest first. `push` keeps the buffer contiguous, so the first slice is everything.
    pub fn candles(&self) -> &[Candle] {
        self.candles.as_slices().0
    }
}
