// src/strategies/indicators.rs
use crate::config::IndicatorConfig;
use crate::error::EngineError;
use crate::types::Candle;
use rust_decimal::prelude::ToPrimitive;
use ta::indicators::{MovingAverageConvergenceDivergence, SimpleMovingAverage};
use ta::Next;

/// MACD histogram and SMA, one value per candle of the window.
///
/// Both series are seeded from the first close, so early indices carry values
/// computed from partial history instead of being undefined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSnapshot {
    pub histogram: Vec<f64>,
    pub sma: Vec<f64>,
}

impl IndicatorSnapshot {
    pub fn from_parts(histogram: Vec<f64>, sma: Vec<f64>) -> Self {
        Self { histogram, sma }
    }

    /// Full recomputation over the window.
    pub fn compute(candles: &[Candle], params: &IndicatorConfig) -> Result<Self, EngineError> {
        let closes = candles
            .iter()
            .map(|c| {
                c.close.to_f64().ok_or_else(|| {
                    EngineError::Indicator(format!("close {} is not representable", c.close))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Self::compute_closes(&closes, params)
    }

    pub fn compute_closes(closes: &[f64], params: &IndicatorConfig) -> Result<Self, EngineError> {
        let mut macd = MovingAverageConvergenceDivergence::new(
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
        )
        .map_err(|e| EngineError::Indicator(format!("macd: {:?}", e)))?;
        let mut sma = SimpleMovingAverage::new(params.sma_period)
            .map_err(|e| EngineError::Indicator(format!("sma: {:?}", e)))?;

        let mut snapshot = Self {
            histogram: Vec::with_capacity(closes.len()),
            sma: Vec::with_capacity(closes.len()),
        };
        for &close in closes {
            if !close.is_finite() {
                return Err(EngineError::Indicator(format!("non-finite close {}", close)));
            }
            snapshot.histogram.push(macd.next(close).histogram);
            snapshot.sma.push(sma.next(close));
        }
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }
}
