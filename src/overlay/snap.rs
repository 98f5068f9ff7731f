//! Magnet mode: pull a raw pointer position onto the nearest candle.

use crate::overlay::chart::{Candle, ChartSurface};
use crate::overlay::model::DomainPoint;

/// Maximum horizontal pixel distance between pointer and candle for a snap.
pub const SNAP_THRESHOLD_PX: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
pub struct SnapResolver<'a> {
    candles: &'a [Candle],
    enabled: bool,
    threshold_px: f64,
}

impl<'a> SnapResolver<'a> {
    pub fn new(candles: &'a [Candle], enabled: bool) -> Self {
        Self {
            candles,
            enabled,
            threshold_px: SNAP_THRESHOLD_PX,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold_px: f64) -> Self {
        self.threshold_px = threshold_px;
        self
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.candles.is_empty()
    }

    /// Snapped `(time, price)` for a raw position, or the raw values when
    /// magnet mode is off, no candle is close enough on screen, or the
    /// candle's x does not resolve. Pure: equal inputs give equal outputs.
    pub fn resolve(&self, chart: &dyn ChartSurface, raw: DomainPoint, pointer_x: f64) -> DomainPoint {
        if !self.is_active() {
            return raw;
        }
        let Some(candle) = nearest_candle(self.candles, raw.time) else {
            return raw;
        };
        let Some(candle_x) = chart.time_to_coordinate(candle.time).filter(|x| x.is_finite()) else {
            return raw;
        };
        if (candle_x - pointer_x).abs() < self.threshold_px {
            DomainPoint::new(candle.time, nearest_ohlc(candle, raw.price))
        } else {
            raw
        }
    }
}

/// Candle whose time equals `time`, otherwise the temporally closer of the two
/// neighbours straddling it. Ties go to the later neighbour.
pub fn nearest_candle(candles: &[Candle], time: f64) -> Option<&Candle> {
    let idx = candles.partition_point(|c| c.time < time);
    let after = candles.get(idx);
    if let Some(candle) = after.filter(|c| c.time == time) {
        return Some(candle);
    }
    let before = idx.checked_sub(1).and_then(|i| candles.get(i));
    match (before, after) {
        (Some(b), Some(a)) => {
            if (b.time - time).abs() < (a.time - time).abs() {
                Some(b)
            } else {
                Some(a)
            }
        }
        (b, a) => b.or(a),
    }
}

/// Whichever of open, high, low, close is numerically closest to `price`.
/// Ties keep the earlier field in that order.
pub fn nearest_ohlc(candle: &Candle, price: f64) -> f64 {
    candle
        .ohlc()
        .into_iter()
        .fold(candle.open, |best, value| {
            if (value - price).abs() < (best - price).abs() {
                value
            } else {
                best
            }
        })
}
