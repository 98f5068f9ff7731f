//! The candlestick-chart collaborator seen from the overlay.
//!
//! The overlay never renders candles or owns the OHLC series. It only asks
//! the chart to convert between domain values and pixels, and reads the
//! loaded candles for snapping and time fallback.

use serde::{Deserialize, Serialize};

/// Coordinate services supplied by the chart.
///
/// Every conversion returns `None` when the axis cannot resolve the value,
/// e.g. before layout or for a time that is not a sample of the displayed
/// series.
pub trait ChartSurface {
    fn time_to_coordinate(&self, time: f64) -> Option<f64>;
    fn coordinate_to_time(&self, x: f64) -> Option<f64>;
    fn price_to_coordinate(&self, price: f64) -> Option<f64>;
    fn coordinate_to_price(&self, y: f64) -> Option<f64>;
}

/// One OHLC bar of the loaded, time-ascending series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub const fn new(time: f64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    pub fn ohlc(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }
}

/// Pixel position inside the chart viewport, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPos {
    pub x: f64,
    pub y: f64,
}

impl ScreenPos {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_to(self, other: ScreenPos) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    #[must_use]
    pub fn distance_squared_to(self, other: ScreenPos) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

impl From<(f64, f64)> for ScreenPos {
    fn from(pos: (f64, f64)) -> Self {
        Self::new(pos.0, pos.1)
    }
}

/// Size of the overlay surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

/// Chart surface whose time axis only knows its sample times, the way a
/// candlestick chart places bars by index rather than by timestamp.
///
/// Bar `i` sits at `left_offset + i * bar_spacing`. Prices map linearly from
/// `price_top` (y = 0) to `price_bottom` (y = `height`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledChart {
    pub times: Vec<f64>,
    pub bar_spacing: f64,
    #[serde(default)]
    pub left_offset: f64,
    pub price_top: f64,
    pub price_bottom: f64,
    pub height: f64,
}

impl SampledChart {
    pub fn new(times: Vec<f64>, bar_spacing: f64, price_top: f64, price_bottom: f64, height: f64) -> Self {
        Self {
            times,
            bar_spacing,
            left_offset: 0.0,
            price_top,
            price_bottom,
            height,
        }
    }

    pub fn from_candles(candles: &[Candle], bar_spacing: f64, price_top: f64, price_bottom: f64, height: f64) -> Self {
        Self::new(
            candles.iter().map(|c| c.time).collect(),
            bar_spacing,
            price_top,
            price_bottom,
            height,
        )
    }

    #[must_use]
    pub fn with_left_offset(mut self, left_offset: f64) -> Self {
        self.left_offset = left_offset;
        self
    }

    fn price_span(&self) -> Option<f64> {
        let span = self.price_top - self.price_bottom;
        (span.is_finite() && span != 0.0 && self.height > 0.0).then_some(span)
    }
}

impl ChartSurface for SampledChart {
    fn time_to_coordinate(&self, time: f64) -> Option<f64> {
        if !time.is_finite() {
            return None;
        }
        let index = self
            .times
            .binary_search_by(|sample| sample.total_cmp(&time))
            .ok()?;
        Some(self.left_offset + index as f64 * self.bar_spacing)
    }

    fn coordinate_to_time(&self, x: f64) -> Option<f64> {
        if !x.is_finite() || self.bar_spacing <= 0.0 {
            return None;
        }
        let index = ((x - self.left_offset) / self.bar_spacing).round();
        if index < 0.0 {
            return None;
        }
        self.times.get(index as usize).copied()
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        let span = self.price_span()?;
        price
            .is_finite()
            .then(|| (self.price_top - price) * self.height / span)
    }

    fn coordinate_to_price(&self, y: f64) -> Option<f64> {
        let span = self.price_span()?;
        y.is_finite().then(|| self.price_top - y * span / self.height)
    }
}
