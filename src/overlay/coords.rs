//! Domain <-> screen conversion on top of a [`ChartSurface`].
//!
//! Screen to domain is a straight proxy of the chart's axes. Domain to screen
//! has one extra rule: a time that is not a sample of the displayed series
//! (a drawing made on a finer timeframe) resolves to the nearest earlier
//! loaded candle instead of disappearing.

use crate::overlay::chart::{Candle, ChartSurface, ScreenPos};
use crate::overlay::model::DomainPoint;

#[derive(Clone, Copy)]
pub struct CoordinateMapper<'a> {
    chart: &'a dyn ChartSurface,
    candles: &'a [Candle],
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(chart: &'a dyn ChartSurface, candles: &'a [Candle]) -> Self {
        Self { chart, candles }
    }

    pub fn chart(&self) -> &'a dyn ChartSurface {
        self.chart
    }

    pub fn candles(&self) -> &'a [Candle] {
        self.candles
    }

    /// Screen position of a domain point, or `None` when either axis does
    /// not resolve.
    pub fn to_screen(&self, point: DomainPoint) -> Option<ScreenPos> {
        let x = self.time_to_x(point.time)?;
        let y = self.price_to_y(point.price)?;
        Some(ScreenPos::new(x, y))
    }

    /// Domain point under a screen position.
    pub fn to_domain(&self, x: f64, y: f64) -> Option<DomainPoint> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let time = finite(self.chart.coordinate_to_time(x))?;
        let price = finite(self.chart.coordinate_to_price(y))?;
        Some(DomainPoint::new(time, price))
    }

    /// X coordinate of `time`, falling back to the latest loaded candle whose
    /// time is `<= time`. Times before the first candle stay unresolved.
    pub fn time_to_x(&self, time: f64) -> Option<f64> {
        if !time.is_finite() {
            return None;
        }
        if let Some(x) = finite(self.chart.time_to_coordinate(time)) {
            return Some(x);
        }
        let candle = candle_at_or_before(self.candles, time)?;
        finite(self.chart.time_to_coordinate(candle.time))
    }

    pub fn price_to_y(&self, price: f64) -> Option<f64> {
        if !price.is_finite() {
            return None;
        }
        finite(self.chart.price_to_coordinate(price))
    }
}

/// Latest candle with `candle.time <= time`, by binary search.
pub fn candle_at_or_before(candles: &[Candle], time: f64) -> Option<&Candle> {
    let idx = candles.partition_point(|c| c.time <= time);
    idx.checked_sub(1).and_then(|i| candles.get(i))
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
