//! Screen-space hit-testing of drawings and their anchor handles.

use crate::overlay::chart::ScreenPos;
use crate::overlay::coords::CoordinateMapper;
use crate::overlay::model::{AnchorHandle, DrawingObject, Shape};

pub const LINE_HIT_TOLERANCE_PX: f64 = 8.0;
pub const ANCHOR_HANDLE_RADIUS_PX: f64 = 10.0;
pub const TEXT_HIT_HALF_WIDTH_PX: f64 = 30.0;
pub const TEXT_HIT_HALF_HEIGHT_PX: f64 = 15.0;
pub const FIB_SPAN_SLACK_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerances {
    pub line_px: f64,
    pub handle_px: f64,
    pub text_half_width_px: f64,
    pub text_half_height_px: f64,
    pub fib_span_slack_px: f64,
}

impl Default for HitTolerances {
    fn default() -> Self {
        Self {
            line_px: LINE_HIT_TOLERANCE_PX,
            handle_px: ANCHOR_HANDLE_RADIUS_PX,
            text_half_width_px: TEXT_HIT_HALF_WIDTH_PX,
            text_half_height_px: TEXT_HIT_HALF_HEIGHT_PX,
            fib_span_slack_px: FIB_SPAN_SLACK_PX,
        }
    }
}

pub struct HitTester<'a> {
    mapper: CoordinateMapper<'a>,
    timeframe: &'a str,
    viewport_width: f64,
    tolerances: HitTolerances,
}

impl<'a> HitTester<'a> {
    pub fn new(mapper: CoordinateMapper<'a>, timeframe: &'a str, viewport_width: f64) -> Self {
        Self {
            mapper,
            timeframe,
            viewport_width,
            tolerances: HitTolerances::default(),
        }
    }

    #[must_use]
    pub fn with_tolerances(mut self, tolerances: HitTolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Topmost drawing under `(x, y)`. Later entries paint on top, so the
    /// list is scanned back to front.
    pub fn find_hit<'d>(&self, x: f64, y: f64, drawings: &'d [DrawingObject]) -> Option<&'d DrawingObject> {
        drawings.iter().rev().find(|drawing| self.hits(drawing, x, y))
    }

    /// Whether `(x, y)` touches `drawing`. Drawings scoped away from the
    /// active timeframe or with unresolvable anchors never hit.
    pub fn hits(&self, drawing: &DrawingObject, x: f64, y: f64) -> bool {
        if !drawing.is_visible_on(self.timeframe) {
            return false;
        }
        let Some(s1) = self.mapper.to_screen(drawing.p1()) else {
            return false;
        };
        let point = ScreenPos::new(x, y);
        let tol = &self.tolerances;

        match &drawing.shape {
            Shape::Rect { p2, .. } => {
                let Some(s2) = self.mapper.to_screen(*p2) else {
                    return false;
                };
                x >= s1.x.min(s2.x) && x <= s1.x.max(s2.x) && y >= s1.y.min(s2.y) && y <= s1.y.max(s2.y)
            }
            Shape::Line { p2, .. } => {
                let Some(s2) = self.mapper.to_screen(*p2) else {
                    return false;
                };
                distance_to_segment(point, s1, s2) < tol.line_px
            }
            Shape::Fib {
                p2, extend_lines, ..
            } => {
                let Some(s2) = self.mapper.to_screen(*p2) else {
                    return false;
                };
                if distance_to_segment(point, s1, s2) < tol.line_px {
                    return true;
                }
                let x_min = s1.x.min(s2.x);
                let x_max = if *extend_lines {
                    self.viewport_width
                } else {
                    s1.x.max(s2.x)
                };
                if x < x_min - tol.fib_span_slack_px || x > x_max + tol.fib_span_slack_px {
                    return false;
                }
                drawing
                    .active_fib_levels()
                    .iter()
                    .any(|level| (y - fib_level_y(s1, s2, level.ratio)).abs() < tol.line_px)
            }
            Shape::Horizontal { .. } => (y - s1.y).abs() < tol.line_px,
            Shape::Text { .. } => {
                (x - s1.x).abs() < tol.text_half_width_px && (y - s1.y).abs() < tol.text_half_height_px
            }
        }
    }

    /// Anchor handle of `drawing` under `(x, y)`, testing `p1` before `p2`.
    pub fn anchor_handle_at(&self, drawing: &DrawingObject, x: f64, y: f64) -> Option<AnchorHandle> {
        [AnchorHandle::P1, AnchorHandle::P2]
            .into_iter()
            .find(|handle| {
                drawing
                    .anchor(*handle)
                    .and_then(|anchor| self.mapper.to_screen(anchor))
                    .is_some_and(|s| {
                        (x - s.x).abs() < self.tolerances.handle_px && (y - s.y).abs() < self.tolerances.handle_px
                    })
            })
    }
}

/// Screen y of a fib level: ratio 0 sits on `p2`, ratio 1 on `p1`.
pub fn fib_level_y(s1: ScreenPos, s2: ScreenPos, ratio: f64) -> f64 {
    s2.y - (s2.y - s1.y) * ratio
}

/// Perpendicular distance from `p` to the segment `a..b`, or to the nearest
/// endpoint when the foot of the perpendicular falls outside it.
pub fn distance_to_segment(p: ScreenPos, a: ScreenPos, b: ScreenPos) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance_to(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance_to(ScreenPos::new(a.x + t * dx, a.y + t * dy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::chart::{Candle, SampledChart};
    use crate::overlay::model::{DomainPoint, DrawingId, DrawingKind, DARK_THEME_STROKE};

    // Bars every 10 time units, 1 px per time unit; price == 400 - y.
    fn fixture() -> (SampledChart, Vec<Candle>) {
        let candles: Vec<Candle> = (0..=40)
            .map(|i| {
                let t = i as f64 * 10.0;
                Candle::new(t, 100.0, 110.0, 90.0, 105.0)
            })
            .collect();
        let chart = SampledChart::from_candles(&candles, 10.0, 400.0, 0.0, 400.0);
        (chart, candles)
    }

    fn drawing(kind: DrawingKind, p1: (f64, f64), p2: (f64, f64)) -> DrawingObject {
        let shape = Shape::new(kind, DomainPoint::new(p1.0, p1.1));
        DrawingObject::new(DrawingId::generate(), shape, DARK_THEME_STROKE)
            .with_anchor(AnchorHandle::P2, DomainPoint::new(p2.0, p2.1))
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = ScreenPos::new(0.0, 0.0);
        let b = ScreenPos::new(10.0, 0.0);
        assert_eq!(distance_to_segment(ScreenPos::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(ScreenPos::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(distance_to_segment(ScreenPos::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn rect_contains_interior_only() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        let rect = drawing(DrawingKind::Rect, (100.0, 300.0), (200.0, 200.0));
        assert!(tester.hits(&rect, 150.0, 150.0));
        assert!(!tester.hits(&rect, 99.0, 150.0));
        assert!(!tester.hits(&rect, 150.0, 201.0));
    }

    #[test]
    fn line_uses_segment_not_infinite_line() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        let line = drawing(DrawingKind::Line, (100.0, 300.0), (200.0, 300.0));
        assert!(tester.hits(&line, 150.0, 105.0));
        assert!(!tester.hits(&line, 150.0, 109.0));
        assert!(!tester.hits(&line, 260.0, 100.0));
    }

    #[test]
    fn fib_levels_hit_inside_span_and_extend_right() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        // p1 at y=300, p2 at y=100: the 0.5 level sits at y=200.
        let mut fib = drawing(DrawingKind::Fib, (100.0, 100.0), (200.0, 300.0));
        assert!(tester.hits(&fib, 190.0, 203.0));
        assert!(!tester.hits(&fib, 300.0, 200.0));
        if let Shape::Fib { extend_lines, .. } = &mut fib.shape {
            *extend_lines = true;
        }
        assert!(tester.hits(&fib, 300.0, 200.0));
    }

    #[test]
    fn inactive_fib_levels_are_ignored() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        let mut fib = drawing(DrawingKind::Fib, (100.0, 100.0), (200.0, 300.0));
        if let Shape::Fib { fib_levels, .. } = &mut fib.shape {
            for level in fib_levels.iter_mut() {
                level.active = level.ratio != 0.5;
            }
        }
        assert!(!tester.hits(&fib, 110.0, 200.0));
    }

    #[test]
    fn horizontal_spans_full_width_and_text_uses_box() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        let horizontal = drawing(DrawingKind::Horizontal, (100.0, 250.0), (0.0, 0.0));
        assert!(tester.hits(&horizontal, 399.0, 153.0));
        assert!(!tester.hits(&horizontal, 0.0, 160.0));

        let text = drawing(DrawingKind::Text, (100.0, 250.0), (0.0, 0.0));
        assert!(tester.hits(&text, 129.0, 164.0));
        assert!(!tester.hits(&text, 131.0, 150.0));
    }

    #[test]
    fn timeframe_scoped_drawings_are_not_hittable() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "4h", 400.0);
        let mut horizontal = drawing(DrawingKind::Horizontal, (100.0, 250.0), (0.0, 0.0));
        horizontal.visible_timeframes = Some(vec!["1m".into()]);
        assert!(!tester.hits(&horizontal, 10.0, 150.0));
    }

    #[test]
    fn topmost_drawing_wins() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        let bottom = drawing(DrawingKind::Rect, (100.0, 300.0), (200.0, 200.0));
        let top = drawing(DrawingKind::Rect, (120.0, 280.0), (180.0, 220.0));
        let list = vec![bottom.clone(), top.clone()];
        assert_eq!(tester.find_hit(150.0, 150.0, &list).map(|d| &d.id), Some(&top.id));
        assert_eq!(tester.find_hit(105.0, 150.0, &list).map(|d| &d.id), Some(&bottom.id));
        assert!(tester.find_hit(5.0, 5.0, &list).is_none());
    }

    #[test]
    fn handles_are_tested_p1_first() {
        let (chart, candles) = fixture();
        let tester = HitTester::new(CoordinateMapper::new(&chart, &candles), "1m", 400.0);
        let line = drawing(DrawingKind::Line, (100.0, 300.0), (200.0, 200.0));
        assert_eq!(tester.anchor_handle_at(&line, 105.0, 95.0), Some(AnchorHandle::P1));
        assert_eq!(tester.anchor_handle_at(&line, 195.0, 205.0), Some(AnchorHandle::P2));
        assert_eq!(tester.anchor_handle_at(&line, 150.0, 150.0), None);
    }
}
