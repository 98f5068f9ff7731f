use serde::{Deserialize, Serialize};

use crate::overlay::chart::ScreenPos;
use crate::overlay::hit_test::{
    HitTolerances, ANCHOR_HANDLE_RADIUS_PX, FIB_SPAN_SLACK_PX, LINE_HIT_TOLERANCE_PX,
    TEXT_HIT_HALF_HEIGHT_PX, TEXT_HIT_HALF_WIDTH_PX,
};
use crate::overlay::model::{Color, DARK_THEME_STROKE, LIGHT_THEME_STROKE};
use crate::overlay::snap::SNAP_THRESHOLD_PX;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Oled,
}

impl Theme {
    pub fn is_dark(self) -> bool {
        !matches!(self, Theme::Light)
    }

    /// Stroke color given to newly created drawings.
    pub fn default_stroke(self) -> Color {
        if self.is_dark() {
            DARK_THEME_STROKE
        } else {
            LIGHT_THEME_STROKE
        }
    }

    /// Color of the crosshair guides.
    pub fn guide_color(self) -> Color {
        if self.is_dark() {
            Color::rgb(255, 255, 255)
        } else {
            Color::rgb(0, 0, 0)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub magnet_mode: bool,
    #[serde(default = "default_snap_threshold_px")]
    pub snap_threshold_px: f64,
    #[serde(default = "default_line_hit_tolerance_px")]
    pub line_hit_tolerance_px: f64,
    #[serde(default = "default_anchor_handle_radius_px")]
    pub anchor_handle_radius_px: f64,
    #[serde(default = "default_text_hit_half_width_px")]
    pub text_hit_half_width_px: f64,
    #[serde(default = "default_text_hit_half_height_px")]
    pub text_hit_half_height_px: f64,
    #[serde(default = "default_fib_span_slack_px")]
    pub fib_span_slack_px: f64,
    #[serde(default = "default_timeframes")]
    pub timeframes: Vec<String>,
    #[serde(default = "default_quick_colors")]
    pub quick_colors: Vec<Color>,
    #[serde(default = "default_toolbar_offset_x")]
    pub toolbar_offset_x: f64,
    #[serde(default = "default_toolbar_offset_y")]
    pub toolbar_offset_y: f64,
    #[serde(default)]
    pub debug_logging: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            magnet_mode: false,
            snap_threshold_px: default_snap_threshold_px(),
            line_hit_tolerance_px: default_line_hit_tolerance_px(),
            anchor_handle_radius_px: default_anchor_handle_radius_px(),
            text_hit_half_width_px: default_text_hit_half_width_px(),
            text_hit_half_height_px: default_text_hit_half_height_px(),
            fib_span_slack_px: default_fib_span_slack_px(),
            timeframes: default_timeframes(),
            quick_colors: default_quick_colors(),
            toolbar_offset_x: default_toolbar_offset_x(),
            toolbar_offset_y: default_toolbar_offset_y(),
            debug_logging: false,
        }
    }
}

impl OverlaySettings {
    /// Restore defaults for values that would break geometry.
    pub fn sanitize(&mut self) {
        fix_positive(&mut self.snap_threshold_px, default_snap_threshold_px());
        fix_positive(&mut self.line_hit_tolerance_px, default_line_hit_tolerance_px());
        fix_positive(&mut self.anchor_handle_radius_px, default_anchor_handle_radius_px());
        fix_positive(&mut self.text_hit_half_width_px, default_text_hit_half_width_px());
        fix_positive(&mut self.text_hit_half_height_px, default_text_hit_half_height_px());
        if !self.fib_span_slack_px.is_finite() || self.fib_span_slack_px < 0.0 {
            self.fib_span_slack_px = default_fib_span_slack_px();
        }
        if !self.toolbar_offset_x.is_finite() {
            self.toolbar_offset_x = default_toolbar_offset_x();
        }
        if !self.toolbar_offset_y.is_finite() {
            self.toolbar_offset_y = default_toolbar_offset_y();
        }
        self.timeframes.retain(|tf| !tf.trim().is_empty());
        if self.timeframes.is_empty() {
            self.timeframes = default_timeframes();
        }
        if self.quick_colors.is_empty() {
            self.quick_colors = default_quick_colors();
        }
    }

    pub fn hit_tolerances(&self) -> HitTolerances {
        HitTolerances {
            line_px: self.line_hit_tolerance_px,
            handle_px: self.anchor_handle_radius_px,
            text_half_width_px: self.text_hit_half_width_px,
            text_half_height_px: self.text_hit_half_height_px,
            fib_span_slack_px: self.fib_span_slack_px,
        }
    }

    pub fn toolbar_offset(&self) -> ScreenPos {
        ScreenPos::new(self.toolbar_offset_x, self.toolbar_offset_y)
    }
}

fn fix_positive(value: &mut f64, default: f64) {
    if !value.is_finite() || *value <= 0.0 {
        *value = default;
    }
}

fn default_snap_threshold_px() -> f64 {
    SNAP_THRESHOLD_PX
}

fn default_line_hit_tolerance_px() -> f64 {
    LINE_HIT_TOLERANCE_PX
}

fn default_anchor_handle_radius_px() -> f64 {
    ANCHOR_HANDLE_RADIUS_PX
}

fn default_text_hit_half_width_px() -> f64 {
    TEXT_HIT_HALF_WIDTH_PX
}

fn default_text_hit_half_height_px() -> f64 {
    TEXT_HIT_HALF_HEIGHT_PX
}

fn default_fib_span_slack_px() -> f64 {
    FIB_SPAN_SLACK_PX
}

fn default_timeframes() -> Vec<String> {
    ["1m", "5m", "15m", "1h", "4h", "D", "W", "M"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_quick_colors() -> Vec<Color> {
    vec![
        Color::rgb(0xef, 0x44, 0x44),
        Color::rgb(0xf9, 0x73, 0x16),
        Color::rgb(0xea, 0xb3, 0x08),
        Color::rgb(0x22, 0xc5, 0x5e),
        Color::rgb(0x3b, 0x82, 0xf6),
        Color::rgb(0x8b, 0x5c, 0xf6),
        Color::rgb(0xec, 0x48, 0x99),
        Color::rgb(0x00, 0x00, 0x00),
        Color::rgb(0xff, 0xff, 0xff),
    ]
}

fn default_toolbar_offset_x() -> f64 {
    20.0
}

fn default_toolbar_offset_y() -> f64 {
    -50.0
}
