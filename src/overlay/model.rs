use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stroke color used for new drawings on dark themes.
pub const DARK_THEME_STROKE: Color = Color::rgb(0x3b, 0x82, 0xf6);
/// Stroke color used for new drawings on the light theme.
pub const LIGHT_THEME_STROKE: Color = Color::rgb(0x25, 0x63, 0xeb);
/// Neutral grey used by the 0 and 1 fib levels.
pub const FIB_NEUTRAL: Color = Color::rgb(0x78, 0x7b, 0x86);

const DEFAULT_LINE_WIDTH: u32 = 2;
const DEFAULT_OPACITY: u8 = 100;
const DEFAULT_FILL_OPACITY: u8 = 20;

/// Opaque drawing identifier, stable across edits and sync.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingId(String);

impl DrawingId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Random UUID v4 id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DrawingId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A `(time, price)` pair in the chart's logical space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainPoint {
    pub time: f64,
    pub price: f64,
}

impl DomainPoint {
    pub const fn new(time: f64, price: f64) -> Self {
        Self { time, price }
    }

    pub fn is_finite(self) -> bool {
        self.time.is_finite() && self.price.is_finite()
    }

    #[must_use]
    pub fn translate(self, d_time: f64, d_price: f64) -> Self {
        Self {
            time: self.time + d_time,
            price: self.price + d_price,
        }
    }
}

/// RGB color carried on the wire as a `#rrggbb` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` or the `#rgb` shorthand.
    pub fn parse_hex(value: &str) -> Option<Self> {
        let digits = value.trim().strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            6 => Some(Self::rgb(
                u8::from_str_radix(&digits[0..2], 16).ok()?,
                u8::from_str_radix(&digits[2..4], 16).ok()?,
                u8::from_str_radix(&digits[4..6], 16).ok()?,
            )),
            3 => {
                let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok();
                Some(Self::rgb(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value).ok_or_else(|| format!("invalid color '{value}'"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextSize {
    S,
    #[default]
    M,
    L,
}

impl TextSize {
    pub fn font_px(self) -> f64 {
        match self {
            TextSize::S => 10.0,
            TextSize::M => 12.0,
            TextSize::L => 16.0,
        }
    }
}

/// 9-way text anchor, `tl` (top-left) through `br` (bottom-right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Tl,
    #[default]
    Tc,
    Tr,
    Ml,
    Mc,
    Mr,
    Bl,
    Bc,
    Br,
}

impl TextAnchor {
    pub const ALL: [TextAnchor; 9] = [
        TextAnchor::Tl,
        TextAnchor::Tc,
        TextAnchor::Tr,
        TextAnchor::Ml,
        TextAnchor::Mc,
        TextAnchor::Mr,
        TextAnchor::Bl,
        TextAnchor::Bc,
        TextAnchor::Br,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    #[serde(rename = "value")]
    pub ratio: f64,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
}

impl FibLevel {
    pub fn new(ratio: f64, active: bool, color: Color) -> Self {
        Self {
            ratio,
            active,
            color: Some(color),
            opacity: DEFAULT_OPACITY,
        }
    }

    /// The fixed ladder used when a fib carries no explicit levels.
    pub fn default_ladder() -> Vec<FibLevel> {
        let red = Color::rgb(0xf4, 0x43, 0x36);
        let green = Color::rgb(0x4c, 0xaf, 0x50);
        let blue = Color::rgb(0x21, 0x96, 0xf3);
        vec![
            FibLevel::new(0.0, true, FIB_NEUTRAL),
            FibLevel::new(0.236, true, red),
            FibLevel::new(0.382, true, red),
            FibLevel::new(0.5, true, green),
            FibLevel::new(0.618, true, blue),
            FibLevel::new(0.786, true, blue),
            FibLevel::new(1.0, true, FIB_NEUTRAL),
            FibLevel::new(1.618, false, blue),
            FibLevel::new(2.618, false, red),
            FibLevel::new(3.618, false, Color::rgb(0x9c, 0x27, 0xb0)),
            FibLevel::new(4.236, false, Color::rgb(0xe9, 0x1e, 0x63)),
        ]
    }
}

/// Shape discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingKind {
    Line,
    Rect,
    Horizontal,
    Fib,
    Text,
}

impl DrawingKind {
    pub fn requires_second_anchor(self) -> bool {
        matches!(self, DrawingKind::Line | DrawingKind::Rect | DrawingKind::Fib)
    }
}

/// Geometry plus the type-specific style of a drawing. The tag doubles as
/// the wire `type` field, and `p2` exists exactly on the two-anchor variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Line {
        p1: DomainPoint,
        p2: DomainPoint,
    },
    #[serde(rename_all = "camelCase")]
    Rect {
        p1: DomainPoint,
        p2: DomainPoint,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        border_color: Option<Color>,
        #[serde(default = "default_opacity")]
        border_opacity: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill_color: Option<Color>,
        #[serde(default = "default_fill_opacity")]
        fill_opacity: u8,
    },
    Horizontal {
        p1: DomainPoint,
    },
    #[serde(rename_all = "camelCase")]
    Fib {
        p1: DomainPoint,
        p2: DomainPoint,
        #[serde(default = "FibLevel::default_ladder")]
        fib_levels: Vec<FibLevel>,
        #[serde(default)]
        extend_lines: bool,
        #[serde(default)]
        show_prices: bool,
        #[serde(default = "default_true")]
        show_trendline: bool,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        p1: DomainPoint,
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text_color: Option<Color>,
        #[serde(default)]
        text_size: TextSize,
        #[serde(default)]
        text_position: TextAnchor,
        #[serde(default)]
        text_bold: bool,
        #[serde(default)]
        text_italic: bool,
    },
}

impl Shape {
    /// Default geometry for a freshly created drawing of `kind`. Two-anchor
    /// kinds start collapsed onto `p1`.
    pub fn new(kind: DrawingKind, p1: DomainPoint) -> Self {
        match kind {
            DrawingKind::Line => Shape::Line { p1, p2: p1 },
            DrawingKind::Rect => Shape::Rect {
                p1,
                p2: p1,
                border_color: None,
                border_opacity: DEFAULT_OPACITY,
                fill_color: None,
                fill_opacity: DEFAULT_FILL_OPACITY,
            },
            DrawingKind::Horizontal => Shape::Horizontal { p1 },
            DrawingKind::Fib => Shape::Fib {
                p1,
                p2: p1,
                fib_levels: FibLevel::default_ladder(),
                extend_lines: false,
                show_prices: false,
                show_trendline: true,
            },
            DrawingKind::Text => Shape::Text {
                p1,
                text: String::new(),
                text_color: None,
                text_size: TextSize::default(),
                text_position: TextAnchor::default(),
                text_bold: false,
                text_italic: false,
            },
        }
    }

    pub fn kind(&self) -> DrawingKind {
        match self {
            Shape::Line { .. } => DrawingKind::Line,
            Shape::Rect { .. } => DrawingKind::Rect,
            Shape::Horizontal { .. } => DrawingKind::Horizontal,
            Shape::Fib { .. } => DrawingKind::Fib,
            Shape::Text { .. } => DrawingKind::Text,
        }
    }

    pub fn p1(&self) -> DomainPoint {
        match self {
            Shape::Line { p1, .. }
            | Shape::Rect { p1, .. }
            | Shape::Horizontal { p1 }
            | Shape::Fib { p1, .. }
            | Shape::Text { p1, .. } => *p1,
        }
    }

    pub fn p2(&self) -> Option<DomainPoint> {
        match self {
            Shape::Line { p2, .. } | Shape::Rect { p2, .. } | Shape::Fib { p2, .. } => Some(*p2),
            Shape::Horizontal { .. } | Shape::Text { .. } => None,
        }
    }

    fn p1_mut(&mut self) -> &mut DomainPoint {
        match self {
            Shape::Line { p1, .. }
            | Shape::Rect { p1, .. }
            | Shape::Horizontal { p1 }
            | Shape::Fib { p1, .. }
            | Shape::Text { p1, .. } => p1,
        }
    }

    fn p2_mut(&mut self) -> Option<&mut DomainPoint> {
        match self {
            Shape::Line { p2, .. } | Shape::Rect { p2, .. } | Shape::Fib { p2, .. } => Some(p2),
            Shape::Horizontal { .. } | Shape::Text { .. } => None,
        }
    }
}

/// One of a drawing's control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorHandle {
    P1,
    P2,
}

/// The persisted annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingObject {
    pub id: DrawingId,
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default = "default_stroke_color")]
    pub color: Color,
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_timeframes: Option<Vec<String>>,
}

impl DrawingObject {
    pub fn new(id: DrawingId, shape: Shape, color: Color) -> Self {
        Self {
            id,
            shape,
            color,
            line_width: DEFAULT_LINE_WIDTH,
            line_style: LineStyle::default(),
            opacity: DEFAULT_OPACITY,
            visible_timeframes: None,
        }
    }

    pub fn kind(&self) -> DrawingKind {
        self.shape.kind()
    }

    pub fn p1(&self) -> DomainPoint {
        self.shape.p1()
    }

    pub fn p2(&self) -> Option<DomainPoint> {
        self.shape.p2()
    }

    pub fn anchor(&self, handle: AnchorHandle) -> Option<DomainPoint> {
        match handle {
            AnchorHandle::P1 => Some(self.p1()),
            AnchorHandle::P2 => self.p2(),
        }
    }

    /// Copy with one anchor replaced. Setting `P2` on a single-anchor shape
    /// leaves it unchanged.
    #[must_use]
    pub fn with_anchor(&self, handle: AnchorHandle, point: DomainPoint) -> Self {
        let mut next = self.clone();
        match handle {
            AnchorHandle::P1 => *next.shape.p1_mut() = point,
            AnchorHandle::P2 => {
                if let Some(p2) = next.shape.p2_mut() {
                    *p2 = point;
                }
            }
        }
        next
    }

    /// Copy with every anchor shifted by the same delta.
    #[must_use]
    pub fn translated(&self, d_time: f64, d_price: f64) -> Self {
        let mut next = self.clone();
        let p1 = next.shape.p1_mut();
        *p1 = p1.translate(d_time, d_price);
        if let Some(p2) = next.shape.p2_mut() {
            *p2 = p2.translate(d_time, d_price);
        }
        next
    }

    /// An empty or absent allow-list means every timeframe.
    pub fn is_visible_on(&self, timeframe: &str) -> bool {
        match &self.visible_timeframes {
            Some(allowed) if !allowed.is_empty() => allowed.iter().any(|tf| tf == timeframe),
            _ => true,
        }
    }

    /// Active fib levels, falling back to the default ladder when the list is
    /// empty. Empty for non-fib shapes.
    pub fn active_fib_levels(&self) -> Vec<FibLevel> {
        match &self.shape {
            Shape::Fib { fib_levels, .. } => {
                let levels = if fib_levels.is_empty() {
                    FibLevel::default_ladder()
                } else {
                    fib_levels.clone()
                };
                levels.into_iter().filter(|level| level.active).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Decodes an untrusted drawing list. A non-array yields nothing and entries
/// that fail to decode are skipped.
pub fn parse_drawings(value: &serde_json::Value) -> Vec<DrawingObject> {
    let Some(entries) = value.as_array() else {
        if !value.is_null() {
            tracing::warn!("drawing list is not an array; ignoring");
        }
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(
            |(index, entry)| match DrawingObject::deserialize(entry) {
                Ok(drawing) => Some(drawing),
                Err(err) => {
                    tracing::warn!(index, error = %err, "skipping malformed drawing");
                    None
                }
            },
        )
        .collect()
}

fn default_stroke_color() -> Color {
    DARK_THEME_STROKE
}

fn default_line_width() -> u32 {
    DEFAULT_LINE_WIDTH
}

fn default_opacity() -> u8 {
    DEFAULT_OPACITY
}

fn default_fill_opacity() -> u8 {
    DEFAULT_FILL_OPACITY
}

fn default_true() -> bool {
    true
}
