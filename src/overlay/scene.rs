//! Screen-space display list for the host renderer.
//!
//! The overlay does not rasterize. `build_scene` resolves every render item
//! to pixel primitives and the host paints them in order.

use crate::overlay::chart::{ScreenPos, Viewport};
use crate::overlay::coords::CoordinateMapper;
use crate::overlay::hit_test::fib_level_y;
use crate::overlay::live_sync::RenderItem;
use crate::overlay::model::{AnchorHandle, Color, DrawingId, DrawingObject, LineStyle, Shape, TextAnchor};
use crate::overlay::settings::Theme;

pub const HANDLE_RADIUS_PX: f64 = 6.0;
const FIB_LABEL_PX: f64 = 10.0;
const TEXT_PLACEHOLDER: &str = "Text";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    pub style: LineStyle,
    /// 0.0 to 1.0.
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub at: ScreenPos,
    pub text: String,
    pub color: Color,
    pub size_px: f64,
    pub bold: bool,
    pub italic: bool,
    pub anchor: TextAnchor,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScenePrimitive {
    Segment {
        from: ScreenPos,
        to: ScreenPos,
        stroke: Stroke,
    },
    Rect {
        min: ScreenPos,
        max: ScreenPos,
        border: Stroke,
        fill: Color,
        fill_alpha: f64,
    },
    Label(Label),
    Handle {
        drawing: DrawingId,
        handle: AnchorHandle,
        at: ScreenPos,
        radius: f64,
    },
    HorizontalGuide {
        y: f64,
        color: Color,
    },
    VerticalGuide {
        x: f64,
        color: Color,
    },
}

/// Per-frame inputs besides the render set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneOptions<'a> {
    pub viewport: Viewport,
    pub theme: Theme,
    pub selected: Option<&'a DrawingId>,
    pub hovered: Option<&'a DrawingId>,
    pub read_only: bool,
    pub hover_price: Option<f64>,
    pub hover_time: Option<f64>,
}

pub fn build_scene(
    mapper: &CoordinateMapper<'_>,
    items: &[RenderItem<'_>],
    options: &SceneOptions<'_>,
) -> Vec<ScenePrimitive> {
    let mut scene = Vec::new();
    for item in items {
        let drawing = item.drawing;
        if !push_drawing(&mut scene, mapper, drawing, options.viewport) {
            continue;
        }
        let decorated = options.selected == Some(&drawing.id) || options.hovered == Some(&drawing.id);
        if decorated && !options.read_only {
            push_handles(&mut scene, mapper, drawing);
        }
    }
    scene.extend(crosshair(mapper, options));
    scene
}

/// Guides for the host-driven hover position. Either axis is dropped when it
/// does not resolve.
pub fn crosshair(mapper: &CoordinateMapper<'_>, options: &SceneOptions<'_>) -> Vec<ScenePrimitive> {
    let color = options.theme.guide_color();
    let mut guides = Vec::new();
    if let Some(x) = options.hover_time.and_then(|t| mapper.time_to_x(t)) {
        guides.push(ScenePrimitive::VerticalGuide { x, color });
    }
    if let Some(y) = options.hover_price.and_then(|p| mapper.price_to_y(p)) {
        guides.push(ScenePrimitive::HorizontalGuide { y, color });
    }
    guides
}

fn stroke_of(drawing: &DrawingObject) -> Stroke {
    Stroke {
        color: drawing.color,
        width: f64::from(drawing.line_width.max(1)),
        style: drawing.line_style,
        alpha: alpha(drawing.opacity),
    }
}

fn alpha(opacity: u8) -> f64 {
    f64::from(opacity.min(100)) / 100.0
}

// Returns false when the drawing's anchors do not resolve.
fn push_drawing(
    scene: &mut Vec<ScenePrimitive>,
    mapper: &CoordinateMapper<'_>,
    drawing: &DrawingObject,
    viewport: Viewport,
) -> bool {
    let Some(s1) = mapper.to_screen(drawing.p1()) else {
        return false;
    };
    let s2 = match drawing.p2() {
        Some(p2) => match mapper.to_screen(p2) {
            Some(s2) => Some(s2),
            None => return false,
        },
        None => None,
    };
    let stroke = stroke_of(drawing);

    match (&drawing.shape, s2) {
        (Shape::Line { .. }, Some(s2)) => scene.push(ScenePrimitive::Segment {
            from: s1,
            to: s2,
            stroke,
        }),
        (
            Shape::Rect {
                border_color,
                border_opacity,
                fill_color,
                fill_opacity,
                ..
            },
            Some(s2),
        ) => scene.push(ScenePrimitive::Rect {
            min: ScreenPos::new(s1.x.min(s2.x), s1.y.min(s2.y)),
            max: ScreenPos::new(s1.x.max(s2.x), s1.y.max(s2.y)),
            border: Stroke {
                color: border_color.unwrap_or(drawing.color),
                alpha: alpha(*border_opacity),
                ..stroke
            },
            fill: fill_color.unwrap_or(drawing.color),
            fill_alpha: alpha(*fill_opacity),
        }),
        (Shape::Horizontal { p1 }, _) => {
            scene.push(ScenePrimitive::Segment {
                from: ScreenPos::new(0.0, s1.y),
                to: ScreenPos::new(viewport.width, s1.y),
                stroke,
            });
            scene.push(ScenePrimitive::Label(Label {
                at: s1.offset(5.0, -5.0),
                text: format!("{:.2}", p1.price),
                color: drawing.color,
                size_px: FIB_LABEL_PX,
                bold: true,
                italic: false,
                anchor: TextAnchor::Bl,
            }));
        }
        (
            Shape::Fib {
                p1,
                p2,
                extend_lines,
                show_prices,
                show_trendline,
                ..
            },
            Some(s2),
        ) => {
            if *show_trendline {
                scene.push(ScenePrimitive::Segment {
                    from: s1,
                    to: s2,
                    stroke: Stroke {
                        width: 1.0,
                        style: LineStyle::Dashed,
                        alpha: 0.5,
                        ..stroke
                    },
                });
            }
            let x_min = s1.x.min(s2.x);
            let x_max = if *extend_lines {
                viewport.width
            } else {
                s1.x.max(s2.x)
            };
            let price_diff = p2.price - p1.price;
            for level in drawing.active_fib_levels() {
                let y = fib_level_y(s1, s2, level.ratio);
                let color = level.color.unwrap_or(drawing.color);
                scene.push(ScenePrimitive::Segment {
                    from: ScreenPos::new(x_min, y),
                    to: ScreenPos::new(x_max, y),
                    stroke: Stroke {
                        color,
                        width: 1.0,
                        style: LineStyle::Solid,
                        alpha: alpha(level.opacity),
                    },
                });
                let text = if *show_prices {
                    format!("{} ({:.2})", level.ratio, p2.price - price_diff * level.ratio)
                } else {
                    level.ratio.to_string()
                };
                scene.push(ScenePrimitive::Label(Label {
                    at: ScreenPos::new(x_min, y - 2.0),
                    text,
                    color,
                    size_px: FIB_LABEL_PX,
                    bold: true,
                    italic: false,
                    anchor: TextAnchor::Bl,
                }));
            }
        }
        (
            Shape::Text {
                text,
                text_color,
                text_size,
                text_position,
                text_bold,
                text_italic,
                ..
            },
            _,
        ) => scene.push(ScenePrimitive::Label(Label {
            at: s1,
            text: if text.is_empty() {
                TEXT_PLACEHOLDER.to_string()
            } else {
                text.clone()
            },
            color: text_color.unwrap_or(drawing.color),
            size_px: text_size.font_px(),
            bold: *text_bold,
            italic: *text_italic,
            anchor: *text_position,
        })),
        // Two-anchor variants always carry a resolved s2 at this point.
        (Shape::Line { .. } | Shape::Rect { .. } | Shape::Fib { .. }, None) => return false,
    }
    true
}

fn push_handles(scene: &mut Vec<ScenePrimitive>, mapper: &CoordinateMapper<'_>, drawing: &DrawingObject) {
    for handle in [AnchorHandle::P1, AnchorHandle::P2] {
        if let Some(at) = drawing.anchor(handle).and_then(|p| mapper.to_screen(p)) {
            scene.push(ScenePrimitive::Handle {
                drawing: drawing.id.clone(),
                handle,
                at,
                radius: HANDLE_RADIUS_PX,
            });
        }
    }
}
