use crate::overlay::chart::ScreenPos;
use crate::overlay::model::{Color, DrawingId, DrawingObject, LineStyle, Shape, TextAnchor, TextSize};
use crate::overlay::templates::DrawingTemplate;

pub const TOOLBAR_WIDTH: f64 = 360.0;
pub const TOOLBAR_HEIGHT: f64 = 40.0;

/// Style edits the floating toolbar applies to the selected drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarCommand {
    SetColor(Color),
    SetLineWidth(u32),
    SetLineStyle(LineStyle),
    SetOpacity(u8),
    SetText(String),
    SetTextColor(Color),
    SetTextSize(TextSize),
    SetTextPosition(TextAnchor),
    SetTextBold(bool),
    SetTextItalic(bool),
    SetBorderColor(Color),
    SetBorderOpacity(u8),
    SetFillColor(Color),
    SetFillOpacity(u8),
    SetFibLevelActive { index: usize, active: bool },
    SetFibLevelRatio { index: usize, ratio: f64 },
    SetFibLevelColor { index: usize, color: Color },
    SetFibLevelOpacity { index: usize, opacity: u8 },
    SetExtendLines(bool),
    SetShowPrices(bool),
    SetShowTrendline(bool),
    SetTimeframeVisible { timeframe: String, visible: bool },
    ApplyTemplate(DrawingTemplate),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarPanel {
    ColorPicker,
    Settings,
    Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolbarRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl ToolbarRect {
    pub fn contains(self, point: ScreenPos) -> bool {
        point.x >= self.x && point.x < self.x + self.w && point.y >= self.y && point.y < self.y + self.h
    }
}

/// Placement and drag state of the floating toolbar. Dragging it is tracked
/// here and never touches the canvas interaction state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToolbarState {
    pub position: Option<ScreenPos>,
    pub open_panel: Option<ToolbarPanel>,
    pub dragging: bool,
    drag_anchor: ScreenPos,
}

impl ToolbarState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the toolbar next to the selecting click the first time only;
    /// afterwards it stays where it was left.
    pub fn on_selection(&mut self, at: ScreenPos, offset: ScreenPos) {
        if self.position.is_none() {
            self.position = Some(at.offset(offset.x, offset.y));
        }
    }

    pub fn on_deselect(&mut self) {
        self.open_panel = None;
        self.dragging = false;
    }

    pub fn toggle_panel(&mut self, panel: ToolbarPanel) {
        self.open_panel = if self.open_panel == Some(panel) {
            None
        } else {
            Some(panel)
        };
    }

    pub fn rect(&self) -> Option<ToolbarRect> {
        self.position.map(|p| ToolbarRect {
            x: p.x,
            y: p.y,
            w: TOOLBAR_WIDTH,
            h: TOOLBAR_HEIGHT,
        })
    }

    pub fn contains(&self, point: ScreenPos) -> bool {
        self.rect().is_some_and(|rect| rect.contains(point))
    }

    /// Starts a toolbar drag when `pointer` is on the toolbar.
    pub fn begin_drag(&mut self, pointer: ScreenPos) -> bool {
        let Some(position) = self.position.filter(|_| self.contains(pointer)) else {
            return false;
        };
        self.dragging = true;
        self.drag_anchor = ScreenPos::new(pointer.x - position.x, pointer.y - position.y);
        true
    }

    pub fn drag_to(&mut self, pointer: ScreenPos) {
        if self.dragging {
            self.position = Some(ScreenPos::new(pointer.x - self.drag_anchor.x, pointer.y - self.drag_anchor.y));
        }
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }
}

/// Whether the toolbar should be shown at all.
pub fn toolbar_visible(selected: Option<&DrawingId>, read_only: bool) -> bool {
    selected.is_some() && !read_only
}

/// Applies `command` to drawing `id` and returns the full replacement list,
/// or `None` when nothing changed.
pub fn apply_toolbar_command(
    drawings: &[DrawingObject],
    id: &DrawingId,
    command: &ToolbarCommand,
    timeframes: &[String],
) -> Option<Vec<DrawingObject>> {
    let target = drawings.iter().find(|d| &d.id == id)?;

    if matches!(command, ToolbarCommand::Delete) {
        tracing::debug!(%id, "drawing deleted from toolbar");
        return Some(drawings.iter().filter(|d| &d.id != id).cloned().collect());
    }

    let edited = edit_drawing(target, command, timeframes)?;
    if &edited == target {
        return None;
    }
    Some(
        drawings
            .iter()
            .map(|d| if &d.id == id { edited.clone() } else { d.clone() })
            .collect(),
    )
}

fn edit_drawing(drawing: &DrawingObject, command: &ToolbarCommand, timeframes: &[String]) -> Option<DrawingObject> {
    let mut next = drawing.clone();
    match (command, &mut next.shape) {
        (ToolbarCommand::SetColor(color), _) => next.color = *color,
        (ToolbarCommand::SetLineWidth(width), _) => next.line_width = (*width).max(1),
        (ToolbarCommand::SetLineStyle(style), _) => next.line_style = *style,
        (ToolbarCommand::SetOpacity(opacity), _) => next.opacity = (*opacity).min(100),
        (ToolbarCommand::SetText(value), Shape::Text { text, .. }) => text.clone_from(value),
        (ToolbarCommand::SetTextColor(color), Shape::Text { text_color, .. }) => *text_color = Some(*color),
        (ToolbarCommand::SetTextSize(size), Shape::Text { text_size, .. }) => *text_size = *size,
        (ToolbarCommand::SetTextPosition(anchor), Shape::Text { text_position, .. }) => *text_position = *anchor,
        (ToolbarCommand::SetTextBold(bold), Shape::Text { text_bold, .. }) => *text_bold = *bold,
        (ToolbarCommand::SetTextItalic(italic), Shape::Text { text_italic, .. }) => *text_italic = *italic,
        (ToolbarCommand::SetBorderColor(color), Shape::Rect { border_color, .. }) => *border_color = Some(*color),
        (ToolbarCommand::SetBorderOpacity(opacity), Shape::Rect { border_opacity, .. }) => {
            *border_opacity = (*opacity).min(100)
        }
        (ToolbarCommand::SetFillColor(color), Shape::Rect { fill_color, .. }) => *fill_color = Some(*color),
        (ToolbarCommand::SetFillOpacity(opacity), Shape::Rect { fill_opacity, .. }) => {
            *fill_opacity = (*opacity).min(100)
        }
        (ToolbarCommand::SetFibLevelActive { index, active }, Shape::Fib { fib_levels, .. }) => {
            fib_levels.get_mut(*index)?.active = *active
        }
        (ToolbarCommand::SetFibLevelRatio { index, ratio }, Shape::Fib { fib_levels, .. }) => {
            if !ratio.is_finite() {
                return None;
            }
            fib_levels.get_mut(*index)?.ratio = *ratio
        }
        (ToolbarCommand::SetFibLevelColor { index, color }, Shape::Fib { fib_levels, .. }) => {
            fib_levels.get_mut(*index)?.color = Some(*color)
        }
        (ToolbarCommand::SetFibLevelOpacity { index, opacity }, Shape::Fib { fib_levels, .. }) => {
            fib_levels.get_mut(*index)?.opacity = (*opacity).min(100)
        }
        (ToolbarCommand::SetExtendLines(value), Shape::Fib { extend_lines, .. }) => *extend_lines = *value,
        (ToolbarCommand::SetShowPrices(value), Shape::Fib { show_prices, .. }) => *show_prices = *value,
        (ToolbarCommand::SetShowTrendline(value), Shape::Fib { show_trendline, .. }) => *show_trendline = *value,
        (ToolbarCommand::SetTimeframeVisible { timeframe, visible }, _) => {
            next.visible_timeframes = toggle_timeframe(drawing, timeframe, *visible, timeframes)?;
        }
        (ToolbarCommand::ApplyTemplate(template), _) => return template.apply_to(drawing),
        _ => return None,
    }
    Some(next)
}

/// New visibility list after ticking or unticking `timeframe`. Ticking every
/// configured timeframe collapses back to "all"; unticking the last one is
/// refused.
fn toggle_timeframe(
    drawing: &DrawingObject,
    timeframe: &str,
    visible: bool,
    timeframes: &[String],
) -> Option<Option<Vec<String>>> {
    let mut current: Vec<String> = match &drawing.visible_timeframes {
        Some(list) if !list.is_empty() => list.clone(),
        _ => timeframes.to_vec(),
    };
    if visible {
        if !current.iter().any(|tf| tf == timeframe) {
            current.push(timeframe.to_string());
        }
    } else {
        current.retain(|tf| tf != timeframe);
        if current.is_empty() {
            return None;
        }
    }

    let all_ticked = timeframes.iter().all(|tf| current.contains(tf));
    Some(if all_ticked { None } else { Some(current) })
}
