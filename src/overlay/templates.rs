//! Named style presets per drawing kind.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::overlay::model::{
    Color, DrawingId, DrawingKind, DrawingObject, FibLevel, LineStyle, Shape, TextAnchor, TextSize,
};

pub const TEMPLATES_FILE_NAME: &str = "overlay_templates.json";

/// Style fields of a drawing without geometry. Absent fields are left alone
/// when the styles are applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawingStyles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_style: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_opacity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_size: Option<TextSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_position: Option<TextAnchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fib_levels: Option<Vec<FibLevel>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extend_lines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_prices: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_trendline: Option<bool>,
}

impl DrawingStyles {
    pub fn capture(drawing: &DrawingObject) -> Self {
        let mut styles = DrawingStyles {
            color: Some(drawing.color),
            line_width: Some(drawing.line_width),
            line_style: Some(drawing.line_style),
            opacity: Some(drawing.opacity),
            ..DrawingStyles::default()
        };
        match &drawing.shape {
            Shape::Rect {
                border_color,
                border_opacity,
                fill_color,
                fill_opacity,
                ..
            } => {
                styles.border_color = *border_color;
                styles.border_opacity = Some(*border_opacity);
                styles.fill_color = *fill_color;
                styles.fill_opacity = Some(*fill_opacity);
            }
            Shape::Text {
                text_color,
                text_size,
                text_position,
                text_bold,
                text_italic,
                ..
            } => {
                styles.text_color = *text_color;
                styles.text_size = Some(*text_size);
                styles.text_position = Some(*text_position);
                styles.text_bold = Some(*text_bold);
                styles.text_italic = Some(*text_italic);
            }
            Shape::Fib {
                fib_levels,
                extend_lines,
                show_prices,
                show_trendline,
                ..
            } => {
                styles.fib_levels = Some(fib_levels.clone());
                styles.extend_lines = Some(*extend_lines);
                styles.show_prices = Some(*show_prices);
                styles.show_trendline = Some(*show_trendline);
            }
            Shape::Line { .. } | Shape::Horizontal { .. } => {}
        }
        styles
    }

    /// Copy of `drawing` with these styles laid over it. Anchors, id and
    /// text content are untouched.
    #[must_use]
    pub fn apply(&self, drawing: &DrawingObject) -> DrawingObject {
        let mut next = drawing.clone();
        if let Some(color) = self.color {
            next.color = color;
        }
        if let Some(width) = self.line_width {
            next.line_width = width.max(1);
        }
        if let Some(style) = self.line_style {
            next.line_style = style;
        }
        if let Some(opacity) = self.opacity {
            next.opacity = opacity.min(100);
        }
        match &mut next.shape {
            Shape::Rect {
                border_color,
                border_opacity,
                fill_color,
                fill_opacity,
                ..
            } => {
                if self.border_color.is_some() {
                    *border_color = self.border_color;
                }
                if let Some(value) = self.border_opacity {
                    *border_opacity = value.min(100);
                }
                if self.fill_color.is_some() {
                    *fill_color = self.fill_color;
                }
                if let Some(value) = self.fill_opacity {
                    *fill_opacity = value.min(100);
                }
            }
            Shape::Text {
                text_color,
                text_size,
                text_position,
                text_bold,
                text_italic,
                ..
            } => {
                if self.text_color.is_some() {
                    *text_color = self.text_color;
                }
                if let Some(value) = self.text_size {
                    *text_size = value;
                }
                if let Some(value) = self.text_position {
                    *text_position = value;
                }
                if let Some(value) = self.text_bold {
                    *text_bold = value;
                }
                if let Some(value) = self.text_italic {
                    *text_italic = value;
                }
            }
            Shape::Fib {
                fib_levels,
                extend_lines,
                show_prices,
                show_trendline,
                ..
            } => {
                if let Some(levels) = &self.fib_levels {
                    fib_levels.clone_from(levels);
                }
                if let Some(value) = self.extend_lines {
                    *extend_lines = value;
                }
                if let Some(value) = self.show_prices {
                    *show_prices = value;
                }
                if let Some(value) = self.show_trendline {
                    *show_trendline = value;
                }
            }
            Shape::Line { .. } | Shape::Horizontal { .. } => {}
        }
        next
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DrawingKind,
    pub styles: DrawingStyles,
}

impl DrawingTemplate {
    pub fn from_drawing(name: impl Into<String>, drawing: &DrawingObject) -> Self {
        Self {
            id: DrawingId::generate().as_str().to_string(),
            name: name.into(),
            kind: drawing.kind(),
            styles: DrawingStyles::capture(drawing),
        }
    }

    /// Styled copy of `drawing`, or `None` when the template belongs to
    /// another kind.
    pub fn apply_to(&self, drawing: &DrawingObject) -> Option<DrawingObject> {
        (self.kind == drawing.kind()).then(|| self.styles.apply(drawing))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateStore {
    templates: Vec<DrawingTemplate>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn templates(&self) -> &[DrawingTemplate] {
        &self.templates
    }

    pub fn add(&mut self, template: DrawingTemplate) {
        self.templates.retain(|t| t.id != template.id);
        self.templates.push(template);
    }

    pub fn remove(&mut self, id: &str) -> Option<DrawingTemplate> {
        let index = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&DrawingTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Looks a template up by id first, then by display name.
    pub fn find(&self, key: &str) -> Option<&DrawingTemplate> {
        self.get(key)
            .or_else(|| self.templates.iter().find(|t| t.name == key))
    }

    pub fn for_kind(&self, kind: DrawingKind) -> impl Iterator<Item = &DrawingTemplate> {
        self.templates.iter().filter(move |t| t.kind == kind)
    }

    /// Missing or blank file yields an empty store.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read template file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content).with_context(|| format!("deserialize template file {}", path.display()))
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from_path(path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to an empty template store");
            Self::default()
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create template parent folder {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize drawing templates")?;
        std::fs::write(path, json).with_context(|| format!("write template file {}", path.display()))
    }
}

pub fn templates_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(TEMPLATES_FILE_NAME))
}
