use image::Rgba;

use crate::color::BLACK;
use crate::ops::shapes::{ShapeKind, StrokeStyle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
    Line,
    Rectangle,
    Circle,
    Triangle,
    Fill,
    Select,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Brush,
            Tool::Eraser,
            Tool::Line,
            Tool::Rectangle,
            Tool::Circle,
            Tool::Triangle,
            Tool::Fill,
            Tool::Select,
        ]
    }

    /// Stable identifier used by toolbars, scripts and the settings file.
    pub fn id(&self) -> &'static str {
        match self {
            Tool::Brush => "brush",
            Tool::Eraser => "eraser",
            Tool::Line => "line",
            Tool::Rectangle => "rectangle",
            Tool::Circle => "circle",
            Tool::Triangle => "triangle",
            Tool::Fill => "fill",
            Tool::Select => "select",
        }
    }

    pub fn from_id(id: &str) -> Option<Tool> {
        let id = id.trim();
        Tool::all().iter().copied().find(|t| t.id().eq_ignore_ascii_case(id))
    }

    /// The renderer shape for drawing tools; `None` for fill and select.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Brush | Tool::Eraser => Some(ShapeKind::Freehand),
            Tool::Line => Some(ShapeKind::Line),
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Circle => Some(ShapeKind::Circle),
            Tool::Triangle => Some(ShapeKind::Triangle),
            Tool::Fill | Tool::Select => None,
        }
    }
}

/// Largest brush diameter, in pixels.
pub const MAX_BRUSH_SIZE: u32 = 256;

/// Current brush parameters picked in the toolbar.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolProperties {
    pub size: u32,
    pub color: Rgba<u8>,
    /// Fill rectangles, circles and triangles instead of outlining them.
    pub fill_shape: bool,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            size: 5,
            color: BLACK,
            fill_shape: false,
        }
    }
}

impl ToolProperties {
    /// Style for `tool`. The eraser always paints `background`.
    pub fn stroke_style(&self, tool: Tool, background: Rgba<u8>) -> StrokeStyle {
        StrokeStyle {
            color: if tool == Tool::Eraser { background } else { self.color },
            width: self.size as f32,
            filled: self.fill_shape,
        }
    }
}
