use crate::overlay::mapper::{DisplayRect, Size};
use crate::overlay::palette::Color;

/// 2D target the overlay renderer paints onto.
pub trait DrawSurface {
    /// Resizes to exactly `size`; implementations discard previous content.
    fn resize(&mut self, size: Size);
    fn clear(&mut self);
    fn stroke_rect(&mut self, rect: DisplayRect, color: Color, line_width: f32);
    fn fill_rect(&mut self, rect: DisplayRect, color: Color);
    /// Draws `text` with its left baseline at `(x, baseline)`.
    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, color: Color);
    fn measure_text(&self, text: &str) -> f32;
}

/// Advance used to estimate label widths when no font metrics are available.
pub const FALLBACK_GLYPH_ADVANCE: f32 = 7.0;

pub fn estimate_text_width(text: &str) -> f32 {
    text.chars().count() as f32 * FALLBACK_GLYPH_ADVANCE
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    StrokeRect {
        rect: DisplayRect,
        color: Color,
        line_width: f32,
    },
    FillRect {
        rect: DisplayRect,
        color: Color,
    },
    FillText {
        text: String,
        x: f32,
        baseline: f32,
        color: Color,
    },
}

/// Surface that keeps the draw calls of the current pass instead of pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    size: Size,
    commands: Vec<DrawCommand>,
    resizes: usize,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    pub fn is_blank(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn stroked_rects(&self) -> Vec<(DisplayRect, Color)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::StrokeRect { rect, color, .. } => Some((*rect, *color)),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn resize(&mut self, size: Size) {
        self.size = size;
        self.resizes += 1;
        self.commands.clear();
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn stroke_rect(&mut self, rect: DisplayRect, color: Color, line_width: f32) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_rect(&mut self, rect: DisplayRect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, color: Color) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            baseline,
            color,
        });
    }

    fn measure_text(&self, text: &str) -> f32 {
        estimate_text_width(text)
    }
}
