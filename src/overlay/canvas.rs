use super::Color;

/// Axis-aligned rectangle in canvas pixels. Not rounded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Drawing surface with the subset of 2D-context operations the overlay uses.
pub trait Canvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Resize the drawable surface. Resizing discards existing content.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear the whole surface to transparent.
    fn clear(&mut self);

    /// Stroke a rectangle outline centered on the rectangle's edges.
    fn stroke_rect(&mut self, rect: PixelRect, color: Color, line_width: f32);

    fn fill_rect(&mut self, rect: PixelRect, color: Color);

    /// Advance width of `text` at `font_size` pixels.
    fn measure_text(&self, text: &str, font_size: f32) -> f32;

    /// Draw `text` with its alphabetic baseline at `y`.
    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color);
}

/// Text width estimate for surfaces without font metrics.
pub fn approximate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * 0.55
}

/// A single recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Resize {
        width: u32,
        height: u32,
    },
    Clear,
    StrokeRect {
        rect: PixelRect,
        color: Color,
        line_width: f32,
    },
    FillRect {
        rect: PixelRect,
        color: Color,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    },
}

/// Canvas that records calls instead of rasterizing them.
#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call since construction, in order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Calls that are still visible: everything after the last clear or resize.
    pub fn visible(&self) -> &[DrawCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|cmd| matches!(cmd, DrawCommand::Clear | DrawCommand::Resize { .. }))
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.commands[start..]
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Color, line_width: f32) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        approximate_text_width(text, font_size)
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color) {
        self.commands.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            font_size,
            color,
        });
    }
}
