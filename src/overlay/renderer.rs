use serde::Serialize;

use crate::config::OverlayStyle;
use crate::detect::{BoundingBox, DetectionResult};

use super::canvas::{Canvas, PixelRect};

/// Size, in pixels, at which the preview image is displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl DisplaySize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Scale `natural` down to at most `max_height` rows, keeping its aspect
    /// ratio. Images that already fit are shown at natural size.
    pub fn fit_height(natural_width: u32, natural_height: u32, max_height: u32) -> Self {
        if natural_height <= max_height || natural_height == 0 {
            return Self::new(natural_width, natural_height);
        }
        let scale = max_height as f64 / natural_height as f64;
        let width = ((natural_width as f64 * scale).round() as u32).max(1);
        Self::new(width, max_height)
    }
}

/// Where one detection ended up on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub label: String,
    pub box_rect: PixelRect,
    pub label_rect: PixelRect,
}

/// Map a normalized box onto a surface of `size` pixels. No rounding.
pub fn pixel_box(bbox: &BoundingBox, size: DisplaySize) -> PixelRect {
    let w = size.width as f32;
    let h = size.height as f32;
    PixelRect::new(
        bbox.origin_x * w,
        bbox.origin_y * h,
        bbox.width * w,
        bbox.height * h,
    )
}

/// `"name (NN%)"` for the primary category.
///
/// The name is the display name, else the category name, else `Unknown`;
/// a missing or non-finite score counts as 0.
pub fn format_label(result: &DetectionResult) -> String {
    let primary = result.primary();
    let name = primary
        .map(|c| {
            if !c.display_name.is_empty() {
                c.display_name.as_str()
            } else {
                c.category_name.as_str()
            }
        })
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown");
    let score = primary.map(|c| c.score).unwrap_or(0.0);
    format!("{} ({}%)", name, percent(score))
}

/// Score as a whole percentage, rounded half away from zero.
///
/// Scaled in `f64` so scores just under a half step (0.285) round down.
pub fn percent(score: f32) -> i64 {
    if !score.is_finite() {
        return 0;
    }
    (f64::from(score) * 100.0).round() as i64
}

/// Draws detection boxes and labels onto a canvas.
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Resize `canvas` to `size`, clear it, then draw every result in list order.
    pub fn render<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        size: DisplaySize,
        results: &[DetectionResult],
    ) -> Vec<Annotation> {
        canvas.resize(size.width, size.height);
        canvas.clear();
        results
            .iter()
            .map(|result| self.draw_one(canvas, size, result))
            .collect()
    }

    fn draw_one<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        size: DisplaySize,
        result: &DetectionResult,
    ) -> Annotation {
        let style = &self.style;
        let box_rect = pixel_box(&result.bounding_box, size);
        canvas.stroke_rect(box_rect, style.stroke_color, style.line_width);

        let label = format_label(result);
        let text_width = canvas.measure_text(&label, style.font_size) + style.label_padding;
        // Directly above the box, not clamped to the canvas.
        let label_rect = PixelRect::new(
            box_rect.x,
            box_rect.y - style.label_height,
            text_width,
            style.label_height,
        );
        canvas.fill_rect(label_rect, style.label_fill);
        canvas.fill_text(
            &label,
            box_rect.x + style.text_inset_x,
            box_rect.y - style.text_baseline_offset,
            style.font_size,
            style.text_color,
        );

        Annotation {
            label,
            box_rect,
            label_rect,
        }
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Category;

    fn result_with(categories: Vec<Category>) -> DetectionResult {
        DetectionResult {
            categories,
            keypoints: Vec::new(),
            bounding_box: BoundingBox::default(),
        }
    }

    fn category(name: &str, display: &str, score: f32) -> Category {
        Category {
            score,
            index: 0,
            category_name: name.to_string(),
            display_name: display.to_string(),
        }
    }

    #[test]
    fn label_prefers_display_name() {
        let r = result_with(vec![category("dog", "Dog", 0.87)]);
        assert_eq!(format_label(&r), "Dog (87%)");
    }

    #[test]
    fn label_falls_back_to_category_name_then_unknown() {
        let r = result_with(vec![category("dog", "", 0.924)]);
        assert_eq!(format_label(&r), "dog (92%)");

        let r = result_with(vec![category("", "", 0.5)]);
        assert_eq!(format_label(&r), "Unknown (50%)");
    }

    #[test]
    fn label_for_empty_categories() {
        assert_eq!(format_label(&result_with(Vec::new())), "Unknown (0%)");
    }

    #[test]
    fn only_primary_category_is_labeled() {
        let r = result_with(vec![category("cat", "", 0.3), category("dog", "", 0.9)]);
        assert_eq!(format_label(&r), "cat (30%)");
    }

    #[test]
    fn percent_rounds_and_guards() {
        assert_eq!(percent(0.875), 88);
        assert_eq!(percent(0.994), 99);
        assert_eq!(percent(0.285), 28);
        assert_eq!(percent(1.0), 100);
        assert_eq!(percent(f32::NAN), 0);
    }

    #[test]
    fn fit_height_keeps_aspect() {
        assert_eq!(DisplaySize::fit_height(400, 300, 500), DisplaySize::new(400, 300));
        assert_eq!(DisplaySize::fit_height(2000, 1000, 500), DisplaySize::new(1000, 500));
        assert_eq!(DisplaySize::fit_height(1, 5000, 500), DisplaySize::new(1, 500));
    }
}
