use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use anyhow::{anyhow, Result};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size, Blend};
use imageproc::rect::Rect;

use super::canvas::{approximate_text_width, Canvas, PixelRect};
use super::Color;

/// Fonts probed when no font path is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a TrueType/OpenType font from disk.
pub fn load_font(path: &Path) -> Result<FontArc> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow!("failed to read font {}: {}", path.display(), e))?;
    FontArc::try_from_vec(bytes).map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))
}

/// First readable sans-serif font from the usual system locations.
pub fn discover_system_font() -> Option<(PathBuf, FontArc)> {
    SYSTEM_FONT_CANDIDATES.iter().find_map(|candidate| {
        let path = Path::new(candidate);
        if !path.is_file() {
            return None;
        }
        match load_font(path) {
            Ok(font) => Some((path.to_path_buf(), font)),
            Err(e) => {
                log::debug!("skipping font candidate: {}", e);
                None
            }
        }
    })
}

/// RGBA pixel canvas. Fills are alpha-blended over existing content.
///
/// Without a font, text is measured with an estimate and not drawn.
pub struct RasterCanvas {
    surface: Blend<RgbaImage>,
    font: Option<FontArc>,
    warned_no_font: bool,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32, font: Option<FontArc>) -> Self {
        Self {
            surface: Blend(RgbaImage::new(width, height)),
            font,
            warned_no_font: false,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.surface.0
    }

    /// Layer the canvas over `base`, which must have the canvas's size.
    pub fn composite_over(&self, base: &RgbaImage) -> Result<RgbaImage> {
        if base.dimensions() != self.surface.0.dimensions() {
            return Err(anyhow!(
                "base image is {}x{}, canvas is {}x{}",
                base.width(),
                base.height(),
                self.surface.0.width(),
                self.surface.0.height()
            ));
        }
        let mut out = base.clone();
        imageops::overlay(&mut out, &self.surface.0, 0, 0);
        Ok(out)
    }

    /// Fill the half-open pixel span `[x0, x1) x [y0, y1)`, clipped to the canvas.
    fn fill_span(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) {
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let rect = Rect::at(x0, y0).of_size((x1 - x0) as u32, (y1 - y0) as u32);
        if color[3] == u8::MAX {
            draw_filled_rect_mut(&mut self.surface.0, rect, color);
        } else {
            draw_filled_rect_mut(&mut self.surface, rect, color);
        }
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.surface.0.width()
    }

    fn height(&self) -> u32 {
        self.surface.0.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.surface = Blend(RgbaImage::new(width, height));
    }

    fn clear(&mut self) {
        for pixel in self.surface.0.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn stroke_rect(&mut self, rect: PixelRect, color: Color, line_width: f32) {
        let half = line_width / 2.0;
        let px = |v: f32| v.round() as i32;
        let (ox0, oy0) = (px(rect.x - half), px(rect.y - half));
        let (ox1, oy1) = (px(rect.x + rect.width + half), px(rect.y + rect.height + half));
        let (ix0, iy0) = (px(rect.x + half), px(rect.y + half));
        let (ix1, iy1) = (px(rect.x + rect.width - half), px(rect.y + rect.height - half));
        let color = color.to_rgba();

        if ix1 <= ix0 || iy1 <= iy0 {
            self.fill_span(ox0, oy0, ox1, oy1, color);
            return;
        }
        self.fill_span(ox0, oy0, ox1, iy0, color);
        self.fill_span(ox0, iy1, ox1, oy1, color);
        self.fill_span(ox0, iy0, ix0, iy1, color);
        self.fill_span(ix1, iy0, ox1, iy1, color);
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        let px = |v: f32| v.round() as i32;
        self.fill_span(
            px(rect.x),
            px(rect.y),
            px(rect.x + rect.width),
            px(rect.y + rect.height),
            color.to_rgba(),
        );
    }

    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        match &self.font {
            Some(font) => text_size(PxScale::from(font_size), font, text).0 as f32,
            None => approximate_text_width(text, font_size),
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Color) {
        let Some(font) = &self.font else {
            if !self.warned_no_font {
                log::warn!("no font available; overlay labels drawn without text");
                self.warned_no_font = true;
            }
            return;
        };
        let scale = PxScale::from(font_size);
        let ascent = font.as_scaled(scale).ascent();
        let top = (y - ascent).round() as i32;
        draw_text_mut(
            &mut self.surface,
            color.to_rgba(),
            x.round() as i32,
            top,
            scale,
            font,
            text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: Color = Color::rgb(0x22, 0xc5, 0x5e);

    #[test]
    fn stroke_is_centered_on_edges() {
        let mut canvas = RasterCanvas::new(40, 40, None);
        canvas.stroke_rect(PixelRect::new(10.0, 10.0, 20.0, 20.0), GREEN, 3.0);
        let img = canvas.image();

        // 3px band spans 9..12 around x = 10.
        assert_eq!(img.get_pixel(9, 20), &GREEN.to_rgba());
        assert_eq!(img.get_pixel(11, 20), &GREEN.to_rgba());
        assert_eq!(img.get_pixel(12, 20)[3], 0);
        assert_eq!(img.get_pixel(8, 20)[3], 0);
        // Interior untouched.
        assert_eq!(img.get_pixel(20, 20)[3], 0);
        // Corners covered.
        assert_eq!(img.get_pixel(9, 9), &GREEN.to_rgba());
        assert_eq!(img.get_pixel(30, 30), &GREEN.to_rgba());
    }

    #[test]
    fn fills_clip_to_canvas() {
        let mut canvas = RasterCanvas::new(10, 10, None);
        canvas.fill_rect(PixelRect::new(-5.0, -24.0, 12.0, 30.0), GREEN);
        let img = canvas.image();
        assert_eq!(img.get_pixel(0, 0), &GREEN.to_rgba());
        assert_eq!(img.get_pixel(6, 5), &GREEN.to_rgba());
        assert_eq!(img.get_pixel(7, 0)[3], 0);
        assert_eq!(img.get_pixel(0, 6)[3], 0);
    }

    #[test]
    fn translucent_fill_blends() {
        let mut canvas = RasterCanvas::new(4, 4, None);
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE);
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 4.0, 4.0), Color::rgba(0, 0, 0, 0.5));
        let pixel = canvas.image().get_pixel(1, 1);
        assert_eq!(pixel[3], 255);
        assert!(pixel[0] > 100 && pixel[0] < 155, "got {:?}", pixel);
    }

    #[test]
    fn clear_and_resize_reset_pixels() {
        let mut canvas = RasterCanvas::new(4, 4, None);
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 4.0, 4.0), GREEN);
        canvas.clear();
        assert!(canvas.image().pixels().all(|p| p[3] == 0));

        canvas.resize(8, 2);
        assert_eq!(canvas.image().dimensions(), (8, 2));
    }

    #[test]
    fn composite_requires_matching_size() -> Result<()> {
        let mut canvas = RasterCanvas::new(4, 4, None);
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 2.0, 2.0), Color::BLACK);
        let base = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        let out = canvas.composite_over(&base)?;
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));

        assert!(canvas.composite_over(&RgbaImage::new(2, 2)).is_err());
        Ok(())
    }

    #[test]
    fn text_without_font_is_skipped() {
        let mut canvas = RasterCanvas::new(20, 20, None);
        canvas.fill_text("Dog (87%)", 2.0, 15.0, 14.0, Color::WHITE);
        assert!(canvas.image().pixels().all(|p| p[3] == 0));
        assert!(canvas.measure_text("Dog", 14.0) > 0.0);
    }
}
