//! Detection overlay rendering.
//!
//! Normalized detection boxes are mapped onto the pixel size at which the
//! preview image is displayed, then stroked and labeled on a canvas that sits
//! on top of the image:
//! - `Canvas`: the 2D drawing surface (recording or raster)
//! - `OverlayRenderer`: box geometry and label layout
//! - `OverlayView`: redraws when the published result list changes

mod canvas;
mod color;
mod raster;
mod renderer;
mod view;

pub use canvas::{approximate_text_width, Canvas, DrawCommand, PixelRect, RecordingCanvas};
pub use color::Color;
pub use raster::{discover_system_font, load_font, RasterCanvas};
pub use renderer::{format_label, percent, pixel_box, Annotation, DisplaySize, OverlayRenderer};
pub use view::OverlayView;
