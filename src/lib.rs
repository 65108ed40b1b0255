//! Detect Overlay
//!
//! Drop an image, run an object detector over it and draw the detections
//! back onto the preview as labeled boxes.
//!
//! # Module Structure
//!
//! - `upload`: file picking, preview URLs and the detection controller
//! - `detect`: detector backends and normalization of their output
//! - `overlay`: normalized-to-pixel mapping and box/label rendering
//! - `session`: controller and overlay wired together for one interaction
//! - `worker`: background detection thread
//! - `config`, `report`, `ui`: CLI plumbing

pub mod config;
pub mod detect;
pub mod overlay;
pub mod report;
pub mod session;
pub mod ui;
pub mod upload;
pub mod worker;

pub use config::{DetectorSettings, OverlayConfig, OverlayStyle, PreviewSettings};
pub use detect::{
    normalize_output, BackendRegistry, BoundingBox, Category, DecodedImage, DetectionResult,
    Detector, DetectorHandle, SharedDetector,
};
pub use overlay::{
    Canvas, Color, DisplaySize, OverlayRenderer, OverlayView, PixelRect, RasterCanvas,
    RecordingCanvas,
};
pub use report::Report;
pub use session::Session;
pub use upload::{FilePicker, ImageFile, Publish, SelectedImage, UploadController};
pub use worker::DetectionWorker;
