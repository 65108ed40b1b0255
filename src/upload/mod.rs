//! Upload/preview controller.
//!
//! - `FilePicker`: accept filter for dropped/selected files
//! - `ObjectUrlStore`: preview URLs for in-memory images
//! - `UploadController`: selection, processing state and published results

mod controller;
mod picker;
mod preview;

pub use controller::{
    execute, DetectionCompletion, DetectionTicket, Publish, SelectedImage, UploadController,
};
pub use picker::{mime_for_name, FilePicker, ImageFile, ACCEPTED_EXTENSIONS};
pub use preview::ObjectUrlStore;
