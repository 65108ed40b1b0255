//! One upload/preview/overlay interaction, wired together.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::ImageReader;

use crate::config::{OverlayConfig, PreviewSettings};
use crate::detect::{Detector, DetectorHandle};
use crate::overlay::{Canvas, DisplaySize, OverlayRenderer, OverlayView};
use crate::upload::{FilePicker, ImageFile, Publish, UploadController};
use crate::worker::DetectionWorker;

/// Natural pixel size of an encoded image, read from its header.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("read image header")?
        .into_dimensions()
        .context("read image dimensions")
}

/// Controller plus the overlay canvas layered over its preview.
pub struct Session<C> {
    picker: FilePicker,
    controller: UploadController,
    view: OverlayView<C>,
    preview: PreviewSettings,
}

impl<C: Canvas> Session<C> {
    pub fn new(config: &OverlayConfig, canvas: C) -> Self {
        let mut view = OverlayView::new(OverlayRenderer::new(config.style.clone()));
        view.attach_canvas(canvas);
        Self {
            picker: FilePicker::new(),
            controller: UploadController::new(),
            view,
            preview: config.preview.clone(),
        }
    }

    /// Offer dropped files; the accepted one becomes the selection.
    pub fn drop_files(&mut self, candidates: Vec<ImageFile>) -> Result<()> {
        let file = self.picker.accept(candidates)?;
        self.select_file(file);
        Ok(())
    }

    /// Select `file` and show its preview. The overlay is cleared.
    pub fn select_file(&mut self, file: ImageFile) {
        let display = match probe_dimensions(file.bytes()) {
            Ok((w, h)) => Some(DisplaySize::fit_height(w, h, self.preview.max_height)),
            Err(e) => {
                log::warn!("preview for {} failed to load: {:#}", file.name, e);
                None
            }
        };
        self.controller.select_file(file);
        match display {
            Some(size) => self.view.set_display(size),
            None => self.view.clear_display(),
        }
        self.refresh();
    }

    /// Run detection in place and redraw.
    pub fn detect<D: Detector>(&mut self, detector: &mut DetectorHandle<D>) -> Option<Publish> {
        let publish = self.controller.run_detection(detector);
        self.refresh();
        publish
    }

    /// Start detection on a background worker.
    pub fn dispatch(&mut self, worker: &DetectionWorker) -> bool {
        let dispatched = self.controller.dispatch(worker);
        self.refresh();
        dispatched
    }

    /// Apply finished runs from `worker` and redraw.
    pub fn poll(&mut self, worker: &DetectionWorker) -> Vec<Publish> {
        let applied = self.controller.drain_completions(worker);
        self.refresh();
        applied
    }

    fn refresh(&mut self) {
        self.view.sync(
            self.controller.results_version(),
            self.controller.results(),
        );
    }

    pub fn controller(&self) -> &UploadController {
        &self.controller
    }

    pub fn view(&self) -> &OverlayView<C> {
        &self.view
    }

    pub fn display(&self) -> Option<DisplaySize> {
        self.view.display()
    }

    pub fn canvas(&self) -> Option<&C> {
        self.view.canvas()
    }
}
