use std::sync::Arc;

use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::{normalize_output, DecodedImage, DetectionResult, Detector, DetectorHandle};

use super::picker::ImageFile;
use super::preview::ObjectUrlStore;

/// The image currently selected for detection.
#[derive(Clone, Debug)]
pub struct SelectedImage {
    pub file: ImageFile,
    /// Hex SHA-256 of the file contents.
    pub digest: String,
    pub preview_url: String,
    pub generation: u64,
    /// Natural pixel size, known once the image has been decoded.
    pub natural_size: Option<(u32, u32)>,
}

/// Work order for one detection run, tagged with the selection it belongs to.
#[derive(Clone)]
pub struct DetectionTicket {
    pub generation: u64,
    pub file_name: String,
    bytes: Arc<[u8]>,
}

impl DetectionTicket {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Outcome of a detection run, still tagged with its generation.
pub struct DetectionCompletion {
    pub generation: u64,
    pub natural_size: Option<(u32, u32)>,
    pub model_loaded: bool,
    pub outcome: Result<Vec<DetectionResult>>,
}

/// What `complete_detection` did with a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Publish {
    /// A fresh list of this many results replaced the previous one.
    Published(usize),
    /// The run failed; an empty list was published.
    Failed,
    /// The selection changed since dispatch; the completion was dropped.
    Stale,
}

/// Decode the ticket's image, run the detector and normalize its output.
///
/// Safe to call off the controller's thread.
pub fn execute<D: Detector>(
    ticket: &DetectionTicket,
    detector: &mut DetectorHandle<D>,
) -> DetectionCompletion {
    let mut natural_size = None;
    let outcome = (|| -> Result<Vec<DetectionResult>> {
        let image = DecodedImage::decode(ticket.bytes())?;
        natural_size = Some((image.width(), image.height()));
        let raw = detector.detect(&image)?;
        normalize_output(raw.as_ref())
    })();
    DetectionCompletion {
        generation: ticket.generation,
        natural_size,
        model_loaded: detector.is_initialized(),
        outcome,
    }
}

/// Owns the selected image, its preview URL, the processing flag and the
/// published detection list.
///
/// Every selection bumps a generation counter. Detection runs carry the
/// generation they started under, and completions from an older generation
/// are discarded instead of published.
#[derive(Default)]
pub struct UploadController {
    urls: ObjectUrlStore,
    selection: Option<SelectedImage>,
    generation: u64,
    in_flight: Option<u64>,
    model_loaded: bool,
    results: Vec<DetectionResult>,
    results_version: u64,
}

impl UploadController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with `file` and reset the published results.
    pub fn select_file(&mut self, file: ImageFile) {
        if let Some(previous) = self.selection.take() {
            self.urls.revoke(&previous.preview_url);
        }

        self.generation += 1;
        let digest = hex::encode(Sha256::digest(file.bytes()));
        let preview_url = self.urls.create(file.shared_bytes(), &digest[..12]);
        log::info!(
            "selected {} ({} bytes, sha256 {}) as {}",
            file.name,
            file.bytes().len(),
            digest,
            preview_url
        );

        self.selection = Some(SelectedImage {
            file,
            digest,
            preview_url,
            generation: self.generation,
            natural_size: None,
        });
        self.in_flight = None;
        self.publish(Vec::new());
    }

    /// Start a detection run for the current selection.
    ///
    /// Returns `None` when nothing is selected or a run for this selection is
    /// already in progress.
    pub fn begin_detection(&mut self) -> Option<DetectionTicket> {
        let selection = match &self.selection {
            Some(selection) => selection,
            None => {
                log::debug!("detection requested with no image selected");
                return None;
            }
        };
        if self.in_flight == Some(selection.generation) {
            log::debug!("detection already running for {}", selection.file.name);
            return None;
        }

        self.in_flight = Some(selection.generation);
        Some(DetectionTicket {
            generation: selection.generation,
            file_name: selection.file.name.clone(),
            bytes: selection.file.shared_bytes(),
        })
    }

    /// Apply a finished run. Completions for an older selection are dropped.
    pub fn complete_detection(&mut self, completion: DetectionCompletion) -> Publish {
        if completion.generation != self.generation {
            log::debug!(
                "discarding stale detection (generation {}, current {})",
                completion.generation,
                self.generation
            );
            return Publish::Stale;
        }

        self.in_flight = None;
        if completion.model_loaded {
            self.model_loaded = true;
        }
        if let (Some(selection), Some(size)) = (self.selection.as_mut(), completion.natural_size) {
            selection.natural_size = Some(size);
        }

        match completion.outcome {
            Ok(results) => {
                let count = results.len();
                log::info!("detection found {} object(s)", count);
                self.publish(results);
                Publish::Published(count)
            }
            Err(e) => {
                log::error!("detection failed: {:#}", e);
                self.publish(Vec::new());
                Publish::Failed
            }
        }
    }

    /// Run detection synchronously. No-op without a selection.
    ///
    /// Failures are logged and published as an empty list; nothing propagates.
    pub fn run_detection<D: Detector>(&mut self, detector: &mut DetectorHandle<D>) -> Option<Publish> {
        let ticket = self.begin_detection()?;
        let completion = execute(&ticket, detector);
        Some(self.complete_detection(completion))
    }

    fn publish(&mut self, results: Vec<DetectionResult>) {
        self.results = results;
        self.results_version += 1;
    }

    pub fn selection(&self) -> Option<&SelectedImage> {
        self.selection.as_ref()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.selection.as_ref().map(|s| s.preview_url.as_str())
    }

    /// Resolve a preview URL issued by this controller.
    pub fn resolve_preview(&self, url: &str) -> Option<Arc<[u8]>> {
        self.urls.resolve(url)
    }

    /// True while a run for the current selection has not completed.
    pub fn is_processing(&self) -> bool {
        self.in_flight.is_some() && self.in_flight == self.selection.as_ref().map(|s| s.generation)
    }

    pub fn model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn results(&self) -> &[DetectionResult] {
        &self.results
    }

    /// Bumped on every publish, including resets to empty.
    pub fn results_version(&self) -> u64 {
        self.results_version
    }
}
