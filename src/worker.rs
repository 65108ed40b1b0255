//! Background detection worker.
//!
//! The controller stays on one thread; decoding and inference run on a
//! worker that owns the detector. Tickets go in over one channel and tagged
//! completions come back over another, so the controller can drop the ones
//! that belong to an older selection.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::detect::{Detector, DetectorHandle};
use crate::upload::{execute, DetectionCompletion, DetectionTicket, Publish, UploadController};

pub struct DetectionWorker {
    jobs: Option<Sender<DetectionTicket>>,
    completions: Receiver<DetectionCompletion>,
    join: Option<JoinHandle<()>>,
}

impl DetectionWorker {
    pub fn spawn<D: Detector + 'static>(detector: D) -> Result<Self> {
        let (job_tx, job_rx) = mpsc::channel::<DetectionTicket>();
        let (done_tx, done_rx) = mpsc::channel();
        let mut handle = DetectorHandle::new(detector);

        let join = std::thread::Builder::new()
            .name(format!("detect-{}", handle.name()))
            .spawn(move || {
                for ticket in job_rx {
                    log::debug!(
                        "worker: running generation {} ({})",
                        ticket.generation,
                        ticket.file_name
                    );
                    let completion = execute(&ticket, &mut handle);
                    if done_tx.send(completion).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn detection worker: {}", e))?;

        Ok(Self {
            jobs: Some(job_tx),
            completions: done_rx,
            join: Some(join),
        })
    }

    pub fn submit(&self, ticket: DetectionTicket) -> Result<()> {
        self.jobs
            .as_ref()
            .ok_or_else(|| anyhow!("detection worker is shut down"))?
            .send(ticket)
            .map_err(|_| anyhow!("detection worker stopped"))
    }

    pub fn try_recv(&self) -> Option<DetectionCompletion> {
        self.completions.try_recv().ok()
    }

    /// Wait up to `timeout` for the next completion.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<DetectionCompletion>> {
        match self.completions.recv_timeout(timeout) {
            Ok(completion) => Ok(Some(completion)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("detection worker stopped")),
        }
    }

    /// Stop accepting work and wait for the thread to finish.
    ///
    /// Blocks until the current detection, if any, returns.
    pub fn shutdown(mut self) -> Result<()> {
        self.jobs.take();
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| anyhow!("detection worker thread panicked")),
            None => Ok(()),
        }
    }
}

/// Dropping closes the job channel without waiting. A detection still running
/// finishes in the background and its completion is discarded.
impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if self.join.take().is_some() {
            log::debug!("detection worker detached");
        }
    }
}

impl UploadController {
    /// Start a run on `worker`. Returns false when nothing was dispatched.
    ///
    /// If the worker is gone the run completes immediately as a failure.
    pub fn dispatch(&mut self, worker: &DetectionWorker) -> bool {
        let Some(ticket) = self.begin_detection() else {
            return false;
        };
        let generation = ticket.generation;
        if let Err(e) = worker.submit(ticket) {
            self.complete_detection(DetectionCompletion {
                generation,
                natural_size: None,
                model_loaded: false,
                outcome: Err(e),
            });
        }
        true
    }

    /// Apply every completion the worker has ready.
    pub fn drain_completions(&mut self, worker: &DetectionWorker) -> Vec<Publish> {
        let mut applied = Vec::new();
        while let Some(completion) = worker.try_recv() {
            applied.push(self.complete_detection(completion));
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{DecodedImage, StubBackend};
    use crate::upload::ImageFile;
    use image::{DynamicImage, ImageFormat};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::sync::{Arc, Barrier};

    fn png_file(name: &str) -> ImageFile {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(6, 4)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode png");
        ImageFile::new(name, None, bytes)
    }

    /// Blocks each detection until the test releases it.
    struct GatedDetector {
        gate: Arc<Barrier>,
    }

    impl Detector for GatedDetector {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn detect(&mut self, _image: &DecodedImage) -> Result<Option<Value>> {
            self.gate.wait();
            Ok(Some(json!({
                "detections": [{
                    "categories": [{ "score": 0.9, "index": 1, "categoryName": "cat" }],
                    "boundingBox": { "originX": 0.1, "originY": 0.1, "width": 0.2, "height": 0.2 }
                }]
            })))
        }
    }

    #[test]
    fn completion_flows_back() -> Result<()> {
        let worker = DetectionWorker::spawn(StubBackend::new())?;
        let mut controller = UploadController::new();
        controller.select_file(png_file("a.png"));

        assert!(controller.dispatch(&worker));
        assert!(controller.is_processing());

        let completion = worker
            .recv_timeout(Duration::from_secs(5))?
            .expect("completion");
        assert_eq!(controller.complete_detection(completion), Publish::Published(0));
        assert!(!controller.is_processing());
        worker.shutdown()
    }

    #[test]
    fn selection_change_mid_run_drops_old_result() -> Result<()> {
        let gate = Arc::new(Barrier::new(2));
        let worker = DetectionWorker::spawn(GatedDetector { gate: gate.clone() })?;
        let mut controller = UploadController::new();

        controller.select_file(png_file("a.png"));
        assert!(controller.dispatch(&worker));

        // User picks another image while the first run is still going.
        controller.select_file(png_file("b.png"));
        gate.wait();

        let completion = worker
            .recv_timeout(Duration::from_secs(5))?
            .expect("completion");
        assert_eq!(controller.complete_detection(completion), Publish::Stale);
        assert!(controller.results().is_empty());

        assert!(controller.dispatch(&worker));
        gate.wait();
        let completion = worker
            .recv_timeout(Duration::from_secs(5))?
            .expect("completion");
        assert_eq!(controller.complete_detection(completion), Publish::Published(1));
        assert_eq!(controller.results().len(), 1);
        worker.shutdown()
    }

    #[test]
    fn drop_does_not_wait_for_running_detection() -> Result<()> {
        let gate = Arc::new(Barrier::new(2));
        let worker = DetectionWorker::spawn(GatedDetector { gate: gate.clone() })?;
        let mut controller = UploadController::new();
        controller.select_file(png_file("a.png"));
        assert!(controller.dispatch(&worker));

        // The detector is parked on the gate; dropping must still return.
        drop(worker);
        gate.wait();
        Ok(())
    }

    #[test]
    fn drain_applies_ready_completions() -> Result<()> {
        let worker = DetectionWorker::spawn(StubBackend::new())?;
        let mut controller = UploadController::new();
        controller.select_file(png_file("a.png"));
        assert!(controller.dispatch(&worker));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let applied = loop {
            let applied = controller.drain_completions(&worker);
            if !applied.is_empty() || std::time::Instant::now() > deadline {
                break applied;
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(applied, vec![Publish::Published(0)]);
        assert!(!controller.is_processing());
        worker.shutdown()
    }

    #[test]
    fn dispatch_without_selection_does_nothing() -> Result<()> {
        let worker = DetectionWorker::spawn(StubBackend::new())?;
        let mut controller = UploadController::new();
        assert!(!controller.dispatch(&worker));
        assert!(worker.recv_timeout(Duration::from_millis(50))?.is_none());
        Ok(())
    }
}
