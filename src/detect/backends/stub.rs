use anyhow::Result;
use serde_json::{json, Value};

use crate::detect::backend::{DecodedImage, Detector};

/// Stub backend for testing. Returns a canned detector output for every image.
pub struct StubBackend {
    output: Option<Value>,
}

impl StubBackend {
    /// Stub that never finds anything.
    pub fn new() -> Self {
        Self {
            output: Some(json!({ "detections": [] })),
        }
    }

    /// Stub that replies with `output` verbatim, including `None`.
    pub fn with_output(output: Option<Value>) -> Self {
        Self { output }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _image: &DecodedImage) -> Result<Option<Value>> {
        Ok(self.output.clone())
    }
}
