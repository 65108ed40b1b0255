use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::detect::backend::{DecodedImage, Detector};

/// Replays a recorded detector output from a local JSON file.
///
/// The file is read on `init`, so a missing or invalid fixture surfaces as a
/// model-load failure rather than at construction.
pub struct FixtureBackend {
    path: PathBuf,
    output: Option<Value>,
}

impl FixtureBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            output: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Detector for FixtureBackend {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn init(&mut self) -> Result<()> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| anyhow!("failed to read fixture {}: {}", self.path.display(), e))?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid fixture {}: {}", self.path.display(), e))?;
        self.output = Some(value);
        Ok(())
    }

    fn detect(&mut self, _image: &DecodedImage) -> Result<Option<Value>> {
        if self.output.is_none() {
            return Err(anyhow!("fixture backend used before init"));
        }
        Ok(self.output.clone())
    }
}
