use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::config::DetectorSettings;

use super::backend::{DecodedImage, Detector};
use super::backends::{FixtureBackend, StubBackend};

/// Detector shared between the registry and whoever runs it.
///
/// Wrapped in `Mutex` because `Detector::detect` takes `&mut self`.
#[derive(Clone)]
pub struct SharedDetector {
    name: &'static str,
    inner: Arc<Mutex<dyn Detector>>,
}

impl Detector for SharedDetector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&mut self) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("backend '{}' lock poisoned", self.name))?;
        guard.init()
    }

    fn detect(&mut self, image: &DecodedImage) -> Result<Option<Value>> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow!("backend '{}' lock poisoned", self.name))?;
        guard.detect(image)
    }
}

/// Registry of named detector backends.
pub struct BackendRegistry {
    backends: HashMap<String, SharedDetector>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Build the registry described by the detector settings.
    ///
    /// `stub` is always available. `fixture` is registered when a fixture
    /// path is configured, `tract` when a model path is configured and the
    /// `backend-tract` feature is enabled.
    pub fn from_settings(settings: &DetectorSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(StubBackend::new());

        if let Some(path) = &settings.fixture_path {
            registry.register(FixtureBackend::new(path));
        }

        #[cfg(feature = "backend-tract")]
        if let Some(path) = &settings.model_path {
            let backend = super::backends::TractBackend::new(
                path,
                settings.input_width,
                settings.input_height,
            )
            .with_threshold(settings.score_threshold)
            .with_max_results(settings.max_results)
            .with_labels(settings.labels.clone());
            registry.register(backend);
        }

        registry.set_default(&settings.backend)?;
        Ok(registry)
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: Detector + 'static>(&mut self, backend: B) {
        let name = backend.name();
        if self.default_name.is_none() {
            self.default_name = Some(name.to_string());
        }
        self.backends.insert(
            name.to_string(),
            SharedDetector {
                name,
                inner: Arc::new(Mutex::new(backend)),
            },
        );
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            ));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<SharedDetector> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<SharedDetector> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registered_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(FixtureBackend::new("detections.json"));
        let default = registry.default_backend().expect("default backend");
        assert_eq!(default.name(), "stub");
        assert_eq!(registry.list(), vec!["fixture", "stub"]);
    }

    #[test]
    fn unknown_default_is_rejected() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        let err = registry.set_default("tract").unwrap_err();
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn settings_select_fixture_backend() -> Result<()> {
        let settings = DetectorSettings {
            backend: "fixture".to_string(),
            fixture_path: Some("detections.json".into()),
            ..DetectorSettings::default()
        };
        let registry = BackendRegistry::from_settings(&settings)?;
        let backend = registry.default_backend().expect("default backend");
        assert_eq!(backend.name(), "fixture");
        Ok(())
    }
}
