use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use serde_json::Value;

/// Image decoded from the selected file, ready for inference.
pub struct DecodedImage {
    image: DynamicImage,
}

impl DecodedImage {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("decode image")?;
        Ok(Self { image })
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn to_rgb8(&self) -> RgbImage {
        self.image.to_rgb8()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }
}

/// Object detector capability.
///
/// The detector is a black box. Its output mirrors the loose JSON shape the
/// vision runtime produces (`{ "detections": [...] }`), which may be absent
/// or malformed; callers normalize it with `normalize_output`.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Load the vision runtime and model. Called once before the first `detect`.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run detection on a decoded image.
    fn detect(&mut self, image: &DecodedImage) -> Result<Option<Value>>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn detect(&mut self, image: &DecodedImage) -> Result<Option<Value>> {
        (**self).detect(image)
    }
}

/// Wraps a detector so `init` runs at most once.
///
/// A failed `init` is retried on the next call.
pub struct DetectorHandle<D> {
    inner: D,
    initialized: bool,
}

impl<D: Detector> DetectorHandle<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            initialized: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn ensure_init(&mut self) -> Result<()> {
        if !self.initialized {
            self.inner
                .init()
                .with_context(|| format!("initialize detector '{}'", self.inner.name()))?;
            self.initialized = true;
            log::info!("detector '{}' loaded", self.inner.name());
        }
        Ok(())
    }

    /// Initialize if needed, then detect.
    pub fn detect(&mut self, image: &DecodedImage) -> Result<Option<Value>> {
        self.ensure_init()?;
        self.inner.detect(image)
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingDetector {
        inits: u32,
        fail_first_init: bool,
    }

    impl Detector for CountingDetector {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn init(&mut self) -> Result<()> {
            self.inits += 1;
            if self.fail_first_init && self.inits == 1 {
                anyhow::bail!("runtime unavailable");
            }
            Ok(())
        }

        fn detect(&mut self, _image: &DecodedImage) -> Result<Option<Value>> {
            Ok(None)
        }
    }

    fn tiny_image() -> DecodedImage {
        DecodedImage::from_image(DynamicImage::new_rgb8(4, 4))
    }

    #[test]
    fn init_runs_once() -> Result<()> {
        let mut handle = DetectorHandle::new(CountingDetector::default());
        let image = tiny_image();
        handle.detect(&image)?;
        handle.detect(&image)?;
        assert!(handle.is_initialized());
        assert_eq!(handle.into_inner().inits, 1);
        Ok(())
    }

    #[test]
    fn failed_init_is_retried() -> Result<()> {
        let mut handle = DetectorHandle::new(CountingDetector {
            fail_first_init: true,
            ..Default::default()
        });
        let image = tiny_image();
        assert!(handle.detect(&image).is_err());
        assert!(!handle.is_initialized());
        handle.detect(&image)?;
        assert_eq!(handle.into_inner().inits, 2);
        Ok(())
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(DecodedImage::decode(b"not an image").is_err());
    }
}
