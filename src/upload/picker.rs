use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

/// Extensions the picker accepts, matching the `image/*` filter.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];

/// A user-provided file, held in memory.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub name: String,
    /// MIME type reported by the source, if any.
    pub mime: Option<String>,
    bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
        }
    }

    /// Read a local file. The MIME type is derived from the extension.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("image path {} has no file name", path.display()))?
            .to_string();
        let mime = mime_for_name(&name).map(str::to_string);
        Ok(Self::new(name, mime, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// MIME type for an accepted image extension.
pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" | "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Accept filter in front of the upload controller.
///
/// Only image files with an accepted extension pass, and at most one file
/// per drop: dropping several acceptable files rejects them all.
#[derive(Clone, Debug)]
pub struct FilePicker {
    extensions: Vec<String>,
    max_files: usize,
}

impl Default for FilePicker {
    fn default() -> Self {
        Self {
            extensions: ACCEPTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            max_files: 1,
        }
    }
}

impl FilePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_acceptable(&self, file: &ImageFile) -> bool {
        let mime_ok = file
            .mime
            .as_deref()
            .map(|mime| mime.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(true);
        let ext_ok = file
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext));
        mime_ok && ext_ok
    }

    /// Filter a drop down to the single file handed to the controller.
    pub fn accept(&self, candidates: Vec<ImageFile>) -> Result<ImageFile> {
        let total = candidates.len();
        let mut accepted: Vec<ImageFile> = candidates
            .into_iter()
            .filter(|file| {
                let ok = self.is_acceptable(file);
                if !ok {
                    log::warn!("rejected {}: not a supported image type", file.name);
                }
                ok
            })
            .collect();

        if accepted.len() > self.max_files {
            return Err(anyhow!(
                "too many files: {} dropped, at most {} accepted",
                accepted.len(),
                self.max_files
            ));
        }
        accepted.pop().ok_or_else(|| {
            anyhow!(
                "no acceptable image among {} file(s); supported: {}",
                total,
                self.extensions.join(", ")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: Option<&str>) -> ImageFile {
        ImageFile::new(name, mime.map(str::to_string), vec![0u8; 4])
    }

    #[test]
    fn accepts_supported_extensions() -> Result<()> {
        let picker = FilePicker::new();
        for name in ["a.jpg", "b.JPEG", "c.png", "d.webp"] {
            let mime = mime_for_name(name);
            assert!(picker.is_acceptable(&file(name, mime)), "{}", name);
        }
        let picked = picker.accept(vec![file("notes.txt", Some("text/plain")), file("dog.png", None)])?;
        assert_eq!(picked.name, "dog.png");
        Ok(())
    }

    #[test]
    fn rejects_other_types() {
        let picker = FilePicker::new();
        assert!(!picker.is_acceptable(&file("anim.gif", Some("image/gif"))));
        assert!(!picker.is_acceptable(&file("fake.png", Some("application/pdf"))));
        assert!(!picker.is_acceptable(&file("noext", None)));
        assert!(picker.accept(vec![file("anim.gif", None)]).is_err());
        assert!(picker.accept(Vec::new()).is_err());
    }

    #[test]
    fn rejects_multiple_images() {
        let picker = FilePicker::new();
        let err = picker
            .accept(vec![file("a.png", None), file("b.jpg", None)])
            .unwrap_err();
        assert!(err.to_string().contains("too many files"));
    }

    #[test]
    fn read_derives_name_and_mime() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Dog.WEBP");
        std::fs::write(&path, b"riff")?;
        let image = ImageFile::read(&path)?;
        assert_eq!(image.name, "Dog.WEBP");
        assert_eq!(image.mime.as_deref(), Some("image/webp"));
        assert_eq!(image.bytes(), b"riff");
        Ok(())
    }
}
