mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{DecodedImage, Detector, DetectorHandle};
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use backends::{FixtureBackend, StubBackend};
pub use registry::{BackendRegistry, SharedDetector};
pub use result::{normalize_output, BoundingBox, Category, DetectionResult, Keypoint};
