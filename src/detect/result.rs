use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ranked category attached to a detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub score: f32,
    pub index: i64,
    pub category_name: String,
    /// May be empty; renderers fall back to `category_name`.
    pub display_name: String,
}

/// Opaque keypoint, passed through from the detector untouched.
pub type Keypoint = Value;

/// Box in normalized (0..1) image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub origin_x: f32,
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
    /// Copied verbatim; not used for drawing.
    pub angle: f32,
}

/// One detected object.
///
/// `categories` keeps the detector's ranking; the first entry is the primary label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub categories: Vec<Category>,
    pub keypoints: Vec<Keypoint>,
    pub bounding_box: BoundingBox,
}

impl DetectionResult {
    pub fn primary(&self) -> Option<&Category> {
        self.categories.first()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCategory {
    score: f32,
    index: i64,
    category_name: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoundingBox {
    origin_x: f32,
    origin_y: f32,
    width: f32,
    height: f32,
    #[serde(default)]
    angle: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDetection {
    categories: Vec<RawCategory>,
    #[serde(default)]
    keypoints: Option<Vec<Value>>,
    bounding_box: RawBoundingBox,
}

impl From<RawDetection> for DetectionResult {
    fn from(raw: RawDetection) -> Self {
        Self {
            categories: raw
                .categories
                .into_iter()
                .map(|c| Category {
                    score: c.score,
                    index: c.index,
                    category_name: c.category_name,
                    display_name: c.display_name.unwrap_or_default(),
                })
                .collect(),
            keypoints: raw.keypoints.unwrap_or_default(),
            bounding_box: BoundingBox {
                origin_x: raw.bounding_box.origin_x,
                origin_y: raw.bounding_box.origin_y,
                width: raw.bounding_box.width,
                height: raw.bounding_box.height,
                angle: raw.bounding_box.angle,
            },
        }
    }
}

/// Reshape raw detector output into `DetectionResult`s.
///
/// A missing output or a `detections` field that is not an array yields an
/// empty list. An entry that lacks `categories` or `boundingBox` fails the
/// whole batch.
pub fn normalize_output(raw: Option<&Value>) -> Result<Vec<DetectionResult>> {
    let detections = match raw.and_then(|output| output.get("detections")) {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };

    detections
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(anyhow!("detection {} is not an object", i));
            }
            let parsed: RawDetection = serde_json::from_value(item.clone())
                .with_context(|| format!("malformed detection {}", i))?;
            Ok(parsed.into())
        })
        .collect()
}
