//! Per-object result summaries, as plain text or JSON.

use std::fmt::Write as _;

use serde::Serialize;

use crate::detect::{BoundingBox, DetectionResult};
use crate::overlay::{format_label, percent, DisplaySize};
use crate::upload::SelectedImage;

#[derive(Debug, Serialize)]
pub struct Badge {
    pub name: String,
    pub percent: i64,
}

#[derive(Debug, Serialize)]
pub struct ObjectReport {
    /// 1-based, in published order.
    pub number: usize,
    pub label: String,
    pub badges: Vec<Badge>,
    pub bounding_box: BoundingBox,
}

#[derive(Debug, Serialize)]
pub struct ImageReport {
    pub name: String,
    pub sha256: String,
    pub natural_size: Option<(u32, u32)>,
    pub display_size: Option<DisplaySize>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub image: Option<ImageReport>,
    pub backend: String,
    pub model_loaded: bool,
    pub objects: Vec<ObjectReport>,
}

impl Report {
    pub fn new(
        selection: Option<&SelectedImage>,
        display_size: Option<DisplaySize>,
        backend: &str,
        model_loaded: bool,
        results: &[DetectionResult],
    ) -> Self {
        let image = selection.map(|s| ImageReport {
            name: s.file.name.clone(),
            sha256: s.digest.clone(),
            natural_size: s.natural_size,
            display_size,
        });
        let objects = results
            .iter()
            .enumerate()
            .map(|(i, result)| ObjectReport {
                number: i + 1,
                label: format_label(result),
                badges: result
                    .categories
                    .iter()
                    .map(|c| Badge {
                        name: if c.display_name.is_empty() {
                            c.category_name.clone()
                        } else {
                            c.display_name.clone()
                        },
                        percent: percent(c.score),
                    })
                    .collect(),
                bounding_box: result.bounding_box,
            })
            .collect();
        Self {
            image,
            backend: backend.to_string(),
            model_loaded,
            objects,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(image) = &self.image {
            let _ = writeln!(out, "Image: {} (sha256 {})", image.name, image.sha256);
            if let Some((w, h)) = image.natural_size {
                let _ = write!(out, "  Size: {}x{}", w, h);
                if let Some(display) = image.display_size {
                    let _ = write!(out, ", shown at {}x{}", display.width, display.height);
                }
                out.push('\n');
            }
        }
        let _ = writeln!(
            out,
            "Backend: {}{}",
            self.backend,
            if self.model_loaded { "" } else { " (model not loaded)" }
        );

        if self.objects.is_empty() {
            out.push_str("No objects detected.\n");
            return out;
        }

        out.push_str("Detection Results\n");
        for object in &self.objects {
            let badges: Vec<String> = object
                .badges
                .iter()
                .map(|b| format!("[{} {}%]", b.name, b.percent))
                .collect();
            let bbox = &object.bounding_box;
            let _ = writeln!(out, "Object {}: {}", object.number, badges.join(" "));
            let _ = writeln!(
                out,
                "  Bounding Box: X: {:.3}  Y: {:.3}  Width: {:.3}  Height: {:.3}",
                bbox.origin_x, bbox.origin_y, bbox.width, bbox.height
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::Category;

    fn results() -> Vec<DetectionResult> {
        vec![DetectionResult {
            categories: vec![
                Category {
                    score: 0.87,
                    index: 18,
                    category_name: "dog".to_string(),
                    display_name: "Dog".to_string(),
                },
                Category {
                    score: 0.12,
                    index: 17,
                    category_name: "cat".to_string(),
                    display_name: String::new(),
                },
            ],
            keypoints: Vec::new(),
            bounding_box: BoundingBox {
                origin_x: 0.25,
                origin_y: 0.1,
                width: 0.5,
                height: 0.6,
                angle: 0.0,
            },
        }]
    }

    #[test]
    fn text_lists_badges_and_box() {
        let report = Report::new(None, None, "stub", true, &results());
        let text = report.to_text();
        assert!(text.contains("Object 1: [Dog 87%] [cat 12%]"), "{}", text);
        assert!(
            text.contains("X: 0.250  Y: 0.100  Width: 0.500  Height: 0.600"),
            "{}",
            text
        );
    }

    #[test]
    fn empty_report_says_so() {
        let report = Report::new(None, None, "stub", false, &[]);
        let text = report.to_text();
        assert!(text.contains("No objects detected."));
        assert!(text.contains("model not loaded"));
    }

    #[test]
    fn json_uses_primary_label() -> serde_json::Result<()> {
        let report = Report::new(None, None, "fixture", true, &results());
        let value: serde_json::Value = serde_json::from_str(&report.to_json()?)?;
        assert_eq!(value["objects"][0]["label"], "Dog (87%)");
        assert_eq!(value["objects"][0]["badges"][1]["percent"], 12);
        assert_eq!(value["objects"][0]["bounding_box"]["originX"], 0.25);
        Ok(())
    }
}
