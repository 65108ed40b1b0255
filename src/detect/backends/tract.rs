#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use serde_json::{json, Value};
use tract_onnx::prelude::*;

use crate::detect::backend::{DecodedImage, Detector};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract-based backend for ONNX object detection.
///
/// The model takes a `1x3xHxW` RGB tensor scaled to 0..1 and returns rows of
/// `[x0, y0, x1, y1, score, class]` in normalized image coordinates, shaped
/// either `[N, 6]` or `[1, N, 6]`. Output is emitted in the vision runtime's
/// `{ "detections": [...] }` shape.
pub struct TractBackend {
    model_path: PathBuf,
    model: Option<OnnxPlan>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    max_results: usize,
    labels: Vec<String>,
}

impl TractBackend {
    /// Prepare a backend for the given model. The model is loaded on `init`.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            model: None,
            width,
            height,
            confidence_threshold: 0.5,
            max_results: 5,
            labels: Vec::new(),
        }
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Class names indexed by the model's class id.
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    fn load(&self) -> Result<OnnxPlan> {
        let model_path = &self.model_path;
        tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, self.height as usize, self.width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")
    }

    fn build_input(&self, image: &DecodedImage) -> Tensor {
        let resized = imageops::resize(
            &image.to_rgb8(),
            self.width,
            self.height,
            FilterType::Triangle,
        );
        tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, self.width as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        )
        .into_tensor()
    }

    fn extract_detections(&self, outputs: TVec<TValue>) -> Result<Vec<Value>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = rows.iter().copied().collect();
        if flat.len() % 6 != 0 {
            return Err(anyhow!(
                "model output has {} values, expected rows of 6",
                flat.len()
            ));
        }

        let mut candidates: Vec<&[f32]> = flat
            .chunks_exact(6)
            .filter(|row| row[4].is_finite() && row[4] >= self.confidence_threshold)
            .collect();
        candidates.sort_by(|a, b| b[4].total_cmp(&a[4]));
        candidates.truncate(self.max_results);

        Ok(candidates
            .into_iter()
            .map(|row| {
                let (x0, y0, x1, y1) = (row[0], row[1], row[2], row[3]);
                let index = row[5].max(0.0) as usize;
                let name = self
                    .labels
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", index));
                json!({
                    "categories": [{
                        "score": row[4],
                        "index": index,
                        "categoryName": name,
                        "displayName": "",
                    }],
                    "keypoints": [],
                    "boundingBox": {
                        "originX": x0.min(x1),
                        "originY": y0.min(y1),
                        "width": (x1 - x0).abs(),
                        "height": (y1 - y0).abs(),
                        "angle": 0.0,
                    },
                })
            })
            .collect())
    }
}

impl Detector for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn init(&mut self) -> Result<()> {
        if self.model.is_none() {
            self.model = Some(self.load()?);
        }
        Ok(())
    }

    fn detect(&mut self, image: &DecodedImage) -> Result<Option<Value>> {
        let input = self.build_input(image);
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("tract backend used before init"))?;
        let outputs = model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let detections = self.extract_detections(outputs)?;
        Ok(Some(json!({ "detections": detections })))
    }
}
