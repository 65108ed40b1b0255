use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::overlay::Color;

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_INPUT_SIZE: u32 = 320;
const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_STROKE_COLOR: &str = "#22c55e";
const DEFAULT_LINE_WIDTH: f32 = 3.0;
const DEFAULT_LABEL_FILL: &str = "rgba(34, 197, 94, 0.7)";
const DEFAULT_LABEL_HEIGHT: f32 = 24.0;
const DEFAULT_LABEL_PADDING: f32 = 10.0;
const DEFAULT_TEXT_COLOR: &str = "white";
const DEFAULT_FONT_SIZE: f32 = 14.0;
const DEFAULT_TEXT_INSET_X: f32 = 5.0;
const DEFAULT_TEXT_BASELINE_OFFSET: f32 = 7.0;
const DEFAULT_PREVIEW_MAX_HEIGHT: u32 = 500;

#[derive(Debug, Deserialize, Default)]
struct OverlayConfigFile {
    detector: Option<DetectorConfigFile>,
    overlay: Option<StyleConfigFile>,
    preview: Option<PreviewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    fixture_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    score_threshold: Option<f32>,
    max_results: Option<usize>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct StyleConfigFile {
    stroke_color: Option<String>,
    line_width: Option<f32>,
    label_fill: Option<String>,
    label_height: Option<f32>,
    label_padding: Option<f32>,
    text_color: Option<String>,
    font_size: Option<f32>,
    text_inset_x: Option<f32>,
    text_baseline_offset: Option<f32>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct PreviewConfigFile {
    max_height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub detector: DetectorSettings,
    pub style: OverlayStyle,
    pub preview: PreviewSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub fixture_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub score_threshold: f32,
    pub max_results: usize,
    pub labels: Vec<String>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            fixture_path: None,
            model_path: None,
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            labels: Vec::new(),
        }
    }
}

/// Drawing parameters for the overlay. Lengths are in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub stroke_color: Color,
    pub line_width: f32,
    pub label_fill: Color,
    pub label_height: f32,
    pub label_padding: f32,
    pub text_color: Color,
    pub font_size: f32,
    pub text_inset_x: f32,
    pub text_baseline_offset: f32,
    pub font_path: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            stroke_color: Color::rgb(0x22, 0xc5, 0x5e),
            line_width: DEFAULT_LINE_WIDTH,
            label_fill: Color::rgba(34, 197, 94, 0.7),
            label_height: DEFAULT_LABEL_HEIGHT,
            label_padding: DEFAULT_LABEL_PADDING,
            text_color: Color::WHITE,
            font_size: DEFAULT_FONT_SIZE,
            text_inset_x: DEFAULT_TEXT_INSET_X,
            text_baseline_offset: DEFAULT_TEXT_BASELINE_OFFSET,
            font_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSettings {
    pub max_height: u32,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            max_height: DEFAULT_PREVIEW_MAX_HEIGHT,
        }
    }
}

impl OverlayConfig {
    /// Load from `DETECT_OVERLAY_CONFIG` (if set), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("DETECT_OVERLAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a specific file, ignoring `DETECT_OVERLAY_CONFIG` but still
    /// honoring the other env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: OverlayConfigFile) -> Result<Self> {
        let detector_file = file.detector.unwrap_or_default();
        let defaults = DetectorSettings::default();
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(defaults.backend),
            fixture_path: detector_file.fixture_path,
            model_path: detector_file.model_path,
            input_width: detector_file.input_width.unwrap_or(defaults.input_width),
            input_height: detector_file.input_height.unwrap_or(defaults.input_height),
            score_threshold: detector_file
                .score_threshold
                .unwrap_or(defaults.score_threshold),
            max_results: detector_file.max_results.unwrap_or(defaults.max_results),
            labels: detector_file.labels.unwrap_or_default(),
        };

        let style_file = file.overlay.unwrap_or_default();
        let style = OverlayStyle {
            stroke_color: parse_color_or(style_file.stroke_color, DEFAULT_STROKE_COLOR)?,
            line_width: style_file.line_width.unwrap_or(DEFAULT_LINE_WIDTH),
            label_fill: parse_color_or(style_file.label_fill, DEFAULT_LABEL_FILL)?,
            label_height: style_file.label_height.unwrap_or(DEFAULT_LABEL_HEIGHT),
            label_padding: style_file.label_padding.unwrap_or(DEFAULT_LABEL_PADDING),
            text_color: parse_color_or(style_file.text_color, DEFAULT_TEXT_COLOR)?,
            font_size: style_file.font_size.unwrap_or(DEFAULT_FONT_SIZE),
            text_inset_x: style_file.text_inset_x.unwrap_or(DEFAULT_TEXT_INSET_X),
            text_baseline_offset: style_file
                .text_baseline_offset
                .unwrap_or(DEFAULT_TEXT_BASELINE_OFFSET),
            font_path: style_file.font_path,
        };

        let preview = PreviewSettings {
            max_height: file
                .preview
                .and_then(|preview| preview.max_height)
                .unwrap_or(DEFAULT_PREVIEW_MAX_HEIGHT),
        };

        Ok(Self {
            detector,
            style,
            preview,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("DETECT_OVERLAY_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("DETECT_OVERLAY_FIXTURE") {
            if !path.trim().is_empty() {
                self.detector.fixture_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("DETECT_OVERLAY_MODEL") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("DETECT_OVERLAY_FONT") {
            if !path.trim().is_empty() {
                self.style.font_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(threshold) = std::env::var("DETECT_OVERLAY_SCORE_THRESHOLD") {
            self.detector.score_threshold = threshold.trim().parse().map_err(|_| {
                anyhow!("DETECT_OVERLAY_SCORE_THRESHOLD must be a number between 0 and 1")
            })?;
        }
        if let Ok(max_height) = std::env::var("DETECT_OVERLAY_PREVIEW_MAX_HEIGHT") {
            self.preview.max_height = max_height.trim().parse().map_err(|_| {
                anyhow!("DETECT_OVERLAY_PREVIEW_MAX_HEIGHT must be an integer number of pixels")
            })?;
        }
        Ok(())
    }

    /// Normalize and check settings. Call again after changing fields by hand.
    pub fn validate(&mut self) -> Result<()> {
        self.detector.backend = self.detector.backend.to_lowercase();
        if !(0.0..=1.0).contains(&self.detector.score_threshold) {
            return Err(anyhow!("score_threshold must be within 0..=1"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if self.detector.max_results == 0 {
            return Err(anyhow!("max_results must be greater than zero"));
        }
        if self.detector.backend == "fixture" && self.detector.fixture_path.is_none() {
            return Err(anyhow!("fixture backend requires fixture_path"));
        }
        if self.detector.backend == "tract" && self.detector.model_path.is_none() {
            return Err(anyhow!("tract backend requires model_path"));
        }
        if self.style.line_width <= 0.0 || self.style.font_size <= 0.0 {
            return Err(anyhow!("line_width and font_size must be greater than zero"));
        }
        if self.style.label_height <= 0.0 {
            return Err(anyhow!("label_height must be greater than zero"));
        }
        if self.preview.max_height == 0 {
            return Err(anyhow!("preview max_height must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            style: OverlayStyle::default(),
            preview: PreviewSettings::default(),
        }
    }
}

fn read_config_file(path: &Path) -> Result<OverlayConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn parse_color_or(value: Option<String>, default: &str) -> Result<Color> {
    let raw = value.as_deref().unwrap_or(default);
    raw.parse()
        .map_err(|e| anyhow!("invalid color '{}': {}", raw, e))
}
