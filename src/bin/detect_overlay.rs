//! detect_overlay - run object detection on one image and draw the boxes.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use image::imageops::{self, FilterType};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use detect_overlay::overlay::{discover_system_font, load_font};
use detect_overlay::ui::{Ui, UiMode};
use detect_overlay::{
    BackendRegistry, DecodedImage, DetectorHandle, ImageFile, OverlayConfig, Publish,
    RasterCanvas, Report, Session,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image to run detection on.
    #[arg(long)]
    image: PathBuf,
    /// Write the preview with the overlay composited on top (PNG).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Config file (TOML or JSON). Defaults to DETECT_OVERLAY_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Detector backend (stub, fixture, tract).
    #[arg(long)]
    backend: Option<String>,
    /// Canned detector output for the fixture backend.
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// ONNX model for the tract backend.
    #[arg(long)]
    model: Option<PathBuf>,
    /// TTF/OTF font for label text.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Report format: text or json.
    #[arg(long, default_value = "text")]
    report: String,
    /// UI mode: auto, plain, or pretty.
    #[arg(long, default_value = "auto")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if args.report != "text" && args.report != "json" {
        return Err(anyhow!("--report must be text or json"));
    }

    let ui = Ui::new(UiMode::parse(Some(args.ui.as_str())), std::io::stderr().is_terminal());
    let config = load_config(&args)?;

    let registry = BackendRegistry::from_settings(&config.detector)?;
    let detector = registry
        .default_backend()
        .ok_or_else(|| anyhow!("no detector backend registered"))?;
    let mut detector = DetectorHandle::new(detector);
    log::info!(
        "backends available: {} (using {})",
        registry.list().join(", "),
        detector.name()
    );

    let font = match &config.style.font_path {
        Some(path) => Some(load_font(path)?),
        None => match discover_system_font() {
            Some((path, font)) => {
                log::debug!("using system font {}", path.display());
                Some(font)
            }
            None => {
                log::warn!("no font found; labels will be drawn without text");
                None
            }
        },
    };

    let mut session = Session::new(&config, RasterCanvas::new(1, 1, font));
    session.drop_files(vec![ImageFile::read(&args.image)?])?;

    let busy = ui.busy("detect objects");
    let outcome = match session.detect(&mut detector) {
        Some(Publish::Published(count)) => format!("{} object(s)", count),
        Some(Publish::Failed) => "failed".to_string(),
        Some(Publish::Stale) | None => "skipped".to_string(),
    };
    busy.done(&outcome);

    if let Some(out) = &args.out {
        write_overlay(&session, out)?;
        log::info!("wrote {}", out.display());
    }

    let controller = session.controller();
    let report = Report::new(
        controller.selection(),
        session.display(),
        detector.name(),
        controller.model_loaded(),
        controller.results(),
    );
    if args.report == "json" {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.to_text());
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<OverlayConfig> {
    let mut config = match &args.config {
        Some(path) => OverlayConfig::load_from(path)?,
        None => OverlayConfig::load()?,
    };
    if let Some(backend) = &args.backend {
        config.detector.backend = backend.clone();
    }
    if let Some(path) = &args.fixture {
        config.detector.fixture_path = Some(path.clone());
        if args.backend.is_none() {
            config.detector.backend = "fixture".to_string();
        }
    }
    if let Some(path) = &args.model {
        config.detector.model_path = Some(path.clone());
        if args.backend.is_none() && args.fixture.is_none() {
            config.detector.backend = "tract".to_string();
        }
    }
    if let Some(path) = &args.font {
        config.style.font_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

fn write_overlay(session: &Session<RasterCanvas>, out: &Path) -> Result<()> {
    let controller = session.controller();
    let bytes = controller
        .preview_url()
        .and_then(|url| controller.resolve_preview(url))
        .ok_or_else(|| anyhow!("no preview to draw on"))?;
    let display = session
        .display()
        .ok_or_else(|| anyhow!("preview image did not load"))?;
    let canvas = session
        .canvas()
        .ok_or_else(|| anyhow!("overlay canvas detached"))?;

    let preview = DecodedImage::decode(&bytes)?.image().to_rgba8();
    let preview = imageops::resize(&preview, display.width, display.height, FilterType::Triangle);
    let composed = canvas.composite_over(&preview)?;
    composed
        .save(out)
        .with_context(|| format!("failed to write {}", out.display()))
}
