use crate::detect::DetectionResult;

use super::canvas::Canvas;
use super::renderer::{Annotation, DisplaySize, OverlayRenderer};

/// Canvas layered over the displayed preview image.
///
/// Redraws whenever the published result list changes, provided both the
/// displayed image size and the canvas are attached.
pub struct OverlayView<C> {
    renderer: OverlayRenderer,
    canvas: Option<C>,
    display: Option<DisplaySize>,
    rendered_version: Option<u64>,
    annotations: Vec<Annotation>,
}

impl<C: Canvas> OverlayView<C> {
    pub fn new(renderer: OverlayRenderer) -> Self {
        Self {
            renderer,
            canvas: None,
            display: None,
            rendered_version: None,
            annotations: Vec::new(),
        }
    }

    pub fn attach_canvas(&mut self, canvas: C) {
        self.canvas = Some(canvas);
        self.rendered_version = None;
    }

    pub fn detach_canvas(&mut self) -> Option<C> {
        self.rendered_version = None;
        self.canvas.take()
    }

    pub fn canvas(&self) -> Option<&C> {
        self.canvas.as_ref()
    }

    /// The preview image finished loading and is displayed at `size`.
    pub fn set_display(&mut self, size: DisplaySize) {
        if self.display != Some(size) {
            self.rendered_version = None;
        }
        self.display = Some(size);
    }

    /// The preview is gone or failed to load. Anything drawn for the previous
    /// image is wiped.
    pub fn clear_display(&mut self) {
        self.display = None;
        self.rendered_version = None;
        self.annotations.clear();
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.clear();
        }
    }

    pub fn display(&self) -> Option<DisplaySize> {
        self.display
    }

    /// Annotations from the most recent render.
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Render `results` if `version` differs from the last rendered one.
    ///
    /// Returns true when the canvas was touched.
    pub fn sync(&mut self, version: u64, results: &[DetectionResult]) -> bool {
        if self.rendered_version == Some(version) {
            return false;
        }
        let rendered = self.on_results_changed(results);
        if rendered {
            self.rendered_version = Some(version);
        }
        rendered
    }

    /// Redraw for a new result list.
    ///
    /// An empty list clears the canvas so boxes from a previous image never
    /// linger. Nothing is drawn while the image or canvas is missing.
    pub fn on_results_changed(&mut self, results: &[DetectionResult]) -> bool {
        let (Some(canvas), Some(display)) = (self.canvas.as_mut(), self.display) else {
            return false;
        };
        if results.is_empty() {
            if (canvas.width(), canvas.height()) != (display.width, display.height) {
                canvas.resize(display.width, display.height);
            }
            canvas.clear();
            self.annotations.clear();
        } else {
            self.annotations = self.renderer.render(canvas, display, results);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Category};
    use crate::overlay::canvas::{DrawCommand, RecordingCanvas};

    fn one_result() -> Vec<DetectionResult> {
        vec![DetectionResult {
            categories: vec![Category {
                score: 0.5,
                index: 0,
                category_name: "cat".to_string(),
                display_name: String::new(),
            }],
            keypoints: Vec::new(),
            bounding_box: BoundingBox {
                origin_x: 0.5,
                origin_y: 0.5,
                width: 0.25,
                height: 0.25,
                angle: 0.0,
            },
        }]
    }

    #[test]
    fn no_drawing_without_image_or_canvas() {
        let mut view: OverlayView<RecordingCanvas> = OverlayView::new(OverlayRenderer::default());
        assert!(!view.on_results_changed(&one_result()));

        view.attach_canvas(RecordingCanvas::new());
        assert!(!view.on_results_changed(&one_result()));
        assert!(view.canvas().map(|c| c.commands().is_empty()).unwrap_or(false));

        view.set_display(DisplaySize::new(100, 100));
        assert!(view.on_results_changed(&one_result()));
        assert_eq!(view.annotations().len(), 1);
    }

    #[test]
    fn sync_renders_once_per_version() {
        let mut view = OverlayView::new(OverlayRenderer::default());
        view.attach_canvas(RecordingCanvas::new());
        view.set_display(DisplaySize::new(100, 100));

        let results = one_result();
        assert!(view.sync(1, &results));
        assert!(!view.sync(1, &results));
        assert!(view.sync(2, &results));

        view.set_display(DisplaySize::new(50, 50));
        assert!(view.sync(2, &results));
    }

    #[test]
    fn empty_list_clears_canvas() {
        let mut view = OverlayView::new(OverlayRenderer::default());
        view.attach_canvas(RecordingCanvas::new());
        view.set_display(DisplaySize::new(100, 100));
        view.sync(1, &one_result());
        view.sync(2, &[]);

        let canvas = view.canvas().expect("canvas attached");
        assert_eq!(canvas.commands().last(), Some(&DrawCommand::Clear));
        assert!(canvas.visible().is_empty());
        assert!(view.annotations().is_empty());
    }

    #[test]
    fn clearing_display_wipes_previous_boxes() {
        let mut view = OverlayView::new(OverlayRenderer::default());
        view.attach_canvas(RecordingCanvas::new());
        view.set_display(DisplaySize::new(100, 100));
        assert!(view.sync(1, &one_result()));

        view.clear_display();
        assert!(!view.sync(2, &[]));

        let canvas = view.canvas().expect("canvas attached");
        assert!(canvas.visible().is_empty());
        assert!(view.annotations().is_empty());
    }
}
