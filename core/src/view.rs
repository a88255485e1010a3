use crate::detection::{DetectionExport, DetectionResult};
use crate::overlay::{
    fit_within, CategoryPalette, DrawSurface, ImageGeometry, ImageSlot, LoadSignal, LoadTicket,
    OverlayFrame, OverlayRenderer, RenderOutcome, Size, SkipReason,
};
use crate::telemetry::log::LogManager;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// Owner of the results viewer state: detections, the image under them,
/// the active category filter and the measured layout.
///
/// The renderer only ever sees this state as immutable inputs.
pub struct ResultsView {
    results: Vec<DetectionResult>,
    slot: ImageSlot,
    filter: Option<String>,
    container: Size,
    display: Size,
    renderer: OverlayRenderer,
    logger: LogManager,
}

impl ResultsView {
    pub fn new(palette: CategoryPalette) -> Self {
        Self {
            results: Vec::new(),
            slot: ImageSlot::new(),
            filter: None,
            container: Size::default(),
            display: Size::default(),
            renderer: OverlayRenderer::new(palette),
            logger: LogManager::scoped("results"),
        }
    }

    /// Replaces the result set and image source wholesale. The new results
    /// are owed a render, reported by the `image_loaded` signal.
    pub fn show(&mut self, results: Vec<DetectionResult>, source: impl Into<String>) -> LoadTicket {
        self.results = results;
        self.filter = None;
        let ticket = self.slot.assign(source);
        self.slot.request_render();
        self.logger.record(&format!(
            "showing {} detections over {}",
            self.results.len(),
            ticket.source()
        ));
        ticket
    }

    pub fn image_loaded(&mut self, ticket: &LoadTicket, natural: Size) -> LoadSignal {
        let signal = self.slot.complete(ticket, natural);
        if signal == LoadSignal::Stale {
            self.logger
                .record(&format!("ignoring stale load of {}", ticket.source()));
        }
        signal
    }

    /// Resolves with the natural size once the current image has loaded;
    /// closed if the image is replaced first.
    pub fn loaded(&mut self) -> oneshot::Receiver<Size> {
        self.slot.loaded()
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.slot.is_current(ticket)
    }

    pub fn set_layout(&mut self, container: Size, display: Size) {
        self.container = container;
        self.display = display;
    }

    /// Selecting the active class again clears the filter.
    pub fn toggle_filter(&mut self, class: &str) {
        if self.filter.as_deref() == Some(class) {
            self.filter = None;
        } else {
            self.filter = Some(class.to_string());
        }
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn reset(&mut self) {
        self.results.clear();
        self.filter = None;
        self.slot.clear();
    }

    pub fn results(&self) -> &[DetectionResult] {
        &self.results
    }

    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    pub fn palette(&self) -> &CategoryPalette {
        self.renderer.palette()
    }

    pub fn image_source(&self) -> Option<&str> {
        self.slot.source()
    }

    pub fn natural_size(&self) -> Option<Size> {
        self.slot.natural_size()
    }

    /// Categories in order of first appearance.
    pub fn categories(&self) -> Vec<&str> {
        self.type_counts().into_iter().map(|(class, _)| class).collect()
    }

    pub fn type_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for result in &self.results {
            match counts.iter().position(|(class, _)| *class == result.class_name) {
                Some(idx) => counts[idx].1 += 1,
                None => counts.push((result.class_name.as_str(), 1)),
            }
        }
        counts
    }

    /// Inputs for an overlay pass, once the image has loaded.
    pub fn frame(&self) -> Option<OverlayFrame<'_>> {
        let natural = self.slot.natural_size()?;
        Some(self.frame_for(self.container, ImageGeometry::new(natural, self.display)))
    }

    fn frame_for(&self, container: Size, image: ImageGeometry) -> OverlayFrame<'_> {
        OverlayFrame {
            container,
            image,
            results: &self.results,
            filter: self.filter.as_deref(),
        }
    }

    fn pending_reason(&self) -> SkipReason {
        if self.slot.is_loading() {
            SkipReason::ImagePending
        } else {
            SkipReason::NoImage
        }
    }

    /// Paints onto a surface that lays the image out itself: the image is
    /// assumed shrunk to fit `container` and centered, never enlarged.
    pub fn render_in<S>(&self, surface: &mut S, container: Size) -> RenderOutcome
    where
        S: DrawSurface + ?Sized,
    {
        let Some(natural) = self.slot.natural_size() else {
            return RenderOutcome::Skipped(self.pending_reason());
        };
        let display = fit_within(natural, container.width, container.height);
        let frame = self.frame_for(container, ImageGeometry::new(natural, display));
        self.renderer.render(surface, &frame)
    }

    /// Repaints `surface`. A detached surface or an image that has not
    /// loaded yet is a silent skip; in the latter case the render is owed
    /// and reported by the next `image_loaded` signal.
    pub fn render<S>(&mut self, surface: Option<&mut S>) -> RenderOutcome
    where
        S: DrawSurface + ?Sized,
    {
        let Some(surface) = surface else {
            return RenderOutcome::Skipped(SkipReason::SurfaceDetached);
        };
        if self.slot.request_render().is_none() {
            return RenderOutcome::Skipped(self.pending_reason());
        }
        match self.frame() {
            Some(frame) => self.renderer.render(surface, &frame),
            None => RenderOutcome::Skipped(SkipReason::ImagePending),
        }
    }

    pub fn export(&self, at: DateTime<Utc>) -> DetectionExport {
        DetectionExport::new(&self.results, at)
    }
}

impl Default for ResultsView {
    fn default() -> Self {
        Self::new(CategoryPalette::default())
    }
}
