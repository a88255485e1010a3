use crate::detection::DetectionResult;
use crate::overlay::mapper::{CoordinateMapper, DisplayRect, ImageGeometry, Size};
use crate::overlay::palette::CategoryPalette;
use crate::overlay::surface::DrawSurface;
use log::debug;

const STROKE_WIDTH: f32 = 2.0;
const LABEL_HEIGHT: f32 = 20.0;
const LABEL_PADDING: f32 = 8.0;
const LABEL_INSET: f32 = 4.0;
const LABEL_BASELINE_RISE: f32 = 7.0;

/// Immutable inputs for one overlay pass.
#[derive(Debug, Clone, Copy)]
pub struct OverlayFrame<'a> {
    pub container: Size,
    pub image: ImageGeometry,
    pub results: &'a [DetectionResult],
    pub filter: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SurfaceDetached,
    NoImage,
    ImagePending,
    ZeroNaturalSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Drawn { boxes: usize },
    Skipped(SkipReason),
}

impl RenderOutcome {
    pub fn boxes(&self) -> usize {
        match self {
            RenderOutcome::Drawn { boxes } => *boxes,
            RenderOutcome::Skipped(_) => 0,
        }
    }
}

/// Draws labeled detection boxes over a letterboxed image.
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    palette: CategoryPalette,
}

impl OverlayRenderer {
    pub fn new(palette: CategoryPalette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &CategoryPalette {
        &self.palette
    }

    /// Repaints `surface` from scratch. A zero natural image side makes the
    /// pass a no-op that issues no drawing calls at all.
    pub fn render<S>(&self, surface: &mut S, frame: &OverlayFrame<'_>) -> RenderOutcome
    where
        S: DrawSurface + ?Sized,
    {
        let Some(mapper) = CoordinateMapper::new(frame.container, frame.image) else {
            return RenderOutcome::Skipped(SkipReason::ZeroNaturalSize);
        };

        surface.resize(frame.container);
        surface.clear();

        let mut boxes = 0;
        for result in frame.results.iter().filter(|r| r.matches(frame.filter)) {
            self.draw_box(surface, mapper.map(result), result);
            boxes += 1;
        }

        debug!(
            "overlay pass: {} of {} boxes, filter {:?}",
            boxes,
            frame.results.len(),
            frame.filter
        );
        RenderOutcome::Drawn { boxes }
    }

    fn draw_box<S>(&self, surface: &mut S, rect: DisplayRect, result: &DetectionResult)
    where
        S: DrawSurface + ?Sized,
    {
        let color = self.palette.color_for(&result.class_name);
        surface.stroke_rect(rect, color, STROKE_WIDTH);

        let label = result.label();
        let band = DisplayRect::new(
            rect.x,
            rect.y - LABEL_HEIGHT,
            surface.measure_text(&label) + LABEL_PADDING,
            LABEL_HEIGHT,
        );
        surface.fill_rect(band, color);
        surface.fill_text(
            &label,
            rect.x + LABEL_INSET,
            rect.y - LABEL_BASELINE_RISE,
            CategoryPalette::LABEL_TEXT,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::MockDetector;
    use crate::overlay::palette::Color;
    use crate::overlay::surface::{estimate_text_width, DrawCommand, RecordingSurface};

    fn half_scale() -> ImageGeometry {
        ImageGeometry::new(Size::new(500.0, 400.0), Size::new(250.0, 200.0))
    }

    fn frame<'a>(results: &'a [DetectionResult], filter: Option<&'a str>) -> OverlayFrame<'a> {
        OverlayFrame {
            container: Size::new(250.0, 200.0),
            image: half_scale(),
            results,
            filter,
        }
    }

    #[test]
    fn draws_box_band_and_label_per_result() {
        let results = vec![DetectionResult::new(50.0, 100.0, 150.0, 100.0, "bottle", 0.92)];
        let mut surface = RecordingSurface::new();
        let outcome = OverlayRenderer::default().render(&mut surface, &frame(&results, None));

        assert_eq!(outcome, RenderOutcome::Drawn { boxes: 1 });
        let bottle = Color::rgb(0xFF, 0x6B, 0x6B);
        let label = "bottle (92%)";
        assert_eq!(
            surface.commands(),
            &[
                DrawCommand::StrokeRect {
                    rect: DisplayRect::new(25.0, 50.0, 75.0, 50.0),
                    color: bottle,
                    line_width: 2.0,
                },
                DrawCommand::FillRect {
                    rect: DisplayRect::new(25.0, 30.0, estimate_text_width(label) + 8.0, 20.0),
                    color: bottle,
                },
                DrawCommand::FillText {
                    text: label.to_string(),
                    x: 29.0,
                    baseline: 43.0,
                    color: Color::BLACK,
                },
            ]
        );
    }

    #[test]
    fn repeated_passes_are_identical() {
        let results = MockDetector::default_results();
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new();

        renderer.render(&mut surface, &frame(&results, None));
        let first = surface.commands().to_vec();
        renderer.render(&mut surface, &frame(&results, None));
        assert_eq!(surface.commands(), first.as_slice());
        assert_eq!(surface.resize_count(), 2);
    }

    #[test]
    fn filter_keeps_only_matching_class() {
        let results = MockDetector::default_results();
        let mut surface = RecordingSurface::new();
        let outcome =
            OverlayRenderer::default().render(&mut surface, &frame(&results, Some("bottle")));

        assert_eq!(outcome.boxes(), 1);
        let boxes = surface.stroked_rects();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].1, Color::rgb(0xFF, 0x6B, 0x6B));
    }

    #[test]
    fn unknown_class_uses_fallback_color() {
        let results = vec![DetectionResult::new(10.0, 10.0, 20.0, 20.0, "debris", 0.4)];
        let mut surface = RecordingSurface::new();
        OverlayRenderer::default().render(&mut surface, &frame(&results, None));
        assert_eq!(surface.stroked_rects()[0].1, Color::WHITE);
    }

    #[test]
    fn zero_natural_size_issues_no_draw_calls() {
        let results = MockDetector::default_results();
        let mut surface = RecordingSurface::new();
        for natural in [Size::new(0.0, 400.0), Size::new(500.0, 0.0)] {
            let frame = OverlayFrame {
                container: Size::new(250.0, 200.0),
                image: ImageGeometry::new(natural, Size::new(250.0, 200.0)),
                results: &results,
                filter: None,
            };
            let outcome = OverlayRenderer::default().render(&mut surface, &frame);
            assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::ZeroNaturalSize));
        }
        assert_eq!(surface.resize_count(), 0);
        assert!(surface.is_blank());
    }

    #[test]
    fn empty_results_clear_previous_boxes() {
        let results = MockDetector::default_results();
        let renderer = OverlayRenderer::default();
        let mut surface = RecordingSurface::new();

        renderer.render(&mut surface, &frame(&results, None));
        assert!(!surface.is_blank());
        let outcome = renderer.render(&mut surface, &frame(&[], None));
        assert_eq!(outcome, RenderOutcome::Drawn { boxes: 0 });
        assert!(surface.is_blank());
        assert_eq!(surface.size(), Size::new(250.0, 200.0));
    }

    #[test]
    fn later_results_are_painted_last() {
        let results = vec![
            DetectionResult::new(10.0, 10.0, 20.0, 20.0, "bottle", 0.9),
            DetectionResult::new(10.0, 10.0, 20.0, 20.0, "general", 0.9),
        ];
        let mut surface = RecordingSurface::new();
        OverlayRenderer::default().render(&mut surface, &frame(&results, None));
        let colors = surface
            .stroked_rects()
            .into_iter()
            .map(|(_, color)| color)
            .collect::<Vec<_>>();
        assert_eq!(
            colors,
            vec![Color::rgb(0xFF, 0x6B, 0x6B), Color::rgb(0x11, 0x8A, 0xB2)]
        );
    }
}
