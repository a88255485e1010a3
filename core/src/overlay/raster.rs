use crate::overlay::mapper::{DisplayRect, ImageGeometry, Size};
use crate::overlay::palette::Color;
use crate::overlay::surface::{estimate_text_width, DrawSurface};
use crate::prelude::{OverlayError, OverlayResult};
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::fs;
use std::path::Path;

const LABEL_FONT_PX: f32 = 12.0;

/// Pixel surface backed by an RGBA buffer.
///
/// Text is rasterized only when a font is attached; without one, labels are
/// measured with a fixed glyph advance and only their bands are painted.
pub struct RasterSurface {
    canvas: RgbaImage,
    font: Option<FontArc>,
    scale: PxScale,
}

impl RasterSurface {
    pub fn new() -> Self {
        Self {
            canvas: RgbaImage::new(0, 0),
            font: None,
            scale: PxScale::from(LABEL_FONT_PX),
        }
    }

    pub fn with_font(font: FontArc) -> Self {
        Self {
            font: Some(font),
            ..Self::new()
        }
    }

    pub fn load_font<P: AsRef<Path>>(path: P) -> OverlayResult<FontArc> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|err| OverlayError::Font(format!("{}: {}", path.display(), err)))?;
        FontArc::try_from_vec(bytes)
            .map_err(|err| OverlayError::Font(format!("{}: {}", path.display(), err)))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas
    }

    /// Flattens the overlay above `backdrop`, which is scaled to the display
    /// size and centered the same way the mapper assumes.
    pub fn compose_over(&self, backdrop: &DynamicImage, geometry: ImageGeometry) -> RgbaImage {
        let (width, height) = self.canvas.dimensions();
        let mut base = RgbaImage::new(width, height);

        let display_w = geometry.display.width.round() as u32;
        let display_h = geometry.display.height.round() as u32;
        if display_w > 0 && display_h > 0 {
            let scaled = imageops::resize(
                &backdrop.to_rgba8(),
                display_w,
                display_h,
                FilterType::Triangle,
            );
            let offset_x = ((width as f32 - geometry.display.width) / 2.0).round() as i64;
            let offset_y = ((height as f32 - geometry.display.height) / 2.0).round() as i64;
            imageops::overlay(&mut base, &scaled, offset_x, offset_y);
        }

        imageops::overlay(&mut base, &self.canvas, 0, 0);
        base
    }

    fn to_rect(rect: DisplayRect) -> Option<Rect> {
        let width = rect.width.round();
        let height = rect.height.round();
        if width < 1.0 || height < 1.0 {
            return None;
        }
        Some(
            Rect::at(rect.x.round() as i32, rect.y.round() as i32)
                .of_size(width as u32, height as u32),
        )
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}

fn pixel(color: Color) -> Rgba<u8> {
    Rgba(color.to_array())
}

impl DrawSurface for RasterSurface {
    fn resize(&mut self, size: Size) {
        let width = size.width.round().max(0.0) as u32;
        let height = size.height.round().max(0.0) as u32;
        self.canvas = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        for px in self.canvas.pixels_mut() {
            *px = pixel(Color::TRANSPARENT);
        }
    }

    fn stroke_rect(&mut self, rect: DisplayRect, color: Color, line_width: f32) {
        // Nested one-pixel outlines centered on the rectangle edge.
        let lines = line_width.round().max(1.0) as i32;
        for i in 0..lines {
            let inset = (i - lines / 2) as f32;
            let outline = DisplayRect::new(
                rect.x + inset,
                rect.y + inset,
                rect.width - 2.0 * inset,
                rect.height - 2.0 * inset,
            );
            if let Some(r) = Self::to_rect(outline) {
                draw_hollow_rect_mut(&mut self.canvas, r, pixel(color));
            }
        }
    }

    fn fill_rect(&mut self, rect: DisplayRect, color: Color) {
        if let Some(r) = Self::to_rect(rect) {
            draw_filled_rect_mut(&mut self.canvas, r, pixel(color));
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, color: Color) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let ascent = font.as_scaled(self.scale).ascent();
        draw_text_mut(
            &mut self.canvas,
            pixel(color),
            x.round() as i32,
            (baseline - ascent).round() as i32,
            self.scale,
            font,
            text,
        );
    }

    fn measure_text(&self, text: &str) -> f32 {
        match self.font.as_ref() {
            Some(font) => text_size(self.scale, font, text).0 as f32,
            None => estimate_text_width(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectionResult;
    use crate::overlay::renderer::{OverlayFrame, OverlayRenderer};

    const RED: Color = Color::rgb(0xFF, 0x00, 0x00);

    #[test]
    fn two_pixel_stroke_straddles_the_edge() {
        let mut surface = RasterSurface::new();
        surface.resize(Size::new(100.0, 100.0));
        surface.stroke_rect(DisplayRect::new(10.0, 10.0, 20.0, 20.0), RED, 2.0);

        let canvas = surface.image();
        assert_eq!(canvas.dimensions(), (100, 100));
        assert_eq!(*canvas.get_pixel(9, 9), pixel(RED));
        assert_eq!(*canvas.get_pixel(10, 10), pixel(RED));
        assert_eq!(*canvas.get_pixel(20, 20), pixel(Color::TRANSPARENT));
    }

    #[test]
    fn degenerate_rects_are_skipped() {
        let mut surface = RasterSurface::new();
        surface.resize(Size::new(10.0, 10.0));
        surface.fill_rect(DisplayRect::new(2.0, 2.0, 0.2, 5.0), RED);
        assert!(surface.image().pixels().all(|px| px.0[3] == 0));
    }

    #[test]
    fn clear_wipes_previous_content() {
        let mut surface = RasterSurface::new();
        surface.resize(Size::new(10.0, 10.0));
        surface.fill_rect(DisplayRect::new(0.0, 0.0, 10.0, 10.0), RED);
        surface.clear();
        assert!(surface.image().pixels().all(|px| *px == pixel(Color::TRANSPARENT)));
    }

    #[test]
    fn renderer_paints_box_and_label_band() {
        let results = vec![DetectionResult::new(50.0, 100.0, 150.0, 100.0, "bottle", 0.92)];
        let frame = OverlayFrame {
            container: Size::new(250.0, 200.0),
            image: ImageGeometry::new(Size::new(500.0, 400.0), Size::new(250.0, 200.0)),
            results: &results,
            filter: None,
        };
        let mut surface = RasterSurface::new();
        OverlayRenderer::default().render(&mut surface, &frame);

        let bottle = pixel(Color::rgb(0xFF, 0x6B, 0x6B));
        let canvas = surface.image();
        assert_eq!(*canvas.get_pixel(25, 75), bottle);
        assert_eq!(*canvas.get_pixel(30, 35), bottle);
        assert_eq!(*canvas.get_pixel(60, 75), pixel(Color::TRANSPARENT));
    }

    #[test]
    fn compose_centers_backdrop_under_overlay() {
        let mut surface = RasterSurface::new();
        surface.resize(Size::new(100.0, 50.0));
        surface.fill_rect(DisplayRect::new(0.0, 0.0, 5.0, 5.0), RED);

        let backdrop =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255])));
        let geometry = ImageGeometry::new(Size::new(50.0, 50.0), Size::new(50.0, 50.0));
        let composed = surface.compose_over(&backdrop, geometry);

        assert_eq!(*composed.get_pixel(2, 2), pixel(RED));
        assert_eq!(composed.get_pixel(10, 25).0[3], 0);
        assert_eq!(*composed.get_pixel(50, 25), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn missing_font_file_is_reported() {
        let err = RasterSurface::load_font("/nonexistent/font.ttf").unwrap_err();
        assert!(matches!(err, OverlayError::Font(_)));
    }
}
