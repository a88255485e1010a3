use crate::detection::DetectionResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f32, height as f32)
    }
}

/// Axis-aligned rectangle in display (surface) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Natural resolution of an image and the size it is shown at.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageGeometry {
    pub natural: Size,
    pub display: Size,
}

impl ImageGeometry {
    pub fn new(natural: Size, display: Size) -> Self {
        Self { natural, display }
    }
}

/// Aspect-preserving fit of `natural` into `max_width` x `max_height` that
/// shrinks but never enlarges.
pub fn fit_within(natural: Size, max_width: f32, max_height: f32) -> Size {
    if natural.is_empty() {
        return Size::default();
    }
    let scale = (max_width / natural.width)
        .min(max_height / natural.height)
        .min(1.0)
        .max(0.0);
    Size::new(natural.width * scale, natural.height * scale)
}

/// Converts natural-space boxes to display space for one container layout.
///
/// The image is assumed centered in the container; the margin on each side
/// is half the slack between container and displayed image. Boxes outside
/// the image stay outside the image after mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    offset_x: f32,
    offset_y: f32,
    scale_x: f32,
    scale_y: f32,
}

impl CoordinateMapper {
    /// Returns `None` when the natural size has a zero side, since the scale
    /// factors would be undefined.
    pub fn new(container: Size, image: ImageGeometry) -> Option<Self> {
        if image.natural.width <= 0.0 || image.natural.height <= 0.0 {
            return None;
        }
        Some(Self {
            offset_x: (container.width - image.display.width) / 2.0,
            offset_y: (container.height - image.display.height) / 2.0,
            scale_x: image.display.width / image.natural.width,
            scale_y: image.display.height / image.natural.height,
        })
    }

    pub fn offset(&self) -> (f32, f32) {
        (self.offset_x, self.offset_y)
    }

    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    pub fn map(&self, result: &DetectionResult) -> DisplayRect {
        DisplayRect {
            x: result.x * self.scale_x + self.offset_x,
            y: result.y * self.scale_y + self.offset_y,
            width: result.width * self.scale_x,
            height: result.height * self.scale_y,
        }
    }
}
