//! Maps natural-space detection boxes onto a letterboxed display and draws
//! them as labeled rectangles.

pub mod image_slot;
pub mod mapper;
pub mod palette;
pub mod raster;
pub mod renderer;
pub mod surface;

pub use image_slot::{ImageSlot, LoadSignal, LoadTicket};
pub use mapper::{fit_within, CoordinateMapper, DisplayRect, ImageGeometry, Size};
pub use palette::{CategoryPalette, Color};
pub use raster::RasterSurface;
pub use renderer::{OverlayFrame, OverlayRenderer, RenderOutcome, SkipReason};
pub use surface::{estimate_text_width, DrawCommand, DrawSurface, RecordingSurface};
