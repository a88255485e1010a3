//! Core of the EcoBot ocean-plastic detector demo.
//!
//! Holds the detection data model, the mock detection backend, upload
//! checks, the JSON export record, and the overlay pipeline that maps
//! natural-space bounding boxes onto a letterboxed display and paints them
//! onto any [`overlay::DrawSurface`].

pub mod detection;
pub mod overlay;
pub mod prelude;
pub mod telemetry;
pub mod view;

pub use detection::{DetectionExport, DetectionResult, MockDetector};
pub use overlay::{CategoryPalette, OverlayRenderer, RenderOutcome};
pub use prelude::{DetectError, DetectionBackend, OverlayError};
pub use view::ResultsView;
