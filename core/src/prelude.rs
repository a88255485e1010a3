use crate::detection::{DetectionResult, ImageUpload, UploadError};
use serde::{Deserialize, Serialize};

/// Shared configuration handed to a detection backend on start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub max_upload_bytes: u64,
    pub min_confidence: f32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: crate::detection::DEFAULT_MAX_UPLOAD_BYTES,
            min_confidence: 0.0,
        }
    }
}

/// Errors raised while configuring or drawing the overlay.
#[derive(thiserror::Error, Debug)]
pub enum OverlayError {
    #[error("invalid color {0:?}: expected #RRGGBB")]
    InvalidColor(String),
    #[error("font could not be loaded: {0}")]
    Font(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type OverlayResult<T> = Result<T, OverlayError>;

/// Common error type for detection runs.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("rejected upload: {0}")]
    Upload(#[from] UploadError),
    #[error("backend not initialized")]
    NotInitialized,
    #[error("backend failure: {0}")]
    Backend(String),
}

impl DetectError {
    /// Generic retryable notice shown to the user when detection fails.
    pub const USER_NOTICE: &'static str =
        "Detection failed: There was a problem processing your image";

    pub fn user_message(&self) -> String {
        match self {
            DetectError::Upload(err) => err.to_string(),
            _ => Self::USER_NOTICE.to_string(),
        }
    }
}

pub type DetectResult<T> = Result<T, DetectError>;

/// Lifecycle of a detector producing bounding boxes for an uploaded image.
pub trait DetectionBackend {
    fn initialize(&mut self, config: &BackendConfig) -> DetectResult<()>;
    fn detect(&mut self, upload: &ImageUpload) -> DetectResult<Vec<DetectionResult>>;
    fn cleanup(&mut self);
}
