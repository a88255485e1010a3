pub mod backend;
pub mod export;
pub mod result;
pub mod upload;

pub use backend::MockDetector;
pub use export::{export_file_name, DetectionExport, DetectionSummary};
pub use result::DetectionResult;
pub use upload::{
    content_type_for_path, probe_dimensions, ImageUpload, UploadError, DEFAULT_MAX_UPLOAD_BYTES,
};
