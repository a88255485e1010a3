use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Upload ceiling applied when no explicit limit is configured (10 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please upload an image file (JPEG, PNG, etc.)")]
    NotAnImage,
    #[error("File size exceeds {}MB limit", .limit / (1024 * 1024))]
    TooLarge { size: u64, limit: u64 },
    #[error("unable to read image dimensions: {0}")]
    Unreadable(String),
}

/// A user-submitted image awaiting detection.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Accepts `image/*` uploads (or sniffable image bytes when no type was
    /// declared) no larger than `max_bytes`.
    pub fn validate(&self, max_bytes: u64) -> Result<(), UploadError> {
        let is_image = match self.content_type.as_deref() {
            Some(declared) => declared.trim().to_ascii_lowercase().starts_with("image/"),
            None => image::guess_format(&self.bytes).is_ok(),
        };
        if !is_image {
            return Err(UploadError::NotAnImage);
        }
        if self.size() > max_bytes {
            return Err(UploadError::TooLarge {
                size: self.size(),
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

/// Natural `(width, height)` of an encoded image, read from its header.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), UploadError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| UploadError::Unreadable(err.to_string()))?
        .into_dimensions()
        .map_err(|err| UploadError::Unreadable(err.to_string()))
}

/// MIME type implied by a file extension, e.g. `image/png` for `beach.png`.
pub fn content_type_for_path(path: &Path) -> Option<String> {
    ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        RgbaImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn declared_image_type_is_accepted() {
        let upload = ImageUpload::new("beach.jpg", Some("image/jpeg".into()), vec![0; 16]);
        assert!(upload.validate(DEFAULT_MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn non_image_type_is_rejected() {
        let upload = ImageUpload::new("notes.txt", Some("text/plain".into()), b"hi".to_vec());
        assert_eq!(
            upload.validate(DEFAULT_MAX_UPLOAD_BYTES),
            Err(UploadError::NotAnImage)
        );
    }

    #[test]
    fn undeclared_type_falls_back_to_sniffing() {
        let upload = ImageUpload::new("shot", None, png_bytes(2, 2));
        assert!(upload.validate(DEFAULT_MAX_UPLOAD_BYTES).is_ok());

        let upload = ImageUpload::new("blob", None, b"not an image".to_vec());
        assert_eq!(
            upload.validate(DEFAULT_MAX_UPLOAD_BYTES),
            Err(UploadError::NotAnImage)
        );
    }

    #[test]
    fn oversized_upload_is_rejected_with_limit_message() {
        let upload = ImageUpload::new("big.png", Some("image/png".into()), vec![0; 2048]);
        let err = upload.validate(1024).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 2048, .. }));

        let err = UploadError::TooLarge {
            size: DEFAULT_MAX_UPLOAD_BYTES + 1,
            limit: DEFAULT_MAX_UPLOAD_BYTES,
        };
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(
            content_type_for_path(Path::new("shots/beach.PNG")).as_deref(),
            Some("image/png")
        );
        assert_eq!(
            content_type_for_path(Path::new("a.jpg")).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(content_type_for_path(Path::new("notes.txt")), None);
    }

    #[test]
    fn probe_reads_header_dimensions() {
        assert_eq!(probe_dimensions(&png_bytes(5, 3)).unwrap(), (5, 3));
        assert!(probe_dimensions(b"garbage").is_err());
    }
}
