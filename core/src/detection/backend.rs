use crate::detection::{DetectionResult, ImageUpload};
use crate::prelude::{BackendConfig, DetectError, DetectResult, DetectionBackend};
use crate::telemetry::log::LogManager;

/// Stand-in detector that answers every upload with the same four boxes.
pub struct MockDetector {
    results: Vec<DetectionResult>,
    config: Option<BackendConfig>,
    logger: LogManager,
}

impl MockDetector {
    pub fn new() -> Self {
        Self::with_results(Self::default_results())
    }

    pub fn with_results(results: Vec<DetectionResult>) -> Self {
        Self {
            results,
            config: None,
            logger: LogManager::new(),
        }
    }

    pub fn default_results() -> Vec<DetectionResult> {
        vec![
            DetectionResult::new(50.0, 100.0, 150.0, 100.0, "bottle", 0.92),
            DetectionResult::new(250.0, 200.0, 120.0, 80.0, "fishing_net", 0.85),
            DetectionResult::new(400.0, 150.0, 100.0, 100.0, "microplastic", 0.78),
            DetectionResult::new(150.0, 300.0, 80.0, 60.0, "general", 0.88),
        ]
    }
}

impl Default for MockDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionBackend for MockDetector {
    fn initialize(&mut self, config: &BackendConfig) -> DetectResult<()> {
        self.logger.record("MockDetector initialized");
        self.config = Some(config.clone());
        Ok(())
    }

    fn detect(&mut self, upload: &ImageUpload) -> DetectResult<Vec<DetectionResult>> {
        let config = self.config.as_ref().ok_or(DetectError::NotInitialized)?;
        upload.validate(config.max_upload_bytes)?;

        self.logger.record(&format!("Processing file: {}", upload.name));
        let results = self
            .results
            .iter()
            .filter(|result| result.confidence >= config.min_confidence)
            .cloned()
            .collect::<Vec<_>>();
        self.logger.record(&format!(
            "Detection complete with {} results",
            results.len()
        ));
        Ok(results)
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}
