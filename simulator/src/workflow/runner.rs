use crate::generator::scenario::build_detector;
use crate::workflow::config::SimulatorConfig;
use anyhow::Context;
use ecobotcore::detection::{probe_dimensions, DetectionResult, ImageUpload, MockDetector};
use ecobotcore::prelude::{DetectError, DetectResult, DetectionBackend};
use ecobotcore::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use std::sync::{Arc, Mutex};

/// Output of one detection request.
#[derive(Debug, Clone)]
pub struct DetectionRun {
    pub image_name: String,
    pub natural_size: (u32, u32),
    pub results: Vec<DetectionResult>,
}

/// Drives the mock detector: validates the upload, waits out the
/// artificial delay, then asks the backend for boxes.
#[derive(Clone)]
pub struct Runner {
    config: SimulatorConfig,
    detector: Arc<Mutex<MockDetector>>,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(config: SimulatorConfig) -> anyhow::Result<Self> {
        let mut detector = build_detector(&config.scenario);
        detector
            .initialize(&config.to_backend_config())
            .context("initializing mock detector")?;
        Ok(Self {
            config,
            detector: Arc::new(Mutex::new(detector)),
            metrics: Arc::new(MetricsRecorder::new()),
        })
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.config.max_upload_bytes
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn execute(&self, upload: &ImageUpload) -> DetectResult<DetectionRun> {
        let outcome = self.run(upload).await;
        match &outcome {
            Ok(run) => self.metrics.record_run(run.results.len()),
            Err(err) => {
                LogManager::scoped("runner").warn(&format!("Error in detection: {}", err));
                self.metrics.record_failure();
            }
        }
        outcome
    }

    async fn run(&self, upload: &ImageUpload) -> DetectResult<DetectionRun> {
        upload.validate(self.config.max_upload_bytes)?;
        let natural_size = probe_dimensions(&upload.bytes)?;

        tokio::time::sleep(self.config.delay()).await;

        let results = self
            .detector
            .lock()
            .map_err(|_| DetectError::Backend("detector lock poisoned".into()))?
            .detect(upload)?;

        Ok(DetectionRun {
            image_name: upload.name.clone(),
            natural_size,
            results,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Vec::new();
        RgbaImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    pub(crate) fn instant_config() -> SimulatorConfig {
        SimulatorConfig {
            delay_ms: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn runner_returns_mock_boxes_with_image_size() {
        let runner = Runner::new(instant_config()).unwrap();
        let upload = ImageUpload::new("beach.png", Some("image/png".into()), png_bytes(500, 400));
        let run = runner.execute(&upload).await.unwrap();

        assert_eq!(run.natural_size, (500, 400));
        assert_eq!(run.results.len(), 4);
        assert_eq!(runner.metrics().detection_runs, 1);
        assert_eq!(runner.metrics().detections, 4);
    }

    #[tokio::test]
    async fn runner_rejects_non_images_and_counts_failure() {
        let runner = Runner::new(instant_config()).unwrap();
        let upload = ImageUpload::new("notes.txt", Some("text/plain".into()), b"hi".to_vec());
        let err = runner.execute(&upload).await.unwrap_err();

        assert!(matches!(err, DetectError::Upload(_)));
        assert_eq!(runner.metrics().failures, 1);
    }

    #[tokio::test]
    async fn undecodable_image_is_rejected() {
        let runner = Runner::new(instant_config()).unwrap();
        let upload = ImageUpload::new("broken.png", Some("image/png".into()), vec![0; 16]);
        assert!(runner.execute(&upload).await.is_err());
    }
}
