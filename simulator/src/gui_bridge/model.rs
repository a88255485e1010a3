use crate::workflow::runner::DetectionRun;
use ecobotcore::detection::{DetectionResult, DetectionSummary};
use serde::{Deserialize, Serialize};

/// Snapshot served to the visualizer on `/payload`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VisualizationModel {
    /// Bumped on every detection or reset so clients can spot a new image.
    pub revision: u64,
    pub image_name: Option<String>,
    pub image_width: u32,
    pub image_height: u32,
    pub detections: Vec<DetectionResult>,
    pub summary: DetectionSummary,
    pub status: String,
}

impl VisualizationModel {
    pub fn from_run(revision: u64, run: &DetectionRun) -> Self {
        Self {
            revision,
            image_name: Some(run.image_name.clone()),
            image_width: run.natural_size.0,
            image_height: run.natural_size.1,
            detections: run.results.clone(),
            summary: DetectionSummary::from_results(&run.results),
            status: format!("Detection complete! Found {} plastic items", run.results.len()),
        }
    }

    pub fn cleared(revision: u64) -> Self {
        Self {
            revision,
            status: "Ready for a new detection".into(),
            ..Default::default()
        }
    }
}
