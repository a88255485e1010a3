use crate::detection::DetectionResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-category tally attached to an export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub total_items: usize,
    pub type_breakdown: BTreeMap<String, usize>,
}

impl DetectionSummary {
    pub fn from_results(results: &[DetectionResult]) -> Self {
        let mut type_breakdown = BTreeMap::new();
        for result in results {
            *type_breakdown.entry(result.class_name.clone()).or_insert(0) += 1;
        }
        Self {
            total_items: results.len(),
            type_breakdown,
        }
    }
}

/// Downloadable record of one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionExport {
    pub timestamp: String,
    pub detections: Vec<DetectionResult>,
    pub summary: DetectionSummary,
}

impl DetectionExport {
    pub fn new(results: &[DetectionResult], at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            detections: results.to_vec(),
            summary: DetectionSummary::from_results(results),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// File name offered for a download, keyed by epoch milliseconds.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("ecobot-detection-{}.json", at.timestamp_millis())
}
