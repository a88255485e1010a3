use serde::{Deserialize, Serialize};

/// One classified bounding box in natural image pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
}

impl DetectionResult {
    pub fn new(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        class_name: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            class_name: class_name.into(),
            confidence,
        }
    }

    /// Label drawn above the box, e.g. `bottle (92%)`.
    pub fn label(&self) -> String {
        format!(
            "{} ({}%)",
            self.class_name,
            (self.confidence * 100.0).round() as i64
        )
    }

    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.map_or(true, |class| self.class_name == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_rounds_confidence_to_percent() {
        let result = DetectionResult::new(0.0, 0.0, 1.0, 1.0, "bottle", 0.927);
        assert_eq!(result.label(), "bottle (93%)");
        let result = DetectionResult::new(0.0, 0.0, 1.0, 1.0, "general", 0.88);
        assert_eq!(result.label(), "general (88%)");
    }

    #[test]
    fn class_is_renamed_on_the_wire() {
        let result = DetectionResult::new(50.0, 100.0, 150.0, 100.0, "bottle", 0.92);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["class"], "bottle");
        assert!(json.get("class_name").is_none());

        let parsed: DetectionResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn no_filter_matches_everything() {
        let result = DetectionResult::new(0.0, 0.0, 1.0, 1.0, "debris", 0.5);
        assert!(result.matches(None));
        assert!(result.matches(Some("debris")));
        assert!(!result.matches(Some("bottle")));
    }
}
