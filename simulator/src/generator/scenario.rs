use ecobotcore::detection::{DetectionResult, MockDetector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of the canned detections served by the mock detector.
///
/// Without a seed the four fixed demo boxes are returned verbatim; with one,
/// their positions and confidences are perturbed reproducibly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockScenario {
    pub seed: Option<u64>,
    pub jitter_px: f32,
    pub confidence_jitter: f32,
    pub description: Option<String>,
}

pub fn build_results(scenario: &MockScenario) -> Vec<DetectionResult> {
    let base = MockDetector::default_results();
    let Some(seed) = scenario.seed else {
        return base;
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = scenario.jitter_px.abs();
    let confidence_jitter = scenario.confidence_jitter.abs();

    base.into_iter()
        .map(|mut result| {
            if jitter > 0.0 {
                result.x = (result.x + rng.gen_range(-jitter..jitter)).max(0.0);
                result.y = (result.y + rng.gen_range(-jitter..jitter)).max(0.0);
            }
            if confidence_jitter > 0.0 {
                result.confidence = (result.confidence
                    + rng.gen_range(-confidence_jitter..confidence_jitter))
                .clamp(0.0, 1.0);
            }
            result
        })
        .collect()
}

pub fn build_detector(scenario: &MockScenario) -> MockDetector {
    MockDetector::with_results(build_results(scenario))
}
