use serde::Serialize;
use std::sync::Mutex;

/// Counters for detection runs and overlay passes.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub detection_runs: usize,
    pub detections: usize,
    pub failures: usize,
}

#[derive(Default)]
struct Metrics {
    detection_runs: usize,
    detections: usize,
    failures: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_run(&self, detections: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.detection_runs += 1;
            metrics.detections += detections;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failures += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                detection_runs: metrics.detection_runs,
                detections: metrics.detections,
                failures: metrics.failures,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
