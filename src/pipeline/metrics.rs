use chrono::{DateTime, Utc};
use std::time::Duration;

/// Timings collected while analyzing one frame
#[derive(Debug, Clone, Default)]
pub struct FrameMetrics {
    conversion: Option<Duration>,
    inference: Option<Duration>,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_conversion(&mut self, duration: Duration) {
        self.conversion = Some(duration);
    }

    pub fn record_inference(&mut self, duration: Duration) {
        self.inference = Some(duration);
    }

    pub fn conversion(&self) -> Option<Duration> {
        self.conversion
    }

    pub fn inference(&self) -> Option<Duration> {
        self.inference
    }

    pub fn total(&self) -> Duration {
        self.conversion.unwrap_or_default() + self.inference.unwrap_or_default()
    }
}

// Weight of the newest sample in the moving averages.
const EWMA_ALPHA: f32 = 0.2;

/// Running analysis totals shown by the UI.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStats {
    pub frames_analyzed: u64,
    pub frames_failed: u64,
    pub persons_last_frame: usize,
    pub avg_conversion_ms: f32,
    pub avg_inference_ms: f32,
    pub last_frame_at: Option<DateTime<Utc>>,
}

impl AnalysisStats {
    pub fn record_frame(&mut self, metrics: &FrameMetrics, persons: usize, at: DateTime<Utc>) {
        let first = self.frames_analyzed == 0;
        self.frames_analyzed += 1;
        self.persons_last_frame = persons;
        self.last_frame_at = Some(at);
        if let Some(conversion) = metrics.conversion() {
            self.avg_conversion_ms = ewma(self.avg_conversion_ms, millis(conversion), first);
        }
        if let Some(inference) = metrics.inference() {
            self.avg_inference_ms = ewma(self.avg_inference_ms, millis(inference), first);
        }
    }

    pub fn record_failure(&mut self) {
        self.frames_failed += 1;
    }
}

fn millis(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1_000.0
}

fn ewma(current: f32, sample: f32, first: bool) -> f32 {
    if first {
        sample
    } else {
        current + EWMA_ALPHA * (sample - current)
    }
}
