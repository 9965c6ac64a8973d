//! Per-frame analysis: convert, detect, filter, publish overlay contents.
use crate::common::AnalysisFrame;
use crate::pipeline::converter::FrameConverter;
use crate::pipeline::detection::{Detection, DetectionFilter, Detector};
use crate::pipeline::metrics::{AnalysisStats, FrameMetrics};
use crate::pipeline::overlay::{Annotation, BoxStyle, OverlayBatch, OverlayPublisher};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

/// Receives analysis frames on the analysis executor, one at a time.
pub trait Analyzer: Send {
    fn analyze(&mut self, frame: AnalysisFrame);
}

pub struct DetectionAnalyzer {
    converter: FrameConverter,
    detector: Detector,
    filter: DetectionFilter,
    style: BoxStyle,
    mirrored: bool,
    publisher: OverlayPublisher,
    stats: Arc<Mutex<AnalysisStats>>,
}

impl DetectionAnalyzer {
    pub fn new(
        converter: FrameConverter,
        detector: Detector,
        filter: DetectionFilter,
        style: BoxStyle,
        publisher: OverlayPublisher,
    ) -> Self {
        Self {
            converter,
            detector,
            filter,
            style,
            mirrored: false,
            publisher,
            stats: Arc::new(Mutex::new(AnalysisStats::default())),
        }
    }

    /// Marks published batches as coming from a front-facing camera.
    pub fn with_mirroring(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn stats(&self) -> Arc<Mutex<AnalysisStats>> {
        self.stats.clone()
    }

    /// Keeps the detections the filter accepts, scaled onto a `width x height` bitmap.
    pub fn annotate(&self, detections: &[Detection], width: u32, height: u32) -> Vec<Annotation> {
        detections
            .iter()
            .filter(|detection| self.filter.accepts(detection))
            .map(|detection| Annotation {
                rect: detection.bbox.to_image_rect(width, height),
                style: self.style,
            })
            .collect()
    }

    fn record_failure(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_failure();
        }
    }
}

impl Analyzer for DetectionAnalyzer {
    fn analyze(&mut self, frame: AnalysisFrame) {
        let frame_id = frame.image().id();
        let mut metrics = FrameMetrics::new();

        let started = Instant::now();
        let bitmap = match self.converter.convert(frame.image()) {
            Ok(bitmap) => bitmap,
            Err(e) => {
                warn!("Dropping frame {}: {}", frame_id, e);
                self.record_failure();
                return;
            }
        };
        metrics.record_conversion(started.elapsed());

        let started = Instant::now();
        let detections = match self.detector.detect(&bitmap) {
            Ok(detections) => {
                metrics.record_inference(started.elapsed());
                Some(detections)
            }
            Err(e) => {
                warn!("Skipping detections for frame {}: {}", frame_id, e);
                None
            }
        };

        let detections = detections.as_deref().unwrap_or_default();
        let annotations = self.annotate(detections, bitmap.width(), bitmap.height());
        debug!(
            "Frame {}: {} raw detections, {} kept in {:?}",
            frame_id,
            detections.len(),
            annotations.len(),
            metrics.total()
        );
        // A failed frame counts once, as a failure.
        if metrics.inference().is_some() {
            if let Ok(mut stats) = self.stats.lock() {
                stats.record_frame(&metrics, annotations.len(), Utc::now());
            }
        } else {
            self.record_failure();
        }

        self.publisher.publish(OverlayBatch {
            frame_id: Some(frame_id),
            image_width: bitmap.width(),
            image_height: bitmap.height(),
            mirrored: self.mirrored,
            annotations,
        });
        frame.close();
    }
}
