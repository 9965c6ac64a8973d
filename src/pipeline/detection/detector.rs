//! Wraps an opaque detection model: resize, infer, decode.
use super::labels::LabelMap;
use super::model::{InferenceModel, ModelOutput, load_model};
use crate::common::PixelRect;
use crate::config::{BoxLayout, DetectorSettings};
use crate::error::AppError;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::borrow::Cow;
use tracing::{info, trace};

/// A box expressed as fractions of the model input's width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl NormalizedBox {
    /// Reads one location quadruple, clamping each edge into `[0, 1]`.
    pub fn from_layout(values: [f32; 4], layout: BoxLayout) -> Self {
        let [a, b, c, d] = values.map(|v| v.clamp(0.0, 1.0));
        match layout {
            BoxLayout::TopLeftBottomRight => Self {
                top: a,
                left: b,
                bottom: c,
                right: d,
            },
            BoxLayout::LeftTopRightBottom => Self {
                left: a,
                top: b,
                right: c,
                bottom: d,
            },
        }
    }

    /// Scales the box onto an image of the given size.
    pub fn to_image_rect(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f32, height as f32);
        PixelRect::new(self.left * w, self.top * h, self.right * w, self.bottom * h)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: NormalizedBox,
}

/// Which detections are worth drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    pub min_confidence: f32,
    pub label: String,
}

impl DetectionFilter {
    pub fn new(min_confidence: f32, label: impl Into<String>) -> Self {
        Self {
            min_confidence,
            label: label.into(),
        }
    }

    pub fn from_settings(settings: &DetectorSettings) -> Self {
        Self::new(settings.min_confidence, settings.target_label.clone())
    }

    /// Strictly above the threshold and an exact label match.
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.confidence > self.min_confidence && detection.label == self.label
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self::new(0.5, "person")
    }
}

pub struct Detector {
    model: Box<dyn InferenceModel>,
    labels: LabelMap,
    layout: BoxLayout,
}

impl Detector {
    pub fn new(model: Box<dyn InferenceModel>, labels: LabelMap, layout: BoxLayout) -> Self {
        Self {
            model,
            labels,
            layout,
        }
    }

    /// Loads the label list and the model. Either failing is fatal to detection.
    pub fn load(settings: &DetectorSettings) -> Result<Self, AppError> {
        let labels = LabelMap::from_file(&settings.labels_path)?;
        let model = load_model(settings)?;
        let (width, height) = model.input_size();
        info!(
            "Detector ready: model '{}' ({}x{} input), {} labels",
            model.name(),
            width,
            height,
            labels.len()
        );
        Ok(Self::new(model, labels, settings.box_layout))
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.model.input_size()
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    /// Runs the model over `bitmap`, returning every decoded detection unfiltered.
    pub fn detect(&mut self, bitmap: &RgbImage) -> Result<Vec<Detection>, AppError> {
        let (width, height) = self.model.input_size();
        let input = if bitmap.dimensions() == (width, height) {
            Cow::Borrowed(bitmap)
        } else {
            Cow::Owned(imageops::resize(bitmap, width, height, FilterType::Triangle))
        };
        let output = self.model.predict(&input)?;
        self.decode(&output)
    }

    pub fn decode(&self, output: &ModelOutput) -> Result<Vec<Detection>, AppError> {
        let count = output.len();
        if output.classes.len() < count || output.locations.len() < count * 4 {
            return Err(AppError::Inference(format!(
                "model returned {} scores but {} classes and {} location values",
                count,
                output.classes.len(),
                output.locations.len()
            )));
        }

        let mut detections = Vec::with_capacity(count);
        for (index, &score) in output.scores.iter().enumerate() {
            let class = output.classes[index];
            let Some(label) = self.labels.resolve(class) else {
                trace!("Skipping detection {} with unknown class {}", index, class);
                continue;
            };
            let offset = index * 4;
            let quad = [
                output.locations[offset],
                output.locations[offset + 1],
                output.locations[offset + 2],
                output.locations[offset + 3],
            ];
            detections.push(Detection {
                label: label.to_string(),
                confidence: score,
                bbox: NormalizedBox::from_layout(quad, self.layout),
            });
        }
        Ok(detections)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned outputs and records the input sizes it was given.
    pub(crate) struct ScriptedModel {
        input_size: (u32, u32),
        outputs: VecDeque<Result<ModelOutput, AppError>>,
        pub(crate) seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(outputs: Vec<Result<ModelOutput, AppError>>) -> Self {
            Self {
                input_size: (300, 300),
                outputs: outputs.into(),
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl InferenceModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn input_size(&self) -> (u32, u32) {
            self.input_size
        }

        fn predict(&mut self, input: &RgbImage) -> Result<ModelOutput, AppError> {
            self.seen.lock().unwrap().push(input.dimensions());
            self.outputs
                .pop_front()
                .unwrap_or_else(|| Ok(ModelOutput::default()))
        }
    }

    pub(crate) fn coco_labels() -> LabelMap {
        LabelMap::parse("person\nbicycle\ncar")
    }

    /// Builds model output from `(class, score, [top, left, bottom, right])` rows.
    pub(crate) fn output(rows: &[(f32, f32, [f32; 4])]) -> ModelOutput {
        let mut out = ModelOutput::default();
        for (class, score, quad) in rows {
            out.classes.push(*class);
            out.scores.push(*score);
            out.locations.extend_from_slice(quad);
        }
        out
    }

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: NormalizedBox::default(),
        }
    }

    #[test]
    fn input_is_resized_to_model_resolution() {
        let model = ScriptedModel::new(vec![]);
        let seen = model.seen.clone();
        let mut detector =
            Detector::new(Box::new(model), coco_labels(), BoxLayout::TopLeftBottomRight);
        detector.detect(&RgbImage::new(640, 480)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(300, 300)]);
    }

    #[test]
    fn decodes_top_left_bottom_right_rows() {
        let detector = Detector::new(
            Box::new(ScriptedModel::new(vec![])),
            coco_labels(),
            BoxLayout::TopLeftBottomRight,
        );
        let detections = detector
            .decode(&output(&[(0.0, 0.9, [0.1, 0.2, 0.6, 0.8])]))
            .unwrap();
        assert_eq!(detections.len(), 1);
        let bbox = detections[0].bbox;
        assert_eq!((bbox.left, bbox.top, bbox.right, bbox.bottom), (0.2, 0.1, 0.8, 0.6));

        let rect = bbox.to_image_rect(300, 300);
        assert!((rect.left - 60.0).abs() < 1e-3);
        assert!((rect.top - 30.0).abs() < 1e-3);
        assert!((rect.right - 240.0).abs() < 1e-3);
        assert!((rect.bottom - 180.0).abs() < 1e-3);
    }

    #[test]
    fn alternate_layout_swaps_axes() {
        let bbox = NormalizedBox::from_layout([0.1, 0.2, 0.6, 0.8], BoxLayout::LeftTopRightBottom);
        assert_eq!((bbox.left, bbox.top, bbox.right, bbox.bottom), (0.1, 0.2, 0.6, 0.8));
    }

    #[test]
    fn coordinates_are_clamped() {
        let bbox =
            NormalizedBox::from_layout([-0.2, 0.5, 1.3, 0.9], BoxLayout::TopLeftBottomRight);
        assert_eq!(bbox.top, 0.0);
        assert_eq!(bbox.bottom, 1.0);
    }

    #[test]
    fn unknown_classes_are_skipped() {
        let detector = Detector::new(
            Box::new(ScriptedModel::new(vec![])),
            coco_labels(),
            BoxLayout::TopLeftBottomRight,
        );
        let detections = detector
            .decode(&output(&[
                (7.0, 0.9, [0.0, 0.0, 1.0, 1.0]),
                (2.0, 0.8, [0.0, 0.0, 1.0, 1.0]),
            ]))
            .unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "car");
    }

    #[test]
    fn short_location_tensor_is_an_inference_error() {
        let detector = Detector::new(
            Box::new(ScriptedModel::new(vec![])),
            coco_labels(),
            BoxLayout::TopLeftBottomRight,
        );
        let malformed = ModelOutput {
            locations: vec![0.1, 0.2],
            classes: vec![0.0],
            scores: vec![0.9],
        };
        assert!(matches!(
            detector.decode(&malformed),
            Err(AppError::Inference(_))
        ));
    }

    #[test]
    fn model_errors_propagate() {
        let mut detector = Detector::new(
            Box::new(ScriptedModel::new(vec![Err(AppError::Inference(
                "tensor mismatch".to_string(),
            ))])),
            coco_labels(),
            BoxLayout::TopLeftBottomRight,
        );
        assert!(detector.detect(&RgbImage::new(300, 300)).is_err());
    }

    #[test]
    fn filter_requires_person_above_threshold() {
        let filter = DetectionFilter::default();
        assert!(filter.accepts(&detection("person", 0.51)));
        assert!(!filter.accepts(&detection("person", 0.5)));
        assert!(!filter.accepts(&detection("person", 0.2)));
        assert!(!filter.accepts(&detection("car", 0.99)));
        assert!(!filter.accepts(&detection("Person", 0.99)));
    }

    #[test]
    fn missing_labels_fail_loading() {
        let settings = DetectorSettings {
            labels_path: "/nonexistent/labels.txt".into(),
            ..DetectorSettings::default()
        };
        assert!(matches!(
            Detector::load(&settings),
            Err(AppError::Labels { .. })
        ));
    }
}
