use crate::config::{DetectorSettings, OnnxSettings};
use crate::error::AppError;
use image::RgbImage;

/// Flattened output tensors of one inference call.
///
/// The three arrays run in parallel: detection `i` owns `scores[i]`,
/// `classes[i]` and `locations[4 * i..4 * i + 4]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOutput {
    pub locations: Vec<f32>,
    pub classes: Vec<f32>,
    pub scores: Vec<f32>,
}

impl ModelOutput {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// A pre-trained detection model with a fixed input resolution.
pub trait InferenceModel: Send {
    fn name(&self) -> &str;

    /// `(width, height)` the model expects its input bitmap to have.
    fn input_size(&self) -> (u32, u32);

    fn predict(&mut self, input: &RgbImage) -> Result<ModelOutput, AppError>;
}

/// Fails unless the graph exposes every output tensor the settings name.
pub fn check_output_names(available: &[&str], tensors: &OnnxSettings) -> Result<(), AppError> {
    let missing: Vec<&str> = [
        tensors.boxes_output.as_str(),
        tensors.classes_output.as_str(),
        tensors.scores_output.as_str(),
    ]
    .into_iter()
    .filter(|name| !available.contains(name))
    .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Model(format!(
            "graph has no output named {} (available: {})",
            missing.join(", "),
            available.join(", ")
        )))
    }
}

#[cfg(feature = "onnx")]
pub fn load_model(settings: &DetectorSettings) -> Result<Box<dyn InferenceModel>, AppError> {
    Ok(Box::new(super::onnx::OnnxModel::load(settings)?))
}

#[cfg(not(feature = "onnx"))]
pub fn load_model(settings: &DetectorSettings) -> Result<Box<dyn InferenceModel>, AppError> {
    Err(AppError::Model(format!(
        "cannot load '{}': built without an inference backend, rebuild with `--features onnx`",
        settings.model_path.display()
    )))
}
