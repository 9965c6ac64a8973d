//! ONNX Runtime backend for SSD-style detection graphs.
use super::model::{InferenceModel, ModelOutput, check_output_names};
use crate::config::{DetectorSettings, OnnxSettings};
use crate::error::AppError;
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;

pub struct OnnxModel {
    session: Session,
    name: String,
    input_size: (u32, u32),
    tensors: OnnxSettings,
}

impl OnnxModel {
    pub fn load(settings: &DetectorSettings) -> Result<Self, AppError> {
        let session = Session::builder()
            .map_err(|e| AppError::Model(format!("failed to create session builder: {}", e)))?
            .commit_from_file(&settings.model_path)
            .map_err(|e| {
                AppError::Model(format!(
                    "failed to load '{}': {}",
                    settings.model_path.display(),
                    e
                ))
            })?;
        let available: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        check_output_names(&available, &settings.onnx)?;
        let name = settings
            .model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());
        Ok(Self {
            session,
            name,
            input_size: (settings.input_width, settings.input_height),
            tensors: settings.onnx.clone(),
        })
    }
}

impl InferenceModel for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn predict(&mut self, input: &RgbImage) -> Result<ModelOutput, AppError> {
        let (width, height) = self.input_size;
        // Quantized SSD graphs take NHWC uint8: [1, height, width, 3].
        let shape = [1usize, height as usize, width as usize, 3];
        let tensor = Tensor::from_array((shape, input.as_raw().clone().into_boxed_slice()))
            .map_err(|e| AppError::Inference(format!("failed to build input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.tensors.input_name.as_str() => tensor])
            .map_err(|e| AppError::Inference(e.to_string()))?;

        let extract = |name: &str| -> Result<Vec<f32>, AppError> {
            let (_shape, data) = outputs
                .get(name)
                .ok_or_else(|| AppError::Inference(format!("graph has no output '{}'", name)))?
                .try_extract_tensor::<f32>()
                .map_err(|e| AppError::Inference(format!("output '{}': {}", name, e)))?;
            Ok(data.to_vec())
        };

        Ok(ModelOutput {
            locations: extract(&self.tensors.boxes_output)?,
            classes: extract(&self.tensors.classes_output)?,
            scores: extract(&self.tensors.scores_output)?,
        })
    }
}
