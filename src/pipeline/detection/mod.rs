pub mod detector;
pub mod labels;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use detector::{Detection, DetectionFilter, Detector, NormalizedBox};
pub use labels::LabelMap;
pub use model::{InferenceModel, ModelOutput, load_model};
