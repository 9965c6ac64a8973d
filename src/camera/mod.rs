pub mod capture_pipeline;
pub mod executor;
pub mod provider;
pub mod storage;
pub mod synthetic;
pub mod use_cases;

pub use capture_pipeline::{CapturePipeline, CapturePipelineBuilder, PipelineState};
pub use executor::{AnalysisExecutor, AnalysisSender};
pub use provider::{CameraProvider, CameraSelector, LensFacing};
pub use storage::OutputDirectory;
pub use synthetic::SyntheticCamera;
pub use use_cases::{
    ImageAnalysis, ImageCapture, Preview, PreviewFrame, PreviewReceiver, UseCaseGroup,
    preview_surface,
};
