pub mod analyzer;
pub mod converter;
pub mod detection;
pub mod metrics;
pub mod overlay;

pub use analyzer::{Analyzer, DetectionAnalyzer};
pub use converter::{ConversionMode, FrameConverter};
pub use metrics::{AnalysisStats, FrameMetrics};
