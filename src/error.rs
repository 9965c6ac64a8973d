use std::path::PathBuf;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Camera permission was not granted.")]
    PermissionDenied,
    #[error("Camera provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Use case binding failed: {0}")]
    Binding(String),
    #[error("Frame conversion failed: {0}")]
    Conversion(String),
    #[error("Failed to load model: {0}")]
    Model(String),
    #[error("Failed to load labels from {path}: {source}")]
    Labels {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Photo capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("UI error: {0}")]
    Ui(String),
}

// Still capture error type
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("The image capture use case is not bound.")]
    NotBound,
    #[error("No frame arrived within {0:?}.")]
    Timeout(std::time::Duration),
    #[error("The camera closed before delivering a frame.")]
    CameraClosed,
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("The writer task did not complete: {0}")]
    Join(String),
}
