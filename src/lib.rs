pub mod app;
pub mod camera;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;

pub use config::Settings;
pub use error::{AppError, CaptureError};
