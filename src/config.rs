use crate::error::AppError;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Environment variable that overrides the settings file location.
pub const CONFIG_PATH_ENV: &str = "PEOPLECAM_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "peoplecam";
const ENV_PREFIX: &str = "PEOPLECAM";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub overlay: OverlaySettings,
    pub storage: StorageSettings,
    pub ui: UiSettings,
    pub permissions: PermissionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

/// Which float of a location quadruple holds which edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxLayout {
    /// `[top, left, bottom, right]`, the SSD MobileNet output layout.
    #[default]
    TopLeftBottomRight,
    /// `[left, top, right, bottom]`
    LeftTopRightBottom,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub min_confidence: f32,
    pub target_label: String,
    pub box_layout: BoxLayout,
    pub onnx: OnnxSettings,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("assets/ssd_mobilenet_v1.onnx"),
            labels_path: PathBuf::from("assets/labels.txt"),
            input_width: 300,
            input_height: 300,
            min_confidence: 0.5,
            target_label: "person".to_string(),
            box_layout: BoxLayout::default(),
            onnx: OnnxSettings::default(),
        }
    }
}

/// Tensor names of an SSD-style detection graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnnxSettings {
    pub input_name: String,
    pub boxes_output: String,
    pub classes_output: String,
    pub scores_output: String,
}

impl Default for OnnxSettings {
    fn default() -> Self {
        Self {
            input_name: "normalized_input_image_tensor".to_string(),
            boxes_output: "TFLite_Detection_PostProcess".to_string(),
            classes_output: "TFLite_Detection_PostProcess:1".to_string(),
            scores_output: "TFLite_Detection_PostProcess:2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// RGBA stroke color.
    pub color: [u8; 4],
    pub stroke_width: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            color: [255, 0, 0, 255],
            stroke_width: 5.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Shared media root; photos go to `<media_root>/<app_name>`.
    pub media_root: Option<PathBuf>,
    pub app_name: String,
    /// App-private directory used when the media directory is unusable.
    pub fallback_dir: PathBuf,
    pub capture_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            media_root: std::env::var_os("HOME").map(|home| PathBuf::from(home).join("Pictures")),
            app_name: "PeopleCam".to_string(),
            fallback_dir: PathBuf::from(".peoplecam"),
            capture_timeout_ms: 2_000,
        }
    }
}

impl StorageSettings {
    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub window_width: f32,
    pub window_height: f32,
    pub toast_duration_ms: u64,
    /// How long the permission-denied message stays up before the window closes.
    pub denial_close_delay_ms: u64,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            window_width: 1280.0,
            window_height: 720.0,
            toast_duration_ms: 2_000,
            denial_close_delay_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionPolicy {
    #[default]
    Granted,
    Denied,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PermissionSettings {
    pub camera: PermissionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> Result<Level, AppError> {
        Level::from_str(&self.level)
            .map_err(|_| AppError::InvalidSettings(format!("unknown log level '{}'", self.level)))
    }
}

impl Settings {
    /// Loads defaults, then the optional settings file, then `PEOPLECAM__*` variables.
    pub fn load() -> Result<Self, AppError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, AppError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |msg: &str| Err(AppError::InvalidSettings(msg.to_string()));

        if self.camera.width == 0 || self.camera.height == 0 {
            return invalid("camera resolution must be non-zero");
        }
        if self.camera.fps == 0 {
            return invalid("camera fps must be greater than 0");
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return invalid("model input size must be non-zero");
        }
        if !(0.0..=1.0).contains(&self.detector.min_confidence) {
            return invalid("min_confidence must be between 0.0 and 1.0");
        }
        if self.detector.target_label.trim().is_empty() {
            return invalid("target_label must not be empty");
        }
        if self.overlay.stroke_width <= 0.0 {
            return invalid("stroke_width must be greater than 0");
        }
        if self.storage.app_name.trim().is_empty() {
            return invalid("app_name must not be empty");
        }
        self.logging.level()?;
        Ok(())
    }
}
