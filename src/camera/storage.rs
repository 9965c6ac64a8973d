use crate::config::StorageSettings;
use crate::error::CaptureError;
use chrono::{DateTime, Local};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PHOTO_NAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";
const PHOTO_EXTENSION: &str = "jpg";
const JPEG_QUALITY: u8 = 95;

/// Where stills are written. Chosen once, when the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirectory {
    path: PathBuf,
}

impl OutputDirectory {
    /// `<media_root>/<app_name>` if it exists or can be created, else `fallback`.
    pub fn resolve(media_root: Option<&Path>, app_name: &str, fallback: &Path) -> Self {
        if let Some(root) = media_root {
            let candidate = root.join(app_name);
            match std::fs::create_dir_all(&candidate) {
                Ok(()) => {
                    info!("Saving photos to {}", candidate.display());
                    return Self { path: candidate };
                }
                Err(e) => warn!(
                    "Media directory {} unavailable ({}), using {}",
                    candidate.display(),
                    e,
                    fallback.display()
                ),
            }
        }
        if let Err(e) = std::fs::create_dir_all(fallback) {
            warn!("Could not create {}: {}", fallback.display(), e);
        }
        Self {
            path: fallback.to_path_buf(),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::resolve(
            settings.media_root.as_deref(),
            &settings.app_name,
            &settings.fallback_dir,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn photo_path(&self, taken_at: DateTime<Local>) -> PathBuf {
        self.path.join(photo_file_name(taken_at))
    }
}

/// `yyyy-MM-dd-HH-mm-ss-SSS.jpg`
pub fn photo_file_name(taken_at: DateTime<Local>) -> String {
    format!("{}.{}", taken_at.format(PHOTO_NAME_FORMAT), PHOTO_EXTENSION)
}

/// Blocking JPEG write; run it off the async workers.
pub fn write_jpeg(path: &Path, image: &RgbImage) -> Result<(), CaptureError> {
    let to_write_error = |source: image::ImageError| CaptureError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| to_write_error(image::ImageError::IoError(e)))?;
    JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY)
        .encode_image(image)
        .map_err(to_write_error)
}
