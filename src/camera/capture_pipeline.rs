use super::executor::AnalysisExecutor;
use super::provider::{CameraProvider, CameraSelector};
use super::storage::{OutputDirectory, write_jpeg};
use super::use_cases::{
    ImageAnalysis, ImageCapture, Preview, PreviewReceiver, PreviewSurface, UseCaseGroup,
    preview_surface,
};
use crate::common::{Notice, NoticeSender};
use crate::config::StorageSettings;
use crate::error::{AppError, CaptureError};
use crate::pipeline::Analyzer;
use chrono::Local;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unbound,
    Binding,
    Bound,
    /// Torn down by `stop`; the pipeline cannot be started again.
    Stopped,
}

/// Owns the camera binding: preview, still capture and analysis use-cases
/// attached to one camera, plus the executor analysis runs on.
pub struct CapturePipeline {
    provider: Arc<dyn CameraProvider>,
    selector: CameraSelector,
    executor: Mutex<Option<AnalysisExecutor>>,
    surface: PreviewSurface,
    preview: PreviewReceiver,
    image_capture: Mutex<Option<ImageCapture>>,
    state: Mutex<PipelineState>,
    output_dir: OutputDirectory,
    capture_timeout: Duration,
    notices: NoticeSender,
    runtime: Handle,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CapturePipeline {
    pub fn builder(storage: StorageSettings) -> CapturePipelineBuilder {
        CapturePipelineBuilder::new(storage)
    }

    pub fn state(&self) -> PipelineState {
        *lock(&self.state)
    }

    pub fn output_dir(&self) -> &OutputDirectory {
        &self.output_dir
    }

    /// The viewfinder's view of the preview use-case.
    pub fn preview(&self) -> PreviewReceiver {
        self.preview.clone()
    }

    /// Binds the use-cases to the selected camera once the provider is ready.
    ///
    /// Every call rebinds: whatever the provider holds is unbound first and a
    /// fresh set of use-cases is bound. Calls made while a bind is in progress
    /// join that bind. On failure the user is notified and the pipeline goes
    /// back to `Unbound`.
    pub async fn start(&self) -> Result<(), AppError> {
        {
            let mut state = lock(&self.state);
            match *state {
                PipelineState::Binding => {
                    debug!("Camera start ignored, a bind is already in progress");
                    return Ok(());
                }
                PipelineState::Stopped => {
                    return Err(AppError::Binding(
                        "the capture pipeline was stopped".to_string(),
                    ));
                }
                PipelineState::Unbound | PipelineState::Bound => {
                    *state = PipelineState::Binding;
                }
            }
        }

        match self.bind().await {
            Ok(image_capture) => {
                *lock(&self.image_capture) = Some(image_capture);
                let mut state = lock(&self.state);
                if *state == PipelineState::Stopped {
                    drop(state);
                    self.provider.unbind_all();
                    *lock(&self.image_capture) = None;
                    return Err(AppError::Binding(
                        "the capture pipeline was stopped".to_string(),
                    ));
                }
                *state = PipelineState::Bound;
                info!("Camera use cases bound ({:?})", self.selector.facing);
                Ok(())
            }
            Err(e) => {
                error!("Use case binding failed: {}", e);
                self.notices.post(Notice::CameraUnavailable(e.to_string()));
                *lock(&self.image_capture) = None;
                let mut state = lock(&self.state);
                if *state != PipelineState::Stopped {
                    *state = PipelineState::Unbound;
                }
                Err(e)
            }
        }
    }

    async fn bind(&self) -> Result<ImageCapture, AppError> {
        self.provider.initialize().await?;
        let sender = lock(&self.executor)
            .as_ref()
            .map(AnalysisExecutor::sender)
            .ok_or_else(|| AppError::Binding("the analysis executor has shut down".to_string()))?;

        let image_capture = ImageCapture::new();
        let use_cases = UseCaseGroup {
            preview: Preview::new(self.surface.clone()),
            image_capture: image_capture.clone(),
            image_analysis: ImageAnalysis::new(sender),
        };
        self.provider.unbind_all();
        self.provider.bind(self.selector, use_cases)?;
        Ok(image_capture)
    }

    /// Saves the next camera frame as a JPEG. Runs independently of the caller;
    /// the outcome is reported as a notice and through the returned handle.
    pub fn take_photo(&self) -> JoinHandle<Result<PathBuf, AppError>> {
        let image_capture = lock(&self.image_capture).clone();
        let path = self.output_dir.photo_path(Local::now());
        let timeout = self.capture_timeout;
        let notices = self.notices.clone();

        self.runtime.spawn(async move {
            let result = capture_still(image_capture, path, timeout).await;
            match &result {
                Ok(path) => {
                    info!("Photo saved to {}", path.display());
                    notices.post(Notice::PhotoSaved(path.clone()));
                }
                Err(e) => {
                    error!("Photo capture failed: {}", e);
                    notices.post(Notice::PhotoFailed(e.to_string()));
                }
            }
            result
        })
    }

    /// Unbinds the camera and waits for the analysis thread to finish.
    /// Terminal: later `start` calls fail.
    pub fn stop(&self) {
        *lock(&self.state) = PipelineState::Stopped;
        self.provider.unbind_all();
        *lock(&self.image_capture) = None;
        if let Some(mut executor) = lock(&self.executor).take() {
            executor.shutdown();
            info!("Capture pipeline stopped");
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn capture_still(
    image_capture: Option<ImageCapture>,
    path: PathBuf,
    timeout: Duration,
) -> Result<PathBuf, AppError> {
    let image_capture = image_capture.ok_or(CaptureError::NotBound)?;
    let frame = match tokio::time::timeout(timeout, image_capture.take_picture()).await {
        Ok(Ok(frame)) => frame,
        Ok(Err(_)) => return Err(CaptureError::CameraClosed.into()),
        Err(_) => return Err(CaptureError::Timeout(timeout).into()),
    };

    let target = path.clone();
    tokio::task::spawn_blocking(move || write_jpeg(&target, &frame))
        .await
        .map_err(|e| CaptureError::Join(e.to_string()))??;
    Ok(path)
}

pub struct CapturePipelineBuilder {
    storage: StorageSettings,
    provider: Option<Arc<dyn CameraProvider>>,
    analyzer: Option<Box<dyn Analyzer>>,
    notices: Option<NoticeSender>,
    runtime: Option<Handle>,
    selector: CameraSelector,
    output_dir: Option<OutputDirectory>,
}

impl CapturePipelineBuilder {
    pub fn new(storage: StorageSettings) -> Self {
        Self {
            storage,
            provider: None,
            analyzer: None,
            notices: None,
            runtime: None,
            selector: CameraSelector::BACK,
            output_dir: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn CameraProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn notices(mut self, notices: NoticeSender) -> Self {
        self.notices = Some(notices);
        self
    }

    // Runtime still captures are spawned on, defaults to the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn selector(mut self, selector: CameraSelector) -> Self {
        self.selector = selector;
        self
    }

    // Overrides the directory resolved from the storage settings.
    pub fn output_dir(mut self, output_dir: OutputDirectory) -> Self {
        self.output_dir = Some(output_dir);
        self
    }

    pub fn build(self) -> Result<CapturePipeline, AppError> {
        let provider = self
            .provider
            .ok_or_else(|| AppError::ProviderUnavailable("no camera provider set".to_string()))?;
        let analyzer = self
            .analyzer
            .ok_or_else(|| AppError::Binding("no analyzer set".to_string()))?;
        let notices = self
            .notices
            .ok_or_else(|| AppError::Binding("no notice channel set".to_string()))?;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()
                .map_err(|e| AppError::Binding(format!("no async runtime: {}", e)))?,
        };
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| OutputDirectory::from_settings(&self.storage));
        let executor = AnalysisExecutor::spawn(analyzer)?;
        let (surface, preview) = preview_surface();

        Ok(CapturePipeline {
            provider,
            selector: self.selector,
            executor: Mutex::new(Some(executor)),
            surface,
            preview,
            image_capture: Mutex::new(None),
            state: Mutex::new(PipelineState::Unbound),
            output_dir,
            capture_timeout: self.storage.capture_timeout(),
            notices,
            runtime,
        })
    }
}
