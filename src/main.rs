use peoplecam::app::{CameraApp, PermissionGate, PolicyPermissions, Toasts};
use peoplecam::camera::{CameraSelector, CapturePipeline, SyntheticCamera};
use peoplecam::common::notice_channel;
use peoplecam::config::Settings;
use peoplecam::error::AppError;
use peoplecam::pipeline::detection::{DetectionFilter, Detector};
use peoplecam::pipeline::overlay::{BoxStyle, overlay_feed};
use peoplecam::pipeline::{DetectionAnalyzer, FrameConverter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings = Settings::load()?;
    init_logging(settings.logging.level()?);

    let mut permissions = PolicyPermissions::from_settings(&settings.permissions);
    if let Err(e) = permissions.require() {
        warn!("{}", e);
        let delay = Duration::from_millis(settings.ui.denial_close_delay_ms);
        CameraApp::start_gui(&settings.ui, CameraApp::denied(delay))?;
        return Err(e);
    }

    let detector = Detector::load(&settings.detector).inspect_err(|e| {
        error!("Cannot start without a detector: {}", e);
    })?;

    let selector = CameraSelector::BACK;
    let (publisher, overlay_rx) = overlay_feed();
    let analyzer = DetectionAnalyzer::new(
        FrameConverter::default(),
        detector,
        DetectionFilter::from_settings(&settings.detector),
        BoxStyle::from_settings(&settings.overlay),
        publisher,
    )
    .with_mirroring(selector.facing.is_mirrored());
    let stats = analyzer.stats();

    let (notice_tx, notice_rx) = notice_channel();
    let pipeline = Arc::new(
        CapturePipeline::builder(settings.storage.clone())
            .provider(Arc::new(SyntheticCamera::new(&settings.camera)))
            .analyzer(Box::new(analyzer))
            .notices(notice_tx)
            .selector(selector)
            .build()?,
    );

    // Failure is already reported to the user; the window still opens.
    if let Err(e) = pipeline.start().await {
        warn!("Camera did not start: {}", e);
    }

    let toasts = Toasts::new(
        notice_rx,
        Duration::from_millis(settings.ui.toast_duration_ms),
    );
    let app = CameraApp::running(pipeline.clone(), overlay_rx, stats, toasts);
    let result = CameraApp::start_gui(&settings.ui, app);

    pipeline.stop();
    info!("Shut down");
    result
}
