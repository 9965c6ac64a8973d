//! A camera that needs no hardware: renders a moving test pattern.
use super::provider::{CameraProvider, CameraSelector};
use super::use_cases::UseCaseGroup;
use crate::config::CameraSettings;
use crate::error::AppError;
use crate::pipeline::converter::rgb_to_yuv420;
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const NOISE_AMPLITUDE: i16 = 6;

pub struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_interval: Duration,
    ready: AtomicBool,
    stream: Mutex<Option<FrameStream>>,
}

impl SyntheticCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            frame_interval: Duration::from_secs(1) / settings.fps.max(1),
            ready: AtomicBool::new(false),
            stream: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CameraProvider for SyntheticCamera {
    async fn initialize(&self) -> Result<(), AppError> {
        if self.width == 0 || self.height == 0 {
            return Err(AppError::ProviderUnavailable(format!(
                "cannot stream {}x{} frames",
                self.width, self.height
            )));
        }
        self.ready.store(true, Ordering::Release);
        info!(
            "Synthetic camera ready: {}x{} every {:?}",
            self.width, self.height, self.frame_interval
        );
        Ok(())
    }

    fn unbind_all(&self) {
        let stream = self
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut stream) = stream {
            stream.stop();
            info!("Synthetic camera unbound");
        }
    }

    fn bind(&self, selector: CameraSelector, use_cases: UseCaseGroup) -> Result<(), AppError> {
        if !self.ready.load(Ordering::Acquire) {
            return Err(AppError::ProviderUnavailable(
                "provider was not initialized".to_string(),
            ));
        }
        let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(AppError::Binding(
                "use cases are already bound, unbind first".to_string(),
            ));
        }
        let pattern = TestPattern::new(self.width, self.height);
        *slot = Some(FrameStream::start(pattern, self.frame_interval, use_cases)?);
        info!("Synthetic camera bound ({:?})", selector.facing);
        Ok(())
    }

    fn is_bound(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

struct FrameStream {
    cancel_token: CancellationToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl FrameStream {
    fn start(
        mut pattern: TestPattern,
        interval: Duration,
        use_cases: UseCaseGroup,
    ) -> Result<Self, AppError> {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let thread = std::thread::Builder::new()
            .name("synthetic-camera".to_string())
            .spawn(move || {
                while !token.is_cancelled() {
                    let started = Instant::now();
                    deliver(pattern.next_frame(), &use_cases);
                    std::thread::sleep(interval.saturating_sub(started.elapsed()));
                }
                debug!("Synthetic camera stream ended");
            })?;
        Ok(Self {
            cancel_token,
            thread: Some(thread),
        })
    }

    fn stop(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Synthetic camera thread panicked");
            }
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn deliver(frame: RgbImage, use_cases: &UseCaseGroup) {
    let frame = Arc::new(frame);
    use_cases.preview.submit(frame.clone());
    if use_cases.image_capture.has_pending() {
        use_cases.image_capture.fulfil(&frame);
    }
    if use_cases.image_analysis.is_idle() {
        use_cases.image_analysis.offer(rgb_to_yuv420(&frame));
    }
}

/// Vertical color bars scrolling sideways, a figure-sized block bouncing
/// across them and a little sensor noise.
struct TestPattern {
    width: u32,
    height: u32,
    tick: u32,
}

const BARS: [[u8; 3]; 6] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [0, 0, 192],
];

impl TestPattern {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }

    fn next_frame(&mut self) -> RgbImage {
        let mut rng = rand::rng();
        let bar_width = (self.width / BARS.len() as u32).max(1);
        let shift = self.tick.wrapping_mul(2);

        let figure_width = (self.width / 6).max(1);
        let figure_height = (self.height * 2 / 3).max(1);
        let travel = self.width.saturating_sub(figure_width).max(1);
        let phase = self.tick % (travel * 2);
        let figure_left = if phase < travel { phase } else { travel * 2 - phase };
        let figure_top = (self.height - figure_height) / 2;

        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            let in_figure = (figure_left..figure_left + figure_width).contains(&x)
                && (figure_top..figure_top + figure_height).contains(&y);
            let base = if in_figure {
                [40, 40, 40]
            } else {
                BARS[(((x + shift) / bar_width) as usize) % BARS.len()]
            };
            let noise = rng.random_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
            Rgb(base.map(|c| (c as i16 + noise).clamp(0, 255) as u8))
        });
        self.tick = self.tick.wrapping_add(1);
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::executor::{AnalysisSender, Job};
    use crate::camera::use_cases::{
        ImageAnalysis, ImageCapture, Preview, PreviewReceiver, preview_surface,
    };
    use tokio::sync::mpsc;

    fn settings() -> CameraSettings {
        CameraSettings {
            width: 32,
            height: 24,
            fps: 100,
        }
    }

    fn use_cases() -> (UseCaseGroup, PreviewReceiver, mpsc::Receiver<Job>) {
        let (surface, receiver) = preview_surface();
        let (tx, rx) = mpsc::channel(2);
        let group = UseCaseGroup {
            preview: Preview::new(surface),
            image_capture: ImageCapture::new(),
            image_analysis: ImageAnalysis::new(AnalysisSender::new(tx)),
        };
        (group, receiver, rx)
    }

    #[test]
    fn pattern_moves_between_frames() {
        let mut pattern = TestPattern::new(64, 48);
        let first = pattern.next_frame();
        let second = pattern.next_frame();
        assert_eq!(first.dimensions(), (64, 48));
        assert_ne!(first.as_raw(), second.as_raw());
    }

    #[tokio::test]
    async fn bind_requires_initialization() {
        let camera = SyntheticCamera::new(&settings());
        let (group, _preview, _jobs) = use_cases();
        assert!(matches!(
            camera.bind(CameraSelector::BACK, group),
            Err(AppError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn streams_to_preview_and_refuses_second_bind() {
        let camera = SyntheticCamera::new(&settings());
        camera.initialize().await.unwrap();
        let (group, mut preview, _jobs) = use_cases();
        let (second, _, _) = use_cases();

        camera.bind(CameraSelector::BACK, group).unwrap();
        assert!(camera.is_bound());
        assert!(matches!(
            camera.bind(CameraSelector::BACK, second),
            Err(AppError::Binding(_))
        ));

        let deadline = Instant::now() + Duration::from_secs(5);
        let frame = loop {
            if let Some(frame) = preview.take_latest() {
                break frame;
            }
            assert!(Instant::now() < deadline, "no preview frame");
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        assert_eq!(frame.dimensions(), (32, 24));

        camera.unbind_all();
        assert!(!camera.is_bound());
    }
}
