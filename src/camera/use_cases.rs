use super::executor::{AnalysisSender, Job};
use crate::common::{AnalysisFrame, FrameRelease, YuvImage};
use image::RgbImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{oneshot, watch};
use tracing::{trace, warn};

pub type PreviewFrame = Arc<RgbImage>;

/// The surface the viewfinder reads; holds only the newest frame.
pub fn preview_surface() -> (PreviewSurface, PreviewReceiver) {
    let (tx, rx) = watch::channel(None);
    (PreviewSurface { tx }, PreviewReceiver { rx })
}

#[derive(Clone)]
pub struct PreviewSurface {
    tx: watch::Sender<Option<PreviewFrame>>,
}

#[derive(Clone)]
pub struct PreviewReceiver {
    rx: watch::Receiver<Option<PreviewFrame>>,
}

impl PreviewReceiver {
    pub fn take_latest(&mut self) -> Option<PreviewFrame> {
        match self.rx.has_changed() {
            Ok(true) => self.rx.borrow_and_update().clone(),
            Ok(false) | Err(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct Preview {
    surface: PreviewSurface,
}

impl Preview {
    pub fn new(surface: PreviewSurface) -> Self {
        Self { surface }
    }

    pub fn submit(&self, frame: PreviewFrame) {
        self.surface.tx.send_replace(Some(frame));
    }
}

/// Still capture: each request is answered with the next frame the camera produces.
#[derive(Clone, Default)]
pub struct ImageCapture {
    pending: Arc<Mutex<Vec<oneshot::Sender<PreviewFrame>>>>,
}

impl ImageCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_picture(&self) -> oneshot::Receiver<PreviewFrame> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn has_pending(&self) -> bool {
        !self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Answers every pending request with `frame`. Returns how many were still waiting.
    pub fn fulfil(&self, frame: &PreviewFrame) -> usize {
        let waiting: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        waiting
            .into_iter()
            .filter(|tx| !tx.is_closed())
            .filter_map(|tx| tx.send(frame.clone()).ok())
            .count()
    }
}

/// Hands frames to the analysis executor, at most one at a time.
///
/// Frames arriving while the previous one is still open are dropped so the
/// camera never waits on analysis.
#[derive(Clone)]
pub struct ImageAnalysis {
    in_flight: Arc<AtomicBool>,
    sender: AnalysisSender,
}

impl ImageAnalysis {
    pub fn new(sender: AnalysisSender) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.in_flight.load(Ordering::Acquire)
    }

    /// Returns whether the frame was accepted.
    pub fn offer(&self, image: YuvImage) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("Analyzer busy, dropping frame {}", image.id());
            return false;
        }

        let frame = AnalysisFrame::new(image, FrameRelease::new(self.in_flight.clone()));
        // A rejected job drops its frame, which clears the flag again.
        match self.sender.try_send(Job::Analyze(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("Analysis queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Analysis executor has shut down, dropping frame");
                false
            }
        }
    }
}

/// The three use-cases bound to a camera together.
#[derive(Clone)]
pub struct UseCaseGroup {
    pub preview: Preview,
    pub image_capture: ImageCapture,
    pub image_analysis: ImageAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::converter::rgb_to_yuv420;
    use tokio::sync::mpsc;

    fn yuv() -> YuvImage {
        rgb_to_yuv420(&RgbImage::new(4, 4))
    }

    #[test]
    fn analysis_drops_frames_while_one_is_open() {
        let (tx, mut rx) = mpsc::channel(2);
        let analysis = ImageAnalysis::new(AnalysisSender::new(tx));

        assert!(analysis.offer(yuv()));
        assert!(!analysis.is_idle());
        assert!(!analysis.offer(yuv()));

        let Some(Job::Analyze(frame)) = rx.try_recv().ok() else {
            panic!("expected one queued frame");
        };
        assert!(rx.try_recv().is_err());
        frame.close();
        assert!(analysis.is_idle());
        assert!(analysis.offer(yuv()));
    }

    #[test]
    fn closed_executor_releases_the_frame() {
        let (tx, rx) = mpsc::channel(2);
        drop(rx);
        let analysis = ImageAnalysis::new(AnalysisSender::new(tx));
        assert!(!analysis.offer(yuv()));
        assert!(analysis.is_idle());
    }

    #[tokio::test]
    async fn capture_requests_get_the_next_frame() {
        let capture = ImageCapture::new();
        assert!(!capture.has_pending());
        let first = capture.take_picture();
        let abandoned = capture.take_picture();
        drop(abandoned);
        assert!(capture.has_pending());

        let frame = Arc::new(RgbImage::new(2, 2));
        assert_eq!(capture.fulfil(&frame), 1);
        assert!(!capture.has_pending());
        assert_eq!(first.await.unwrap().dimensions(), (2, 2));
    }

    #[test]
    fn preview_keeps_only_newest_frame() {
        let (surface, mut receiver) = preview_surface();
        let preview = Preview::new(surface);
        preview.submit(Arc::new(RgbImage::new(1, 1)));
        preview.submit(Arc::new(RgbImage::new(3, 3)));
        assert_eq!(receiver.take_latest().unwrap().dimensions(), (3, 3));
        assert!(receiver.take_latest().is_none());
    }
}
