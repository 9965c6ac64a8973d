//! Single-slot handoff of overlay contents from the analysis thread to the UI.
use super::graphic_overlay::Annotation;
use tokio::sync::watch;
use uuid::Uuid;

/// Everything the overlay needs to redraw one analyzed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayBatch {
    pub frame_id: Option<Uuid>,
    pub image_width: u32,
    pub image_height: u32,
    pub mirrored: bool,
    pub annotations: Vec<Annotation>,
}

pub fn overlay_feed() -> (OverlayPublisher, OverlaySubscriber) {
    let (tx, rx) = watch::channel(OverlayBatch::default());
    (OverlayPublisher { tx }, OverlaySubscriber { rx })
}

#[derive(Clone)]
pub struct OverlayPublisher {
    tx: watch::Sender<OverlayBatch>,
}

impl OverlayPublisher {
    /// Replaces whatever batch is pending. Never blocks, even with no reader.
    pub fn publish(&self, batch: OverlayBatch) {
        self.tx.send_replace(batch);
    }

    pub fn subscribe(&self) -> OverlaySubscriber {
        OverlaySubscriber {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Clone)]
pub struct OverlaySubscriber {
    rx: watch::Receiver<OverlayBatch>,
}

impl OverlaySubscriber {
    /// The newest batch, if one arrived since the last call.
    pub fn take_latest(&mut self) -> Option<OverlayBatch> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            Ok(false) | Err(_) => None,
        }
    }
}
