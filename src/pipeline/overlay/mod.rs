pub mod canvas;
pub mod feed;
pub mod graphic_overlay;

pub use canvas::Canvas;
pub use feed::{OverlayBatch, OverlayPublisher, OverlaySubscriber, overlay_feed};
pub use graphic_overlay::{Annotation, BoxStyle, GraphicOverlay};
