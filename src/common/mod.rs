pub mod frame;
pub mod geometry;
pub mod notice;

pub use frame::{AnalysisFrame, FrameRelease, Plane, YuvImage};
pub use geometry::PixelRect;
pub use notice::{Notice, NoticeSender, notice_channel};
