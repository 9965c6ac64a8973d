use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// One byte plane of a camera image.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// A tightly packed plane, one byte per sample.
    pub fn packed(data: Vec<u8>, width: usize) -> Self {
        Self::new(data, width, 1)
    }

    pub fn sample(&self, x: usize, y: usize) -> Option<u8> {
        self.data
            .get(y * self.row_stride + x * self.pixel_stride)
            .copied()
    }

    /// Bytes needed to address every sample of a `width x height` grid.
    pub fn required_len(&self, width: usize, height: usize) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        (height - 1) * self.row_stride + (width - 1) * self.pixel_stride + 1
    }
}

/// A planar YUV 4:2:0 image: full resolution luma, half resolution chroma.
#[derive(Debug, Clone)]
pub struct YuvImage {
    width: u32,
    height: u32,
    planes: [Plane; 3],
    captured_at: DateTime<Utc>,
    id: Uuid,
}

impl YuvImage {
    pub fn new(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Self {
        Self {
            width,
            height,
            planes: [y, u, v],
            captured_at: Utc::now(),
            id: Uuid::new_v4(),
        }
    }

    pub fn with_captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sample grid of each chroma plane.
    pub fn chroma_dimensions(&self) -> (u32, u32) {
        (self.width.div_ceil(2), self.height.div_ceil(2))
    }

    pub fn y_plane(&self) -> &Plane {
        &self.planes[0]
    }

    pub fn u_plane(&self) -> &Plane {
        &self.planes[1]
    }

    pub fn v_plane(&self) -> &Plane {
        &self.planes[2]
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

/// Hands a delivered frame back to its producer when dropped.
pub struct FrameRelease {
    in_flight: Arc<AtomicBool>,
}

impl FrameRelease {
    pub fn new(in_flight: Arc<AtomicBool>) -> Self {
        Self { in_flight }
    }
}

impl Drop for FrameRelease {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

impl fmt::Debug for FrameRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRelease")
            .field("in_flight", &self.in_flight.load(Ordering::Acquire))
            .finish()
    }
}

/// A frame on loan from the camera for the duration of one analyzer call.
///
/// The producer will not hand out another frame while this one is open, so
/// it is released when closed or dropped, whichever comes first.
#[derive(Debug)]
pub struct AnalysisFrame {
    image: YuvImage,
    _release: FrameRelease,
}

impl AnalysisFrame {
    pub fn new(image: YuvImage, release: FrameRelease) -> Self {
        Self {
            image,
            _release: release,
        }
    }

    /// A frame no producer is waiting on.
    pub fn detached(image: YuvImage) -> Self {
        Self::new(image, FrameRelease::new(Arc::new(AtomicBool::new(true))))
    }

    pub fn image(&self) -> &YuvImage {
        &self.image
    }

    pub fn close(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_image(width: u32, height: u32) -> YuvImage {
        let (cw, ch) = (width.div_ceil(2) as usize, height.div_ceil(2) as usize);
        YuvImage::new(
            width,
            height,
            Plane::packed(vec![128; (width * height) as usize], width as usize),
            Plane::packed(vec![128; cw * ch], cw),
            Plane::packed(vec![128; cw * ch], cw),
        )
    }

    #[test]
    fn closing_frame_releases_producer() {
        let in_flight = Arc::new(AtomicBool::new(true));
        let frame = AnalysisFrame::new(gray_image(4, 4), FrameRelease::new(in_flight.clone()));
        assert!(in_flight.load(Ordering::Acquire));
        frame.close();
        assert!(!in_flight.load(Ordering::Acquire));
    }

    #[test]
    fn dropping_frame_on_error_path_releases_producer() {
        let in_flight = Arc::new(AtomicBool::new(true));
        let result: Result<(), &str> = (|| {
            let _frame =
                AnalysisFrame::new(gray_image(4, 4), FrameRelease::new(in_flight.clone()));
            Err("conversion failed")
        })();
        assert!(result.is_err());
        assert!(!in_flight.load(Ordering::Acquire));
    }

    #[test]
    fn odd_dimensions_round_chroma_up() {
        let image = gray_image(5, 3);
        assert_eq!(image.chroma_dimensions(), (3, 2));
    }

    #[test]
    fn strided_plane_reports_required_length() {
        let plane = Plane::new(vec![0; 64], 16, 2);
        assert_eq!(plane.required_len(4, 3), 2 * 16 + 3 * 2 + 1);
        assert_eq!(plane.required_len(0, 3), 0);
    }
}
