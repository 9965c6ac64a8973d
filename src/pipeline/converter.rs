//! Camera frame to RGB bitmap conversion.
use crate::common::{Plane, YuvImage};
use crate::error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionMode {
    /// Per-pixel YUV to RGB transform.
    #[default]
    Direct,
    /// Transform, then pass the bitmap through a JPEG encode/decode cycle.
    /// Matches bitmaps produced by platforms that decode frames via JPEG.
    JpegRoundTrip { quality: u8 },
}

#[derive(Debug, Clone, Default)]
pub struct FrameConverter {
    mode: ConversionMode,
}

impl FrameConverter {
    pub fn new(mode: ConversionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    /// Converts a frame into an RGB bitmap with the same dimensions.
    pub fn convert(&self, image: &YuvImage) -> Result<RgbImage, AppError> {
        let rgb = yuv420_to_rgb(image)?;
        match self.mode {
            ConversionMode::Direct => Ok(rgb),
            ConversionMode::JpegRoundTrip { quality } => jpeg_round_trip(&rgb, quality),
        }
    }
}

/// Full-range BT.601 (JFIF) YCbCr to RGB.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32 - 128.0;
    let cr = cr as f32 - 128.0;
    [
        clamp_channel(y + 1.402 * cr),
        clamp_channel(y - 0.344_136 * cb - 0.714_136 * cr),
        clamp_channel(y + 1.772 * cb),
    ]
}

pub fn rgb_to_ycbcr([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    [
        clamp_channel(0.299 * r + 0.587 * g + 0.114 * b),
        clamp_channel(128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b),
        clamp_channel(128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b),
    ]
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

pub fn yuv420_to_rgb(image: &YuvImage) -> Result<RgbImage, AppError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::Conversion(format!(
            "frame has empty dimensions {}x{}",
            width, height
        )));
    }
    let (chroma_width, chroma_height) = image.chroma_dimensions();
    check_plane("Y", image.y_plane(), width, height)?;
    check_plane("U", image.u_plane(), chroma_width, chroma_height)?;
    check_plane("V", image.v_plane(), chroma_width, chroma_height)?;

    let (luma, cb, cr) = (image.y_plane(), image.u_plane(), image.v_plane());
    let at = |plane: &Plane, x: usize, y: usize| {
        plane.data[y * plane.row_stride + x * plane.pixel_stride]
    };

    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgb.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        pixel.0 = ycbcr_to_rgb(
            at(luma, x, y),
            at(cb, x / 2, y / 2),
            at(cr, x / 2, y / 2),
        );
    }
    Ok(rgb)
}

fn check_plane(name: &str, plane: &Plane, width: u32, height: u32) -> Result<(), AppError> {
    if plane.pixel_stride == 0 || (plane.row_stride == 0 && height > 1) {
        return Err(AppError::Conversion(format!(
            "{} plane has a zero stride (row {}, pixel {})",
            name, plane.row_stride, plane.pixel_stride
        )));
    }
    let required = plane.required_len(width as usize, height as usize);
    if plane.data.len() < required {
        return Err(AppError::Conversion(format!(
            "{} plane holds {} bytes, {}x{} samples need {}",
            name,
            plane.data.len(),
            width,
            height,
            required
        )));
    }
    Ok(())
}

/// Builds a tightly packed I420 frame from an RGB bitmap, averaging chroma over 2x2 blocks.
pub fn rgb_to_yuv420(rgb: &RgbImage) -> YuvImage {
    let (width, height) = rgb.dimensions();
    let (chroma_width, chroma_height) = (width.div_ceil(2), height.div_ceil(2));
    let mut y_data = Vec::with_capacity((width * height) as usize);
    for pixel in rgb.pixels() {
        y_data.push(rgb_to_ycbcr(pixel.0)[0]);
    }

    let mut u_data = Vec::with_capacity((chroma_width * chroma_height) as usize);
    let mut v_data = Vec::with_capacity((chroma_width * chroma_height) as usize);
    for cy in 0..chroma_height {
        for cx in 0..chroma_width {
            let (mut cb_sum, mut cr_sum, mut count) = (0u32, 0u32, 0u32);
            for y in (cy * 2)..(cy * 2 + 2).min(height) {
                for x in (cx * 2)..(cx * 2 + 2).min(width) {
                    let [_, cb, cr] = rgb_to_ycbcr(rgb.get_pixel(x, y).0);
                    cb_sum += cb as u32;
                    cr_sum += cr as u32;
                    count += 1;
                }
            }
            u_data.push(((cb_sum + count / 2) / count) as u8);
            v_data.push(((cr_sum + count / 2) / count) as u8);
        }
    }

    YuvImage::new(
        width,
        height,
        Plane::packed(y_data, width as usize),
        Plane::packed(u_data, chroma_width as usize),
        Plane::packed(v_data, chroma_width as usize),
    )
}

fn jpeg_round_trip(rgb: &RgbImage, quality: u8) -> Result<RgbImage, AppError> {
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, quality.clamp(1, 100))
        .encode_image(rgb)
        .map_err(|e| AppError::Conversion(format!("JPEG encode failed: {}", e)))?;
    let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)
        .map_err(|e| AppError::Conversion(format!("JPEG decode failed: {}", e)))?;
    Ok(decoded.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_frame(width: u32, height: u32, y: u8, u: u8, v: u8) -> YuvImage {
        let (cw, ch) = (width.div_ceil(2) as usize, height.div_ceil(2) as usize);
        YuvImage::new(
            width,
            height,
            Plane::packed(vec![y; (width * height) as usize], width as usize),
            Plane::packed(vec![u; cw * ch], cw),
            Plane::packed(vec![v; cw * ch], cw),
        )
    }

    fn assert_close(actual: [u8; 3], expected: [u8; 3], tolerance: i16) {
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!(
                (*a as i16 - *e as i16).abs() <= tolerance,
                "{:?} not within {} of {:?}",
                actual,
                tolerance,
                expected
            );
        }
    }

    #[test]
    fn conversion_preserves_dimensions() {
        let converter = FrameConverter::default();
        for (width, height) in [(1, 1), (2, 2), (7, 5), (640, 480), (33, 64)] {
            let rgb = converter.convert(&solid_frame(width, height, 90, 128, 128)).unwrap();
            assert_eq!(rgb.dimensions(), (width, height));
        }
    }

    #[test]
    fn neutral_chroma_yields_gray() {
        let rgb = yuv420_to_rgb(&solid_frame(4, 4, 128, 128, 128)).unwrap();
        assert!(rgb.pixels().all(|p| *p == Rgb([128, 128, 128])));
    }

    #[test]
    fn colors_survive_rgb_to_yuv_and_back() {
        let mut source = RgbImage::new(8, 8);
        for (x, _, pixel) in source.enumerate_pixels_mut() {
            // 2-pixel wide stripes so each chroma block is a single color.
            pixel.0 = if (x / 2) % 2 == 0 { [220, 30, 40] } else { [20, 60, 200] };
        }
        let rgb = yuv420_to_rgb(&rgb_to_yuv420(&source)).unwrap();
        for (x, y, pixel) in rgb.enumerate_pixels() {
            assert_close(pixel.0, source.get_pixel(x, y).0, 3);
        }
    }

    #[test]
    fn reads_interleaved_chroma_through_pixel_stride() {
        // NV21 style: one V/U interleaved buffer exposed as two strided planes.
        let (width, height) = (4u32, 4u32);
        let (cw, ch) = (2usize, 2usize);
        let [y, u, v] = rgb_to_ycbcr([200, 40, 40]);
        let mut vu = Vec::with_capacity(cw * ch * 2);
        for _ in 0..cw * ch {
            vu.push(v);
            vu.push(u);
        }
        let frame = YuvImage::new(
            width,
            height,
            Plane::packed(vec![y; (width * height) as usize], width as usize),
            Plane::new(vu[1..].to_vec(), cw * 2, 2),
            Plane::new(vu, cw * 2, 2),
        );
        let rgb = yuv420_to_rgb(&frame).unwrap();
        assert_close(rgb.get_pixel(3, 3).0, [200, 40, 40], 3);
    }

    #[test]
    fn undersized_plane_is_rejected() {
        let base = solid_frame(4, 4, 10, 128, 128);
        let frame = YuvImage::new(
            4,
            4,
            base.y_plane().clone(),
            Plane::packed(vec![128; 3], 2),
            base.v_plane().clone(),
        );
        assert!(matches!(yuv420_to_rgb(&frame), Err(AppError::Conversion(_))));
    }

    #[test]
    fn empty_frame_is_rejected() {
        let frame = YuvImage::new(
            0,
            0,
            Plane::packed(Vec::new(), 0),
            Plane::packed(Vec::new(), 0),
            Plane::packed(Vec::new(), 0),
        );
        assert!(FrameConverter::default().convert(&frame).is_err());
    }

    #[test]
    fn jpeg_round_trip_keeps_size_and_color() {
        let converter = FrameConverter::new(ConversionMode::JpegRoundTrip { quality: 100 });
        let rgb = converter.convert(&solid_frame(16, 12, 128, 128, 128)).unwrap();
        assert_eq!(rgb.dimensions(), (16, 12));
        assert_close(rgb.get_pixel(8, 6).0, [128, 128, 128], 2);
    }
}
