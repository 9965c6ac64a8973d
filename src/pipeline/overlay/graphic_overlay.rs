use super::canvas::Canvas;
use super::feed::OverlayBatch;
use crate::common::PixelRect;
use crate::config::OverlaySettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStyle {
    /// RGBA
    pub color: [u8; 4],
    pub stroke_width: f32,
}

impl BoxStyle {
    pub fn from_settings(settings: &OverlaySettings) -> Self {
        Self {
            color: settings.color,
            stroke_width: settings.stroke_width,
        }
    }
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            color: [255, 0, 0, 255],
            stroke_width: 5.0,
        }
    }
}

/// One box to draw, in source image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub rect: PixelRect,
    pub style: BoxStyle,
}

/// Annotations drawn over the viewfinder, scaled from image space to view space.
///
/// Rebuilt from scratch for every analyzed frame; nothing carries over.
#[derive(Debug, Clone, Default)]
pub struct GraphicOverlay {
    annotations: Vec<Annotation>,
    view_width: f32,
    view_height: f32,
    image_width: u32,
    image_height: u32,
    mirrored: bool,
}

impl GraphicOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    pub fn add(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Size of the analyzed image, and whether it came from a front-facing camera.
    pub fn set_image_source_info(&mut self, width: u32, height: u32, mirrored: bool) {
        self.image_width = width;
        self.image_height = height;
        self.mirrored = mirrored;
    }

    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view_width = width;
        self.view_height = height;
    }

    pub fn scale_x(&self) -> f32 {
        if self.image_width == 0 {
            1.0
        } else {
            self.view_width / self.image_width as f32
        }
    }

    pub fn scale_y(&self) -> f32 {
        if self.image_height == 0 {
            1.0
        } else {
            self.view_height / self.image_height as f32
        }
    }

    pub fn translate_x(&self, x: f32) -> f32 {
        let scaled = x * self.scale_x();
        if self.mirrored {
            self.view_width - scaled
        } else {
            scaled
        }
    }

    pub fn translate_y(&self, y: f32) -> f32 {
        y * self.scale_y()
    }

    /// Maps an image-space rectangle into view space.
    pub fn to_view(&self, rect: &PixelRect) -> PixelRect {
        let (x1, x2) = (self.translate_x(rect.left), self.translate_x(rect.right));
        PixelRect::new(
            x1.min(x2),
            self.translate_y(rect.top),
            x1.max(x2),
            self.translate_y(rect.bottom),
        )
    }

    /// Draws every annotation in insertion order.
    pub fn render(&self, canvas: &mut dyn Canvas) {
        for annotation in &self.annotations {
            canvas.draw_rect(self.to_view(&annotation.rect), &annotation.style);
        }
    }

    /// Replaces the overlay contents with one analyzed frame's batch.
    pub fn apply(&mut self, batch: &OverlayBatch) {
        self.set_image_source_info(batch.image_width, batch.image_height, batch.mirrored);
        self.clear();
        for annotation in &batch.annotations {
            self.add(annotation.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingCanvas {
        rects: Vec<(PixelRect, BoxStyle)>,
    }

    impl Canvas for RecordingCanvas {
        fn draw_rect(&mut self, rect: PixelRect, style: &BoxStyle) {
            self.rects.push((rect, *style));
        }
    }

    fn annotation(left: f32, top: f32, right: f32, bottom: f32) -> Annotation {
        Annotation {
            rect: PixelRect::new(left, top, right, bottom),
            style: BoxStyle::default(),
        }
    }

    #[test]
    fn clear_then_render_draws_nothing() {
        let mut overlay = GraphicOverlay::new();
        overlay.set_view_size(300.0, 300.0);
        overlay.set_image_source_info(300, 300, false);
        overlay.add(annotation(0.0, 0.0, 10.0, 10.0));
        overlay.add(annotation(5.0, 5.0, 20.0, 20.0));
        overlay.clear();

        let mut canvas = RecordingCanvas::default();
        overlay.render(&mut canvas);
        assert!(canvas.rects.is_empty());
    }

    #[test]
    fn renders_every_annotation_in_insertion_order() {
        let mut overlay = GraphicOverlay::new();
        overlay.set_view_size(300.0, 300.0);
        overlay.set_image_source_info(300, 300, false);
        overlay.add(annotation(60.0, 30.0, 240.0, 180.0));
        overlay.add(annotation(1.0, 1.0, 2.0, 2.0));
        overlay.add(annotation(3.0, 3.0, 4.0, 4.0));

        let mut canvas = RecordingCanvas::default();
        overlay.render(&mut canvas);
        assert_eq!(canvas.rects.len(), 3);
        assert_eq!(canvas.rects[0].0, PixelRect::new(60.0, 30.0, 240.0, 180.0));
        assert_eq!(canvas.rects[2].0.left, 3.0);
        assert_eq!(canvas.rects[0].1.stroke_width, 5.0);
    }

    #[test]
    fn scales_each_axis_independently() {
        let mut overlay = GraphicOverlay::new();
        overlay.set_image_source_info(640, 480, false);
        overlay.set_view_size(1280.0, 480.0);
        let view = overlay.to_view(&PixelRect::new(100.0, 100.0, 200.0, 200.0));
        assert_eq!(view, PixelRect::new(200.0, 100.0, 400.0, 200.0));
    }

    #[test]
    fn mirrored_source_flips_horizontally() {
        let mut overlay = GraphicOverlay::new();
        overlay.set_image_source_info(100, 100, true);
        overlay.set_view_size(100.0, 100.0);
        let view = overlay.to_view(&PixelRect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(view, PixelRect::new(70.0, 20.0, 90.0, 40.0));
    }

    #[test]
    fn apply_replaces_previous_frame() {
        let mut overlay = GraphicOverlay::new();
        overlay.add(annotation(0.0, 0.0, 1.0, 1.0));
        overlay.apply(&OverlayBatch {
            frame_id: None,
            image_width: 50,
            image_height: 50,
            mirrored: false,
            annotations: vec![annotation(2.0, 2.0, 3.0, 3.0), annotation(4.0, 4.0, 5.0, 5.0)],
        });
        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.annotations()[0].rect.left, 2.0);
    }
}
