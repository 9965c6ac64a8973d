use crate::app::views::View;
use crate::camera::PreviewReceiver;
use crate::common::PixelRect;
use crate::pipeline::overlay::{BoxStyle, Canvas, GraphicOverlay, OverlaySubscriber};
use egui::{Color32, Painter, Pos2, Rect, Sense, Stroke, StrokeKind, TextureHandle, TextureOptions};

/// Draws overlay rectangles with the egui painter, offset to the viewfinder's corner.
pub struct EguiCanvas<'a> {
    painter: &'a Painter,
    origin: Pos2,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(painter: &'a Painter, origin: Pos2) -> Self {
        Self { painter, origin }
    }
}

impl Canvas for EguiCanvas<'_> {
    fn draw_rect(&mut self, rect: PixelRect, style: &BoxStyle) {
        let [r, g, b, a] = style.color;
        let rect = Rect::from_min_max(
            self.origin + egui::vec2(rect.left, rect.top),
            self.origin + egui::vec2(rect.right, rect.bottom),
        );
        self.painter.rect_stroke(
            rect,
            0.0,
            Stroke::new(style.stroke_width, Color32::from_rgba_unmultiplied(r, g, b, a)),
            StrokeKind::Outside,
        );
    }
}

/// Live preview with the latest analysis boxes on top.
pub struct Viewfinder {
    preview: PreviewReceiver,
    overlay_feed: OverlaySubscriber,
    overlay: GraphicOverlay,
    texture: Option<TextureHandle>,
    frame_size: Option<[usize; 2]>,
}

impl Viewfinder {
    pub fn new(preview: PreviewReceiver, overlay_feed: OverlaySubscriber) -> Self {
        Self {
            preview,
            overlay_feed,
            overlay: GraphicOverlay::new(),
            texture: None,
            frame_size: None,
        }
    }

    pub fn overlay(&self) -> &GraphicOverlay {
        &self.overlay
    }

    fn upload_latest_frame(&mut self, ctx: &egui::Context) {
        let Some(frame) = self.preview.take_latest() else {
            return;
        };
        let size = [frame.width() as usize, frame.height() as usize];
        let image = egui::ColorImage::from_rgb(size, frame.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("viewfinder", image, TextureOptions::LINEAR))
            }
        }
        self.frame_size = Some(size);
    }

    /// Largest rect with the frame's aspect ratio that fits `available`.
    fn fitted_size(frame: [usize; 2], available: egui::Vec2) -> egui::Vec2 {
        let (w, h) = (frame[0] as f32, frame[1] as f32);
        if w == 0.0 || h == 0.0 {
            return egui::Vec2::ZERO;
        }
        let scale = (available.x / w).min(available.y / h).max(0.0);
        egui::vec2(w * scale, h * scale)
    }
}

impl View for Viewfinder {
    fn draw(&mut self, ui: &mut egui::Ui) {
        self.upload_latest_frame(ui.ctx());
        if let Some(batch) = self.overlay_feed.take_latest() {
            self.overlay.apply(&batch);
        }

        let (Some(texture), Some(frame_size)) = (&self.texture, self.frame_size) else {
            ui.centered_and_justified(|ui| ui.label("Waiting for camera..."));
            return;
        };

        let size = Self::fitted_size(frame_size, ui.available_size());
        let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);
        painter.image(
            texture.id(),
            rect,
            Rect::from_min_max(Pos2::ZERO, egui::pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        self.overlay.set_view_size(rect.width(), rect.height());
        self.overlay.render(&mut EguiCanvas::new(&painter, rect.min));
    }
}
