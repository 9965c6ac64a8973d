use super::graphic_overlay::BoxStyle;
use crate::common::PixelRect;

/// A drawing surface in view coordinates.
pub trait Canvas {
    /// Strokes the outline of `rect`; the interior is left untouched.
    fn draw_rect(&mut self, rect: PixelRect, style: &BoxStyle);
}
