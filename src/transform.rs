//! Maps calibration-space rectangles to capture-space pixels.
//!
//! The order of operations is fixed: scale first, then the manual offset,
//! then clamping to the frame. Applying the offset before scaling, or
//! applying either step twice, is a defect.

use crate::error::PipelineError;
use crate::geometry::{Offset, Rect, Scale};

/// Pure calibration-space to capture-space transform for one cycle.
///
/// Built once per cycle from the probed scale, the configured offset, and the
/// frame bounds, then applied to every labeled rectangle.
#[derive(Clone, Copy, Debug)]
pub struct CoordinateTransformer {
    scale: Scale,
    offset: Offset,
    frame_bounds: Rect,
}

impl CoordinateTransformer {
    pub fn new(scale: Scale, offset: Offset, frame_bounds: Rect) -> Self {
        Self {
            scale,
            offset,
            frame_bounds,
        }
    }

    /// Transforms one rectangle, clamping the result into the frame bounds.
    ///
    /// Fails with `UnresolvableRegion` when clamping leaves no area, which
    /// indicates stale calibration rather than a transient fault.
    pub fn apply(&self, rect: Rect) -> Result<Rect, PipelineError> {
        let scaled = if self.scale.is_identity() {
            // Native mode skips the float path entirely.
            rect
        } else {
            Rect::new(
                (rect.x as f64 * self.scale.sx).floor() as i32,
                (rect.y as f64 * self.scale.sy).floor() as i32,
                (rect.width as f64 * self.scale.sx).floor() as i32,
                (rect.height as f64 * self.scale.sy).floor() as i32,
            )
        };

        let shifted = Rect::new(
            scaled.x + self.offset.dx,
            scaled.y + self.offset.dy,
            scaled.width,
            scaled.height,
        );

        let clamped = shifted.clamped_to(self.frame_bounds);
        if !clamped.has_area() {
            // Surface the calibration-space rectangle: that is the one the
            // user has to fix.
            return Err(PipelineError::UnresolvableRegion { rect });
        }
        Ok(clamped)
    }
}
