//! Crops labeled regions out of a captured frame.

use image::{ImageBuffer, Rgba};

use crate::capture::{BackendKind, CaptureFrame};
use crate::error::PipelineError;
use crate::geometry::Rect;

/// One cropped region, ready for the recognizer. Ownership transfers to the
/// caller; the source frame stays with the cycle.
#[derive(Debug)]
pub struct CaptureResult {
    pub label: String,
    pub image: ImageBuffer<Rgba<u8>, Vec<u8>>,
    /// The cropped rectangle in capture space, after the final clamp.
    pub rect: Rect,
    pub backend: BackendKind,
}

impl CaptureResult {
    /// Writes the cropped region as a PNG (diagnostic dumps).
    pub fn save_png(&self, path: &std::path::Path) -> anyhow::Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}

/// Crops `rect` out of `frame` under `label`.
///
/// The rectangle is re-clamped against the actual frame dimensions even
/// though the transformer already clamped it: the frame's size is only known
/// after capture and may disagree with the probed display bounds.
pub fn extract(
    frame: &CaptureFrame,
    rect: Rect,
    label: &str,
) -> Result<CaptureResult, PipelineError> {
    let clamped = rect.clamped_to(frame.bounds());
    if !clamped.has_area() {
        return Err(PipelineError::EmptyRegion {
            requested: rect,
            clamped,
        });
    }

    let image = image::imageops::crop_imm(
        &frame.image,
        clamped.x as u32,
        clamped.y as u32,
        clamped.width as u32,
        clamped.height as u32,
    )
    .to_image();

    Ok(CaptureResult {
        label: label.to_string(),
        image,
        rect: clamped,
        backend: frame.backend,
    })
}
