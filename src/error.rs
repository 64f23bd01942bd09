//! Structured failure kinds surfaced to the overlay application.
//!
//! Platform errors never cross the crate boundary raw: tier and backend
//! internals use `anyhow`, and only these kinds reach the caller.

use thiserror::Error;

use crate::geometry::Rect;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Display query failed; the pipeline recovered with the fixed 1920x1080
    /// fallback. Logged once per process, not per cycle.
    #[error("display probe failed; assuming a single 1920x1080 display")]
    DisplayProbeFailed,

    /// Every locator tier returned empty. Not fatal: callers proceed with a
    /// full-screen assumption and no window anchor.
    #[error("no window matched any locator tier")]
    WindowNotFound,

    /// Every backend in the capture chain failed for this cycle. The caller
    /// skips recognition for the cycle and retries on the next scheduled one.
    #[error("all capture backends failed for this cycle")]
    CaptureUnavailable,

    /// The transform produced a non-positive rectangle after clamping. Bad
    /// calibration, not a transient fault; requires recalibration.
    #[error("calibrated rectangle resolves outside the frame: {rect:?}")]
    UnresolvableRegion { rect: Rect },

    /// The post-capture clamp produced zero area. Same handling as
    /// `UnresolvableRegion`: surfaced unmodified, never auto-corrected.
    #[error("region has zero area after clamping to the frame: requested {requested:?}, clamped {clamped:?}")]
    EmptyRegion { requested: Rect, clamped: Rect },

    /// A detection cycle was started while the previous one was still in
    /// flight. Cycles are serialized to prevent duplicate screen grabs.
    #[error("a detection cycle is already in flight")]
    CycleBusy,
}
