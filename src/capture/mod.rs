//! Full-frame capture through an ordered chain of backend strategies.
//!
//! The chain tries each backend in turn and returns the first valid frame.
//! Backends never race in parallel: one screen read per cycle, and a failed
//! backend releases its partial state before the next one runs.

pub mod external;

#[cfg(windows)]
mod gdi;
#[cfg(windows)]
mod wgc;

pub use external::ExternalToolBackend;
#[cfg(windows)]
pub use gdi::GdiBackend;
#[cfg(windows)]
pub use wgc::GraphicsCaptureBackend;

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Local};
use image::{ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::geometry::Rect;
use crate::logger;

/// Identity of the backend that produced a frame, carried through to the
/// recognizer for traceability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hardware-accelerated Windows.Graphics.Capture.
    Hardware,
    /// Software GDI blit.
    Gdi,
    /// External OS screenshot utility run as a subprocess.
    External,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Hardware => "hardware",
            BackendKind::Gdi => "gdi",
            BackendKind::External => "external",
        };
        write!(f, "{}", name)
    }
}

/// One captured full frame. Owned by the cycle that produced it, shared by
/// every labeled region in that cycle, and dropped at cycle end.
#[derive(Debug)]
pub struct CaptureFrame {
    pub image: ImageBuffer<Rgba<u8>, Vec<u8>>,
    pub backend: BackendKind,
    pub captured_at: DateTime<Local>,
}

impl CaptureFrame {
    pub fn new(image: ImageBuffer<Rgba<u8>, Vec<u8>>, backend: BackendKind) -> Self {
        Self {
            image,
            backend,
            captured_at: Local::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Frame bounds in capture space (origin at the frame's top-left pixel).
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width() as i32, self.height() as i32)
    }
}

/// One concrete mechanism for obtaining a full-frame pixel buffer.
pub trait CaptureBackend {
    fn kind(&self) -> BackendKind;

    /// Captures the given screen region as a full frame. Any partial state
    /// (device objects, temp files, subprocesses) must be released before
    /// this returns, on success and failure alike.
    fn attempt(&mut self, target: Rect) -> Result<CaptureFrame>;
}

/// Ordered backend chain with linear fallthrough.
pub struct CaptureChain {
    backends: Vec<Box<dyn CaptureBackend>>,
}

impl CaptureChain {
    pub fn new(backends: Vec<Box<dyn CaptureBackend>>) -> Self {
        Self { backends }
    }

    /// The production order: hardware capture, then GDI, then the external
    /// utility. Platforms without the first two start at the external one.
    pub fn with_default_backends() -> Self {
        Self::from_order(&[
            BackendKind::Hardware,
            BackendKind::Gdi,
            BackendKind::External,
        ])
    }

    /// Builds a chain in an explicitly forced order (diagnostic override).
    /// Kinds unavailable on this platform are skipped with a warning.
    pub fn from_order(order: &[BackendKind]) -> Self {
        let mut backends: Vec<Box<dyn CaptureBackend>> = Vec::new();
        for kind in order {
            match make_backend(*kind) {
                Some(backend) => backends.push(backend),
                None => logger::warn(&format!(
                    "Capture backend {} is unavailable on this platform; skipping",
                    kind
                )),
            }
        }
        Self::new(backends)
    }

    /// Walks the chain once and returns the first valid frame.
    ///
    /// Called at most once per detection cycle; exhausting every backend is
    /// `CaptureUnavailable` and there is no retry within the cycle.
    pub fn capture(&mut self, target: Rect) -> Result<CaptureFrame, PipelineError> {
        for backend in &mut self.backends {
            let kind = backend.kind();
            match backend.attempt(target) {
                Ok(frame) => {
                    if frame.width() == 0 || frame.height() == 0 {
                        logger::warn(&format!(
                            "Capture backend {} returned an empty frame; trying next",
                            kind
                        ));
                        continue;
                    }
                    logger::info(&format!(
                        "Captured {}x{} frame via {}",
                        frame.width(),
                        frame.height(),
                        kind
                    ));
                    return Ok(frame);
                }
                Err(e) => {
                    logger::warn(&format!(
                        "Capture backend {} failed: {}; trying next",
                        kind, e
                    ));
                }
            }
        }
        Err(PipelineError::CaptureUnavailable)
    }
}

#[cfg(windows)]
fn make_backend(kind: BackendKind) -> Option<Box<dyn CaptureBackend>> {
    match kind {
        BackendKind::Hardware => Some(Box::new(GraphicsCaptureBackend::new())),
        BackendKind::Gdi => Some(Box::new(GdiBackend)),
        BackendKind::External => Some(Box::new(ExternalToolBackend::new())),
    }
}

#[cfg(not(windows))]
fn make_backend(kind: BackendKind) -> Option<Box<dyn CaptureBackend>> {
    match kind {
        BackendKind::Hardware | BackendKind::Gdi => None,
        BackendKind::External => Some(Box::new(ExternalToolBackend::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::rc::Rc;

    const TARGET: Rect = Rect::new(0, 0, 64, 64);

    enum MockOutcome {
        Frame(u32, u32),
        Failure,
    }

    struct MockBackend {
        kind: BackendKind,
        calls: Rc<Cell<u32>>,
        outcome: MockOutcome,
    }

    impl CaptureBackend for MockBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn attempt(&mut self, _target: Rect) -> Result<CaptureFrame> {
            self.calls.set(self.calls.get() + 1);
            match self.outcome {
                MockOutcome::Frame(w, h) => {
                    Ok(CaptureFrame::new(ImageBuffer::new(w, h), self.kind))
                }
                MockOutcome::Failure => Err(anyhow!("mock backend down")),
            }
        }
    }

    fn backend(
        kind: BackendKind,
        outcome: MockOutcome,
    ) -> (Box<dyn CaptureBackend>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Box::new(MockBackend {
                kind,
                calls: calls.clone(),
                outcome,
            }),
            calls,
        )
    }

    #[test]
    fn test_first_backend_success_stops_chain() {
        let (b1, c1) = backend(BackendKind::Hardware, MockOutcome::Frame(64, 64));
        let (b2, c2) = backend(BackendKind::Gdi, MockOutcome::Frame(64, 64));
        let (b3, c3) = backend(BackendKind::External, MockOutcome::Frame(64, 64));

        let frame = CaptureChain::new(vec![b1, b2, b3]).capture(TARGET).unwrap();

        assert_eq!(frame.backend, BackendKind::Hardware);
        assert_eq!(c1.get(), 1);
        assert_eq!(c2.get(), 0);
        assert_eq!(c3.get(), 0);
    }

    #[test]
    fn test_backend_invoked_only_after_predecessors_fail() {
        let (b1, c1) = backend(BackendKind::Hardware, MockOutcome::Failure);
        let (b2, c2) = backend(BackendKind::Gdi, MockOutcome::Failure);
        let (b3, c3) = backend(BackendKind::External, MockOutcome::Frame(32, 32));

        let frame = CaptureChain::new(vec![b1, b2, b3]).capture(TARGET).unwrap();

        assert_eq!(frame.backend, BackendKind::External);
        assert_eq!(c1.get(), 1);
        assert_eq!(c2.get(), 1);
        assert_eq!(c3.get(), 1);
    }

    #[test]
    fn test_empty_frame_advances_chain() {
        let (b1, _) = backend(BackendKind::Hardware, MockOutcome::Frame(0, 0));
        let (b2, c2) = backend(BackendKind::Gdi, MockOutcome::Frame(16, 16));

        let frame = CaptureChain::new(vec![b1, b2]).capture(TARGET).unwrap();

        assert_eq!(frame.backend, BackendKind::Gdi);
        assert_eq!(c2.get(), 1);
    }

    #[test]
    fn test_all_backends_failing_is_capture_unavailable() {
        let (b1, c1) = backend(BackendKind::Hardware, MockOutcome::Failure);
        let (b2, c2) = backend(BackendKind::Gdi, MockOutcome::Failure);
        let (b3, c3) = backend(BackendKind::External, MockOutcome::Failure);

        let err = CaptureChain::new(vec![b1, b2, b3])
            .capture(TARGET)
            .unwrap_err();

        assert!(matches!(err, PipelineError::CaptureUnavailable));
        assert_eq!(c1.get(), 1);
        assert_eq!(c2.get(), 1);
        assert_eq!(c3.get(), 1);
    }

    #[test]
    fn test_empty_chain_is_capture_unavailable() {
        let err = CaptureChain::new(vec![]).capture(TARGET).unwrap_err();
        assert!(matches!(err, PipelineError::CaptureUnavailable));
    }

    #[test]
    fn test_backend_kind_display_names() {
        assert_eq!(BackendKind::Hardware.to_string(), "hardware");
        assert_eq!(BackendKind::Gdi.to_string(), "gdi");
        assert_eq!(BackendKind::External.to_string(), "external");
    }
}
