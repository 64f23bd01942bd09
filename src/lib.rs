//! Window localization, coordinate transformation, and multi-backend screen
//! capture for a HUD overlay that reads calibrated screen rectangles.
//!
//! One detection cycle runs probe -> locate -> transform -> capture ->
//! extract: the display topology decides the scaling mode, the tiered
//! locator finds the target browser window when it can, every calibrated
//! rectangle is mapped into capture space, a single frame is captured
//! through the backend chain, and each labeled region is cropped out of
//! that frame for the recognizer.

pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod geometry;
pub mod logger;
pub mod paths;
pub mod pipeline;
pub mod region;
pub mod transform;
pub mod window;

mod platform;

pub use capture::{BackendKind, CaptureBackend, CaptureChain, CaptureFrame};
pub use config::CaptureConfig;
pub use display::{DisplayInfo, DisplayTopology, ScalingMode};
pub use error::PipelineError;
pub use geometry::{Offset, Rect, Scale};
pub use pipeline::{CycleOutput, Pipeline, RegionOutcome, RegionRequest};
pub use region::CaptureResult;
pub use transform::CoordinateTransformer;
pub use window::{LocateOutcome, LocateTier, WindowCandidate, WindowLocator};
