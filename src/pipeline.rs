//! One detection cycle: probe, locate, transform, capture once, extract per
//! label.
//!
//! Everything a cycle produces is an immutable snapshot scoped to that cycle:
//! the display topology and scale factors are recomputed every time (displays
//! can be reconnected between cycles), the candidate list is never cached,
//! and the captured frame is shared by all labels then dropped.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::capture::{BackendKind, CaptureChain};
use crate::config::CaptureConfig;
use crate::display::{self, DisplayTopology, ScalingMode};
use crate::error::PipelineError;
use crate::geometry::{Rect, Scale};
use crate::logger;
use crate::region::{self, CaptureResult};
use crate::transform::CoordinateTransformer;
use crate::window::{WindowCandidate, WindowLocator};

/// One labeled calibration-space rectangle to capture this cycle.
#[derive(Clone, Debug)]
pub struct RegionRequest {
    pub label: String,
    pub rect: Rect,
}

/// Per-label outcome. Calibration-data failures (unresolvable or empty
/// regions) land here unmodified so stale calibration stays diagnosable.
#[derive(Debug)]
pub struct RegionOutcome {
    pub label: String,
    pub result: Result<CaptureResult, PipelineError>,
}

/// Everything one cycle produced, for the caller and the diagnostics report.
#[derive(Debug)]
pub struct CycleOutput {
    pub degraded_display: bool,
    pub mode: ScalingMode,
    pub scale: Scale,
    /// Best-ranked window candidate, when any tier matched.
    pub anchor: Option<WindowCandidate>,
    pub tier: Option<&'static str>,
    /// Backend that produced the frame; `None` when no region survived the
    /// transform and the capture was skipped.
    pub backend: Option<BackendKind>,
    pub regions: Vec<RegionOutcome>,
}

/// Detection cycles are serialized process-wide: a new cycle must not start
/// while another one's capture/extract sequence is in flight.
static CYCLE_IN_FLIGHT: AtomicBool = AtomicBool::new(false);

pub(crate) struct CycleGuard;

impl CycleGuard {
    pub(crate) fn acquire() -> Option<Self> {
        if CYCLE_IN_FLIGHT.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self)
        }
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        CYCLE_IN_FLIGHT.store(false, Ordering::SeqCst);
    }
}

/// The capture pipeline, wired once and driven one cycle at a time.
pub struct Pipeline {
    config: CaptureConfig,
    locator: WindowLocator,
    chain: CaptureChain,
}

impl Pipeline {
    /// Production wiring: default tiers, and the default backend order unless
    /// the configuration forces another one.
    pub fn new(config: CaptureConfig) -> Self {
        let chain = match &config.backend_order {
            Some(order) => CaptureChain::from_order(order),
            None => CaptureChain::with_default_backends(),
        };
        Self::with_parts(config, WindowLocator::with_default_tiers(), chain)
    }

    pub fn with_parts(config: CaptureConfig, locator: WindowLocator, chain: CaptureChain) -> Self {
        Self {
            config,
            locator,
            chain,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Runs one cycle over the configured label map.
    pub fn run_configured_cycle(&mut self) -> Result<CycleOutput, PipelineError> {
        let requests: Vec<RegionRequest> = self
            .config
            .regions
            .iter()
            .map(|(label, rect)| RegionRequest {
                label: label.clone(),
                rect: *rect,
            })
            .collect();
        self.run_cycle(&requests)
    }

    /// Runs one full detection cycle for the given labeled rectangles.
    ///
    /// Fails with `CycleBusy` when another cycle is in flight and with
    /// `CaptureUnavailable` when every backend failed; in the latter case no
    /// region is extracted this cycle and the caller retries on the next
    /// scheduled one.
    pub fn run_cycle(&mut self, requests: &[RegionRequest]) -> Result<CycleOutput, PipelineError> {
        let _guard = CycleGuard::acquire().ok_or(PipelineError::CycleBusy)?;
        let topology = display::probe();
        self.run_cycle_inner(requests, &topology)
    }

    fn run_cycle_inner(
        &mut self,
        requests: &[RegionRequest],
        topology: &DisplayTopology,
    ) -> Result<CycleOutput, PipelineError> {
        let primary = topology.primary();
        let (mode, scale) = display::resolve_scaling(primary, self.config.scaling_mode);
        logger::info(&format!(
            "Cycle start: {}x{} primary, {:?} mode, scale ({:.3}, {:.3})",
            primary.bounds.width, primary.bounds.height, mode, scale.sx, scale.sy
        ));

        let located = self.locator.locate(&self.config.window_signatures);
        if located.candidates.is_empty() {
            // Not fatal: proceed with the full-screen assumption.
            logger::info(&format!("{}", PipelineError::WindowNotFound));
        }

        // Capture space has its origin at the frame's top-left pixel.
        let frame_bounds = Rect::new(0, 0, primary.bounds.width, primary.bounds.height);
        let transformer =
            CoordinateTransformer::new(scale, self.config.effective_offset(), frame_bounds);

        let transformed: Vec<(&RegionRequest, Result<Rect, PipelineError>)> = requests
            .iter()
            .map(|request| (request, transformer.apply(request.rect)))
            .collect();

        if transformed.iter().all(|(_, result)| result.is_err()) {
            logger::warn("No region survived the transform; skipping capture this cycle");
            return Ok(CycleOutput {
                degraded_display: topology.degraded,
                mode,
                scale,
                anchor: located.best().cloned(),
                tier: located.tier,
                backend: None,
                regions: transformed
                    .into_iter()
                    .filter_map(|(request, result)| match result {
                        Err(e) => Some(RegionOutcome {
                            label: request.label.clone(),
                            result: Err(e),
                        }),
                        Ok(_) => None,
                    })
                    .collect(),
            });
        }

        // Exactly one capture per cycle; every label shares this frame.
        let frame = self.chain.capture(primary.bounds)?;

        let regions = transformed
            .into_iter()
            .map(|(request, result)| RegionOutcome {
                label: request.label.clone(),
                result: result.and_then(|rect| region::extract(&frame, rect, &request.label)),
            })
            .collect();

        Ok(CycleOutput {
            degraded_display: topology.degraded,
            mode,
            scale,
            anchor: located.best().cloned(),
            tier: located.tier,
            backend: Some(frame.backend),
            regions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureBackend, CaptureFrame};
    use crate::display::DisplayInfo;
    use crate::window::LocateTier;
    use anyhow::anyhow;
    use image::ImageBuffer;
    use std::cell::Cell;
    use std::rc::Rc;

    fn topology(width: i32, height: i32) -> DisplayTopology {
        DisplayTopology {
            displays: vec![DisplayInfo {
                id: 0,
                bounds: Rect::new(0, 0, width, height),
                scale_factor: 1.0,
                is_primary: true,
            }],
            degraded: false,
        }
    }

    struct CountingBackend {
        calls: Rc<Cell<u32>>,
        fail: bool,
    }

    impl CaptureBackend for CountingBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Gdi
        }

        fn attempt(&mut self, target: Rect) -> anyhow::Result<CaptureFrame> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(anyhow!("backend down"));
            }
            Ok(CaptureFrame::new(
                ImageBuffer::new(target.width as u32, target.height as u32),
                BackendKind::Gdi,
            ))
        }
    }

    struct EmptyTier;

    impl LocateTier for EmptyTier {
        fn name(&self) -> &'static str {
            "empty"
        }

        fn attempt(&self, _signatures: &[String]) -> anyhow::Result<Vec<WindowCandidate>> {
            Ok(vec![])
        }
    }

    fn test_pipeline(fail_capture: bool) -> (Pipeline, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let chain = CaptureChain::new(vec![Box::new(CountingBackend {
            calls: calls.clone(),
            fail: fail_capture,
        })]);
        let locator = WindowLocator::new(vec![Box::new(EmptyTier)]);
        let config = CaptureConfig {
            scaling_mode: Some(ScalingMode::Native),
            ..Default::default()
        };
        (Pipeline::with_parts(config, locator, chain), calls)
    }

    fn request(label: &str, rect: Rect) -> RegionRequest {
        RegionRequest {
            label: label.to_string(),
            rect,
        }
    }

    #[test]
    fn test_labels_share_one_capture() {
        let (mut pipeline, calls) = test_pipeline(false);
        let requests = vec![
            request("balance", Rect::new(10, 10, 50, 20)),
            request("current_bet", Rect::new(10, 40, 50, 20)),
            request("last_win", Rect::new(10, 70, 50, 20)),
        ];

        let output = pipeline
            .run_cycle_inner(&requests, &topology(1920, 1080))
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(output.backend, Some(BackendKind::Gdi));
        assert_eq!(output.regions.len(), 3);
        for outcome in &output.regions {
            assert!(outcome.result.is_ok(), "label {} failed", outcome.label);
        }
    }

    #[test]
    fn test_capture_failure_fails_cycle_without_extraction() {
        // Scenario C: every backend raises.
        let (mut pipeline, calls) = test_pipeline(true);
        let requests = vec![request("balance", Rect::new(10, 10, 50, 20))];

        let err = pipeline
            .run_cycle_inner(&requests, &topology(1920, 1080))
            .unwrap_err();

        assert!(matches!(err, PipelineError::CaptureUnavailable));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_unresolvable_label_does_not_poison_others() {
        let (mut pipeline, _) = test_pipeline(false);
        let requests = vec![
            request("off_screen", Rect::new(5000, 5000, 50, 20)),
            request("balance", Rect::new(10, 10, 50, 20)),
        ];

        let output = pipeline
            .run_cycle_inner(&requests, &topology(1920, 1080))
            .unwrap();

        let off_screen = &output.regions[0];
        assert!(matches!(
            off_screen.result,
            Err(PipelineError::UnresolvableRegion { .. })
        ));
        assert!(output.regions[1].result.is_ok());
    }

    #[test]
    fn test_all_labels_unresolvable_skips_capture() {
        let (mut pipeline, calls) = test_pipeline(false);
        let requests = vec![
            request("a", Rect::new(5000, 5000, 50, 20)),
            request("b", Rect::new(6000, 6000, 50, 20)),
        ];

        let output = pipeline
            .run_cycle_inner(&requests, &topology(1920, 1080))
            .unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(output.backend, None);
        assert!(output
            .regions
            .iter()
            .all(|outcome| outcome.result.is_err()));
    }

    #[test]
    fn test_empty_locator_outcome_still_captures() {
        // Scenario D: no anchor, pipeline proceeds full-screen.
        let (mut pipeline, calls) = test_pipeline(false);
        let requests = vec![request("balance", Rect::new(10, 10, 50, 20))];

        let output = pipeline
            .run_cycle_inner(&requests, &topology(1920, 1080))
            .unwrap();

        assert!(output.anchor.is_none());
        assert_eq!(output.tier, None);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fit_mode_scales_requests() {
        let calls = Rc::new(Cell::new(0));
        let chain = CaptureChain::new(vec![Box::new(CountingBackend {
            calls: calls.clone(),
            fail: false,
        })]);
        let locator = WindowLocator::new(vec![Box::new(EmptyTier)]);
        let config = CaptureConfig::default();
        let mut pipeline = Pipeline::with_parts(config, locator, chain);

        let requests = vec![request("balance", Rect::new(100, 100, 50, 50))];
        let output = pipeline
            .run_cycle_inner(&requests, &topology(1280, 720))
            .unwrap();

        assert_eq!(output.mode, ScalingMode::Fit);
        assert_eq!(output.scale, Scale::new(1.5, 1.5));
        let result = output.regions[0].result.as_ref().unwrap();
        assert_eq!(result.rect, Rect::new(150, 150, 75, 75));
    }

    #[test]
    fn test_overlapping_cycle_is_rejected() {
        let held = CycleGuard::acquire().expect("guard should be free");

        let (mut pipeline, calls) = test_pipeline(false);
        let err = pipeline
            .run_cycle(&[request("balance", Rect::new(10, 10, 50, 20))])
            .unwrap_err();

        assert!(matches!(err, PipelineError::CycleBusy));
        assert_eq!(calls.get(), 0);

        drop(held);
        assert!(CycleGuard::acquire().is_some());
    }
}
