//! Display topology probing and scaling-mode selection.
//!
//! The probe runs once per detection cycle. Results are never cached across
//! cycles because displays can be reconnected between them.

use std::sync::Once;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Scale};
use crate::logger;
use crate::platform;

/// Native resolution at or above which calibration coordinates are taken as-is.
pub const NATIVE_WIDTH_THRESHOLD: i32 = 2560;
pub const NATIVE_HEIGHT_THRESHOLD: i32 = 1440;

/// Reference resolution calibration rectangles are mapped against in FIT mode.
pub const REFERENCE_WIDTH: i32 = 1920;
pub const REFERENCE_HEIGHT: i32 = 1080;

static PROBE_FAILURE_LOGGED: Once = Once::new();

/// How calibration-space rectangles map onto the capture frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMode {
    /// Identity scale; only the manual offset applies.
    Native,
    /// Stretch against the 1920x1080 reference resolution.
    Fit,
}

/// One attached display.
#[derive(Clone, Debug)]
pub struct DisplayInfo {
    pub id: u32,
    pub bounds: Rect,
    /// OS DPI scale, >= 1.0.
    pub scale_factor: f64,
    pub is_primary: bool,
}

/// Snapshot of the attached displays for a single cycle.
#[derive(Clone, Debug)]
pub struct DisplayTopology {
    pub displays: Vec<DisplayInfo>,
    /// True when the platform query failed and the fixed fallback is in use.
    pub degraded: bool,
}

impl DisplayTopology {
    /// The primary display, or the first one when no display carries the
    /// primary flag.
    pub fn primary(&self) -> &DisplayInfo {
        self.displays
            .iter()
            .find(|d| d.is_primary)
            .unwrap_or(&self.displays[0])
    }
}

/// Queries the attached displays.
///
/// On platform failure there is no retry: a single 1920x1080 primary display
/// is assumed, the topology is tagged degraded, and a warning is logged once
/// per process lifetime so repeating cycles cannot flood the log.
pub fn probe() -> DisplayTopology {
    match platform::list_displays() {
        Ok(displays) if !displays.is_empty() => DisplayTopology {
            displays,
            degraded: false,
        },
        Ok(_) => {
            log_probe_failure("display query returned no displays");
            fallback_topology()
        }
        Err(e) => {
            log_probe_failure(&e.to_string());
            fallback_topology()
        }
    }
}

fn log_probe_failure(reason: &str) {
    PROBE_FAILURE_LOGGED.call_once(|| {
        logger::warn(&format!(
            "Display probe failed ({}); assuming a single 1920x1080 display",
            reason
        ));
    });
}

/// The fixed degraded topology used when the display query fails.
pub fn fallback_topology() -> DisplayTopology {
    DisplayTopology {
        displays: vec![DisplayInfo {
            id: 0,
            bounds: Rect::new(0, 0, REFERENCE_WIDTH, REFERENCE_HEIGHT),
            scale_factor: 1.0,
            is_primary: true,
        }],
        degraded: true,
    }
}

/// Decides the scaling mode for `primary` and the scale factors that go with
/// it. A forced mode (diagnostic override) short-circuits the resolution rule.
pub fn resolve_scaling(primary: &DisplayInfo, forced: Option<ScalingMode>) -> (ScalingMode, Scale) {
    let mode = match forced {
        Some(mode) => mode,
        None => {
            if primary.bounds.width >= NATIVE_WIDTH_THRESHOLD
                || primary.bounds.height >= NATIVE_HEIGHT_THRESHOLD
            {
                ScalingMode::Native
            } else {
                ScalingMode::Fit
            }
        }
    };

    let scale = match mode {
        ScalingMode::Native => Scale::IDENTITY,
        ScalingMode::Fit => Scale::new(
            REFERENCE_WIDTH as f64 / primary.bounds.width as f64,
            REFERENCE_HEIGHT as f64 / primary.bounds.height as f64,
        ),
    };

    (mode, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(width: i32, height: i32) -> DisplayInfo {
        DisplayInfo {
            id: 0,
            bounds: Rect::new(0, 0, width, height),
            scale_factor: 1.0,
            is_primary: true,
        }
    }

    #[test]
    fn test_high_resolution_selects_native() {
        let (mode, scale) = resolve_scaling(&display(2560, 1440), None);
        assert_eq!(mode, ScalingMode::Native);
        assert!(scale.is_identity());
    }

    #[test]
    fn test_wide_display_selects_native_on_width_alone() {
        let (mode, _) = resolve_scaling(&display(2560, 1080), None);
        assert_eq!(mode, ScalingMode::Native);
    }

    #[test]
    fn test_tall_display_selects_native_on_height_alone() {
        let (mode, _) = resolve_scaling(&display(1920, 1440), None);
        assert_eq!(mode, ScalingMode::Native);
    }

    #[test]
    fn test_reference_display_selects_fit_with_unit_scale() {
        let (mode, scale) = resolve_scaling(&display(1920, 1080), None);
        assert_eq!(mode, ScalingMode::Fit);
        assert_eq!(scale.sx, 1.0);
        assert_eq!(scale.sy, 1.0);
    }

    #[test]
    fn test_small_display_scales_up() {
        let (mode, scale) = resolve_scaling(&display(1280, 720), None);
        assert_eq!(mode, ScalingMode::Fit);
        assert_eq!(scale.sx, 1.5);
        assert_eq!(scale.sy, 1.5);
    }

    #[test]
    fn test_forced_mode_overrides_resolution_rule() {
        let (mode, scale) = resolve_scaling(&display(1280, 720), Some(ScalingMode::Native));
        assert_eq!(mode, ScalingMode::Native);
        assert!(scale.is_identity());
    }

    #[test]
    fn test_fallback_topology_is_degraded_reference_display() {
        let topo = fallback_topology();
        assert!(topo.degraded);
        assert_eq!(topo.displays.len(), 1);
        let primary = topo.primary();
        assert!(primary.is_primary);
        assert_eq!(primary.bounds, Rect::new(0, 0, 1920, 1080));
    }
}
