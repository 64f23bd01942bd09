//! Persisted calibration configuration.
//!
//! Calibration is versioned data consumed by the pure transform: labeled
//! rectangles, one offset pair, and a scaling mode, loaded from config.json
//! beside the executable. The diagnostic override knobs live here too.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::BackendKind;
use crate::display::ScalingMode;
use crate::geometry::{Offset, Rect};
use crate::logger;

/// Complete capture-core configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Label -> calibration-space rectangle. Ordered so cycles and reports
    /// walk labels deterministically.
    #[serde(default = "default_regions")]
    pub regions: BTreeMap<String, Rect>,

    /// Manual pixel correction applied after scaling.
    #[serde(default)]
    pub offset: Offset,

    /// Substrings matched against process names and window titles when
    /// locating the game window.
    #[serde(default = "default_window_signatures")]
    pub window_signatures: Vec<String>,

    /// Diagnostic override: force native or fit scaling instead of deciding
    /// from the display resolution.
    #[serde(default)]
    pub scaling_mode: Option<ScalingMode>,

    /// Diagnostic override: force the capture backend order.
    #[serde(default)]
    pub backend_order: Option<Vec<BackendKind>>,

    /// Diagnostic override: replace the calibrated offset for this run.
    #[serde(default)]
    pub offset_override: Option<Offset>,
}

fn default_regions() -> BTreeMap<String, Rect> {
    BTreeMap::from([
        ("balance".to_string(), Rect::new(1356, 879, 98, 42)),
        ("current_bet".to_string(), Rect::new(1356, 931, 98, 42)),
        ("last_win".to_string(), Rect::new(1356, 983, 98, 42)),
    ])
}

fn default_window_signatures() -> Vec<String> {
    ["chrome", "msedge", "firefox", "opera", "brave"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            offset: Offset::default(),
            window_signatures: default_window_signatures(),
            scaling_mode: None,
            backend_order: None,
            offset_override: None,
        }
    }
}

impl CaptureConfig {
    /// The offset the transform actually uses: the override when forced,
    /// otherwise the calibrated one.
    pub fn effective_offset(&self) -> Offset {
        self.offset_override.unwrap_or(self.offset)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is missing or unreadable. Parse failures are logged, not fatal.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            logger::info(&format!(
                "{} not found; using default configuration",
                path.display()
            ));
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    logger::info(&format!("Configuration loaded from {}", path.display()));
                    config
                }
                Err(e) => {
                    logger::warn(&format!(
                        "Failed to parse {}: {}; using defaults",
                        path.display(),
                        e
                    ));
                    Self::default()
                }
            },
            Err(e) => {
                logger::warn(&format!(
                    "Failed to read {}: {}; using defaults",
                    path.display(),
                    e
                ));
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_have_regions_and_signatures() {
        let config = CaptureConfig::default();
        assert!(!config.regions.is_empty());
        assert!(!config.window_signatures.is_empty());
        assert_eq!(config.effective_offset(), Offset::default());
        assert!(config.scaling_mode.is_none());
        assert!(config.backend_order.is_none());
    }

    #[test]
    fn test_offset_override_wins() {
        let config = CaptureConfig {
            offset: Offset::new(5, 5),
            offset_override: Some(Offset::new(-3, 9)),
            ..Default::default()
        };
        assert_eq!(config.effective_offset(), Offset::new(-3, 9));
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "regions": { "balance": { "x": 10, "y": 20, "width": 100, "height": 40 } },
            "offset": { "dx": 12, "dy": -8 },
            "window_signatures": ["chrome"],
            "scaling_mode": "native",
            "backend_order": ["gdi", "external"]
        }"#;
        let config: CaptureConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.regions["balance"], Rect::new(10, 20, 100, 40));
        assert_eq!(config.offset, Offset::new(12, -8));
        assert_eq!(config.scaling_mode, Some(ScalingMode::Native));
        assert_eq!(
            config.backend_order,
            Some(vec![BackendKind::Gdi, BackendKind::External])
        );
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: CaptureConfig = serde_json::from_str(r#"{ "offset": { "dx": 1, "dy": 2 } }"#)
            .unwrap();
        assert_eq!(config.offset, Offset::new(1, 2));
        assert!(!config.regions.is_empty());
        assert!(config.backend_order.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = CaptureConfig::load_or_default(Path::new("definitely/not/here.json"));
        assert!(!config.regions.is_empty());
    }

    #[test]
    fn test_load_garbage_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(b"{ not json").unwrap();
        let config = CaptureConfig::load_or_default(file.path());
        assert_eq!(config.regions, default_regions());
    }
}
