//! Calibration validation without the recognizer.
//!
//! Runs one full detection cycle over the configured rectangles and reports
//! per-label success or failure, the elapsed time, and which backend and
//! locator tier the cycle went through.

use std::time::{Duration, Instant};

use chrono::Local;

use crate::capture::BackendKind;
use crate::display::ScalingMode;
use crate::error::PipelineError;
use crate::geometry::Rect;
use crate::logger;
use crate::paths;
use crate::pipeline::Pipeline;

pub struct DiagnosticEntry {
    pub label: String,
    /// Capture-space rectangle on success.
    pub rect: Option<Rect>,
    pub error: Option<String>,
}

impl DiagnosticEntry {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

pub struct DiagnosticReport {
    pub elapsed: Duration,
    pub degraded_display: bool,
    pub mode: ScalingMode,
    pub tier: Option<&'static str>,
    pub backend: Option<BackendKind>,
    pub entries: Vec<DiagnosticEntry>,
}

impl DiagnosticReport {
    pub fn passed(&self) -> usize {
        self.entries.iter().filter(|e| e.ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.passed()
    }

    /// Human-readable report lines for the log.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(format!(
            "Diagnostic cycle finished in {} ms ({} ok, {} failed)",
            self.elapsed.as_millis(),
            self.passed(),
            self.failed()
        ));
        lines.push(format!(
            "  mode: {:?}{}, tier: {}, backend: {}",
            self.mode,
            if self.degraded_display {
                " (degraded display fallback)"
            } else {
                ""
            },
            self.tier.unwrap_or("none (full-screen)"),
            self.backend
                .map(|b| b.to_string())
                .unwrap_or_else(|| "none".to_string()),
        ));
        for entry in &self.entries {
            match (&entry.rect, &entry.error) {
                (Some(rect), None) => lines.push(format!(
                    "  [ok]   {}: {}x{} at ({}, {})",
                    entry.label, rect.width, rect.height, rect.x, rect.y
                )),
                (_, Some(error)) => lines.push(format!("  [fail] {}: {}", entry.label, error)),
                _ => {}
            }
        }
        lines
    }
}

/// Runs one diagnostic cycle. With `dump` set, every successfully cropped
/// region is written to the screenshots directory as a timestamped PNG.
pub fn run(pipeline: &mut Pipeline, dump: bool) -> Result<DiagnosticReport, PipelineError> {
    let start = Instant::now();
    let output = pipeline.run_configured_cycle()?;
    let elapsed = start.elapsed();

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut entries = Vec::with_capacity(output.regions.len());
    for outcome in &output.regions {
        match &outcome.result {
            Ok(result) => {
                if dump {
                    let filename = format!("hud_{}_{}.png", result.label, timestamp);
                    let path = paths::screenshots_dir().join(&filename);
                    match result.save_png(&path) {
                        Ok(()) => logger::info(&format!("Dumped {}", path.display())),
                        Err(e) => {
                            logger::warn(&format!("Could not dump {}: {}", result.label, e))
                        }
                    }
                }
                entries.push(DiagnosticEntry {
                    label: outcome.label.clone(),
                    rect: Some(result.rect),
                    error: None,
                });
            }
            Err(e) => entries.push(DiagnosticEntry {
                label: outcome.label.clone(),
                rect: None,
                error: Some(e.to_string()),
            }),
        }
    }

    Ok(DiagnosticReport {
        elapsed,
        degraded_display: output.degraded_display,
        mode: output.mode,
        tier: output.tier,
        backend: output.backend,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> DiagnosticReport {
        DiagnosticReport {
            elapsed: Duration::from_millis(42),
            degraded_display: true,
            mode: ScalingMode::Fit,
            tier: None,
            backend: Some(BackendKind::External),
            entries: vec![
                DiagnosticEntry {
                    label: "balance".to_string(),
                    rect: Some(Rect::new(10, 20, 98, 42)),
                    error: None,
                },
                DiagnosticEntry {
                    label: "last_win".to_string(),
                    rect: None,
                    error: Some("region has zero area".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_report_counts() {
        let report = report();
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_report_lines_cover_every_label() {
        let lines = report().lines();
        assert!(lines[0].contains("1 ok"));
        assert!(lines[0].contains("1 failed"));
        assert!(lines[1].contains("degraded"));
        assert!(lines[1].contains("full-screen"));
        assert!(lines.iter().any(|l| l.contains("[ok]   balance")));
        assert!(lines.iter().any(|l| l.contains("[fail] last_win")));
    }
}
