//! The three locator strategies, cheapest-precision first.

use anyhow::Result;

use super::{
    ESTIMATED_BOUNDS, LocateTier, MIN_MAIN_WINDOW_HEIGHT, MIN_MAIN_WINDOW_WIDTH, MatchKind,
    WindowCandidate, match_signature,
};
use crate::platform;

/// Tier 1: enumerate all visible, unowned top-level windows and classify them
/// by process name or title. Real geometry.
pub struct FullEnumerationTier;

impl LocateTier for FullEnumerationTier {
    fn name(&self) -> &'static str {
        "full-enumeration"
    }

    fn attempt(&self, signatures: &[String]) -> Result<Vec<WindowCandidate>> {
        let windows = platform::list_windows()?;

        let mut candidates = Vec::new();
        for window in windows {
            if window.has_parent {
                continue;
            }
            // Undersized windows are dialogs or popups, not main windows.
            if window.bounds.width < MIN_MAIN_WINDOW_WIDTH
                || window.bounds.height < MIN_MAIN_WINDOW_HEIGHT
            {
                continue;
            }
            let Some((signature_index, matched)) =
                match_signature(signatures, &window.process_name, &window.title)
            else {
                continue;
            };
            candidates.push(WindowCandidate {
                id: window.id,
                title: window.title,
                process_name: window.process_name,
                bounds: window.bounds,
                has_parent: window.has_parent,
                matched,
                signature_index,
                estimated: false,
            });
        }
        Ok(candidates)
    }
}

/// Tier 2: enumerate processes by name. No geometry; a title is attached when
/// one is independently obtainable, otherwise the process name stands in.
pub struct ProcessMatchTier;

impl LocateTier for ProcessMatchTier {
    fn name(&self) -> &'static str {
        "process-match"
    }

    fn attempt(&self, signatures: &[String]) -> Result<Vec<WindowCandidate>> {
        let processes = platform::list_processes()?;

        let mut candidates = Vec::new();
        for process in processes {
            let Some((signature_index, _)) = match_signature(signatures, &process.name, "") else {
                continue;
            };
            let title =
                platform::title_for_pid(process.pid).unwrap_or_else(|| process.name.clone());
            candidates.push(WindowCandidate {
                id: process.pid as u64,
                title,
                process_name: process.name,
                bounds: ESTIMATED_BOUNDS,
                has_parent: false,
                matched: MatchKind::Process,
                signature_index,
                estimated: true,
            });
        }
        Ok(candidates)
    }
}

/// Tier 3: bare process-presence check, no window API calls at all. One
/// estimated candidate per matched signature.
pub struct ProcessPresenceTier;

impl LocateTier for ProcessPresenceTier {
    fn name(&self) -> &'static str {
        "process-presence"
    }

    fn attempt(&self, signatures: &[String]) -> Result<Vec<WindowCandidate>> {
        let processes = platform::list_processes()?;

        let mut candidates = Vec::new();
        for (signature_index, signature) in signatures.iter().enumerate() {
            let needle = signature.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let Some(process) = processes
                .iter()
                .find(|p| p.name.to_lowercase().contains(&needle))
            else {
                continue;
            };
            candidates.push(WindowCandidate {
                id: process.pid as u64,
                title: signature.clone(),
                process_name: process.name.clone(),
                bounds: ESTIMATED_BOUNDS,
                has_parent: false,
                matched: MatchKind::Process,
                signature_index,
                estimated: true,
            });
        }
        Ok(candidates)
    }
}
