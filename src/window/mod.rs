//! Target-window localization with tiered fallback.
//!
//! Three strategies are tried in order, each only when the previous yielded
//! zero candidates or errored: full window enumeration, process match without
//! geometry, and a bare process-presence check. An empty outcome is a value,
//! not an error; callers then proceed full-screen with no window anchor.

mod tiers;

pub use tiers::{FullEnumerationTier, ProcessMatchTier, ProcessPresenceTier};

use anyhow::Result;

use crate::geometry::Rect;
use crate::logger;

/// Windows smaller than this are treated as dialogs or popups, not main
/// windows, and discarded during full enumeration.
pub const MIN_MAIN_WINDOW_WIDTH: i32 = 300;
pub const MIN_MAIN_WINDOW_HEIGHT: i32 = 200;

/// Placeholder bounds for candidates produced without real geometry.
pub const ESTIMATED_BOUNDS: Rect = Rect::new(100, 100, 1200, 800);

/// What part of the window matched a caller-supplied signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchKind {
    Process,
    Title,
}

/// One candidate target window, produced fresh on every locate call.
#[derive(Clone, Debug)]
pub struct WindowCandidate {
    pub id: u64,
    pub title: String,
    pub process_name: String,
    pub bounds: Rect,
    pub has_parent: bool,
    pub matched: MatchKind,
    /// Index of the first matching signature, used as the ranking tiebreaker.
    pub signature_index: usize,
    /// True when the bounds are a placeholder rather than real geometry.
    pub estimated: bool,
}

/// One localization strategy. Returns every candidate it can see; an empty
/// list or an error makes the locator fall through to the next tier.
pub trait LocateTier {
    fn name(&self) -> &'static str;
    fn attempt(&self, signatures: &[String]) -> Result<Vec<WindowCandidate>>;
}

/// Outcome of one locate call: the ranked candidates and the tier that
/// produced them (`None` when every tier came up empty).
#[derive(Debug, Default)]
pub struct LocateOutcome {
    pub candidates: Vec<WindowCandidate>,
    pub tier: Option<&'static str>,
}

impl LocateOutcome {
    pub fn best(&self) -> Option<&WindowCandidate> {
        self.candidates.first()
    }
}

/// Tiered window locator. Tiers run in order; the first non-empty result is
/// ranked and returned.
pub struct WindowLocator {
    tiers: Vec<Box<dyn LocateTier>>,
}

impl WindowLocator {
    pub fn new(tiers: Vec<Box<dyn LocateTier>>) -> Self {
        Self { tiers }
    }

    /// The production tier order: enumeration, process match, process presence.
    pub fn with_default_tiers() -> Self {
        Self::new(vec![
            Box::new(FullEnumerationTier),
            Box::new(ProcessMatchTier),
            Box::new(ProcessPresenceTier),
        ])
    }

    pub fn locate(&self, signatures: &[String]) -> LocateOutcome {
        for tier in &self.tiers {
            match tier.attempt(signatures) {
                Ok(candidates) if !candidates.is_empty() => {
                    let mut candidates = candidates;
                    rank(&mut candidates);
                    logger::info(&format!(
                        "Window locate: {} candidate(s) via {}",
                        candidates.len(),
                        tier.name()
                    ));
                    return LocateOutcome {
                        candidates,
                        tier: Some(tier.name()),
                    };
                }
                Ok(_) => {
                    logger::info(&format!("Window locate: {} found nothing", tier.name()));
                }
                Err(e) => {
                    logger::warn(&format!("Window locate: {} failed: {}", tier.name(), e));
                }
            }
        }
        LocateOutcome::default()
    }
}

/// Largest window first; ties broken by first-matching-signature order.
fn rank(candidates: &mut [WindowCandidate]) {
    candidates.sort_by(|a, b| {
        b.bounds
            .area()
            .cmp(&a.bounds.area())
            .then(a.signature_index.cmp(&b.signature_index))
    });
}

/// Returns the index of the first signature contained (case-insensitively) in
/// either haystack, preferring the process name.
pub(crate) fn match_signature(
    signatures: &[String],
    process_name: &str,
    title: &str,
) -> Option<(usize, MatchKind)> {
    let process_lower = process_name.to_lowercase();
    let title_lower = title.to_lowercase();
    for (index, signature) in signatures.iter().enumerate() {
        let needle = signature.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if process_lower.contains(&needle) {
            return Some((index, MatchKind::Process));
        }
        if title_lower.contains(&needle) {
            return Some((index, MatchKind::Title));
        }
    }
    None
}
