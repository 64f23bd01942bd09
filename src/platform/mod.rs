//! OS-specific queries behind a uniform surface.
//!
//! `win32` is the real implementation; every other OS gets the stub, which
//! reports the queries as unavailable so the callers' fallback paths (degraded
//! display topology, empty locator outcome, external-utility capture) kick in.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{list_displays, list_processes, list_windows, title_for_pid};

#[cfg(not(windows))]
mod stub;
#[cfg(not(windows))]
pub use stub::{list_displays, list_processes, list_windows, title_for_pid};

use crate::geometry::Rect;

/// A top-level window as reported by the OS, before classification.
#[derive(Clone, Debug)]
pub struct RawWindow {
    pub id: u64,
    pub title: String,
    pub process_name: String,
    pub bounds: Rect,
    pub has_parent: bool,
}

/// A running process as reported by the OS process list.
#[derive(Clone, Debug)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}
