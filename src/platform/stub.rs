//! Non-Windows stand-ins. Each query reports itself unavailable; the callers
//! fall through to their degraded paths.

use anyhow::{anyhow, Result};

use super::{ProcessEntry, RawWindow};
use crate::display::DisplayInfo;

pub fn list_displays() -> Result<Vec<DisplayInfo>> {
    Err(anyhow!("display enumeration is not available on this platform"))
}

pub fn list_windows() -> Result<Vec<RawWindow>> {
    Err(anyhow!("window enumeration is not available on this platform"))
}

pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    Err(anyhow!("process enumeration is not available on this platform"))
}

pub fn title_for_pid(_pid: u32) -> Option<String> {
    None
}
