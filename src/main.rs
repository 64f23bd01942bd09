//! Diagnostic entry point: runs one detection cycle over the configured
//! rectangles and reports what happened, without involving the recognizer.
//!
//! Usage: `hud-capture [config.json] [--dump]`
//!
//! `--dump` writes every successfully cropped region to the screenshots
//! directory for visual calibration checks.

use std::path::PathBuf;

use anyhow::Result;

use hud_capture::config::CaptureConfig;
use hud_capture::pipeline::Pipeline;
use hud_capture::{diagnostics, logger, paths};

fn main() -> Result<()> {
    paths::ensure_directories()?;
    logger::init(&paths::logs_dir());

    let mut config_path = paths::config_path();
    let mut dump = false;
    for arg in std::env::args().skip(1) {
        if arg == "--dump" {
            dump = true;
        } else {
            config_path = PathBuf::from(arg);
        }
    }

    let config = CaptureConfig::load_or_default(&config_path);
    let mut pipeline = Pipeline::new(config);

    match diagnostics::run(&mut pipeline, dump) {
        Ok(report) => {
            for line in report.lines() {
                logger::info(&line);
            }
            if report.failed() > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            logger::error(&format!("Diagnostic cycle failed: {}", e));
            std::process::exit(2);
        }
    }
}
