//! Process-wide logging to console and an append-mode log file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use chrono::Local;

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();

/// Opens the log file under `log_dir`. Call once at startup; log calls made
/// before (or without) init only reach the console.
pub fn init(log_dir: &Path) {
    let _ = std::fs::create_dir_all(log_dir);
    let log_path = log_dir.join("hud_capture.log");
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let _ = LOG_FILE.set(Mutex::new(file));
    }
}

fn write(level: &str, msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] [{}] {}\n", timestamp, level, msg);
    print!("{}", line);
    if let Some(file) = LOG_FILE.get() {
        if let Ok(mut f) = file.lock() {
            let _ = f.write_all(line.as_bytes());
        }
    }
}

pub fn info(msg: &str) {
    write("INFO", msg);
}

pub fn warn(msg: &str) {
    write("WARN", msg);
}

pub fn error(msg: &str) {
    write("ERROR", msg);
}
