use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn logs_dir() -> PathBuf {
    exe_dir().join("logs")
}

/// Returns the directory diagnostic region dumps are written to:
/// `<exe_dir>/screenshots/`
pub fn screenshots_dir() -> PathBuf {
    exe_dir().join("screenshots")
}

/// Returns the default configuration file path: `<exe_dir>/config.json`
pub fn config_path() -> PathBuf {
    exe_dir().join("config.json")
}

/// Ensures all output directories exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(logs_dir())?;
    std::fs::create_dir_all(screenshots_dir())?;
    Ok(())
}
