//! Last-resort capture through the OS screenshot utility.
//!
//! The utility runs as a subprocess writing a PNG into a temp directory. The
//! wait is bounded by a timeout, and the child is guarded so that every exit
//! path, including cycle cancellation, reaps it.

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};

use super::{BackendKind, CaptureBackend, CaptureFrame};
use crate::geometry::Rect;

/// Upper bound on the subprocess run. Screenshot utilities normally finish in
/// well under a second; anything past this is a hung process.
const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Kills and reaps the child on drop unless it already exited.
struct ChildGuard(Option<Child>);

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if let Some(mut child) = self.0.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

pub struct ExternalToolBackend {
    timeout: Duration,
}

impl ExternalToolBackend {
    pub fn new() -> Self {
        Self {
            timeout: SUBPROCESS_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn wait_bounded(&self, child: Child) -> Result<()> {
        let mut guard = ChildGuard(Some(child));
        let start = Instant::now();
        loop {
            let status = match guard.0.as_mut() {
                Some(child) => child
                    .try_wait()
                    .context("failed to poll screenshot utility")?,
                None => return Err(anyhow!("screenshot utility already reaped")),
            };
            if let Some(status) = status {
                guard.0.take();
                if !status.success() {
                    return Err(anyhow!("screenshot utility exited with {}", status));
                }
                return Ok(());
            }
            if start.elapsed() > self.timeout {
                // Guard drop kills and reaps the child.
                return Err(anyhow!(
                    "screenshot utility timed out after {:?}",
                    self.timeout
                ));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl CaptureBackend for ExternalToolBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::External
    }

    fn attempt(&mut self, target: Rect) -> Result<CaptureFrame> {
        // A directory rather than a pre-opened file: the utility must be able
        // to create its output without fighting our handle over sharing.
        let dir = tempfile::tempdir()?;
        let output_path = dir.path().join("frame.png");

        let mut command = screenshot_command(target, &output_path)?;
        let child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn screenshot utility")?;

        self.wait_bounded(child)?;

        let img = image::open(&output_path)
            .context("failed to read screenshot utility output")?
            .to_rgba8();

        // Utilities that can only grab the whole screen need a crop down to
        // the requested bounds; the Windows invocation already writes exactly
        // the target region.
        let img = if OUTPUT_IS_REGION {
            img
        } else {
            let full = Rect::new(0, 0, img.width() as i32, img.height() as i32);
            let wanted = Rect::new(
                target.x.max(0),
                target.y.max(0),
                target.width,
                target.height,
            )
            .clamped_to(full);

            if wanted.has_area() && wanted != full {
                image::imageops::crop_imm(
                    &img,
                    wanted.x as u32,
                    wanted.y as u32,
                    wanted.width as u32,
                    wanted.height as u32,
                )
                .to_image()
            } else {
                img
            }
        };

        Ok(CaptureFrame::new(img, BackendKind::External))
    }
}

/// Whether the utility writes the target region itself (true) or a full
/// screen that still needs cropping (false).
#[cfg(windows)]
const OUTPUT_IS_REGION: bool = true;
#[cfg(not(windows))]
const OUTPUT_IS_REGION: bool = false;

/// The platform's screenshot utility invocation, writing a PNG to `path`.
#[cfg(windows)]
fn screenshot_command(target: Rect, path: &std::path::Path) -> Result<Command> {
    // No dedicated CLI utility ships with Windows; System.Drawing through
    // PowerShell is the stock equivalent.
    let script = format!(
        "Add-Type -AssemblyName System.Drawing; \
         $bmp = New-Object System.Drawing.Bitmap {w}, {h}; \
         $gfx = [System.Drawing.Graphics]::FromImage($bmp); \
         $gfx.CopyFromScreen({x}, {y}, 0, 0, $bmp.Size); \
         $bmp.Save('{path}', [System.Drawing.Imaging.ImageFormat]::Png)",
        w = target.width,
        h = target.height,
        x = target.x,
        y = target.y,
        path = path.display(),
    );
    let mut command = Command::new("powershell");
    command.args(["-NoProfile", "-NonInteractive", "-Command", &script]);
    Ok(command)
}

#[cfg(target_os = "macos")]
fn screenshot_command(_target: Rect, path: &std::path::Path) -> Result<Command> {
    let mut command = Command::new("screencapture");
    command.arg("-x"); // no sound
    command.arg(path);
    Ok(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn screenshot_command(_target: Rect, path: &std::path::Path) -> Result<Command> {
    // ImageMagick's import is the most widely present X11 screenshot tool.
    let mut command = Command::new("import");
    command.args(["-window", "root", "-silent"]);
    command.arg(path);
    Ok(command)
}
