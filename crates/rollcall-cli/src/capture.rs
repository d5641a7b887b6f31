//! Interactive capture session: save named face images for registration.

use crate::config::Config;
use anyhow::{Context, Result};
use rollcall_hw::Camera;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub fn run(config: &Config) -> Result<()> {
    let dir = config.original_faces_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let camera = Camera::open(&config.camera_device)
        .with_context(|| format!("failed to open camera {}", config.camera_device))?;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(raw) = prompt(&mut lines, "Name to capture (or 'quit'): ")? else {
            break;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        if raw.eq_ignore_ascii_case("quit") {
            break;
        }

        let name = sanitize_name(raw);
        if name.is_empty() {
            tracing::warn!(input = raw, "name has no usable characters");
            continue;
        }

        let target = dir.join(format!("{name}.jpg"));
        if target.exists() {
            let message = format!("{} exists, overwrite? [y/N]: ", target.display());
            let Some(answer) = prompt(&mut lines, &message)? else {
                break;
            };
            if !answer.trim().eq_ignore_ascii_case("y") {
                continue;
            }
        }

        if let Err(e) = capture_one(&camera, config.warmup_frames, &mut lines, &target) {
            tracing::error!(error = %e, "capture failed");
        }
    }

    tracing::info!("capture session ended");
    Ok(())
}

/// Print a prompt and read one stdin line; `None` on end of input.
fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    message: &str,
) -> Result<Option<String>> {
    print!("{message}");
    io::stdout().flush().context("failed to flush stdout")?;
    match lines.next() {
        Some(line) => Ok(Some(line.context("failed to read stdin")?)),
        None => Ok(None),
    }
}

/// Grab one frame after warmup and save it as a JPEG. The stream is
/// scoped to this call and released on every return path.
fn capture_one(
    camera: &Camera,
    warmup_frames: usize,
    lines: &mut impl Iterator<Item = io::Result<String>>,
    target: &Path,
) -> Result<()> {
    let mut stream = camera.start().context("failed to start camera stream")?;
    for _ in 0..warmup_frames {
        let _ = stream.next_frame();
    }

    print!("Press Enter to capture... ");
    io::stdout().flush().context("failed to flush stdout")?;
    if lines.next().transpose().context("failed to read stdin")?.is_none() {
        anyhow::bail!("stdin closed before capture");
    }

    let frame = stream.next_frame().context("failed to grab frame")?;
    let image = frame.to_image().context("frame buffer has unexpected size")?;
    image
        .save(target)
        .with_context(|| format!("failed to save {}", target.display()))?;

    tracing::info!(path = %target.display(), "face image saved");
    Ok(())
}

/// Reduce a raw name to a filesystem-safe identifier: ASCII letters,
/// digits, and underscores. Whitespace and hyphens become underscores;
/// everything else is dropped.
pub fn sanitize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                Some(c)
            } else if c.is_whitespace() || c == '-' {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}
