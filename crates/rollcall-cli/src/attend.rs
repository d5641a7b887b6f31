//! Live attendance loop: camera frames in, CSV rows out.

use crate::attendance::{AttendanceLog, DedupPolicy};
use crate::config::Config;
use anyhow::{Context, Result};
use chrono::Local;
use image::RgbImage;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rollcall_core::{
    recognize_frame, FaceDetector, FaceEncoder, FaceMatch, Registry, FRAME_DOWNSCALE,
};
use rollcall_hw::Camera;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn run(config: &Config) -> Result<()> {
    let mut detector = FaceDetector::load(&config.detector_model_path())?;
    let mut encoder = FaceEncoder::load(&config.encoder_model_path())?;

    let faces_dir = config.registered_faces_dir();
    tracing::info!(dir = %faces_dir.display(), "loading registered faces");
    let (registry, report) = Registry::load(&faces_dir, &mut detector, &mut encoder)
        .with_context(|| format!("failed to load registered faces from {}", faces_dir.display()))?;
    tracing::info!(
        registered = report.registered,
        no_face = report.no_face,
        failed = report.failed,
        names = ?registry.names().collect::<Vec<_>>(),
        "registry loaded"
    );

    let dedup = if config.dedup_per_day {
        DedupPolicy::PerDay
    } else {
        DedupPolicy::EveryCall
    };
    let log = AttendanceLog::new(config.attendance_path(), dedup);

    let camera = Camera::open(&config.camera_device)
        .with_context(|| format!("failed to open camera {}", config.camera_device))?;
    let mut stream = camera.start().context("failed to start camera stream")?;

    for _ in 0..config.warmup_frames {
        let _ = stream.next_frame();
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("failed to install interrupt handler")?;
    }

    tracing::info!("attendance loop running, press Ctrl-C to stop");

    while running.load(Ordering::SeqCst) {
        let frame = match stream.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "failed to grab frame, stopping");
                break;
            }
        };

        let Some(image) = frame.to_image() else {
            tracing::warn!(sequence = frame.sequence, "frame buffer has unexpected size, skipping");
            continue;
        };

        let matches = match recognize_frame(
            &image,
            &registry,
            &mut detector,
            &mut encoder,
            config.match_tolerance,
        ) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "frame recognition failed, skipping");
                continue;
            }
        };

        for m in &matches {
            match &m.name {
                Some(name) => match log.mark(name) {
                    Ok(true) => {
                        tracing::info!(name = %name, distance = ?m.distance, "attendance marked")
                    }
                    Ok(false) => tracing::debug!(name = %name, "already marked today"),
                    Err(e) => tracing::warn!(name = %name, error = %e, "failed to mark attendance"),
                },
                None => tracing::debug!(confidence = m.location.confidence, "unknown face"),
            }
        }

        if let Some(dir) = &config.snapshot_dir {
            if !matches.is_empty() {
                if let Err(e) = save_snapshot(dir, image, &matches) {
                    tracing::warn!(error = %e, "failed to save snapshot");
                }
            }
        }
    }

    tracing::info!("attendance session ended");
    Ok(())
}

/// Save the frame with each detection outlined, rescaled back to
/// full-frame coordinates.
fn save_snapshot(dir: &Path, mut image: RgbImage, matches: &[FaceMatch]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    for m in matches {
        let location = m.location.scaled(FRAME_DOWNSCALE);
        if location.width() == 0 || location.height() == 0 {
            continue;
        }
        let rect = Rect::at(location.left as i32, location.top as i32)
            .of_size(location.width(), location.height());
        draw_hollow_rect_mut(&mut image, rect, image::Rgb([0, 255, 0]));
    }

    let path = dir.join(format!("{}.jpg", Local::now().format("%Y%m%d-%H%M%S%.3f")));
    image
        .save(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    tracing::debug!(path = %path.display(), faces = matches.len(), "snapshot saved");
    Ok(())
}
