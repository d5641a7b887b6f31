//! Batch image normalization: raw captures into the registration format.

use crate::config::Config;
use anyhow::{Context, Result};
use rollcall_core::normalize::{has_image_extension, normalize_image};
use std::path::{Path, PathBuf};

/// Per-file conversion outcome.
enum ConvertOutcome {
    Converted,
    Failed,
}

pub fn run(config: &Config) -> Result<()> {
    let input_dir = config.original_faces_dir();
    let output_dir = config.registered_faces_dir();

    let (converted, failed) = process_directory(&input_dir, &output_dir)?;
    tracing::info!(converted, failed, "conversion complete");
    Ok(())
}

/// Normalize every image in `input_dir` into `output_dir`, one JPEG per
/// source file. Individual failures are logged and counted, never fatal.
fn process_directory(input_dir: &Path, output_dir: &Path) -> Result<(usize, usize)> {
    if !input_dir.is_dir() {
        anyhow::bail!("input directory not found: {}", input_dir.display());
    }
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| has_image_extension(path))
        .collect();
    files.sort();

    let mut converted = 0usize;
    let mut failed = 0usize;

    for src in &files {
        let Some(stem) = src.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let dst = output_dir.join(format!("{stem}.jpg"));
        match convert_file(src, &dst) {
            ConvertOutcome::Converted => converted += 1,
            ConvertOutcome::Failed => failed += 1,
        }
    }

    Ok((converted, failed))
}

fn convert_file(src: &Path, dst: &Path) -> ConvertOutcome {
    match normalize_image(src, dst) {
        Ok(()) => {
            tracing::info!(src = %src.display(), dst = %dst.display(), "converted");
            ConvertOutcome::Converted
        }
        Err(e) => {
            tracing::warn!(src = %src.display(), error = %e, "conversion failed");
            ConvertOutcome::Failed
        }
    }
}
