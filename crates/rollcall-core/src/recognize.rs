//! Per-frame recognition: downscale, detect, encode, match.

use crate::detector::{Detect, DetectorError};
use crate::encoder::{Encode, EncoderError};
use crate::registry::Registry;
use crate::types::FaceLocation;
use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

/// Fixed downscale divisor applied to frames before detection. Returned
/// boxes are in downscaled coordinates; multiply by this factor (see
/// [`FaceLocation::scaled`]) to map them back to the full frame.
pub const FRAME_DOWNSCALE: u32 = 4;

/// Default embedding distance tolerance for a positive match.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

#[derive(Error, Debug)]
pub enum RecognizeError {
    #[error("empty frame")]
    EmptyFrame,
    #[error("frame too small to downscale: {width}x{height}")]
    FrameTooSmall { width: u32, height: u32 },
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
}

/// One detected face with its match against the registry.
///
/// The location is in downscaled-frame coordinates. `name` is `None` when
/// no registered identity was within tolerance.
#[derive(Debug, Clone)]
pub struct FaceMatch {
    pub location: FaceLocation,
    pub name: Option<String>,
    /// Distance to the matched identity; absent for unknown faces.
    pub distance: Option<f32>,
}

impl FaceMatch {
    /// Display label for drawing and logging.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Validate and downscale a frame ahead of detection.
fn downscale(frame: &RgbImage) -> Result<RgbImage, RecognizeError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(RecognizeError::EmptyFrame);
    }
    if width < FRAME_DOWNSCALE || height < FRAME_DOWNSCALE {
        return Err(RecognizeError::FrameTooSmall { width, height });
    }
    Ok(imageops::resize(
        frame,
        width / FRAME_DOWNSCALE,
        height / FRAME_DOWNSCALE,
        FilterType::Triangle,
    ))
}

/// Match every face in `frame` against the registry.
///
/// Detection runs on a 0.25x downscaled copy of the frame to bound
/// per-frame cost; the returned locations stay in that space. Produces
/// exactly one [`FaceMatch`] per detected face. Stateless — nothing is
/// retained between calls.
pub fn recognize_frame<D: Detect, E: Encode>(
    frame: &RgbImage,
    registry: &Registry,
    detector: &mut D,
    encoder: &mut E,
    tolerance: f32,
) -> Result<Vec<FaceMatch>, RecognizeError> {
    let small = downscale(frame)?;

    let faces = detector.detect(&small)?;
    let mut matches = Vec::with_capacity(faces.len());

    for location in faces {
        let embedding = encoder.encode(&small, &location)?;
        let (name, distance) = match registry.first_match(&embedding, tolerance) {
            Some((entry, distance)) => (Some(entry.name.clone()), Some(distance)),
            None => (None, None),
        };
        matches.push(FaceMatch { location, name, distance });
    }

    Ok(matches)
}
