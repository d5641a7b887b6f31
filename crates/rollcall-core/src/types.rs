use serde::{Deserialize, Serialize};

/// Face bounding box in pixel coordinates of the image it was detected in.
///
/// Coordinates are edge-order: top, right, bottom, left. Boxes found in a
/// downscaled frame map back to full-frame space via
/// [`scaled`](Self::scaled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl FaceLocation {
    /// Build a location from fractional corner coordinates, clamped to the
    /// image bounds. Swapped corners are reordered so `left <= right` and
    /// `top <= bottom` always hold.
    pub fn from_corners(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let clamp_x = |v: f32| v.round().clamp(0.0, width as f32) as u32;
        let clamp_y = |v: f32| v.round().clamp(0.0, height as f32) as u32;
        Self {
            top: clamp_y(y1.min(y2)),
            right: clamp_x(x1.max(x2)),
            bottom: clamp_y(y1.max(y2)),
            left: clamp_x(x1.min(x2)),
            confidence,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Map a box detected in a downscaled frame back to full-frame space.
    pub fn scaled(&self, factor: u32) -> FaceLocation {
        FaceLocation {
            top: self.top * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
            left: self.left * factor,
            confidence: self.confidence,
        }
    }
}

/// Face embedding vector (128-dimensional, L2-normalized at extraction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Euclidean distance to another embedding — the native metric of the
    /// embedding model family. Lower = more similar.
    pub fn distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A registered identity: sanitized name plus its stored embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredFace {
    pub name: String,
    pub embedding: Embedding,
}
