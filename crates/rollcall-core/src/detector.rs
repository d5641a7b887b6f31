//! Ultra-Light face detector via ONNX Runtime.
//!
//! Runs the RFB-320 variant of the Ultra-Light-Fast face detector: 320x240
//! RGB input, per-anchor score/box outputs in normalized corner
//! coordinates, decoded with a confidence filter and IoU non-maximum
//! suppression.

use crate::types::FaceLocation;
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const DETECTOR_INPUT_WIDTH: u32 = 320;
const DETECTOR_INPUT_HEIGHT: u32 = 240;
const DETECTOR_MEAN: f32 = 127.0;
const DETECTOR_STD: f32 = 128.0;
const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DETECTOR_NMS_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download version-RFB-320.onnx and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Detection seam: an RGB image in, zero or more face boxes out, sorted by
/// confidence (highest first).
pub trait Detect {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, DetectorError>;
}

/// Ultra-Light RFB-320 face detector.
pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    /// Load the detector ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face detector"
        );

        Ok(Self { session })
    }

    /// Resize to the model input and normalize into a NCHW float tensor.
    fn preprocess(image: &RgbImage) -> Array4<f32> {
        let resized = image::imageops::resize(
            image,
            DETECTOR_INPUT_WIDTH,
            DETECTOR_INPUT_HEIGHT,
            FilterType::Triangle,
        );

        let mut tensor = Array4::<f32>::zeros((
            1,
            3,
            DETECTOR_INPUT_HEIGHT as usize,
            DETECTOR_INPUT_WIDTH as usize,
        ));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel.0[c] as f32 - DETECTOR_MEAN) / DETECTOR_STD;
            }
        }
        tensor
    }
}

impl Detect for FaceDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, DetectorError> {
        let (width, height) = image.dimensions();
        let input = Self::preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("boxes: {e}")))?;

        let candidates =
            decode_candidates(scores, boxes, width, height, DETECTOR_CONFIDENCE_THRESHOLD);

        Ok(nms(candidates, DETECTOR_NMS_THRESHOLD))
    }
}

/// Decode raw score/box tensors into pixel-space candidates.
///
/// The model emits per-anchor [background, face] scores and boxes as
/// normalized [x1, y1, x2, y2] corners of the input image, so decoding is
/// a confidence filter plus a scale to frame dimensions.
fn decode_candidates(
    scores: &[f32],
    boxes: &[f32],
    width: u32,
    height: u32,
    threshold: f32,
) -> Vec<FaceLocation> {
    let anchors = scores.len() / 2;
    let mut candidates = Vec::new();

    for idx in 0..anchors {
        let confidence = scores[idx * 2 + 1];
        if confidence <= threshold {
            continue;
        }
        let off = idx * 4;
        if off + 3 >= boxes.len() {
            break;
        }
        let x1 = boxes[off].clamp(0.0, 1.0) * width as f32;
        let y1 = boxes[off + 1].clamp(0.0, 1.0) * height as f32;
        let x2 = boxes[off + 2].clamp(0.0, 1.0) * width as f32;
        let y2 = boxes[off + 3].clamp(0.0, 1.0) * height as f32;

        candidates.push(FaceLocation::from_corners(
            x1, y1, x2, y2, confidence, width, height,
        ));
    }

    candidates
}

/// Intersection-over-union of two boxes.
fn iou(a: &FaceLocation, b: &FaceLocation) -> f32 {
    let inter_w = a.right.min(b.right).saturating_sub(a.left.max(b.left)) as f32;
    let inter_h = a.bottom.min(b.bottom).saturating_sub(a.top.max(b.top)) as f32;
    let inter = inter_w * inter_h;

    let area_a = a.width() as f32 * a.height() as f32;
    let area_b = b.width() as f32 * b.height() as f32;
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Non-maximum suppression: keep the highest-confidence box of every
/// overlapping cluster. Output is sorted by confidence.
fn nms(mut candidates: Vec<FaceLocation>, iou_limit: f32) -> Vec<FaceLocation> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<FaceLocation> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_limit) {
            kept.push(candidate);
        }
    }
    kept
}
