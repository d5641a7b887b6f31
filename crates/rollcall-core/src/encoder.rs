//! MobileFaceNet embedding extraction via ONNX Runtime.
//!
//! Crops a detected face region, resizes it to the 112x112 model input,
//! and produces a 128-dimensional L2-normalized embedding.

use crate::types::{Embedding, FaceLocation};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (different normalization from the detector) ---
const ENCODER_INPUT_SIZE: u32 = 112;
const ENCODER_MEAN: f32 = 127.5;
const ENCODER_STD: f32 = 128.0;

/// Output dimension of the embedding model.
pub const EMBEDDING_DIM: usize = 128;

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0} — download mobilefacenet.onnx and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face region is empty")]
    EmptyRegion,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Embedding seam: a face region of an RGB image in, one fixed-length
/// embedding out.
pub trait Encode {
    fn encode(&mut self, image: &RgbImage, face: &FaceLocation)
        -> Result<Embedding, EncoderError>;
}

/// MobileFaceNet face encoder.
pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    /// Load the embedding ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EncoderError> {
        if !Path::new(model_path).exists() {
            return Err(EncoderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face encoder"
        );

        Ok(Self { session })
    }

    /// Crop the face region, resize, and normalize into a NCHW float tensor.
    fn preprocess(image: &RgbImage, face: &FaceLocation) -> Result<Array4<f32>, EncoderError> {
        if face.width() == 0 || face.height() == 0 {
            return Err(EncoderError::EmptyRegion);
        }

        let crop =
            imageops::crop_imm(image, face.left, face.top, face.width(), face.height()).to_image();
        let resized = imageops::resize(
            &crop,
            ENCODER_INPUT_SIZE,
            ENCODER_INPUT_SIZE,
            FilterType::Triangle,
        );

        let size = ENCODER_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel.0[c] as f32 - ENCODER_MEAN) / ENCODER_STD;
            }
        }
        Ok(tensor)
    }
}

impl Encode for FaceEncoder {
    fn encode(
        &mut self,
        image: &RgbImage,
        face: &FaceLocation,
    ) -> Result<Embedding, EncoderError> {
        let input = Self::preprocess(image, face)?;

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncoderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(EncoderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        // L2-normalize the embedding
        let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        let values = if norm > 0.0 {
            raw.iter().map(|x| x / norm).collect()
        } else {
            raw.to_vec()
        };

        Ok(Embedding { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_output_shape() {
        let image = RgbImage::from_pixel(200, 200, image::Rgb([100, 100, 100]));
        let face = FaceLocation { top: 20, right: 180, bottom: 180, left: 20, confidence: 0.9 };
        let tensor = FaceEncoder::preprocess(&image, &face).unwrap();
        let size = ENCODER_INPUT_SIZE as usize;
        assert_eq!(tensor.shape(), &[1, 3, size, size]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let image = RgbImage::from_pixel(120, 120, image::Rgb([128, 128, 128]));
        let face = FaceLocation { top: 0, right: 120, bottom: 120, left: 0, confidence: 0.9 };
        let tensor = FaceEncoder::preprocess(&image, &face).unwrap();
        let expected = (128.0 - ENCODER_MEAN) / ENCODER_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
        assert!((tensor[[0, 1, 56, 56]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_empty_region() {
        let image = RgbImage::from_pixel(64, 64, image::Rgb([0, 0, 0]));
        let face = FaceLocation { top: 10, right: 10, bottom: 40, left: 10, confidence: 0.9 };
        assert!(matches!(
            FaceEncoder::preprocess(&image, &face),
            Err(EncoderError::EmptyRegion)
        ));
    }

    #[test]
    fn test_preprocess_channels_follow_pixel() {
        let image = RgbImage::from_pixel(64, 64, image::Rgb([255, 127, 0]));
        let face = FaceLocation { top: 0, right: 64, bottom: 64, left: 0, confidence: 0.9 };
        let tensor = FaceEncoder::preprocess(&image, &face).unwrap();
        assert!(tensor[[0, 0, 10, 10]] > 0.9);
        assert!(tensor[[0, 1, 10, 10]].abs() < 0.01);
        assert!(tensor[[0, 2, 10, 10]] < -0.9);
    }
}
