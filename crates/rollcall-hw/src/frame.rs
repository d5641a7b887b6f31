//! RGB frame type and pixel-format conversion.

use image::RgbImage;
use thiserror::Error;

/// A captured RGB24 camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// View the frame as an [`RgbImage`] for the recognition pipeline.
    /// `None` when the buffer does not match the stated dimensions.
    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 integer math.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share
/// the U/V pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = (width * height) as usize;
    let expected = pixels * 2;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength { expected, actual: yuyv.len() });
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in yuyv[..expected].chunks_exact(4) {
        push_rgb(&mut rgb, chunk[0], chunk[1], chunk[3]);
        push_rgb(&mut rgb, chunk[2], chunk[1], chunk[3]);
    }
    Ok(rgb)
}

/// Replicate 8-bit grayscale pixels into RGB24.
pub fn grey_to_rgb(gray: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(gray.len() * 3);
    for &value in gray {
        rgb.extend_from_slice(&[value, value, value]);
    }
    rgb
}

fn push_rgb(rgb: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let clamp = |value: i32| value.clamp(0, 255) as u8;
    rgb.push(clamp((298 * c + 409 * e + 128) >> 8));
    rgb.push(clamp((298 * c - 100 * d - 208 * e + 128) >> 8));
    rgb.push(clamp((298 * c + 516 * d + 128) >> 8));
}
