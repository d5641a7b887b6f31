//! Image normalization for registration: canonical RGB JPEG output.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

const JPEG_QUALITY: u8 = 95;
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("written image failed re-decode check {path}: {source}")]
    Verify {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Whether a path carries one of the image extensions the pipeline
/// accepts (`jpg`/`jpeg`/`png`, case-insensitive).
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Normalize one image: decode the source, convert to 8-bit RGB, encode
/// to `dst` as JPEG, then re-decode `dst` to confirm the written file is
/// usable downstream.
pub fn normalize_image(src: &Path, dst: &Path) -> Result<(), NormalizeError> {
    let image = decode(src).map_err(|source| NormalizeError::Decode {
        path: src.display().to_string(),
        source,
    })?;
    let rgb = image.to_rgb8();

    let file =
        File::create(dst).map_err(|e| write_err(dst, image::ImageError::IoError(e)))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| write_err(dst, e))?;
    writer
        .flush()
        .map_err(|e| write_err(dst, image::ImageError::IoError(e)))?;

    decode(dst)
        .map(|_| ())
        .map_err(|source| NormalizeError::Verify {
            path: dst.display().to_string(),
            source,
        })
}

fn decode(path: &Path) -> Result<DynamicImage, image::ImageError> {
    ImageReader::open(path)
        .map_err(image::ImageError::IoError)?
        .decode()
}

fn write_err(path: &Path, source: image::ImageError) -> NormalizeError {
    NormalizeError::Write { path: path.display().to_string(), source }
}
