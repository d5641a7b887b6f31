//! rollcall-hw — camera capture for the attendance pipeline.
//!
//! Provides V4L2-based camera access with RGB24 frame delivery; the
//! recognition pipeline consumes frames as `image::RgbImage`.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, FrameStream, PixelFormat};
pub use frame::Frame;
