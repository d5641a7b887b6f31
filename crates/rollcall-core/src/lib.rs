//! rollcall-core — Face registration and recognition pipeline.
//!
//! Wraps an Ultra-Light RFB-320 face detector and a MobileFaceNet
//! embedding encoder (both via ONNX Runtime) behind small trait seams,
//! and builds the directory-based registration registry that the
//! attendance loop matches live camera frames against.

pub mod detector;
pub mod encoder;
pub mod normalize;
pub mod recognize;
pub mod registry;
pub mod types;

pub use detector::{Detect, DetectorError, FaceDetector};
pub use encoder::{Encode, EncoderError, FaceEncoder};
pub use recognize::{recognize_frame, FaceMatch, RecognizeError, FRAME_DOWNSCALE};
pub use registry::{LoadReport, Registry, RegistryError};
pub use types::{Embedding, FaceLocation, RegisteredFace};
