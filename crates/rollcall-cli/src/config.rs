use std::path::PathBuf;

/// Runtime configuration, loaded from `ROLLCALL_*` environment variables.
pub struct Config {
    /// Root directory for face images and the attendance log.
    pub data_dir: PathBuf,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Embedding distance tolerance for a positive match.
    pub match_tolerance: f32,
    /// Frames discarded after stream start (camera AGC/AE stabilization).
    pub warmup_frames: usize,
    /// Record at most one attendance row per name per day.
    pub dedup_per_day: bool,
    /// Directory for annotated detection snapshots (disabled when unset).
    pub snapshot_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("ROLLCALL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            model_dir: std::env::var("ROLLCALL_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            camera_device: std::env::var("ROLLCALL_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            match_tolerance: env_f32(
                "ROLLCALL_MATCH_TOLERANCE",
                rollcall_core::recognize::DEFAULT_TOLERANCE,
            ),
            warmup_frames: env_usize("ROLLCALL_WARMUP_FRAMES", 4),
            dedup_per_day: std::env::var("ROLLCALL_DEDUP_PER_DAY")
                .map(|v| v != "0")
                .unwrap_or(false),
            snapshot_dir: std::env::var("ROLLCALL_SNAPSHOT_DIR").ok().map(PathBuf::from),
        }
    }

    /// Raw captures from the capture session.
    pub fn original_faces_dir(&self) -> PathBuf {
        self.data_dir.join("original_faces")
    }

    /// Normalized images, one per registered identity.
    pub fn registered_faces_dir(&self) -> PathBuf {
        self.data_dir.join("registered_faces")
    }

    /// Append-only attendance log.
    pub fn attendance_path(&self) -> PathBuf {
        self.data_dir.join("attendance.csv")
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("version-RFB-320.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face embedding model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join("mobilefacenet.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
