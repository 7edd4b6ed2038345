//! faceverify-core: Face detection and encoding engine.
//!
//! Uses SCRFD for face detection and ArcFace for face encoding, both running
//! via ONNX Runtime for CPU inference. Encodings are compared by Euclidean
//! distance under a caller-supplied tolerance.

pub mod alignment;
pub mod decode;
pub mod detector;
pub mod encoder;
pub mod recognizer;
pub mod types;

use std::path::PathBuf;

pub use decode::{decode_image, ImageError};
pub use detector::FaceDetector;
pub use encoder::{EncodeError, FaceEncoder};
pub use recognizer::FaceRecognizer;
pub use types::{compare_faces, face_distance, BoundingBox, FaceEncoding};

/// File name of the SCRFD detection model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";

/// File name of the ArcFace recognition model inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

/// Tolerance applied when the caller does not configure one.
pub const DEFAULT_TOLERANCE: f32 = 0.5;

/// Default location of the ONNX model files.
///
/// `$XDG_DATA_HOME/faceverify/models`, falling back to
/// `~/.local/share/faceverify/models`, then `./models`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join("faceverify/models");
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local/share/faceverify/models"),
        Err(_) => PathBuf::from("models"),
    }
}
