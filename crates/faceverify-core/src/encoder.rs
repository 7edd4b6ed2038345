//! Photo-in, encodings-out pipeline: decode, detect, align, encode.

use crate::decode::{decode_image, ImageError};
use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::FaceEncoding;
use crate::{DETECTOR_MODEL_FILE, RECOGNIZER_MODEL_FILE};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("image error: {0}")]
    Image(#[from] ImageError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// SCRFD detector and ArcFace recognizer loaded side by side.
///
/// Both ONNX sessions need exclusive access, so encoding takes `&mut self`.
pub struct FaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FaceEncoder {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, EncodeError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(RECOGNIZER_MODEL_FILE))?;
        Ok(Self { detector, recognizer })
    }

    /// Encode every face found in an encoded photo.
    ///
    /// The result is ordered by detection confidence, so the first entry is
    /// the most prominent face. An empty vector means no face was found.
    pub fn encode(&mut self, bytes: &[u8]) -> Result<Vec<FaceEncoding>, EncodeError> {
        let image = decode_image(bytes)?;
        self.encode_image(&image)
    }

    pub fn encode_image(&mut self, image: &RgbImage) -> Result<Vec<FaceEncoding>, EncodeError> {
        let faces = self.detector.detect(image)?;
        let mut encodings = Vec::with_capacity(faces.len());
        for face in &faces {
            if face.landmarks.is_none() {
                tracing::warn!(confidence = face.confidence, "skipping face without landmarks");
                continue;
            }
            encodings.push(self.recognizer.encode(image, face)?);
        }
        if encodings.len() > 1 {
            tracing::debug!(faces = encodings.len(), "multiple faces found; first is most confident");
        }
        Ok(encodings)
    }
}
