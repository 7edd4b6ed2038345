use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Feature vector for exactly one detected face (512-dimensional for ArcFace).
///
/// Encodings are computed per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding {
    pub values: Vec<f32>,
}

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// L2 norm of the vector. Encodings from the recognizer are normalised to 1.0.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Euclidean distance to another encoding.
    ///
    /// Returns `None` when the dimensions differ.
    pub fn distance(&self, other: &FaceEncoding) -> Option<f32> {
        if self.values.len() != other.values.len() {
            return None;
        }
        let sum = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>();
        Some(sum.sqrt())
    }
}

/// Euclidean distance between two encodings, `f32::INFINITY` on dimension mismatch.
pub fn face_distance(known: &FaceEncoding, candidate: &FaceEncoding) -> f32 {
    known.distance(candidate).unwrap_or(f32::INFINITY)
}

/// True when `candidate` lies within `tolerance` of `known`.
///
/// The boundary is inclusive: a distance equal to the tolerance matches.
pub fn compare_faces(known: &FaceEncoding, candidate: &FaceEncoding, tolerance: f32) -> bool {
    face_distance(known, candidate) <= tolerance
}
