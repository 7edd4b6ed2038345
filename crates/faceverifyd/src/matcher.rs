use async_trait::async_trait;
use faceverify_core::{compare_faces, FaceEncoding};
use thiserror::Error;

use crate::engine::{EngineError, EngineHandle};

#[derive(Error, Debug)]
pub enum MatcherError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("face matcher unavailable: {0}")]
    Unavailable(String),
}

/// Face recognition capability used by the verification endpoint.
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    /// Encodings of every face in an encoded photo, most confident first.
    async fn encodings(&self, image: Vec<u8>) -> Result<Vec<FaceEncoding>, MatcherError>;

    /// False once the matcher can no longer serve requests.
    fn is_ready(&self) -> bool;

    /// Whether `candidate` matches `known` within `tolerance`.
    fn compare(&self, known: &FaceEncoding, candidate: &FaceEncoding, tolerance: f32) -> bool {
        compare_faces(known, candidate, tolerance)
    }
}

#[async_trait]
impl FaceMatcher for EngineHandle {
    async fn encodings(&self, image: Vec<u8>) -> Result<Vec<FaceEncoding>, MatcherError> {
        Ok(self.encode(image).await?)
    }

    fn is_ready(&self) -> bool {
        self.is_alive()
    }
}
