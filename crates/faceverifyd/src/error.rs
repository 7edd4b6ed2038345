//! API error type with JSON `IntoResponse`.
//!
//! Every failure renders as `{"success": false, "message": ...}`. Internal
//! errors are logged with full detail and answered with a generic message.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::db::DbError;
use crate::image_store::ImageStoreError;
use crate::matcher::MatcherError;

const INTERNAL_MESSAGE: &str = "An error occurred on the server";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No user_id or image provided")]
    MissingInput,

    #[error("User not found")]
    UserNotFound,

    #[error("No image found for this user")]
    NoStoredImage,

    #[error("Stored image not found for user at {}", .0.display())]
    StoredImageMissing(PathBuf),

    #[error("No face detected")]
    NoFaceDetected,

    #[error("No face detected in stored image")]
    NoFaceInStoredImage,

    #[error("No matching face found for the user")]
    NoMatch,

    #[error("Invalid file name")]
    InvalidFileName,

    #[error("File not found")]
    FileNotFound,

    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Matcher(#[from] MatcherError),

    #[error(transparent)]
    ImageStore(ImageStoreError),
}

impl From<ImageStoreError> for ApiError {
    fn from(e: ImageStoreError) -> Self {
        match e {
            ImageStoreError::InvalidName(_) => Self::InvalidFileName,
            other => Self::ImageStore(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingInput
            | Self::NoFaceDetected
            | Self::NoFaceInStoredImage
            | Self::InvalidFileName => StatusCode::BAD_REQUEST,
            Self::UserNotFound
            | Self::NoStoredImage
            | Self::StoredImageMissing(_)
            | Self::NoMatch
            | Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::Base64(_) | Self::Database(_) | Self::Matcher(_) | Self::ImageStore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            tracing::info!(status = status.as_u16(), reason = %self, "request rejected");
            self.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn missing_input_is_400() {
        let (status, body) = render(ApiError::MissingInput).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No user_id or image provided");
    }

    #[tokio::test]
    async fn stored_image_missing_names_path() {
        let (status, body) =
            render(ApiError::StoredImageMissing(PathBuf::from("/srv/photos/a.jpg"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Stored image not found for user at /srv/photos/a.jpg");
    }

    #[tokio::test]
    async fn internal_errors_are_generic() {
        let err = ApiError::Matcher(MatcherError::Unavailable("onnx exploded at 0xdead".into()));
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
        assert!(!body.to_string().contains("0xdead"));
    }

    #[test]
    fn invalid_name_maps_to_400() {
        let err = ApiError::from(ImageStoreError::InvalidName("../x".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
