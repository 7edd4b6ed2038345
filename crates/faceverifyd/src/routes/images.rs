//! GET /user_images/{filename}: raw stored photos.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::ApiError;
use crate::image_store::ImageStore;
use crate::state::AppState;

/// GET /user_images/{filename}
#[tracing::instrument(skip_all, fields(filename))]
async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    tracing::Span::current().record("filename", filename.as_str());
    let path = state.images().public_path(&filename)?;
    if !ImageStore::is_file(&path).await {
        return Err(ApiError::FileNotFound);
    }

    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.map(Body::new))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/user_images/{filename}", get(serve_image))
}
