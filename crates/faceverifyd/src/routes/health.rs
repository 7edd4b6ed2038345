//! Liveness of the daemon and its face engine

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// False once the engine thread has stopped taking requests.
    pub engine: bool,
    pub version: &'static str,
}

/// GET /health
///
/// 503 when the face engine is gone, since every verification would fail.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let engine = state.matcher().is_ready();
    let (code, status) = if engine {
        (StatusCode::OK, "ok")
    } else {
        tracing::warn!("health check: face engine unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        code,
        Json(HealthResponse {
            status,
            engine,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
