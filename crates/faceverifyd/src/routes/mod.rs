//! HTTP routes

pub mod compare;
pub mod health;
pub mod images;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with all routes.
///
/// Cross-origin requests are allowed from anywhere.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(compare::router())
        .merge(images::router())
        .merge(health::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
