//! Application state shared across handlers

use std::sync::Arc;

use crate::db::UserRepository;
use crate::image_store::ImageStore;
use crate::matcher::FaceMatcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    users: Arc<dyn UserRepository>,
    matcher: Arc<dyn FaceMatcher>,
    images: ImageStore,
    tolerance: f32,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserRepository>,
        matcher: Arc<dyn FaceMatcher>,
        images: ImageStore,
        tolerance: f32,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                users,
                matcher,
                images,
                tolerance,
            }),
        }
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.inner.users.as_ref()
    }

    pub fn matcher(&self) -> &dyn FaceMatcher {
        self.inner.matcher.as_ref()
    }

    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }

    pub fn tolerance(&self) -> f32 {
        self.inner.tolerance
    }
}
