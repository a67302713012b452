//! HTTP surface over the strangler router.

pub mod error;
pub mod handlers;

use crate::core::observer::InMemoryObserver;
use crate::core::router::StranglerRouter;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<StranglerRouter>,
    pub progress: Arc<InMemoryObserver>,
    /// Include the serving backend in customer responses.
    pub expose_source: bool,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/customer", get(handlers::get_customer))
        .route("/api/migration/progress", get(handlers::migration_progress))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
