pub mod routes;

use crate::state::AppState;
use crate::store::DocumentStore;
use axum::routing::get;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

/// Page shell at `/`, assets under `/static`, JSON under `/api` and `/debug`.
pub fn router<S: DocumentStore>(state: Arc<AppState<S>>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/dashboard_data", get(routes::dashboard_data::<S>))
        .route("/debug/firestore", get(routes::debug_firestore::<S>))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
