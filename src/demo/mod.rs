pub mod catalog;
pub mod handlers;
pub mod load_generator;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use catalog::Catalog;

/// The demo API before instrumentation.
pub fn api_router(catalog: Arc<Catalog>) -> Router {
    Router::new()
        // ── User endpoints ──────────────────────────────────────
        .route("/api/users/:id", get(handlers::get_user))
        .route("/api/users", post(handlers::create_user))
        // ── Product endpoints ───────────────────────────────────
        .route("/api/products/:id", get(handlers::get_product))
        .with_state(catalog)
}
