use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::metrics::stream;
use crate::Observatory;

/// Dashboard routes, relative to the mount path.
///
/// Schema routes exist only when schema capture is enabled.
pub fn dashboard_router<S>(obs: Observatory) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let router = Router::new()
        // ── Metrics ─────────────────────────────────────────────
        .route("/", get(handlers::metrics::list_metrics))
        .route("/metrics", get(handlers::metrics::list_metrics))
        .route(
            "/metrics/:method/*pattern",
            get(handlers::metrics::endpoint_metrics),
        )
        .route("/stream", get(stream::metrics_stream))
        .route("/reset", post(handlers::metrics::reset));

    // ── Schemas ─────────────────────────────────────────────────
    let router = if obs.schemas().is_some() {
        router
            .route("/schemas", get(handlers::schemas::list_schemas))
            .route(
                "/schemas/:method/*pattern",
                get(handlers::schemas::endpoint_schema),
            )
    } else {
        router
    };

    router.with_state(obs)
}
