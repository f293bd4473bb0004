use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use super::{pattern_from_tail, AppError, ItemEnvelope, ListEnvelope, MessageEnvelope};
use crate::metrics::EndpointMetrics;
use crate::Observatory;

// ─── GET {mount} and {mount}/metrics ─────────────────────────────

pub async fn list_metrics(State(obs): State<Observatory>) -> Json<ListEnvelope<EndpointMetrics>> {
    Json(ListEnvelope::new(obs.metrics().get_metrics()))
}

// ─── GET {mount}/metrics/:method/*pattern ────────────────────────

pub async fn endpoint_metrics(
    State(obs): State<Observatory>,
    Path((method, tail)): Path<(String, String)>,
) -> Result<Json<ItemEnvelope<EndpointMetrics>>, AppError> {
    let pattern = pattern_from_tail(&tail);
    obs.metrics()
        .get_endpoint_metrics(&method, &pattern)
        .map(|m| Json(ItemEnvelope::new(m)))
        .ok_or_else(|| AppError::NotFound("Endpoint not found".into()))
}

// ─── POST {mount}/reset ──────────────────────────────────────────

pub async fn reset(State(obs): State<Observatory>) -> Json<MessageEnvelope> {
    obs.reset();
    info!("observatory reset via dashboard");
    Json(MessageEnvelope {
        timestamp: super::timestamp(),
        message: "All metrics have been reset".into(),
    })
}
