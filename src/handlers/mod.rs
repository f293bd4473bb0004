pub mod metrics;
pub mod schemas;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

// ─── Shared response envelopes ───────────────────────────────────

/// Every list response carries a generation timestamp and a count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEnvelope<T: Serialize> {
    pub timestamp: String,
    pub endpoint_count: usize,
    pub endpoints: Vec<T>,
}

impl<T: Serialize> ListEnvelope<T> {
    pub fn new(endpoints: Vec<T>) -> Self {
        Self {
            timestamp: timestamp(),
            endpoint_count: endpoints.len(),
            endpoints,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemEnvelope<T: Serialize> {
    pub timestamp: String,
    pub endpoint: T,
}

impl<T: Serialize> ItemEnvelope<T> {
    pub fn new(endpoint: T) -> Self {
        Self {
            timestamp: timestamp(),
            endpoint,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageEnvelope {
    pub timestamp: String,
    pub message: String,
}

/// RFC 3339, millisecond precision, `Z` suffix.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wildcard captures arrive without their leading slash.
pub(crate) fn pattern_from_tail(tail: &str) -> String {
    format!("/{}", tail.trim_start_matches('/'))
}

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_millis_and_utc_suffix() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        let fraction = ts.rsplit('.').next().unwrap();
        assert_eq!(fraction.len(), 4); // "123Z"
    }

    #[test]
    fn tail_becomes_absolute_pattern() {
        assert_eq!(pattern_from_tail("api/users/:id"), "/api/users/:id");
        assert_eq!(pattern_from_tail("/api"), "/api");
    }

    #[test]
    fn list_envelope_counts_endpoints() {
        let json = serde_json::to_value(ListEnvelope::new(vec![1, 2, 3])).unwrap();
        assert_eq!(json["endpointCount"], 3);
        assert_eq!(json["endpoints"], serde_json::json!([1, 2, 3]));
    }
}
