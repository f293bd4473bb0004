pub mod aggregator;
pub mod percentiles;
pub mod ring_buffer;
pub mod store;
pub mod stream;

pub use aggregator::{aggregate, aggregate_at, EndpointMetrics, ErrorRate, LatencyMetrics};
pub use percentiles::PercentileSet;
pub use ring_buffer::RingBuffer;
pub use store::MetricsStore;

use serde::Serialize;

/// A single request/response observation.
/// The middleware builds these and pushes them into the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// e.g. "GET"
    pub method: String,
    /// Route template such as "/api/users/:id", never the literal URL
    pub pattern: String,
    pub status_code: u16,
    /// Handler wall time in milliseconds, sub-millisecond precision
    pub duration_ms: f64,
    /// Request body size in bytes (Content-Length)
    pub req_size: u64,
    /// Response body size in bytes (Content-Length)
    pub res_size: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// Map key for one endpoint: uppercased method plus route pattern.
pub fn endpoint_key(method: &str, pattern: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), pattern)
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
