//! In-process API telemetry for axum services.
//!
//! Per-endpoint latency, error-rate and throughput metrics over a sliding
//! window, plus optional JSON schema inference of request and response
//! bodies. Everything lives in memory; the dashboard is a small JSON/SSE API
//! nested into the host application.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observatory;
pub mod schema;
pub mod server;

pub use config::ObservatoryConfig;
pub use error::{ObservatoryError, Result};
pub use metrics::{EndpointMetrics, MetricsStore, Sample};
pub use observatory::{CapturedBodies, Observatory};
pub use schema::{EndpointSchema, SchemaField, SchemaStore};
