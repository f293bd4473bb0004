use std::sync::Arc;

use axum::Router;
use serde_json::Value;
use tracing::info;

use crate::config::ObservatoryConfig;
use crate::error::Result;
use crate::metrics::{MetricsStore, Sample};
use crate::middleware::PathFilter;
use crate::schema::SchemaStore;

/// One observatory instance: a metrics store, an optional schema store and
/// the settings the middleware and dashboard share.
///
/// Cheap to clone; every clone points at the same stores.
///
/// ```ignore
/// let observatory = Observatory::new(ObservatoryConfig::from_env()?)?;
/// observatory.start();
/// let app = observatory.attach(Router::new().route("/users/:id", get(get_user)));
/// ```
#[derive(Clone)]
pub struct Observatory {
    inner: Arc<Shared>,
}

struct Shared {
    config: ObservatoryConfig,
    filter: PathFilter,
    metrics: MetricsStore,
    schemas: Option<SchemaStore>,
}

/// Bodies captured on the request thread, handed to the deferred recorder.
#[derive(Debug, Default, Clone)]
pub struct CapturedBodies {
    pub request: Option<Value>,
    pub response: Option<Value>,
}

impl Observatory {
    pub fn new(mut config: ObservatoryConfig) -> Result<Self> {
        let trimmed = config.mount_path.trim_end_matches('/').to_string();
        config.mount_path = trimmed;
        config.validate()?;

        let filter = PathFilter::new(&config.include_paths, &config.resolved_exclude_paths())?;
        let metrics = MetricsStore::new(&config)?;
        let schemas = config.capture_schemas.then(SchemaStore::new);

        info!(
            mount_path = %config.mount_path,
            retention_ms = config.retention_ms,
            max_per_endpoint = config.max_per_endpoint,
            capture_schemas = config.capture_schemas,
            "observatory configured"
        );

        Ok(Self {
            inner: Arc::new(Shared {
                config,
                filter,
                metrics,
                schemas,
            }),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ObservatoryConfig::from_env()?)
    }

    /// Start background eviction on the current Tokio runtime. Outside a
    /// runtime this logs a warning and does nothing.
    pub fn start(&self) {
        self.inner
            .metrics
            .start_eviction(self.inner.config.eviction_interval);
    }

    /// Stop background eviction. Stored data stays readable.
    pub fn shutdown(&self) {
        self.inner.metrics.destroy();
    }

    pub fn config(&self) -> &ObservatoryConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &MetricsStore {
        &self.inner.metrics
    }

    /// `None` unless schema capture is enabled.
    pub fn schemas(&self) -> Option<&SchemaStore> {
        self.inner.schemas.as_ref()
    }

    pub fn should_track(&self, pattern: &str) -> bool {
        self.inner.filter.should_track(pattern)
    }

    pub fn reset(&self) {
        self.inner.metrics.reset();
        if let Some(schemas) = &self.inner.schemas {
            schemas.reset();
        }
    }

    /// Store one finished request. Runs off the response path.
    pub fn observe(&self, sample: Sample, bodies: CapturedBodies) {
        if let Some(schemas) = &self.inner.schemas {
            if let Some(body) = &bodies.request {
                schemas.record_request_body(&sample.method, &sample.pattern, body);
            }
            if (200..300).contains(&sample.status_code) {
                if let Some(body) = &bodies.response {
                    schemas.record_response_body(&sample.method, &sample.pattern, body);
                }
            }
        }

        match &self.inner.config.on_record {
            Some(hook) => {
                self.inner.metrics.record(sample.clone());
                hook(&sample);
            }
            None => self.inner.metrics.record(sample),
        }
    }

    /// Nest the dashboard under the mount path and wrap every route of
    /// `app` (dashboard included) with the tracking middleware.
    pub fn attach<S>(&self, app: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        app.nest(&self.inner.config.mount_path, crate::server::dashboard_router(self.clone()))
            .layer(axum::middleware::from_fn_with_state(
                self.clone(),
                crate::middleware::track,
            ))
    }
}
