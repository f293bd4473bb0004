use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::aggregator::{aggregate_at, EndpointMetrics};
use super::ring_buffer::RingBuffer;
use super::{endpoint_key, now_ms, Sample};
use crate::config::ObservatoryConfig;
use crate::error::Result;

// ─── Public types ────────────────────────────────────────────────

/// In-memory metrics engine: one ring buffer per "METHOD /pattern".
///
/// The middleware calls `record()`, dashboards call `get_metrics()`.
/// Each endpoint buffer sits behind its own lock, so a read never sees a
/// half-applied push. An optional background task evicts endpoints that
/// have gone fully idle; stop it with `destroy()` (or by dropping the store).
pub struct MetricsStore {
    inner: Arc<Inner>,
    evictor: Mutex<Option<JoinHandle<()>>>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    endpoints: RwLock<HashMap<String, Arc<Endpoint>>>,
    /// Discovery counter, used to keep sort order stable on ties
    next_seq: AtomicU64,
    /// Empty buffer cloned for every new endpoint (capacity already validated)
    template: RingBuffer<Sample>,
    retention_ms: u64,
    percentiles: Vec<f64>,
}

struct Endpoint {
    seq: u64,
    buffer: Mutex<RingBuffer<Sample>>,
}

// ─── MetricsStore impl ───────────────────────────────────────────

impl MetricsStore {
    pub fn new(config: &ObservatoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                endpoints: RwLock::new(HashMap::new()),
                next_seq: AtomicU64::new(0),
                template: RingBuffer::new(config.max_per_endpoint)?,
                retention_ms: config.retention_ms,
                percentiles: config.percentiles.clone(),
            }),
            evictor: Mutex::new(None),
        })
    }

    /// Record a single request observation. O(1).
    ///
    /// The push happens while the map lock is held, so an eviction sweep
    /// can never drop an endpoint between its lookup and its first sample.
    pub fn record(&self, sample: Sample) {
        let key = endpoint_key(&sample.method, &sample.pattern);

        {
            let endpoints = self.inner.endpoints.read();
            if let Some(endpoint) = endpoints.get(&key) {
                endpoint.buffer.lock().push(sample);
                return;
            }
        }

        let mut endpoints = self.inner.endpoints.write();
        let endpoint = endpoints.entry(key).or_insert_with_key(|key| {
            debug!(endpoint = %key, "tracking new endpoint");
            Arc::new(self.inner.new_endpoint())
        });
        endpoint.buffer.lock().push(sample);
    }

    /// Summaries for every endpoint with samples in the retention window,
    /// busiest first. Ties keep discovery order.
    pub fn get_metrics(&self) -> Vec<EndpointMetrics> {
        self.inner.metrics_at(now_ms())
    }

    /// Summary for one endpoint; `None` when unknown or fully stale.
    pub fn get_endpoint_metrics(&self, method: &str, pattern: &str) -> Option<EndpointMetrics> {
        let key = endpoint_key(method, pattern);
        let endpoint = self.inner.endpoints.read().get(&key).cloned()?;
        let samples = endpoint.buffer.lock().to_vec();
        aggregate_at(
            &samples,
            &self.inner.percentiles,
            self.inner.retention_ms,
            now_ms(),
        )
    }

    /// Drop every endpoint buffer.
    pub fn reset(&self) {
        let dropped = {
            let mut endpoints = self.inner.endpoints.write();
            let n = endpoints.len();
            endpoints.clear();
            n
        };
        info!(endpoints = dropped, "metrics store reset");
    }

    /// Number of tracked endpoints, stale ones included until evicted.
    pub fn endpoint_count(&self) -> usize {
        self.inner.endpoints.read().len()
    }

    /// Remove endpoints whose newest sample is older than the retention window.
    /// Returns how many were removed.
    pub fn evict_stale(&self) -> usize {
        self.inner.evict_stale_at(now_ms())
    }

    /// Spawn the periodic eviction task on the current Tokio runtime.
    ///
    /// Calling this again while a task is running is a no-op. The task only
    /// holds a weak reference, so it also ends once the store is dropped.
    pub fn start_eviction(&self, every: Duration) {
        let mut slot = self.evictor.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no Tokio runtime available, background eviction not started");
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                inner.evict_stale_at(now_ms());
            }
        });

        info!(interval_ms = every.as_millis() as u64, "eviction task started");
        *slot = Some(handle);
    }

    pub fn is_evicting(&self) -> bool {
        self.evictor
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the background eviction task. Idempotent.
    pub fn destroy(&self) {
        if let Some(handle) = self.evictor.lock().take() {
            handle.abort();
            info!("eviction task stopped");
        }
    }

    #[cfg(test)]
    fn metrics_at(&self, now: u64) -> Vec<EndpointMetrics> {
        self.inner.metrics_at(now)
    }
}

impl Drop for MetricsStore {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn new_endpoint(&self) -> Endpoint {
        Endpoint {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            buffer: Mutex::new(self.template.clone()),
        }
    }

    fn metrics_at(&self, now: u64) -> Vec<EndpointMetrics> {
        // Snapshot the map first so aggregation never holds the map lock
        let endpoints: Vec<Arc<Endpoint>> = self.endpoints.read().values().cloned().collect();

        let mut results: Vec<(u64, EndpointMetrics)> = endpoints
            .iter()
            .filter_map(|endpoint| {
                let samples = endpoint.buffer.lock().to_vec();
                aggregate_at(&samples, &self.percentiles, self.retention_ms, now)
                    .map(|m| (endpoint.seq, m))
            })
            .collect();

        results.sort_by(|(seq_a, a), (seq_b, b)| b.count.cmp(&a.count).then(seq_a.cmp(seq_b)));
        results.into_iter().map(|(_, m)| m).collect()
    }

    fn evict_stale_at(&self, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.retention_ms);
        let mut endpoints = self.endpoints.write();
        let before = endpoints.len();

        endpoints.retain(|_, endpoint| {
            let buffer = endpoint.buffer.lock();
            buffer
                .iter()
                .map(|s| s.timestamp)
                .max()
                .is_some_and(|newest| newest >= cutoff)
        });

        let evicted = before - endpoints.len();
        if evicted > 0 {
            debug!(evicted, remaining = endpoints.len(), "evicted stale endpoints");
        }
        evicted
    }
}
