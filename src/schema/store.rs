use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::field::SchemaField;
use super::infer::{infer_schema, merge_schemas, schema_hash};
use crate::metrics::endpoint_key;

/// Request and response schemas captured for one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSchema {
    pub method: String,
    pub pattern: String,
    pub request_body: Option<SchemaField>,
    pub response_body: Option<SchemaField>,
    pub request_sample_count: u64,
    pub response_sample_count: u64,
    pub request_hash: Option<String>,
    pub response_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Request,
    Response,
}

/// Per-endpoint inferred body schemas.
///
/// Every observation is inferred and hashed; when the hash matches the one
/// cached for that side the merge is skipped and only the counter moves.
#[derive(Debug, Default)]
pub struct SchemaStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    /// key → position in `records`
    index: HashMap<String, usize>,
    /// Discovery order
    records: Vec<EndpointSchema>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request_body(&self, method: &str, pattern: &str, body: &Value) {
        self.record(Side::Request, method, pattern, body);
    }

    /// Callers only forward 2xx response bodies.
    pub fn record_response_body(&self, method: &str, pattern: &str, body: &Value) {
        self.record(Side::Response, method, pattern, body);
    }

    /// All captured schemas, in the order endpoints were first seen.
    pub fn get_schemas(&self) -> Vec<EndpointSchema> {
        self.inner.read().records.clone()
    }

    /// Method is matched case-insensitively.
    pub fn get_endpoint_schema(&self, method: &str, pattern: &str) -> Option<EndpointSchema> {
        let inner = self.inner.read();
        let idx = *inner.index.get(&endpoint_key(method, pattern))?;
        inner.records.get(idx).cloned()
    }

    pub fn endpoint_count(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.write();
        let dropped = inner.records.len();
        inner.index.clear();
        inner.records.clear();
        info!(endpoints = dropped, "schema store reset");
    }

    fn record(&self, side: Side, method: &str, pattern: &str, body: &Value) {
        // A null body means nothing was observed
        if body.is_null() {
            return;
        }

        let incoming = infer_schema(body);
        let hash = schema_hash(&incoming);
        let key = endpoint_key(method, pattern);

        let mut inner = self.inner.write();
        let Inner { index, records } = &mut *inner;

        let idx = match index.get(&key).copied() {
            Some(idx) => idx,
            None => {
                debug!(endpoint = %key, ?side, "first schema observation");
                index.insert(key, records.len());
                records.push(EndpointSchema::first(method, pattern, side, incoming, hash));
                return;
            }
        };

        let record = &mut records[idx];
        let (schema, count, cached_hash) = record.side_mut(side);

        *count += 1;
        // Same shape as before: nothing to widen
        if cached_hash.as_deref() == Some(hash.as_str()) {
            return;
        }

        let merged = match schema.as_ref() {
            Some(existing) => merge_schemas(existing, &incoming),
            None => incoming,
        };
        *cached_hash = Some(schema_hash(&merged));
        *schema = Some(merged);
    }
}

impl EndpointSchema {
    fn first(method: &str, pattern: &str, side: Side, schema: SchemaField, hash: String) -> Self {
        let mut record = Self {
            method: method.to_ascii_uppercase(),
            pattern: pattern.to_string(),
            request_body: None,
            response_body: None,
            request_sample_count: 0,
            response_sample_count: 0,
            request_hash: None,
            response_hash: None,
        };
        let (slot, count, cached_hash) = record.side_mut(side);
        *slot = Some(schema);
        *count = 1;
        *cached_hash = Some(hash);
        record
    }

    fn side_mut(&mut self, side: Side) -> (&mut Option<SchemaField>, &mut u64, &mut Option<String>) {
        match side {
            Side::Request => (
                &mut self.request_body,
                &mut self.request_sample_count,
                &mut self.request_hash,
            ),
            Side::Response => (
                &mut self.response_body,
                &mut self.response_sample_count,
                &mut self.response_hash,
            ),
        }
    }
}
