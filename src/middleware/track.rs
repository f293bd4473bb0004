use std::time::Instant;

use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, warn};

use super::route::route_pattern;
use crate::metrics::{now_ms, Sample};
use crate::observatory::{CapturedBodies, Observatory};

/// Axum middleware that times every tracked request and hands the
/// observation to the observatory once the response is ready.
///
/// Adds a `Server-Timing: total;dur=<ms>` header. Storage happens on a
/// spawned task so the response is never held up by it.
pub async fn track(State(obs): State<Observatory>, req: Request, next: Next) -> Response {
    let pattern = route_pattern(&req);
    if !obs.should_track(&pattern) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_string();
    let req_size = content_length(req.headers()).unwrap_or(0);

    let capture = obs.schemas().is_some();
    let max_body = obs.config().max_body_bytes;

    let (req, req_body) = if capture && is_json(req.headers()) {
        let (parts, body) = req.into_parts();
        let (body, value) = buffer_json(body, max_body).await;
        (Request::from_parts(parts, body), value)
    } else {
        (req, None)
    };

    let response = next.run(req).await;
    let status_code = response.status().as_u16();
    let res_size = content_length(response.headers())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0);

    let (mut response, res_body) =
        if capture && (200..300).contains(&status_code) && is_json(response.headers()) {
            let (parts, body) = response.into_parts();
            let (body, value) = buffer_json(body, max_body).await;
            (Response::from_parts(parts, body), value)
        } else {
            (response, None)
        };

    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("total;dur={duration_ms:.3}")) {
        response.headers_mut().insert("server-timing", value);
    }

    debug!(%method, %pattern, status = status_code, duration_ms, "request observed");

    let sample = Sample {
        method,
        pattern,
        status_code,
        duration_ms,
        req_size,
        res_size,
        timestamp: now_ms(),
    };
    let bodies = CapturedBodies {
        request: req_body,
        response: res_body,
    };
    tokio::spawn(async move { obs.observe(sample, bodies) });

    response
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

/// Read a body whose size is known to fit, parse it, and hand back an
/// identical body. Bodies of unknown or excessive size pass through untouched.
async fn buffer_json(body: Body, limit: usize) -> (Body, Option<Value>) {
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64);
    if !fits {
        return (body, None);
    }

    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes).ok();
            (Body::from(bytes), value)
        }
        Err(err) => {
            warn!(error = %err, "failed to buffer body for schema capture");
            (Body::empty(), None)
        }
    }
}
