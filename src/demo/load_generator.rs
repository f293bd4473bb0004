use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::Router;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tracing::{debug, info};

use super::catalog::{product_id, user_id, NUM_PRODUCTS, NUM_USERS};

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` workers that send requests through `app` until
/// `running` is cleared. Requests never touch the network.
pub async fn run(running: Arc<AtomicBool>, app: Router, concurrency: u32, read_pct: u8) {
    info!(concurrency, read_pct, "load generator started");

    let mut handles = Vec::with_capacity(concurrency as usize);
    for worker_id in 0..concurrency {
        let running = running.clone();
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            worker(worker_id, running, app, read_pct).await;
        }));
    }

    for h in handles {
        let _ = h.await;
    }
    info!("load generator stopped");
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, running: Arc<AtomicBool>, app: Router, read_pct: u8) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + u64::from(id));

    while running.load(Ordering::Relaxed) {
        let request = if rng.gen_range(0u8..100) < read_pct {
            read_request(&mut rng)
        } else {
            write_request(&mut rng)
        };

        if let Ok(response) = app.clone().oneshot(request).await {
            debug!(worker = id, status = response.status().as_u16(), "load request");
        }

        let pause = rng.gen_range(5..50u64);
        tokio::time::sleep(Duration::from_millis(pause)).await;
    }
}

// ─── Requests ────────────────────────────────────────────────────

fn read_request(rng: &mut StdRng) -> Request<Body> {
    // 60 % user lookups, 40 % product lookups; ids slightly past the
    // seeded range produce some 404s
    let uri = if rng.gen_bool(0.6) {
        format!("/api/users/{}", user_id(rng.gen_range(1..=NUM_USERS + NUM_USERS / 20)))
    } else {
        format!("/api/products/{}", product_id(rng.gen_range(1..=NUM_PRODUCTS + NUM_PRODUCTS / 20)))
    };
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_default()
}

fn write_request(rng: &mut StdRng) -> Request<Body> {
    let n = rng.gen::<u16>();
    let mut body = serde_json::json!({
        "name": format!("Load User {n}"),
        "email": format!("load{n}@test.com"),
    });
    if rng.gen_bool(0.5) {
        body["prefs"] = serde_json::json!({
            "theme": "dark",
            "lang": "en",
            "notifications": rng.gen_bool(0.5),
        });
    }
    let body = body.to_string();
    Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap_or_default()
}
