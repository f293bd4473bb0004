use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use api_observatory::Observatory;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod demo;

const ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,api_observatory=debug")),
        )
        .init();

    // ── 1. Observatory from OBSERVATORY_* ────────────────────────
    let observatory = match Observatory::from_env() {
        Ok(obs) => obs,
        Err(err) => {
            error!(error = %err, "invalid observatory configuration");
            return ExitCode::FAILURE;
        }
    };
    observatory.start();

    // ── 2. Seed demo data and build the router ───────────────────
    let catalog = Arc::new(demo::catalog::Catalog::seeded());
    let app = observatory
        .attach(demo::api_router(catalog))
        .layer(CorsLayer::permissive());

    // ── 3. Optional in-process load ──────────────────────────────
    let load_running = Arc::new(AtomicBool::new(false));
    let load_handle = if std::env::var("OBSERVATORY_DEMO_LOAD").is_ok_and(|v| v == "1") {
        load_running.store(true, Ordering::SeqCst);
        Some(tokio::spawn(demo::load_generator::run(
            load_running.clone(),
            app.clone(),
            8,
            80,
        )))
    } else {
        None
    };

    // ── 4. Bind & serve ──────────────────────────────────────────
    let listener = match tokio::net::TcpListener::bind(ADDR).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, addr = ADDR, "failed to bind, is the port already in use?");
            return ExitCode::FAILURE;
        }
    };

    let mount = observatory.config().mount_path.clone();
    info!("server listening on http://localhost:3000");
    info!("metrics JSON → http://localhost:3000{mount}/metrics");
    info!("metrics SSE  → http://localhost:3000{mount}/stream");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // ── 5. Teardown ──────────────────────────────────────────────
    load_running.store(false, Ordering::SeqCst);
    if let Some(handle) = load_handle {
        let _ = handle.await;
    }
    observatory.shutdown();

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}
