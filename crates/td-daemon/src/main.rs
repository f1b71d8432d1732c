//! td-daemon entry point.
//!
//! Sets up tracing, loads configuration, builds the shared state, wires
//! middleware and serves HTTP until Ctrl-C. Handlers live in `routes.rs`;
//! shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use td_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let paths = config_paths_from_env();
    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let (loaded, desk) = td_config::load_desk_config(&path_refs)?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "configuration loaded");

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => desk
            .server
            .addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid server.addr {:?}", desk.server.addr))?,
    };
    let heartbeat_secs = desk.notify.heartbeat_secs;

    let shared = Arc::new(state::AppState::boot(desk).await?);

    if heartbeat_secs > 0 {
        state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(heartbeat_secs));
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    info!("td-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    if let Err(err) = shared.engine.flush().await {
        warn!(error = %format!("{err:#}"), "flush on shutdown failed");
    } else {
        info!("state flushed; bye");
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `TD_CONFIG=base.yaml,local.yaml` (later layers win). Unset means defaults.
fn config_paths_from_env() -> Vec<String> {
    std::env::var("TD_CONFIG")
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("TD_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
