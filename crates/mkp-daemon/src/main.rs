//! mkp-daemon entry point.
//!
//! Sets up tracing, loads layered config, picks the storage backend, wires
//! middleware and starts the HTTP server. Route handlers live in
//! `routes.rs`; shared state lives in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use mkp_config::{
    load_layered_yaml, report_unused_keys, secrets::resolve_secrets, EngineSettings,
    StorageBackend, UnusedKeyPolicy,
};
use mkp_daemon::{
    backend::{Marketplace, MemoryMarketplace, PgMarketplace},
    routes, state,
};
use mkp_schemas::{RandomIds, SystemClock};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const DEFAULT_CONFIG_PATHS: &str = "config/defaults/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let raw_paths =
        std::env::var("MKP_CONFIG_PATHS").unwrap_or_else(|_| DEFAULT_CONFIG_PATHS.to_string());
    let paths: Vec<&str> = raw_paths
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let loaded = load_layered_yaml(&paths)?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys nothing reads");
    }
    let settings = EngineSettings::from_config_json(&loaded.config_json)?;
    let secrets = resolve_secrets(&settings)?;
    info!(
        config_hash = %loaded.config_hash,
        backend = settings.storage.backend.as_str(),
        lifecycle = settings.lifecycle_policy.as_str(),
        delete_policy = settings.delete_policy.as_str(),
        "config loaded"
    );

    let market: Arc<dyn Marketplace> = match settings.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryMarketplace::new(
            Arc::new(SystemClock),
            Arc::new(RandomIds),
            &settings,
        )),
        StorageBackend::Postgres => {
            let url = secrets
                .database_url
                .as_deref()
                .context("postgres backend selected but no database url resolved")?;
            let pool = mkp_db::connect(url).await?;
            mkp_db::migrate(&pool).await?;
            Arc::new(PgMarketplace::new(
                pool,
                Arc::new(SystemClock),
                Arc::new(RandomIds),
                &settings,
            ))
        }
    };

    let shared = Arc::new(state::AppState::new(market, Some(loaded.config_hash)));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => settings
            .bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid daemon.bind_addr '{}'", settings.bind_addr))?,
    };
    info!("mkp-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("MKP_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
    }
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
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
