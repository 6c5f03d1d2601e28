//! nbp-daemon entry point.
//!
//! Thin: loads config, connects + migrates the database, sets up tracing,
//! builds shared state, wires middleware and starts the HTTP server. Route
//! handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use nbp_config::{PlanConfig, UnusedKeyPolicy};
use nbp_daemon::{routes, state};
use nbp_db::PgPlanStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const ENV_CONFIG: &str = "NBP_CONFIG";
const ENV_DAEMON_ADDR: &str = "NBP_DAEMON_ADDR";
const DEFAULT_CONFIG: &str = "config/defaults/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = load_config()?;
    info!(
        trader_id = %cfg.trader_id,
        rows = cfg.rows,
        compounding = cfg.compounding.as_str(),
        "config loaded"
    );

    let pool = nbp_db::connect_from_env_var(&cfg.database_url_env).await?;
    nbp_db::migrate(&pool).await?;

    let shared = Arc::new(state::AppState::new(
        Arc::new(PgPlanStore::new(pool)),
        &cfg,
    ));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&cfg);
    info!("nbp-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
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

/// Layered config from NBP_CONFIG (comma-separated, merge order) or the
/// shipped defaults.
fn load_config() -> anyhow::Result<PlanConfig> {
    let raw = std::env::var(ENV_CONFIG).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let paths: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let loaded = nbp_config::load_layered_yaml(&paths)?;
    let report = nbp_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }
    info!(config_hash = %loaded.config_hash, "config hash");

    PlanConfig::from_config_json(&loaded.config_json)
}

/// NBP_DAEMON_ADDR, then /daemon/bind_addr, then 127.0.0.1:8899.
fn bind_addr(cfg: &PlanConfig) -> SocketAddr {
    std::env::var(ENV_DAEMON_ADDR)
        .ok()
        .or_else(|| cfg.daemon_bind_addr.clone())
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)))
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
