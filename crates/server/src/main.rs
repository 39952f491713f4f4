use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::Method,
    routing::get,
    Json, Router,
};
use shared::domain::RoleCounts;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod dispatch;
mod emulator;
mod keymap;
mod registry;
mod ws;

use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RELAY_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let state = Arc::new(AppState::new(&settings));
    let app = build_router(state, settings.cors_any_origin);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(
        %addr,
        press_release_ms = settings.press_release_ms,
        default_mode = %settings.default_mode,
        "relay listening; waiting for controllers and actuators"
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, cors_any_origin: bool) -> Router {
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    if cors_any_origin {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST]),
        )
    } else {
        router
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<Arc<AppState>>) -> Json<RoleCounts> {
    Json(state.dispatcher.registry().counts())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
