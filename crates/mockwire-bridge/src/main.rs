//! mockwire bridge server.
//!
//! Serves the background mock engine over WebSocket:
//! - `/v1/bridge?page=<url>`: request/reply envelopes, page URL as sender
//! - `/healthz`, `/metrics`
//!
//! Config path from the first argument, default `mockwire.yaml`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use mockwire_bridge::engine::MemoryStore;
use mockwire_bridge::{app_state, config, router};
use mockwire_core::error::{MockWireError, Result};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "mockwire-bridge failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "mockwire.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .bridge
        .listen
        .parse()
        .map_err(|e| MockWireError::BadRequest(format!("bridge.listen must be a valid SocketAddr: {e}")))?;

    let store = match &cfg.store.rules_file {
        Some(rules) => MemoryStore::load_seed_file(rules)?,
        None => MemoryStore::new(),
    };

    let state = app_state::AppState::new(cfg, Arc::new(store));
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "mockwire-bridge starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MockWireError::Transport(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| MockWireError::Internal(format!("server failed: {e}")))
}
