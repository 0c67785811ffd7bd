//! Axum router wiring.
//!
//! - `/v1/bridge` : WebSocket bridge (`?page=<url>`)
//! - `/healthz`, `/metrics` : see `ops`

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/bridge", get(transport::ws::ws_upgrade))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
