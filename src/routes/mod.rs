// HTTP + WebSocket routes

mod error;
mod http;
mod ws;

pub use error::{ApiError, ErrorResponse};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::{Any, CorsLayer};

use crate::models::StackSnapshot;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) stacks_tx: broadcast::Sender<StackSnapshot>,
    pub(crate) latest: Arc<RwLock<StackSnapshot>>,
    pub(crate) ws_stacks_connections: Arc<AtomicUsize>,
}

pub fn app(
    stacks_tx: broadcast::Sender<StackSnapshot>,
    latest: Arc<RwLock<StackSnapshot>>,
    ws_stacks_connections: Arc<AtomicUsize>,
) -> Router {
    let state = AppState {
        stacks_tx,
        latest,
        ws_stacks_connections,
    };
    Router::new()
        .route("/", get(|| async { "stackscope: Docker stack dashboard API" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stacks", get(http::list_stacks_handler)) // GET /api/stacks
        .route("/api/stacks/{name}", get(http::get_stack_handler)) // GET /api/stacks/{name}
        .route(
            "/api/stacks/{name}/validation",
            get(http::stack_validation_handler),
        ) // GET /api/stacks/{name}/validation
        .route("/api/validate", post(http::validate_handler)) // POST /api/validate
        .route("/api/ports/normalize", post(http::normalize_ports_handler)) // POST /api/ports/normalize
        .route("/ws/stacks", get(ws::ws_stacks)) // WS /ws/stacks
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
