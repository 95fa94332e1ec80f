// WebSocket handler and stream logic

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::StackSnapshot;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Decrements ws_stacks connection count on drop (connect = +1, drop = -1).
struct WsStacksGuard(Arc<AtomicUsize>);

impl Drop for WsStacksGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

pub(super) async fn ws_stacks(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let tx = state.stacks_tx.clone();
    let latest = state.latest.clone();
    let conn_count = state.ws_stacks_connections.clone();
    ws.on_upgrade(move |socket| async move {
        let mut rx = tx.subscribe();
        if let Err(e) = stream_stacks(socket, &mut rx, latest, conn_count).await {
            tracing::info!("Stacks stream error: {}", e);
        }
    })
}

/// Send with a deadline; `false` means the client is gone or too slow.
async fn send_timed(socket: &mut WebSocket, msg: Message) -> bool {
    matches!(timeout(WS_SEND_TIMEOUT, socket.send(msg)).await, Ok(Ok(())))
}

async fn stream_stacks(
    mut socket: WebSocket,
    rx: &mut broadcast::Receiver<StackSnapshot>,
    latest: Arc<RwLock<StackSnapshot>>,
    conn_count: Arc<AtomicUsize>,
) -> anyhow::Result<()> {
    conn_count.fetch_add(1, Ordering::Relaxed);
    let _guard = WsStacksGuard(conn_count);
    tracing::info!("Client connected to Stacks stream");

    // Current snapshot first, then one message per refresh.
    let initial = serde_json::to_string(&*latest.read().await)?;
    if !send_timed(&mut socket, Message::Text(initial.into())).await {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        let json = serde_json::to_string(&snapshot)?;
                        if !send_timed(&mut socket, Message::Text(json.into())).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket /ws/stacks client lagged, skipped {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                if !send_timed(&mut socket, Message::Ping(Bytes::new())).await {
                    break;
                }
            }
        }
    }
    Ok(())
}
