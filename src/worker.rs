// Background refresh worker: list stacks, validate them, publish the snapshot.

use crate::docker_repo::DockerRepo;
use crate::models::{Stack, StackReport, StackSnapshot};
use crate::validator::validate_stack;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Rate limit for "no receivers" message (avoid logging every tick when no one is on /ws/stacks)
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Repo, shared state, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub docker_repo: Arc<DockerRepo>,
    pub latest: Arc<RwLock<StackSnapshot>>,
    pub tx: broadcast::Sender<StackSnapshot>,
    pub ws_stacks_connections: Arc<AtomicUsize>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub refresh_interval_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Validate every stack and wrap the reports in a snapshot.
pub fn build_snapshot(stacks: Vec<Stack>, timestamp: u64) -> StackSnapshot {
    let stacks = stacks
        .into_iter()
        .map(|stack| {
            let validation = validate_stack(&stack);
            StackReport { stack, validation }
        })
        .collect();
    StackSnapshot { timestamp, stacks }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        docker_repo,
        latest,
        tx,
        ws_stacks_connections,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        refresh_interval_ms,
        stats_log_interval_secs,
    } = config;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_millis(refresh_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut refreshes_total: u64 = 0;
        let mut refresh_failures_total: u64 = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let stacks = match docker_repo.list_stacks().await {
                        Ok(s) => s,
                        Err(e) => {
                            refresh_failures_total += 1;
                            tracing::warn!(
                                error = %e,
                                operation = "list_stacks",
                                "stack refresh failed; keeping previous snapshot"
                            );
                            continue;
                        }
                    };
                    let snapshot = build_snapshot(stacks, now_millis());
                    refreshes_total += 1;
                    *latest.write().await = snapshot.clone();

                    if tx.send(snapshot).is_err() {
                        let should_warn = last_no_receivers_warn
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                        if should_warn {
                            tracing::debug!(
                                operation = "broadcast_snapshot",
                                "No active WebSocket clients; broadcast channel has no receivers"
                            );
                            last_no_receivers_warn = Some(Instant::now());
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_stacks_clients = ws_stacks_connections.load(Ordering::Relaxed),
                        refreshes_total,
                        refresh_failures_total,
                        "app stats"
                    );
                }
            }
        }
    }
    .instrument(tracing::debug_span!("worker", refresh_interval_ms)))
}
