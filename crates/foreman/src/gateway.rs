//! Interface Service
//!
//! Always-on HTTP listener started before discovery and stopped after every
//! worker has stopped. Its shared state is injected into the composition
//! context under the name `"interface"` so workers that need the listener
//! can be wired to it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use foreman_worker::WorkerSnapshot;

use crate::host::HostState;

// ─────────────────────────────────────────────────────────────────────────────
// Gateway State
// ─────────────────────────────────────────────────────────────────────────────

/// Shared state published to HTTP handlers and to workers
#[derive(Clone)]
pub struct GatewayState {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    started_at: DateTime<Utc>,
    host_state: RwLock<HostState>,
    workers: DashMap<String, WorkerSnapshot>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                started_at: Utc::now(),
                host_state: RwLock::new(HostState::Starting),
                workers: DashMap::new(),
            }),
        }
    }

    /// Record the current host state
    pub fn set_host_state(&self, state: HostState) {
        *self.inner.host_state.write() = state;
    }

    pub fn host_state(&self) -> HostState {
        *self.inner.host_state.read()
    }

    /// Replace the published worker snapshot
    pub fn update_workers(&self, snapshot: Vec<WorkerSnapshot>) {
        self.inner.workers.clear();
        for worker in snapshot {
            self.inner.workers.insert(worker.name.clone(), worker);
        }
    }

    pub fn worker_count(&self) -> usize {
        self.inner.workers.len()
    }

    fn workers(&self) -> Vec<WorkerSnapshot> {
        let mut workers: Vec<WorkerSnapshot> = self
            .inner
            .workers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        workers.sort_by(|a, b| a.name.cmp(&b.name));
        workers
    }

    fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.inner.started_at).num_seconds()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Create the interface router
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/workers", get(list_workers))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    host_state: HostState,
    workers: usize,
    uptime_seconds: i64,
}

async fn health_check(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        host_state: state.host_state(),
        workers: state.worker_count(),
        uptime_seconds: state.uptime_seconds(),
    })
}

async fn list_workers(State(state): State<GatewayState>) -> Json<Vec<WorkerSnapshot>> {
    Json(state.workers())
}

// ─────────────────────────────────────────────────────────────────────────────
// Interface Service
// ─────────────────────────────────────────────────────────────────────────────

/// Running HTTP listener with graceful shutdown
pub struct InterfaceService {
    state: GatewayState,
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl InterfaceService {
    /// Bind the listener and start serving
    ///
    /// A bind failure is a fatal setup fault for the host.
    pub async fn start(bind: SocketAddr, state: GatewayState) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let router = create_router(state.clone());

        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.changed().await;
            };
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Interface service error: {}", e);
            }
        });

        info!("Interface service listening on http://{}", addr);

        Ok(Self {
            state,
            addr,
            shutdown_tx,
            handle,
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Signal shutdown and wait for the serve task to exit
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
        info!("Interface service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_worker::{WorkerState, WorkerStatus};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn snapshot(name: &str, state: WorkerState) -> WorkerSnapshot {
        WorkerSnapshot {
            name: name.to_string(),
            state,
            status: Some(WorkerStatus::Started),
        }
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let state = GatewayState::new();
        let service = InterfaceService::start("127.0.0.1:0".parse().unwrap(), state)
            .await
            .unwrap();

        assert_ne!(service.local_addr().port(), 0);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_state_tracks_host_and_workers() {
        let state = GatewayState::new();
        assert_eq!(state.host_state(), HostState::Starting);

        state.set_host_state(HostState::Running);
        state.update_workers(vec![
            snapshot("echo", WorkerState::Started),
            snapshot("idle", WorkerState::Initialized),
        ]);

        assert_eq!(state.host_state(), HostState::Running);
        assert_eq!(state.worker_count(), 2);
        let workers = state.workers();
        assert_eq!(workers[0].name, "echo");
        assert_eq!(workers[1].name, "idle");
    }

    #[tokio::test]
    async fn test_health_endpoint_responds() {
        let state = GatewayState::new();
        state.set_host_state(HostState::Running);
        let service = InterfaceService::start("127.0.0.1:0".parse().unwrap(), state)
            .await
            .unwrap();
        let addr = service.local_addr();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("\"host_state\":\"running\""));

        service.stop().await;
    }
}
