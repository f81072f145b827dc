//! Host Run Loop & Control Surface
//!
//! The [`Host`] owns the orchestrator state: the configuration, the
//! discovered workers (via the lifecycle manager), the interface service,
//! and the run/shutdown state machine. `on_start` performs the one-shot
//! setup sequence, `run` keeps the host alive until cancellation, and
//! `on_stop` drives the coordinated shutdown exactly once.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{info, warn};

use foreman_worker::{
    AggregateLogger, CompositionContext, FileLogger, LifecycleManager, Logger, TraceLogger,
    WorkerRegistry, WorkerSnapshot,
};

use crate::artifacts::ArtifactStore;
use crate::config::{ConfigSource, Configuration};
use crate::discovery;
use crate::gateway::{GatewayState, InterfaceService};
use crate::settings::HostSettings;

/// Name under which the interface-service state is exposed to factories
pub const INTERFACE_SERVICE: &str = "interface";

/// Global parameter enabling the file log sink
const LOG_FILE_PARAMETER: &str = "LogFile";

/// Host lifecycle states, driven only by the run loop and the stop sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Fatal setup faults; everything else is logged and absorbed
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Interface service failed to start: {0}")]
    Interface(#[from] std::io::Error),

    #[error("Invalid bind address: {0}")]
    BindAddr(#[from] std::net::AddrParseError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Host
// ─────────────────────────────────────────────────────────────────────────────

/// The long-running host process
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

struct HostInner {
    settings: HostSettings,
    registry: WorkerRegistry,
    config_source: Box<dyn ConfigSource>,
    artifacts: Option<Arc<dyn ArtifactStore>>,

    state_tx: watch::Sender<HostState>,
    shutdown_tx: watch::Sender<bool>,
    run_done_tx: parking_lot::Mutex<Option<oneshot::Sender<()>>>,
    run_done_rx: parking_lot::Mutex<Option<oneshot::Receiver<()>>>,
    run_entered: AtomicBool,
    stop_started: AtomicBool,

    log: parking_lot::Mutex<Arc<dyn Logger>>,
    manager: Mutex<Option<LifecycleManager>>,
    gateway: Mutex<Option<InterfaceService>>,
    gateway_state: GatewayState,
}

impl Host {
    pub fn new(
        settings: HostSettings,
        registry: WorkerRegistry,
        config_source: Box<dyn ConfigSource>,
        artifacts: Option<Arc<dyn ArtifactStore>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(HostState::Starting);
        let (shutdown_tx, _) = watch::channel(false);
        let (run_done_tx, run_done_rx) = oneshot::channel();

        Self {
            inner: Arc::new(HostInner {
                settings,
                registry,
                config_source,
                artifacts,
                state_tx,
                shutdown_tx,
                run_done_tx: parking_lot::Mutex::new(Some(run_done_tx)),
                run_done_rx: parking_lot::Mutex::new(Some(run_done_rx)),
                run_entered: AtomicBool::new(false),
                stop_started: AtomicBool::new(false),
                log: parking_lot::Mutex::new(Arc::new(TraceLogger)),
                manager: Mutex::new(None),
                gateway: Mutex::new(None),
                gateway_state: GatewayState::new(),
            }),
        }
    }

    /// Current host state
    pub fn state(&self) -> HostState {
        *self.inner.state_tx.borrow()
    }

    /// Watch channel for host-state transitions
    pub fn state_watch(&self) -> watch::Receiver<HostState> {
        self.inner.state_tx.subscribe()
    }

    /// Shared interface-service state
    pub fn gateway_state(&self) -> GatewayState {
        self.inner.gateway_state.clone()
    }

    /// Address the interface service is bound to, once started
    pub async fn gateway_addr(&self) -> Option<std::net::SocketAddr> {
        self.inner
            .gateway
            .lock()
            .await
            .as_ref()
            .map(InterfaceService::local_addr)
    }

    /// Snapshot of the managed workers
    pub async fn worker_states(&self) -> Vec<WorkerSnapshot> {
        self.inner
            .manager
            .lock()
            .await
            .as_ref()
            .map(LifecycleManager::snapshot)
            .unwrap_or_default()
    }

    /// Number of workers that started successfully
    pub async fn started_count(&self) -> usize {
        self.inner
            .manager
            .lock()
            .await
            .as_ref()
            .map(LifecycleManager::started_count)
            .unwrap_or(0)
    }

    fn log(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.inner.log.lock())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Startup
    // ─────────────────────────────────────────────────────────────────────

    /// One-shot setup: configuration, loggers, interface service, artifact
    /// sync, discovery, initialization, start.
    ///
    /// Only a collaborator-startup fault is fatal; configuration and
    /// discovery faults are logged and absorbed so the host still runs.
    pub async fn on_start(&self) -> Result<(), HostError> {
        let inner = &self.inner;
        info!("Foreman host starting");

        let configuration = self.load_configuration().await;

        let log = build_logger(&configuration);
        *inner.log.lock() = Arc::clone(&log);

        // The interface service must be available before discovery so
        // workers can be wired to it.
        let bind = inner.settings.bind_addr()?;
        let gateway = InterfaceService::start(bind, inner.gateway_state.clone()).await?;

        if let Some(store) = &inner.artifacts {
            if let Err(e) = store.sync(&inner.settings.download_dir).await {
                log.error("Could not sync worker artifacts", Some(e.as_ref()));
            }
        }

        let mut ctx = CompositionContext::new();
        ctx.insert(INTERFACE_SERVICE, Arc::new(inner.gateway_state.clone()));

        let host_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let locations = discovery::candidate_locations(
            &host_dir,
            &inner.settings.download_dir,
            configuration.worker_names(),
        );
        let workers = discovery::discover(&locations, &inner.registry, &ctx, &log).await;
        if workers.is_empty() {
            log.warning("No workers discovered");
        }

        let mut manager = LifecycleManager::new(workers, Arc::clone(&log))
            .with_stop_timeout(inner.settings.stop_timeout());
        manager
            .initialize(&configuration.workers, &configuration.parameters)
            .await;
        manager.start().await;

        inner.gateway_state.update_workers(manager.snapshot());
        *inner.manager.lock().await = Some(manager);
        *inner.gateway.lock().await = Some(gateway);

        Ok(())
    }

    /// Fetch and parse the configuration document; any fault is non-fatal
    /// and yields an empty configuration.
    async fn load_configuration(&self) -> Configuration {
        let document = match self.inner.config_source.fetch().await {
            Ok(document) => document,
            Err(e) => {
                warn!("Could not read the configuration, proceeding with none: {}", e);
                return Configuration::default();
            }
        };

        match Configuration::from_json(&document) {
            Ok(configuration) => {
                info!(
                    "Loaded configuration: {} workers declared, {} global parameters",
                    configuration.workers.len(),
                    configuration.parameters.len()
                );
                configuration
            }
            Err(e) => {
                warn!("Could not parse the configuration, proceeding with none: {}", e);
                Configuration::default()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Run loop
    // ─────────────────────────────────────────────────────────────────────

    /// Keep the host alive until the cancellation flag is set
    ///
    /// Polls the flag on the configured interval rather than busy-spinning,
    /// then fires the completion signal exactly once on exit.
    pub async fn run(&self) {
        let inner = &self.inner;
        inner.run_entered.store(true, Ordering::SeqCst);

        let _ = inner.state_tx.send(HostState::Running);
        inner.gateway_state.set_host_state(HostState::Running);
        self.log().info("Foreman is running");

        let shutdown_rx = inner.shutdown_tx.subscribe();
        let poll = inner.settings.poll_interval();
        while !*shutdown_rx.borrow() {
            tokio::time::sleep(poll).await;
        }

        if let Some(done) = inner.run_done_tx.lock().take() {
            let _ = done.send(());
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shutdown
    // ─────────────────────────────────────────────────────────────────────

    /// Coordinated stop sequence
    ///
    /// Exactly one sequence runs; a concurrent second call waits for
    /// `Stopped` and returns without touching any worker. After this
    /// returns the host state is `Stopped`.
    pub async fn on_stop(&self) {
        let inner = &self.inner;

        if inner.stop_started.swap(true, Ordering::SeqCst) {
            let mut state_rx = inner.state_tx.subscribe();
            let _ = state_rx.wait_for(|s| *s == HostState::Stopped).await;
            return;
        }

        let log = self.log();
        let _ = inner.state_tx.send(HostState::Stopping);
        inner.gateway_state.set_host_state(HostState::Stopping);

        if let Some(manager) = inner.manager.lock().await.as_mut() {
            manager.stop_all().await;
            inner.gateway_state.update_workers(manager.snapshot());
        }

        log.info("Foreman is stopping");

        // Cancel the run loop and wait until it observes the flag.
        let _ = inner.shutdown_tx.send(true);
        let receiver = inner.run_done_rx.lock().take();
        if inner.run_entered.load(Ordering::SeqCst) {
            if let Some(done) = receiver {
                let _ = done.await;
            }
        }

        // The interface service outlives the workers and goes down last.
        if let Some(gateway) = inner.gateway.lock().await.take() {
            gateway.stop().await;
        }

        let _ = inner.state_tx.send(HostState::Stopped);
        inner.gateway_state.set_host_state(HostState::Stopped);
        log.info("Foreman has stopped");
    }
}

/// Compose the logger fan-out from the configuration: the trace sink is
/// always present, a file sink is added when `LogFile` names a path.
fn build_logger(configuration: &Configuration) -> Arc<dyn Logger> {
    let mut log = AggregateLogger::new();
    log.add(Arc::new(TraceLogger));

    if let Some(path) = configuration.parameter(LOG_FILE_PARAMETER) {
        if !path.trim().is_empty() {
            match FileLogger::open(path) {
                Ok(sink) => log.add(Arc::new(sink)),
                Err(e) => warn!("Could not open log file '{}': {}", path, e),
            }
        }
    }

    Arc::new(log)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
