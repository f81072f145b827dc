//! Lifecycle Manager
//!
//! Owns every discovered worker for the life of the host and drives it
//! through initialize, selective start, and stop. Each lifecycle call is
//! isolated: one worker's failure never prevents a sibling from reaching
//! its own next state and never aborts the host.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::logger::Logger;
use crate::params::Parameter;
use crate::worker::{Worker, WorkerConfig, WorkerDeclaration, WorkerState, WorkerStatus};

const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// A discovered worker plus the lifecycle state tracked for it
struct ManagedWorker {
    worker: Box<dyn Worker>,
    state: WorkerState,
    declared: Option<WorkerStatus>,
}

/// Point-in-time view of a managed worker, for the interface service and tests
#[derive(Debug, Clone, Serialize)]
pub struct WorkerSnapshot {
    pub name: String,
    pub state: WorkerState,
    pub status: Option<WorkerStatus>,
}

/// Supervises the lifecycle of all discovered workers
///
/// Lifecycle calls run sequentially, one worker at a time, on the calling
/// task. Discovery and initialization are one-shot: the manager is built
/// once during host startup and dropped at shutdown.
pub struct LifecycleManager {
    workers: Vec<ManagedWorker>,
    log: Arc<dyn Logger>,
    stop_timeout: Duration,
    started: usize,
}

impl LifecycleManager {
    /// Take ownership of the discovered workers
    pub fn new(workers: Vec<Box<dyn Worker>>, log: Arc<dyn Logger>) -> Self {
        let workers = workers
            .into_iter()
            .map(|worker| ManagedWorker {
                worker,
                state: WorkerState::Discovered,
                declared: None,
            })
            .collect();

        Self {
            workers,
            log,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            started: 0,
        }
    }

    /// Bound the wait on each worker's `stop` call
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Initialize every discovered worker against its declaration
    ///
    /// A worker with no matching declaration is a fault: it is marked
    /// `Failed`, logged, and excluded from further lifecycle steps. A
    /// declaration with no matching worker is silently ignored.
    pub async fn initialize(&mut self, declarations: &[WorkerDeclaration], globals: &[Parameter]) {
        for managed in &mut self.workers {
            let name = managed.worker.name().to_string();

            let Some(declaration) = declarations.iter().find(|d| d.name == name) else {
                self.log.error(
                    &format!("Could not initialize worker '{name}': no declaration found"),
                    None,
                );
                managed.state = WorkerState::Failed;
                continue;
            };

            let config = WorkerConfig::for_declaration(declaration, globals);
            managed.declared = Some(declaration.status);

            match managed.worker.initialize(config, Arc::clone(&self.log)).await {
                Ok(()) => {
                    managed.state = WorkerState::Initialized;
                }
                Err(e) => {
                    self.log
                        .error(&format!("Could not initialize worker '{name}'"), Some(&e));
                    managed.state = WorkerState::Failed;
                }
            }
        }
    }

    /// Start every initialized worker whose declared status is `Started`
    ///
    /// Each `start` call is isolated; a fault marks that worker `Failed`
    /// without touching the others. Returns the number of workers that
    /// started successfully.
    pub async fn start(&mut self) -> usize {
        let mut started = 0;

        for managed in &mut self.workers {
            if managed.state != WorkerState::Initialized {
                continue;
            }
            if managed.worker.status() != WorkerStatus::Started {
                continue;
            }

            let name = managed.worker.name().to_string();
            match managed.worker.start().await {
                Ok(()) => {
                    managed.state = WorkerState::Started;
                    started += 1;
                    self.log.info(&format!("Worker '{name}' started"));
                }
                Err(e) => {
                    self.log
                        .error(&format!("Could not start worker '{name}'"), Some(&e));
                    managed.state = WorkerState::Failed;
                }
            }
        }

        self.started = started;
        self.log
            .info(&format!("Foreman started {started} of {} workers", self.workers.len()));
        started
    }

    /// Stop every worker still in `Initialized` or `Started`
    ///
    /// Best effort: faults and timeouts are logged and never propagate.
    /// Every visited worker ends in `Stopped`, so calling this twice never
    /// invokes a worker's `stop` more than once.
    pub async fn stop_all(&mut self) {
        for managed in &mut self.workers {
            if !matches!(
                managed.state,
                WorkerState::Initialized | WorkerState::Started
            ) {
                continue;
            }

            let name = managed.worker.name().to_string();
            match tokio::time::timeout(self.stop_timeout, managed.worker.stop()).await {
                Ok(Ok(())) => {
                    self.log.info(&format!("Worker '{name}' stopped"));
                }
                Ok(Err(e)) => {
                    self.log
                        .error(&format!("Could not stop worker '{name}'"), Some(&e));
                }
                Err(_) => {
                    self.log.error(
                        &format!("Worker '{name}' did not stop within {:?}; abandoning", self.stop_timeout),
                        None,
                    );
                }
            }
            managed.state = WorkerState::Stopped;
        }
    }

    /// Number of workers that started successfully during `start`
    pub fn started_count(&self) -> usize {
        self.started
    }

    /// Lifecycle state of a worker by name
    pub fn state_of(&self, name: &str) -> Option<WorkerState> {
        self.workers
            .iter()
            .find(|m| m.worker.name() == name)
            .map(|m| m.state)
    }

    /// Snapshot of all managed workers
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers
            .iter()
            .map(|m| WorkerSnapshot {
                name: m.worker.name().to_string(),
                state: m.state,
                status: m.declared,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::TraceLogger;
    use crate::worker::{WorkerError, WorkerResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        inits: AtomicUsize,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    struct CountingWorker {
        name: String,
        status: WorkerStatus,
        counters: Arc<Counters>,
        fail_init: bool,
        fail_start: bool,
        fail_stop: bool,
        hang_on_stop: bool,
        seen_params: Arc<parking_lot::Mutex<Option<WorkerConfig>>>,
    }

    impl CountingWorker {
        fn new(name: &str) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                Self {
                    name: name.to_string(),
                    status: WorkerStatus::Stopped,
                    counters: Arc::clone(&counters),
                    fail_init: false,
                    fail_start: false,
                    fail_stop: false,
                    hang_on_stop: false,
                    seen_params: Arc::new(parking_lot::Mutex::new(None)),
                },
                counters,
            )
        }
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn name(&self) -> &str {
            &self.name
        }

        fn status(&self) -> WorkerStatus {
            self.status
        }

        async fn initialize(
            &mut self,
            config: WorkerConfig,
            _log: Arc<dyn Logger>,
        ) -> WorkerResult<()> {
            self.counters.inits.fetch_add(1, Ordering::SeqCst);
            if self.fail_init {
                return Err(WorkerError::InitializationFailed("boom".to_string()));
            }
            self.status = config.status;
            *self.seen_params.lock() = Some(config);
            Ok(())
        }

        async fn start(&mut self) -> WorkerResult<()> {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(WorkerError::StartFailed("boom".to_string()));
            }
            Ok(())
        }

        async fn stop(&mut self) -> WorkerResult<()> {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            if self.hang_on_stop {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
            if self.fail_stop {
                return Err(WorkerError::StopFailed("boom".to_string()));
            }
            Ok(())
        }
    }

    fn declare(name: &str, status: WorkerStatus) -> WorkerDeclaration {
        WorkerDeclaration {
            name: name.to_string(),
            status,
            parameters: Vec::new(),
        }
    }

    fn manager(workers: Vec<Box<dyn Worker>>) -> LifecycleManager {
        LifecycleManager::new(workers, Arc::new(TraceLogger))
    }

    #[tokio::test]
    async fn test_undeclared_worker_fails_without_affecting_siblings() {
        let (ghost, ghost_counters) = CountingWorker::new("ghost");
        let (echo, echo_counters) = CountingWorker::new("echo");

        let mut mgr = manager(vec![Box::new(ghost), Box::new(echo)]);
        mgr.initialize(&[declare("echo", WorkerStatus::Started)], &[])
            .await;

        assert_eq!(mgr.state_of("ghost"), Some(WorkerState::Failed));
        assert_eq!(mgr.state_of("echo"), Some(WorkerState::Initialized));
        assert_eq!(ghost_counters.inits.load(Ordering::SeqCst), 0);
        assert_eq!(echo_counters.inits.load(Ordering::SeqCst), 1);

        // The failed worker is excluded from every later step.
        let started = mgr.start().await;
        assert_eq!(started, 1);
        mgr.stop_all().await;
        assert_eq!(ghost_counters.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_declared_but_not_discovered_is_ignored() {
        let (echo, _) = CountingWorker::new("echo");
        let mut mgr = manager(vec![Box::new(echo)]);

        mgr.initialize(
            &[
                declare("echo", WorkerStatus::Started),
                declare("absent", WorkerStatus::Started),
            ],
            &[],
        )
        .await;

        assert_eq!(mgr.state_of("echo"), Some(WorkerState::Initialized));
        assert_eq!(mgr.state_of("absent"), None);
        assert_eq!(mgr.start().await, 1);
    }

    #[tokio::test]
    async fn test_start_failure_is_isolated_and_counted() {
        let (mut bad, bad_counters) = CountingWorker::new("bad");
        bad.fail_start = true;
        let (good, good_counters) = CountingWorker::new("good");

        let mut mgr = manager(vec![Box::new(bad), Box::new(good)]);
        mgr.initialize(
            &[
                declare("bad", WorkerStatus::Started),
                declare("good", WorkerStatus::Started),
            ],
            &[],
        )
        .await;

        let started = mgr.start().await;
        assert_eq!(started, 1);
        assert_eq!(mgr.started_count(), 1);
        assert_eq!(mgr.state_of("bad"), Some(WorkerState::Failed));
        assert_eq!(mgr.state_of("good"), Some(WorkerState::Started));
        assert_eq!(bad_counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(good_counters.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_declared_stopped_worker_is_initialized_but_not_started() {
        let (idle, counters) = CountingWorker::new("idle");
        let mut mgr = manager(vec![Box::new(idle)]);

        mgr.initialize(&[declare("idle", WorkerStatus::Stopped)], &[])
            .await;
        let started = mgr.start().await;

        assert_eq!(started, 0);
        assert_eq!(mgr.state_of("idle"), Some(WorkerState::Initialized));
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);

        // Stop still visits it during shutdown.
        mgr.stop_all().await;
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state_of("idle"), Some(WorkerState::Stopped));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (echo, counters) = CountingWorker::new("echo");
        let mut mgr = manager(vec![Box::new(echo)]);

        mgr.initialize(&[declare("echo", WorkerStatus::Started)], &[])
            .await;
        mgr.start().await;

        mgr.stop_all().await;
        mgr.stop_all().await;

        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state_of("echo"), Some(WorkerState::Stopped));
    }

    #[tokio::test]
    async fn test_stop_failure_does_not_block_remaining_workers() {
        let (mut bad, _) = CountingWorker::new("bad");
        bad.fail_stop = true;
        let (good, good_counters) = CountingWorker::new("good");

        let mut mgr = manager(vec![Box::new(bad), Box::new(good)]);
        mgr.initialize(
            &[
                declare("bad", WorkerStatus::Started),
                declare("good", WorkerStatus::Started),
            ],
            &[],
        )
        .await;
        mgr.start().await;
        mgr.stop_all().await;

        assert_eq!(good_counters.stops.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state_of("bad"), Some(WorkerState::Stopped));
        assert_eq!(mgr.state_of("good"), Some(WorkerState::Stopped));
    }

    #[tokio::test]
    async fn test_hung_stop_is_abandoned_after_timeout() {
        let (mut hung, _) = CountingWorker::new("hung");
        hung.hang_on_stop = true;
        let (good, good_counters) = CountingWorker::new("good");

        let mut mgr = manager(vec![Box::new(hung), Box::new(good)])
            .with_stop_timeout(Duration::from_millis(50));
        mgr.initialize(
            &[
                declare("hung", WorkerStatus::Started),
                declare("good", WorkerStatus::Started),
            ],
            &[],
        )
        .await;
        mgr.start().await;
        mgr.stop_all().await;

        assert_eq!(mgr.state_of("hung"), Some(WorkerState::Stopped));
        assert_eq!(good_counters.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_passes_merged_parameters() {
        let (echo, _) = CountingWorker::new("echo");
        let seen = Arc::clone(&echo.seen_params);
        let mut mgr = manager(vec![Box::new(echo)]);

        let declaration = WorkerDeclaration {
            name: "echo".to_string(),
            status: WorkerStatus::Started,
            parameters: vec![Parameter::new("B", "2")],
        };
        let globals = vec![Parameter::new("B", "9"), Parameter::new("C", "3")];

        mgr.initialize(&[declaration], &globals).await;

        let config = seen.lock().take().unwrap();
        assert_eq!(config.status, WorkerStatus::Started);
        assert_eq!(config.parameters.get("B"), Some("2"));
        assert_eq!(config.parameters.get("C"), Some("3"));
    }

    #[tokio::test]
    async fn test_snapshot_reflects_states() {
        let (echo, _) = CountingWorker::new("echo");
        let mut mgr = manager(vec![Box::new(echo)]);

        mgr.initialize(&[declare("echo", WorkerStatus::Started)], &[])
            .await;
        mgr.start().await;

        let snapshot = mgr.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "echo");
        assert_eq!(snapshot[0].state, WorkerState::Started);
        assert_eq!(snapshot[0].status, Some(WorkerStatus::Started));
    }
}
