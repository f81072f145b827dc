//! Heartbeat Worker
//!
//! Emits a periodic log line while started. The interval comes from the
//! `Heartbeat.Interval` parameter (seconds); the periodic task is spawned
//! on start and aborted on stop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use foreman_worker::{Logger, Worker, WorkerConfig, WorkerResult, WorkerStatus};

const INTERVAL_PARAMETER: &str = "Heartbeat.Interval";
const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

pub struct HeartbeatWorker {
    status: WorkerStatus,
    interval: Duration,
    log: Option<Arc<dyn Logger>>,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatWorker {
    pub fn new() -> Self {
        Self {
            status: WorkerStatus::Stopped,
            interval: DEFAULT_INTERVAL,
            log: None,
            task: None,
        }
    }
}

impl Default for HeartbeatWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for HeartbeatWorker {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn status(&self) -> WorkerStatus {
        self.status
    }

    async fn initialize(&mut self, config: WorkerConfig, log: Arc<dyn Logger>) -> WorkerResult<()> {
        self.status = config.status;

        if let Some(raw) = config.parameters.get(INTERVAL_PARAMETER) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.interval = Duration::from_secs(secs),
                _ => log.warning(&format!(
                    "heartbeat: invalid {INTERVAL_PARAMETER} '{raw}', using default"
                )),
            }
        }

        self.log = Some(log);
        Ok(())
    }

    async fn start(&mut self) -> WorkerResult<()> {
        let Some(log) = self.log.clone() else {
            return Ok(());
        };

        let interval = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the interval
            // measures from start.
            timer.tick().await;
            loop {
                timer.tick().await;
                log.info("heartbeat");
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) -> WorkerResult<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }
}
