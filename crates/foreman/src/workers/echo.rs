//! Echo Worker
//!
//! Logs a configurable message on start and stop. Mostly useful for
//! verifying a deployment end to end.

use std::sync::Arc;

use async_trait::async_trait;

use foreman_worker::{Logger, Worker, WorkerConfig, WorkerResult, WorkerStatus};

const MESSAGE_PARAMETER: &str = "Echo.Message";
const DEFAULT_MESSAGE: &str = "hello from foreman";

pub struct EchoWorker {
    status: WorkerStatus,
    message: String,
    log: Option<Arc<dyn Logger>>,
}

impl EchoWorker {
    pub fn new() -> Self {
        Self {
            status: WorkerStatus::Stopped,
            message: DEFAULT_MESSAGE.to_string(),
            log: None,
        }
    }
}

impl Default for EchoWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for EchoWorker {
    fn name(&self) -> &str {
        "echo"
    }

    fn status(&self) -> WorkerStatus {
        self.status
    }

    async fn initialize(&mut self, config: WorkerConfig, log: Arc<dyn Logger>) -> WorkerResult<()> {
        self.status = config.status;
        if let Some(message) = config.parameters.get(MESSAGE_PARAMETER) {
            self.message = message.to_string();
        }
        self.log = Some(log);
        Ok(())
    }

    async fn start(&mut self) -> WorkerResult<()> {
        if let Some(log) = &self.log {
            log.info(&format!("echo: {}", self.message));
        }
        Ok(())
    }

    async fn stop(&mut self) -> WorkerResult<()> {
        if let Some(log) = &self.log {
            log.info("echo: goodbye");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_worker::{Parameter, TraceLogger, WorkerDeclaration};

    fn config(parameters: Vec<Parameter>) -> WorkerConfig {
        WorkerConfig::for_declaration(
            &WorkerDeclaration {
                name: "echo".to_string(),
                status: WorkerStatus::Started,
                parameters,
            },
            &[],
        )
    }

    #[tokio::test]
    async fn test_echo_uses_configured_message() {
        let mut worker = EchoWorker::new();
        worker
            .initialize(
                config(vec![Parameter::new(MESSAGE_PARAMETER, "custom")]),
                Arc::new(TraceLogger),
            )
            .await
            .unwrap();

        assert_eq!(worker.status(), WorkerStatus::Started);
        assert_eq!(worker.message, "custom");
        worker.start().await.unwrap();
        worker.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_echo_defaults_without_parameter() {
        let mut worker = EchoWorker::new();
        worker
            .initialize(config(Vec::new()), Arc::new(TraceLogger))
            .await
            .unwrap();
        assert_eq!(worker.message, DEFAULT_MESSAGE);
    }
}
