//! Worker Capability Contract
//!
//! Every discoverable worker implements the [`Worker`] trait. The host hands
//! each worker its merged configuration and a shared logger handle at
//! initialization time; after that the orchestrator only ever calls
//! `start`/`stop` and observes explicit `Result` values.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::logger::Logger;
use crate::params::{Parameter, WorkerParameters};

// ─────────────────────────────────────────────────────────────────────────────
// Worker Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during a worker's lifecycle
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Worker start failed: {0}")]
    StartFailed(String),

    #[error("Worker stop failed: {0}")]
    StopFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for worker lifecycle operations
pub type WorkerResult<T> = Result<T, WorkerError>;

// ─────────────────────────────────────────────────────────────────────────────
// Status & State
// ─────────────────────────────────────────────────────────────────────────────

/// Desired runtime status declared for a worker in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Stopped,
    Started,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

/// Lifecycle states tracked by the manager for each discovered worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Discovered,
    Initialized,
    Started,
    Stopped,
    Failed,
}

// ─────────────────────────────────────────────────────────────────────────────
// Declaration & Config
// ─────────────────────────────────────────────────────────────────────────────

/// Configured intent for a worker, independent of whether it is discovered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerDeclaration {
    /// Worker name, matched case-sensitively against discovered instances
    pub name: String,

    /// Desired status after host startup
    #[serde(default)]
    pub status: WorkerStatus,

    /// Worker-specific parameters; these take precedence over global ones
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Effective configuration handed to a worker at initialization
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Declared worker name
    pub name: String,

    /// Declared status
    pub status: WorkerStatus,

    /// Merged parameter map (worker parameters win over globals)
    pub parameters: WorkerParameters,
}

impl WorkerConfig {
    /// Build the effective configuration for a declaration, merging the
    /// worker's own parameters with the global parameter set.
    pub fn for_declaration(declaration: &WorkerDeclaration, globals: &[Parameter]) -> Self {
        Self {
            name: declaration.name.clone(),
            status: declaration.status,
            parameters: WorkerParameters::merge(&declaration.parameters, globals),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The capability contract every discoverable worker must satisfy
///
/// Lifecycle calls are made sequentially, one worker at a time, on the
/// host task. Workers are free to spawn their own tasks internally; that
/// concurrency is opaque to the orchestrator.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Intrinsic worker name, used to match a declaration
    fn name(&self) -> &str;

    /// Declared status, available after a successful `initialize`
    fn status(&self) -> WorkerStatus;

    /// Called once during host startup with the merged configuration
    ///
    /// If this returns an error the worker is marked failed and excluded
    /// from all further lifecycle steps.
    async fn initialize(&mut self, config: WorkerConfig, log: Arc<dyn Logger>) -> WorkerResult<()>;

    /// Called for workers whose declared status is `Started`
    async fn start(&mut self) -> WorkerResult<()>;

    /// Called for every initialized worker during host shutdown
    ///
    /// Errors are logged and never block stopping the remaining workers.
    async fn stop(&mut self) -> WorkerResult<()>;
}
