//! Configuration Model
//!
//! Parses the configuration document supplied by an external source into the
//! global parameter list and the per-worker declarations. A missing or
//! unparseable document is non-fatal: the host logs it and proceeds with an
//! empty configuration.

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use foreman_worker::{Parameter, WorkerDeclaration};

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate worker name in configuration: '{0}'")]
    DuplicateWorker(String),
}

/// Global parameters plus the set of worker declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Global parameters, applied to every worker unless overridden
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Declared workers; order is preserved from the document
    #[serde(default)]
    pub workers: Vec<WorkerDeclaration>,
}

impl Configuration {
    /// Parse a JSON document and validate worker-name uniqueness
    pub fn from_json(document: &str) -> Result<Self, LoadError> {
        let configuration: Self = serde_json::from_str(document)?;
        configuration.validate()?;
        Ok(configuration)
    }

    fn validate(&self) -> Result<(), LoadError> {
        let mut seen = HashSet::new();
        for declaration in &self.workers {
            if !seen.insert(declaration.name.as_str()) {
                return Err(LoadError::DuplicateWorker(declaration.name.clone()));
            }
        }
        Ok(())
    }

    /// Look up a global parameter value by exact name; first match wins
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Find a worker declaration by exact name
    pub fn worker(&self, name: &str) -> Option<&WorkerDeclaration> {
        self.workers.iter().find(|w| w.name == name)
    }

    /// Names of all declared workers, in document order
    pub fn worker_names(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().map(|w| w.name.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Sources
// ─────────────────────────────────────────────────────────────────────────────

/// External collaborator supplying the serialized configuration document
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<String, LoadError>;
}

/// Reads the configuration document from a local file
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    async fn fetch(&self) -> Result<String, LoadError> {
        if !self.path.exists() {
            return Err(LoadError::NotFound(self.path.clone()));
        }
        Ok(fs::read_to_string(&self.path).await?)
    }
}

/// Serves a fixed document; used in tests and for env-provided configuration
pub struct StaticSource {
    document: String,
}

impl StaticSource {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn fetch(&self) -> Result<String, LoadError> {
        Ok(self.document.clone())
    }
}
