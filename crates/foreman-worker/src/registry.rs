//! Composition Registry
//!
//! Worker implementations are compiled in and registered under a kind name;
//! discovery resolves manifest entries against this registry instead of
//! scanning binaries for types. The [`CompositionContext`] carries shared
//! collaborators (such as the interface-service state) so workers that need
//! them can be wired up at construction time.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::worker::Worker;

/// Errors raised while populating the registry
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Worker kind '{0}' is already registered")]
    DuplicateKind(String),
}

/// Factory producing a fresh worker instance for a registered kind
pub type WorkerFactory = Box<dyn Fn(&CompositionContext) -> Box<dyn Worker> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Composition Context
// ─────────────────────────────────────────────────────────────────────────────

/// Named bag of shared values available to worker factories
///
/// The host inserts collaborators here before discovery runs; factories pull
/// out what they need by name and concrete type.
#[derive(Default)]
pub struct CompositionContext {
    values: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl CompositionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a shared value under a name
    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: Arc<T>) {
        self.values.insert(name.into(), value);
    }

    /// Fetch a shared value by name, if present with the expected type
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.values
            .get(name)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Worker Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Registry mapping worker kinds to their factories
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = WorkerRegistry::new();
/// registry.register("echo", |_ctx| Box::new(EchoWorker::new()))?;
///
/// let ctx = CompositionContext::new();
/// let worker = registry.create("echo", &ctx).unwrap();
/// ```
#[derive(Default)]
pub struct WorkerRegistry {
    factories: HashMap<String, WorkerFactory>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a worker kind
    ///
    /// Duplicate kinds are rejected; there is exactly one factory per kind.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&CompositionContext) -> Box<dyn Worker> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            return Err(RegistryError::DuplicateKind(kind));
        }
        self.factories.insert(kind, Box::new(factory));
        Ok(())
    }

    /// Instantiate a worker of the given kind, if registered
    pub fn create(&self, kind: &str, ctx: &CompositionContext) -> Option<Box<dyn Worker>> {
        self.factories.get(kind).map(|factory| factory(ctx))
    }

    /// Whether a kind is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// All registered kinds, sorted for deterministic logging
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
