//! Worker Lifecycle Library
//!
//! This crate provides the core worker abstraction for Foreman. Workers are
//! independently deployable components hosted in-process and supervised by
//! the [`LifecycleManager`] for the life of the host.
//!
//! # Lifecycle
//!
//! Discovered workers move through the following states:
//! `Discovered → Initialized → Started → Stopped`, with a terminal `Failed`
//! state reachable from `Discovered` or `Initialized` on error. Every
//! lifecycle fault is isolated to the worker that raised it.

pub mod logger;
pub mod manager;
pub mod params;
pub mod registry;
pub mod worker;

pub use logger::{AggregateLogger, FileLogger, Logger, TraceLogger};
pub use manager::{LifecycleManager, WorkerSnapshot};
pub use params::{Parameter, WorkerParameters};
pub use registry::{CompositionContext, RegistryError, WorkerFactory, WorkerRegistry};
pub use worker::{
    Worker, WorkerConfig, WorkerDeclaration, WorkerError, WorkerResult, WorkerState, WorkerStatus,
};
