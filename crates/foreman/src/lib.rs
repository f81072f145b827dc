//! Foreman Host
//!
//! Long-running host process that discovers worker components from candidate
//! directories, configures them from a layered parameter set, and supervises
//! their lifecycle until shutdown.

pub mod artifacts;
pub mod config;
pub mod discovery;
pub mod gateway;
pub mod host;
pub mod settings;
pub mod workers;

pub use config::{ConfigSource, Configuration, FileSource, LoadError, StaticSource};
pub use host::{Host, HostError, HostState};
pub use settings::HostSettings;
