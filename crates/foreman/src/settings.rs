//! Host Settings
//!
//! The host's own knobs (as opposed to the worker configuration document):
//! bind address, paths, run-loop poll interval, stop timeout. Loaded as
//! defaults ← TOML file ← `FOREMAN_` environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Interface service bind host
    pub host: String,

    /// Interface service port (0 picks an ephemeral port)
    pub port: u16,

    /// Path to the worker configuration document
    pub config_path: PathBuf,

    /// Shared download directory scanned during discovery
    pub download_dir: PathBuf,

    /// Optional local staging directory mirrored into the download
    /// directory before discovery
    pub artifact_source: Option<PathBuf>,

    /// Run-loop cancellation poll interval
    pub poll_interval_ms: u64,

    /// Bound on each worker's stop call during shutdown
    pub stop_timeout_secs: u64,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9700,
            config_path: PathBuf::from("foreman.json"),
            download_dir: PathBuf::from("workers"),
            artifact_source: None,
            poll_interval_ms: 1000,
            stop_timeout_secs: 30,
        }
    }
}

impl HostSettings {
    /// Load settings: defaults, then the TOML file (if present), then
    /// `FOREMAN_`-prefixed environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FOREMAN_"))
            .extract()
    }

    /// Socket address for the interface service
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}
