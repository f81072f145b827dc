//! Foreman Host
//!
//! Plugin orchestrator: discovers workers, supervises their lifecycle,
//! and serves the interface API until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use foreman_worker::WorkerRegistry;

use foreman::artifacts::{ArtifactStore, DirMirror};
use foreman::config::FileSource;
use foreman::host::Host;
use foreman::settings::HostSettings;
use foreman::workers::register_builtins;

/// Foreman Plugin Orchestrator
#[derive(Parser, Debug)]
#[command(name = "foreman")]
#[command(about = "Foreman Plugin Orchestrator", long_about = None)]
struct Args {
    /// Path to the host settings file
    #[arg(short, long, default_value = "foreman.toml")]
    settings: PathBuf,

    /// Override the worker configuration document path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the interface service port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("foreman=info,foreman_worker=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Foreman v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = HostSettings::load(&args.settings)?;
    if let Some(config) = args.config {
        settings.config_path = config;
    }
    if let Some(port) = args.port {
        settings.port = port;
    }

    let mut registry = WorkerRegistry::new();
    register_builtins(&mut registry)?;

    let config_source = Box::new(FileSource::new(&settings.config_path));
    let artifacts: Option<Arc<dyn ArtifactStore>> = settings
        .artifact_source
        .as_ref()
        .map(|source| Arc::new(DirMirror::new(source)) as Arc<dyn ArtifactStore>);

    let host = Host::new(settings, registry, config_source, artifacts);

    if let Err(e) = host.on_start().await {
        tracing::error!("Foreman failed to start: {}", e);
        std::process::exit(1);
    }

    if let Some(addr) = host.gateway_addr().await {
        info!("Interface service listening on http://{}", addr);
    }

    // Translate process signals into the stop sequence.
    let stopper = host.clone();
    let stop_task = tokio::spawn(async move {
        shutdown_signal().await;
        stopper.on_stop().await;
    });

    host.run().await;
    if let Err(e) = stop_task.await {
        warn!("Stop task did not complete cleanly: {}", e);
    }

    info!("Foreman shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
