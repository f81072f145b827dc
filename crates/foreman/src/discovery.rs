//! Worker Discovery
//!
//! Scans a prioritized list of candidate locations for worker manifests and
//! instantiates each discovered kind exactly once through the composition
//! registry. Locations that do not exist are skipped; a fault in one
//! location never prevents the remaining locations from being scanned.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio::fs;
use tracing::debug;

use foreman_worker::{CompositionContext, Logger, Worker, WorkerRegistry};

/// File suffix that marks a worker manifest
pub const MANIFEST_SUFFIX: &str = ".worker.toml";

/// Parsed worker manifest
#[derive(Debug, Deserialize)]
struct WorkerManifest {
    worker: ManifestEntry,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    /// Registered kind to instantiate
    kind: String,
}

/// Build the ordered candidate-location list: the host directory, the shared
/// download directory, and one subdirectory per declared worker name.
pub fn candidate_locations<'a>(
    host_dir: &Path,
    download_dir: &Path,
    declared_names: impl Iterator<Item = &'a str>,
) -> Vec<PathBuf> {
    let mut locations = vec![host_dir.to_path_buf(), download_dir.to_path_buf()];
    for name in declared_names {
        locations.push(download_dir.join(name));
    }
    locations
}

/// Scan the candidate locations and instantiate every discovered kind once
///
/// Returns the discovered workers in location order (manifests within a
/// location are processed in filename order for determinism). On total
/// failure the result is simply empty; per-location faults are logged and
/// scanning continues.
pub async fn discover(
    locations: &[PathBuf],
    registry: &WorkerRegistry,
    ctx: &CompositionContext,
    log: &Arc<dyn Logger>,
) -> Vec<Box<dyn Worker>> {
    let mut workers: Vec<Box<dyn Worker>> = Vec::new();
    let mut seen_kinds: HashSet<String> = HashSet::new();

    for location in locations {
        if !location.is_dir() {
            debug!("Skipping missing candidate location: {}", location.display());
            continue;
        }

        let manifests = match manifest_paths(location).await {
            Ok(paths) => paths,
            Err(e) => {
                log.error(
                    &format!("Could not scan candidate location '{}'", location.display()),
                    Some(&e),
                );
                continue;
            }
        };

        for path in manifests {
            let kind = match read_manifest(&path).await {
                Ok(manifest) => manifest.worker.kind,
                Err(e) => {
                    log.warning(&format!(
                        "Skipping malformed worker manifest '{}': {e}",
                        path.display()
                    ));
                    continue;
                }
            };

            if !seen_kinds.insert(kind.clone()) {
                debug!("Worker kind '{}' already discovered, skipping {}", kind, path.display());
                continue;
            }

            match registry.create(&kind, ctx) {
                Some(worker) => {
                    log.info(&format!(
                        "Discovered worker '{}' (kind '{kind}') from {}",
                        worker.name(),
                        path.display()
                    ));
                    workers.push(worker);
                }
                None => {
                    log.error(
                        &format!(
                            "No registered factory for worker kind '{kind}' ({})",
                            path.display()
                        ),
                        None,
                    );
                }
            }
        }
    }

    workers
}

/// Manifest files in a location, sorted by filename
async fn manifest_paths(location: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = fs::read_dir(location).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(MANIFEST_SUFFIX) {
                paths.push(path);
            }
        }
    }

    paths.sort();
    Ok(paths)
}

async fn read_manifest(path: &Path) -> anyhow::Result<WorkerManifest> {
    let content = fs::read_to_string(path).await?;
    Ok(toml::from_str(&content)?)
}
