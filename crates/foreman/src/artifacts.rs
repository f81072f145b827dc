//! Artifact Mirror
//!
//! Before discovery runs the host asks an [`ArtifactStore`] collaborator to
//! populate the download directory. The transfer protocol itself is out of
//! scope; [`DirMirror`] covers the local case by clearing the destination
//! and copying a staging tree into it. Sync failures are logged by the host
//! and never abort startup.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;

/// External collaborator that fills the download directory with worker
/// binaries and manifests
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn sync(&self, dest: &Path) -> anyhow::Result<()>;
}

/// Mirrors a local staging directory into the download directory
pub struct DirMirror {
    source: PathBuf,
}

impl DirMirror {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for DirMirror {
    async fn sync(&self, dest: &Path) -> anyhow::Result<()> {
        if !self.source.is_dir() {
            anyhow::bail!("artifact source '{}' does not exist", self.source.display());
        }

        // Stale artifacts from a previous run are removed first.
        if dest.exists() {
            fs::remove_dir_all(dest)
                .await
                .with_context(|| format!("clearing '{}'", dest.display()))?;
        }
        fs::create_dir_all(dest)
            .await
            .with_context(|| format!("creating '{}'", dest.display()))?;

        // Walk the staging tree without recursion.
        let mut pending = vec![(self.source.clone(), dest.to_path_buf())];
        while let Some((from, to)) = pending.pop() {
            let mut entries = fs::read_dir(&from)
                .await
                .with_context(|| format!("reading '{}'", from.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                let target = to.join(entry.file_name());

                if entry.file_type().await?.is_dir() {
                    fs::create_dir_all(&target).await?;
                    pending.push((entry_path, target));
                } else {
                    fs::copy(&entry_path, &target)
                        .await
                        .with_context(|| format!("copying '{}'", entry_path.display()))?;
                }
            }
        }

        Ok(())
    }
}
