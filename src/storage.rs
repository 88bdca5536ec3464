use crate::error::Result;
use crate::models::Snapshot;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Flat-file persistence of the last observed snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the snapshot file with `snapshot`.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }

    /// Reads the persisted snapshot. A missing or unreadable file yields an
    /// empty snapshot.
    pub async fn load(&self) -> Snapshot {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {}, starting empty", self.path.display());
                return Snapshot::new();
            }
            Err(e) => {
                warn!("Failed to read snapshot {}: {}", self.path.display(), e);
                return Snapshot::new();
            }
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                info!("Loaded snapshot from {} ({} assets)", self.path.display(), snapshot.len());
                snapshot
            }
            Err(e) => {
                warn!("Failed to parse snapshot {}: {}", self.path.display(), e);
                Snapshot::new()
            }
        }
    }
}
