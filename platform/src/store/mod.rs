//! Durable desired-state store.
//!
//! All entities live in one in-memory [`Snapshot`] guarded by a single
//! reader/writer lock. Readers run concurrently; a writer excludes everyone
//! else for the whole operation, including the snapshot write, which makes
//! each operation atomic and linearizable.
//!
//! Mutations are applied to a copy of the snapshot. The copy is written to
//! disk (temp file, fsync, rename) and only swapped in once the write
//! succeeded, so a failed write leaves both views untouched and surfaces
//! [`PlatformError::PersistenceFailure`].

mod build_jobs;
mod projects;
mod repositories;
pub mod snapshot;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::PlatformError;
use crate::filesys::file::File;

pub use snapshot::Snapshot;

/// Single source of truth for projects, services, repositories,
/// installations and build jobs
pub struct StateStore {
    file: File,
    state: RwLock<Snapshot>,
}

impl StateStore {
    /// Open the store backed by the JSON snapshot at `path`.
    ///
    /// A missing file is created with an empty snapshot; an empty file is
    /// treated as an empty snapshot.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PlatformError> {
        let file = File::new(path.into());

        let snapshot = if file.exists().await {
            let bytes = file.read_bytes().await?;
            if bytes.iter().all(|b| b.is_ascii_whitespace()) {
                Snapshot::default()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            let snapshot = Snapshot::default();
            file.write_json_private(&snapshot)
                .await
                .map_err(|e| PlatformError::PersistenceFailure(e.to_string()))?;
            snapshot
        };

        info!(
            "Opened state store at {} ({} projects, {} services, {} build jobs)",
            file.path().display(),
            snapshot.projects.len(),
            snapshot.services.len(),
            snapshot.build_jobs.len()
        );

        Ok(Self {
            file,
            state: RwLock::new(snapshot),
        })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Copy of the whole snapshot
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.clone()
    }

    async fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// Run `f` against a candidate copy of the snapshot under the write lock,
    /// persist the candidate and publish it. Nothing is published when `f` or
    /// the write fails.
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Snapshot, DateTime<Utc>) -> Result<R, PlatformError>,
    ) -> Result<R, PlatformError> {
        let mut guard = self.state.write().await;
        let mut candidate = guard.clone();
        let result = f(&mut candidate, Utc::now())?;

        self.file
            .write_json_private(&candidate)
            .await
            .map_err(|e| PlatformError::PersistenceFailure(e.to_string()))?;
        debug!("Persisted snapshot to {}", self.file.path().display());

        *guard = candidate;
        Ok(result)
    }
}
