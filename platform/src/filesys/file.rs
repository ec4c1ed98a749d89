//! File operations

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::PlatformError;

const DEFAULT_MODE: u32 = 0o644;
const PRIVATE_MODE: u32 = 0o600;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, PlatformError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file contents as bytes
    pub async fn read_bytes(&self) -> Result<Vec<u8>, PlatformError> {
        Ok(fs::read(&self.path).await?)
    }

    /// Delete the file if it exists
    pub async fn delete(&self) -> Result<(), PlatformError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write JSON to file atomically, readable by the owner only
    pub async fn write_json_private<T: Serialize>(&self, value: &T) -> Result<(), PlatformError> {
        let contents = serde_json::to_vec_pretty(value)?;
        self.write_atomic_with_mode(&contents, PRIVATE_MODE).await
    }

    /// Atomic write using a temporary file in the same directory.
    ///
    /// The temporary file is fsynced before it is renamed over the target, so
    /// readers observe either the previous contents or the new contents, never
    /// a truncated file.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), PlatformError> {
        self.write_atomic_with_mode(contents, DEFAULT_MODE).await
    }

    /// [`File::write_atomic`] with explicit unix permission bits
    pub async fn write_atomic_with_mode(&self, contents: &[u8], mode: u32) -> Result<(), PlatformError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).await?;

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            drop(file);
            set_mode(&temp_path, mode).await?;
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        sync_dir(&parent).await;
        Ok(())
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

// Errors are ignored, the rename already happened.
#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir).await {
        let _ = handle.sync_all().await;
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}
