//! Reverse-proxy configuration file kept in sync with the control plane

use tokio::sync::Mutex;
use tracing::info;

use crate::errors::PlatformError;
use crate::filesys::file::File;
use crate::utils::sha256_hex;

/// Writes the proxy configuration only when its content changes.
///
/// The hash of the last written document is kept in memory; the first write
/// after start-up always happens.
pub struct ProxyConfigWriter {
    file: File,
    last_hash: Mutex<Option<String>>,
}

impl ProxyConfigWriter {
    pub fn new(file: File) -> Self {
        Self {
            file,
            last_hash: Mutex::new(None),
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Atomically replace the file with `contents` unless it is identical to
    /// the last write. Returns whether the file was written.
    pub async fn apply(&self, contents: &[u8]) -> Result<bool, PlatformError> {
        let hash = sha256_hex(contents);
        let mut last_hash = self.last_hash.lock().await;
        if last_hash.as_deref() == Some(hash.as_str()) {
            return Ok(false);
        }

        self.file.write_atomic(contents).await?;
        info!(
            "Proxy configuration updated at {} ({})",
            self.file.path().display(),
            &hash[..12]
        );
        *last_hash = Some(hash);
        Ok(true)
    }
}
