//! Append-only command journal.
//!
//! Every write is best-effort: a failure is reported through `tracing` and
//! never interrupts command execution.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Handle to the optional plain-text log file.
///
/// Cheap to clone; each clone appends to the same file.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    path: Option<Arc<PathBuf>>,
}

impl Journal {
    /// Journal writing to `path`, or a no-op journal for `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path: path.map(Arc::new),
        }
    }

    /// Path of the log file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Whether a log file is configured.
    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Truncate the log file, creating it if absent.
    pub fn clear(&self) -> std::io::Result<()> {
        if let Some(path) = self.path() {
            std::fs::File::create(path)?;
        }
        Ok(())
    }

    /// Append one line of text.
    pub async fn line(&self, text: &str) {
        let mut entry = String::with_capacity(text.len() + 1);
        entry.push_str(text);
        entry.push('\n');
        self.append(entry.as_bytes()).await;
    }

    /// Append raw bytes.
    pub async fn append(&self, bytes: &[u8]) {
        let Some(path) = self.path() else {
            return;
        };

        if let Err(e) = write_all(path, bytes).await {
            warn!(path = %path.display(), error = %e, "failed to write command log");
        }
    }
}

async fn write_all(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
