//! Dual-destination build logger: operator console and per-build log file.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::BuildError;

/// Appends each message as one line to a build log, mirroring it to the
/// console through `tracing`.
///
/// File write failures are reported on the console and otherwise ignored;
/// a build never fails because its log could not be appended to.
#[derive(Debug, Clone)]
pub struct BuildLogger {
    path: PathBuf,
}

impl BuildLogger {
    /// Attach to a log file without touching it. Lines are appended,
    /// creating the file on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Start a fresh log at `path`, truncating any log left by a previous build.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, BuildError> {
        let path = path.into();
        tokio::fs::File::create(&path)
            .await
            .map_err(|source| BuildError::LogOpen {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn log(&self, message: &str) {
        tracing::info!("{message}");
        self.append(message).await;
    }

    pub async fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.append(message).await;
    }

    async fn append(&self, message: &str) {
        if let Err(e) = self.try_append(message).await {
            tracing::error!(
                path = %self.path.display(),
                "Error: failed to append to log file {}: {e}",
                self.path.display()
            );
        }
    }

    async fn try_append(&self, message: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{message}\n").as_bytes()).await?;
        file.flush().await
    }
}
