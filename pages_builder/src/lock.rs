//! Per-site update lock.
//!
//! A site is locked through an OS file lock on `<dir>/.update-lock-<site>`,
//! so separate server processes never build the same site at once. Within
//! one process, waiters first queue first-come-first-served on a mutex keyed
//! by the lock path, then take the file lock.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::BuildError;

pub const LOCK_FILE_PREFIX: &str = ".update-lock-";

static LOCAL_QUEUES: LazyLock<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Holder details written into the lock file while it is held.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
    pub pid: u32,
    pub repo: String,
    pub acquired_at: String,
}

/// Named mutual exclusion for one site.
#[derive(Debug, Clone)]
pub struct UpdateLock {
    site: String,
    path: PathBuf,
}

impl UpdateLock {
    pub fn new(lock_dir: impl AsRef<Path>, site: &str) -> Self {
        Self {
            site: site.to_string(),
            path: lock_dir
                .as_ref()
                .join(format!("{LOCK_FILE_PREFIX}{site}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until this site's lock is free and take it.
    pub async fn acquire(&self) -> Result<UpdateLockGuard, BuildError> {
        let queue = local_queue(&self.path);
        let local = queue.lock_owned().await;

        let path = self.path.clone();
        let site = self.site.clone();
        let file = tokio::task::spawn_blocking(move || lock_file(&path, &site))
            .await
            .map_err(|e| BuildError::LockAcquisition {
                path: self.path.clone(),
                source: io::Error::other(e),
            })?
            .map_err(|source| BuildError::LockAcquisition {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(site = %self.site, lock = %self.path.display(), "Update lock acquired");

        Ok(UpdateLockGuard {
            file,
            path: self.path.clone(),
            _local: local,
        })
    }

    /// Run `critical_section` while holding the lock.
    ///
    /// The lock is released before this returns, whether the section
    /// succeeded or failed. If the lock cannot be acquired the section is
    /// never run and the acquisition error is returned.
    pub async fn run_exclusive<F, Fut, T>(&self, critical_section: F) -> Result<T, BuildError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BuildError>>,
    {
        let guard = self.acquire().await?;
        let result = critical_section().await;
        guard.release();
        result
    }
}

/// Exclusive ownership of a site's update lock; released on drop.
#[derive(Debug)]
pub struct UpdateLockGuard {
    file: File,
    path: PathBuf,
    _local: OwnedMutexGuard<()>,
}

impl UpdateLockGuard {
    pub fn release(self) {}
}

impl Drop for UpdateLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), "Failed to unlock update lock: {e}");
        }
    }
}

fn local_queue(path: &Path) -> Arc<AsyncMutex<()>> {
    let mut queues = LOCAL_QUEUES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    queues
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
}

/// Open (creating if needed) and exclusively lock the file, blocking until
/// any other holder lets go.
fn lock_file(path: &Path, site: &str) -> io::Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    file.lock_exclusive()?;

    if let Err(e) = write_metadata(&file, site) {
        tracing::warn!(lock = %path.display(), "Failed to write lock metadata: {e}");
    }

    Ok(file)
}

fn write_metadata(file: &File, site: &str) -> io::Result<()> {
    let metadata = LockMetadata {
        pid: std::process::id(),
        repo: site.to_string(),
        acquired_at: chrono::Utc::now().to_rfc3339(),
    };

    file.set_len(0)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer(&mut writer, &metadata).map_err(io::Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
