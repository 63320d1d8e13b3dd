//! Process-level locking for the revision cache file.
//!
//! The lock lives next to the cache (`.svnpm-cache.json.lock`) and is held for
//! the whole read-merge-write of a flush, so two svnpm runs sharing a project
//! never drop each other's entries. The lock is released when the guard drops.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An exclusive lock on a cache file.
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Acquires the exclusive lock guarding `cache_path`.
    ///
    /// Blocks (on a blocking-pool thread) until any other holder releases it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be created or locked.
    pub async fn acquire(cache_path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(cache_path);
        if let Some(parent) = lock_path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create directory for cache lock: {}", parent.display())
            })?;
        }

        let path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

            FileExt::lock_exclusive(&file)
                .with_context(|| format!("Failed to lock {}", path.display()))?;

            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        tracing::debug!(target: "cache", "Acquired {}", lock_path.display());
        Ok(Self {
            file,
            path: lock_path,
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(target: "cache", "Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

fn lock_path_for(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    cache_path.with_file_name(name)
}
