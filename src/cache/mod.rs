//! Persistent record of which dependency revisions are installed.
//!
//! The revision cache lets a run skip dependencies whose pinned revision is
//! already installed. It is a JSON object keyed by dependency name, stored at
//! `node_modules/.svnpm-cache.json`; wiping `node_modules` therefore also
//! resets the cache, so a skipped dependency is never missing from disk.
//!
//! ```json
//! {
//!   "libfoo": {
//!     "name": "libfoo",
//!     "revision": "42",
//!     "sourceLocation": "svn://host/libfoo/trunk",
//!     "installDirectory": "/project/node_modules/.libfoo-package",
//!     "installedAt": "2026-10-14T09:12:44Z"
//!   }
//! }
//! ```
//!
//! # Lifecycle
//!
//! 1. [`RevisionCache::load`] reads the file once at the start of a run
//! 2. Every dependency is checked with [`RevisionCache::is_up_to_date`]
//! 3. Successful installs are buffered with [`RevisionCache::record`]
//! 4. [`RevisionCache::flush`] persists the buffer once, after every pipeline settled
//!
//! Revisions compare as plain strings, so a cached `HEAD` satisfies a `HEAD`
//! dependency until `--force` is given. A flush takes the [`CacheLock`],
//! re-reads the file and merges the buffer into what is on disk, then replaces
//! the file atomically.

pub mod lock;

pub use lock::CacheLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::constants::CACHE_FILE;
use crate::core::SvnpmError;
use crate::descriptor::DependencyDescriptor;
use crate::utils::atomic_write;

/// One installed dependency as persisted in the cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Dependency name
    #[serde(default)]
    pub name: String,
    /// Installed revision (older cache files call this `rev`)
    #[serde(alias = "rev")]
    pub revision: String,
    /// Source URL the revision was fetched from
    #[serde(default, alias = "url")]
    pub source_location: String,
    /// Staging directory used for the install
    #[serde(default, alias = "installDir")]
    pub install_directory: PathBuf,
    /// When the install finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Entry for a dependency that was just installed.
    pub fn installed_now(descriptor: &DependencyDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            revision: descriptor.revision.clone(),
            source_location: descriptor.source_location.clone(),
            install_directory: descriptor.install_dir.clone(),
            installed_at: Some(Utc::now()),
        }
    }
}

/// The revision cache for one host project.
///
/// `record` takes `&self` so concurrently running dependency pipelines can
/// share one cache.
#[derive(Debug)]
pub struct RevisionCache {
    path: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    pending: Mutex<Vec<CacheEntry>>,
    flushed: AtomicBool,
    recover: bool,
}

impl RevisionCache {
    /// Default cache location inside a staging root.
    pub fn path_in(staging_root: &Path) -> PathBuf {
        staging_root.join(CACHE_FILE)
    }

    /// Loads the cache at `path`.
    ///
    /// A missing or empty file yields an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`SvnpmError::CacheCorrupt`] when the file is not a JSON object
    /// of cache entries, or an I/O error when it cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = read_entries(path)?;
        tracing::debug!(target: "cache", "Loaded {} entries from {}", entries.len(), path.display());
        Ok(Self::with_entries(path, entries, false))
    }

    /// Loads the cache at `path`, starting empty if the file is corrupt.
    ///
    /// The corrupt file is overwritten by the next flush.
    ///
    /// # Errors
    ///
    /// Returns an error only when the file exists but cannot be read.
    pub fn load_or_recover(path: &Path) -> Result<Self> {
        let entries = match read_entries(path) {
            Ok(entries) => entries,
            Err(e) if is_corrupt(&e) => {
                tracing::warn!(target: "cache", "{e}; starting from an empty revision cache");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::with_entries(path, entries, true))
    }

    fn with_entries(path: &Path, entries: BTreeMap<String, CacheEntry>, recover: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            entries,
            pending: Mutex::new(Vec::new()),
            flushed: AtomicBool::new(false),
            recover,
        }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries as loaded at the start of the run, keyed by name.
    pub fn entries(&self) -> &BTreeMap<String, CacheEntry> {
        &self.entries
    }

    /// Whether `descriptor` is already installed at its configured revision.
    pub fn is_up_to_date(&self, descriptor: &DependencyDescriptor) -> bool {
        self.entries
            .get(&descriptor.name)
            .is_some_and(|entry| entry.revision == descriptor.revision)
    }

    /// Buffers a successful install for the next flush.
    pub fn record(&self, descriptor: &DependencyDescriptor) {
        let entry = CacheEntry::installed_now(descriptor);
        match self.pending.lock() {
            Ok(mut pending) => pending.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    /// Number of buffered, not yet flushed entries.
    pub fn pending_len(&self) -> usize {
        match self.pending.lock() {
            Ok(pending) => pending.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Persists buffered entries. Callable once per run.
    ///
    /// With nothing buffered the file is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error on a second call, when the lock cannot be taken, when
    /// the file on disk became corrupt (outside recovery mode), or when the
    /// write fails.
    pub async fn flush(&self) -> Result<()> {
        if self.flushed.swap(true, Ordering::SeqCst) {
            return Err(SvnpmError::Other {
                message: "revision cache was already flushed for this run".to_string(),
            }
            .into());
        }

        let pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        if pending.is_empty() {
            tracing::debug!(target: "cache", "Nothing to flush");
            return Ok(());
        }

        let _lock = CacheLock::acquire(&self.path).await?;

        let mut on_disk = if self.recover {
            read_entries_async(&self.path).await.unwrap_or_default()
        } else {
            read_entries_async(&self.path).await?
        };
        let count = pending.len();
        for entry in pending {
            on_disk.insert(entry.name.clone(), entry);
        }

        let content =
            serde_json::to_string_pretty(&on_disk).context("Failed to serialize revision cache")?;
        atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write revision cache {}", self.path.display()))?;

        tracing::debug!(target: "cache", "Flushed {count} entries to {}", self.path.display());
        Ok(())
    }

    /// Deletes the cache file. Returns `false` when there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn clear(path: &Path) -> Result<bool> {
        let _lock = CacheLock::acquire(path).await?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, CacheEntry>> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_entries(path, &content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read revision cache {}", path.display())),
    }
}

async fn read_entries_async(path: &Path) -> Result<BTreeMap<String, CacheEntry>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => parse_entries(path, &content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read revision cache {}", path.display())),
    }
}

fn parse_entries(path: &Path, content: &str) -> Result<BTreeMap<String, CacheEntry>> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let mut entries: BTreeMap<String, CacheEntry> =
        serde_json::from_str(content).map_err(|e| SvnpmError::CacheCorrupt {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    // The key is authoritative
    for (name, entry) in &mut entries {
        if entry.name != *name {
            entry.name.clone_from(name);
        }
    }
    Ok(entries)
}

fn is_corrupt(error: &anyhow::Error) -> bool {
    matches!(error.downcast_ref::<SvnpmError>(), Some(SvnpmError::CacheCorrupt { .. }))
}
