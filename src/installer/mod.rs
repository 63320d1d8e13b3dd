//! Packaging and install stage.
//!
//! - [`staging`] prepares and removes the per-dependency staging directories
//! - [`archive`] locates the package archive inside a checkout
//! - [`BatchDir`] collects archives for a single batched `npm install`
//!
//! Two install modes exist. [`InstallMode::Batched`] is the default: every
//! `npm install --no-save` reifies the whole tree and may prune archives an
//! earlier call of the same run installed.
//!
//! In [`InstallMode::PerDependency`] each pipeline
//! installs its own archive as soon as it is packaged; the installs are
//! serialized by an [`InstallLock`] because concurrent npm processes against
//! one `node_modules` corrupt each other. In [`InstallMode::Batched`] every
//! pipeline stops after copying its archive into the batch directory and the
//! orchestrator runs one install for all of them.

pub mod archive;
pub mod staging;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::constants::BATCH_DIR;
use crate::descriptor::encode_name;
use crate::npm::PackageManager;
use crate::utils::fs::ensure_dir_async;

pub use archive::find_archive;
pub use staging::{ensure_staging, remove_staging};

/// How packaged archives reach npm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallMode {
    /// One `npm install` per dependency, serialized
    PerDependency,
    /// One `npm install` for every packaged dependency, after all fetches
    #[default]
    Batched,
}

/// Run-scoped lock serializing `npm install` calls against one project.
#[derive(Debug, Default)]
pub struct InstallLock(Mutex<()>);

impl InstallLock {
    /// Creates an unlocked lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `archives` while holding the lock.
    ///
    /// # Errors
    ///
    /// Propagates the package manager's error.
    pub async fn install(
        &self,
        package_manager: &dyn PackageManager,
        project_dir: &Path,
        archives: &[PathBuf],
    ) -> Result<()> {
        let _guard = self.0.lock().await;
        package_manager.install(project_dir, archives).await
    }
}

/// Shared directory collecting archives for a batched install.
///
/// Layout: `<staging-root>/.svnpm-install/<name>/<archive>`.
#[derive(Debug, Clone)]
pub struct BatchDir {
    path: PathBuf,
}

impl BatchDir {
    /// Batch directory inside `staging_root`.
    pub fn new(staging_root: &Path) -> Self {
        Self {
            path: staging_root.join(BATCH_DIR),
        }
    }

    /// Path of the batch directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes leftovers from an earlier interrupted run.
    ///
    /// # Errors
    ///
    /// Returns an error if the stale directory cannot be removed.
    pub async fn prepare(&self) -> Result<()> {
        crate::utils::remove_dir_if_exists(&self.path).await?;
        Ok(())
    }

    /// Copies `archive` of dependency `name` into the batch directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the copy fails.
    pub async fn add(&self, name: &str, archive: &Path) -> Result<PathBuf> {
        let dir = self.path.join(encode_name(name));
        ensure_dir_async(&dir).await?;

        let file_name = archive
            .file_name()
            .with_context(|| format!("Archive path has no file name: {}", archive.display()))?;
        let dest = dir.join(file_name);
        tokio::fs::copy(archive, &dest).await.with_context(|| {
            format!("Failed to copy {} to {}", archive.display(), dest.display())
        })?;
        Ok(dest)
    }

    /// Removes the batch directory; failure is only logged.
    pub async fn remove(&self) -> bool {
        remove_staging(&self.path).await
    }
}
