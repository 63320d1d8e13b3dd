//! Staging directory lifecycle.
//!
//! A dependency is checked out into `node_modules/.<name>-package`. The
//! directory is recreated from scratch before every fetch and removed again
//! once the install finished, whatever its outcome.

use anyhow::Result;
use std::path::Path;

use crate::core::SvnpmError;
use crate::utils::fs::{ensure_dir_async, remove_dir_if_exists};

/// Creates the staging root if needed and clears `install_dir`.
///
/// # Errors
///
/// Returns an error if either directory operation fails.
pub async fn ensure_staging(staging_root: &Path, install_dir: &Path) -> Result<()> {
    ensure_dir_async(staging_root).await?;
    if remove_dir_if_exists(install_dir).await? {
        tracing::debug!(target: "pipeline", "Removed stale {}", install_dir.display());
    }
    Ok(())
}

/// Removes a staging (or batch) directory.
///
/// Failure is reported as a [`SvnpmError::CleanupWarning`] in the log and
/// otherwise ignored. Returns whether the directory is gone.
pub async fn remove_staging(dir: &Path) -> bool {
    match remove_dir_if_exists(dir).await {
        Ok(_) => true,
        Err(e) => {
            let warning = SvnpmError::CleanupWarning {
                path: dir.display().to_string(),
                reason: format!("{e:#}"),
            };
            tracing::warn!(target: "pipeline", "{warning}");
            false
        }
    }
}
