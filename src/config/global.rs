//! Global (user-level) configuration for svnpm.
//!
//! The global config holds defaults shared by every project on the machine,
//! typically svn credentials that should not be committed to `package.json`.
//!
//! # Location
//!
//! - **Unix/macOS**: `~/.svnpm/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\svnpm\config.toml`
//! - **Override**: the `SVNPM_CONFIG` environment variable, or the `--config` flag
//!
//! A missing file is not an error; it simply contributes no options.
//!
//! # Security
//!
//! The file may contain an svn password. On Unix, svnpm warns when it is
//! readable by group or others.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::OptionsLayer;
use crate::constants::CONFIG_ENV_VAR;
use crate::core::SvnpmError;

/// Contents of `~/.svnpm/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Defaults for `svnOptions`
    #[serde(default)]
    pub svn: OptionsLayer,
}

impl GlobalConfig {
    /// Loads the global config from the default location.
    ///
    /// Returns an empty config when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined, or if the
    /// file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Loads from `path` when given, otherwise from [`default_path`](Self::default_path).
    ///
    /// An explicitly given path must exist; the default location may be absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, and
    /// [`SvnpmError::ConfigError`] if it contains invalid TOML.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(&path).await,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path).await
                } else {
                    tracing::debug!("No global config at {}", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads the global config from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, and
    /// [`SvnpmError::ConfigError`] if it contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        warn_if_world_readable(path).await;

        toml::from_str(&content).map_err(|e| {
            SvnpmError::ConfigError {
                path: path.display().to_string(),
                reason: e.to_string().trim_end().to_string(),
            }
            .into()
        })
    }

    /// Location of the global config file.
    ///
    /// `SVNPM_CONFIG` wins over the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or, on Windows, local data) directory
    /// cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("svnpm")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".svnpm")
        };

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(unix)]
async fn warn_if_world_readable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::metadata(path).await else {
        return;
    };
    if metadata.permissions().mode() & 0o077 != 0 {
        tracing::warn!(
            "{} may contain svn credentials and is readable by other users; consider `chmod 600`",
            path.display()
        );
    }
}

#[cfg(not(unix))]
async fn warn_if_world_readable(_path: &Path) {}
