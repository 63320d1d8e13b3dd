//! Test utilities for svnpm
//!
//! In-memory stand-ins for svn and npm, plus small helpers for host project
//! fixtures. The mocks record every call so tests can assert on exactly what
//! the pipeline asked the tools to do.
//!
//! # Example
//!
//! ```rust,no_run
//! use svnpm_cli::test_utils::{MockPackageManager, MockVcs};
//!
//! let vcs = MockVcs::new().failing("libbar");
//! let npm = MockPackageManager::new();
//! // ... run the pipeline against &vcs and &npm ...
//! assert_eq!(vcs.checkouts().len(), 2);
//! assert_eq!(npm.installs().len(), 1);
//! ```

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::npm::PackageManager;
use crate::svn::{SvnOptions, VersionControl};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, else `RUST_LOG`; with neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=pipeline=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// One call seen by [`MockVcs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsCall {
    Checkout {
        url: String,
        dest: PathBuf,
        revision: String,
    },
    Update {
        dest: PathBuf,
        revision: String,
    },
    Cleanup {
        dest: PathBuf,
    },
}

/// [`VersionControl`] that writes package archives instead of talking to svn.
///
/// A checkout creates `dest` and writes the archives configured for the URL,
/// by default a single `package-1.0.0.tgz`. URLs containing a substring passed
/// to [`failing`](Self::failing) fail their checkout. Update and cleanup only
/// see the working copy, so [`failing_update`](Self::failing_update) and
/// [`failing_cleanup`](Self::failing_cleanup) match against its path.
#[derive(Debug, Default)]
pub struct MockVcs {
    calls: Mutex<Vec<VcsCall>>,
    failing: Vec<String>,
    failing_update: Vec<String>,
    failing_cleanup: Vec<String>,
    archives: HashMap<String, Vec<String>>,
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every checkout whose URL contains `pattern`.
    #[must_use]
    pub fn failing(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    /// Fails every update of a working copy whose path contains `pattern`.
    #[must_use]
    pub fn failing_update(mut self, pattern: &str) -> Self {
        self.failing_update.push(pattern.to_string());
        self
    }

    /// Fails every cleanup of a working copy whose path contains `pattern`.
    #[must_use]
    pub fn failing_cleanup(mut self, pattern: &str) -> Self {
        self.failing_cleanup.push(pattern.to_string());
        self
    }

    /// Files a checkout of `url` produces. An empty list leaves the checkout
    /// without any archive.
    #[must_use]
    pub fn with_files(mut self, url: &str, files: &[&str]) -> Self {
        self.archives.insert(url.to_string(), files.iter().map(|f| (*f).to_string()).collect());
        self
    }

    /// Every call, in order.
    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Working copies updated, in call order. Retried updates appear once per attempt.
    pub fn updates(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                VcsCall::Update {
                    dest,
                    ..
                } => Some(dest),
                _ => None,
            })
            .collect()
    }

    /// URLs checked out, in call order.
    pub fn checkouts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                VcsCall::Checkout {
                    url,
                    ..
                } => Some(url),
                _ => None,
            })
            .collect()
    }

    fn matches(patterns: &[String], dest: &Path) -> bool {
        let dest = dest.to_string_lossy();
        patterns.iter().any(|p| dest.contains(p.as_str()))
    }

    fn push(&self, call: VcsCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl VersionControl for MockVcs {
    async fn checkout(
        &self,
        url: &str,
        dest: &Path,
        revision: &str,
        _options: &SvnOptions,
    ) -> Result<()> {
        self.push(VcsCall::Checkout {
            url: url.to_string(),
            dest: dest.to_path_buf(),
            revision: revision.to_string(),
        });
        if self.failing.iter().any(|p| url.contains(p.as_str())) {
            bail!("svn: E170013: Unable to connect to a repository at URL '{url}'");
        }

        tokio::fs::create_dir_all(dest).await?;
        let default = vec!["package-1.0.0.tgz".to_string()];
        for file in self.archives.get(url).unwrap_or(&default) {
            tokio::fs::write(dest.join(file), b"fake archive").await?;
        }
        Ok(())
    }

    async fn update(&self, dest: &Path, revision: &str, _options: &SvnOptions) -> Result<()> {
        self.push(VcsCall::Update {
            dest: dest.to_path_buf(),
            revision: revision.to_string(),
        });
        if Self::matches(&self.failing_update, dest) {
            bail!("svn: E155004: Run 'svn cleanup' to remove locks in '{}'", dest.display());
        }
        Ok(())
    }

    async fn cleanup(&self, dest: &Path, _options: &SvnOptions) -> Result<()> {
        self.push(VcsCall::Cleanup {
            dest: dest.to_path_buf(),
        });
        if Self::matches(&self.failing_cleanup, dest) {
            bail!("svn: E155007: '{}' is not a working copy", dest.display());
        }
        Ok(())
    }
}

/// [`PackageManager`] that records installs.
///
/// Each install records the archive file names it was given, after checking
/// that the archives exist. With [`failing`](Self::failing) every install fails.
#[derive(Debug, Default)]
pub struct MockPackageManager {
    installs: Mutex<Vec<Vec<String>>>,
    fail: bool,
}

impl MockPackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every install like a broken registry would.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Archive file names of every install call, in order.
    pub fn installs(&self) -> Vec<Vec<String>> {
        self.installs.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PackageManager for MockPackageManager {
    async fn install(&self, _project_dir: &Path, archives: &[PathBuf]) -> Result<()> {
        let mut names = Vec::with_capacity(archives.len());
        for archive in archives {
            if !archive.is_file() {
                bail!("archive {} does not exist", archive.display());
            }
            names.push(
                archive.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            );
        }
        if let Ok(mut installs) = self.installs.lock() {
            installs.push(names);
        }
        if self.fail {
            bail!("npm ERR! code E404");
        }
        Ok(())
    }
}

/// Writes `json` as `package.json` into `dir` and returns its path.
pub fn write_manifest(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("package.json");
    std::fs::write(&path, json).unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
    path
}

/// `package.json` with the given `svnDependencies` entries.
pub fn manifest_with_dependencies(dependencies: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = dependencies
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::String((*v).to_string())))
        .collect();
    serde_json::json!({
        "name": "host-app",
        "version": "1.0.0",
        "svnDependencies": map
    })
    .to_string()
}
