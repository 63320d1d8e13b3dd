//! Shared helpers for the integration tests.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use svnpm_cli::cache::RevisionCache;
use svnpm_cli::cli::{CliConfig, RunCommand};
use svnpm_cli::config::GlobalConfig;
use svnpm_cli::manifest::HostManifest;
use svnpm_cli::npm::PackageManager;
use svnpm_cli::pipeline::RunReport;
use svnpm_cli::svn::VersionControl;
use svnpm_cli::test_utils::{init_test_logging, manifest_with_dependencies, write_manifest};
use tempfile::TempDir;

/// A temporary host project.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    /// Project whose `package.json` has the given `svnDependencies`.
    pub fn with_dependencies(dependencies: &[(&str, &str)]) -> Self {
        Self::with_manifest(&manifest_with_dependencies(dependencies))
    }

    /// Project with `json` as its `package.json`.
    pub fn with_manifest(json: &str) -> Self {
        init_test_logging(None);
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), json);
        Self {
            dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.path().join("package.json")
    }

    pub fn node_modules(&self) -> PathBuf {
        self.path().join("node_modules")
    }

    pub fn cache_path(&self) -> PathBuf {
        RevisionCache::path_in(&self.node_modules())
    }

    /// Parsed `package.json`.
    pub fn manifest_json(&self) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(self.manifest_path()).unwrap()).unwrap()
    }

    /// Cache entries currently on disk.
    pub fn cached(&self) -> RevisionCache {
        RevisionCache::load(&self.cache_path()).unwrap()
    }

    /// Writes a cache file with `(name, revision)` entries.
    pub fn seed_cache(&self, entries: &[(&str, &str)]) {
        let map: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(name, revision)| {
                (
                    (*name).to_string(),
                    serde_json::json!({
                        "name": name,
                        "revision": revision,
                        "sourceLocation": format!("svn://svn.example.com/{name}/trunk"),
                        "installDirectory": self.node_modules().join(format!(".{name}-package")),
                    }),
                )
            })
            .collect();
        std::fs::create_dir_all(self.node_modules()).unwrap();
        std::fs::write(self.cache_path(), serde_json::Value::Object(map).to_string()).unwrap();
    }

    /// Runs the pipeline with `cmd` against the given tools, without retries.
    pub async fn run(
        &self,
        cmd: RunCommand,
        vcs: &dyn VersionControl,
        package_manager: &dyn PackageManager,
    ) -> Result<RunReport> {
        self.run_with_retries(cmd, vcs, package_manager, 0).await
    }

    /// Like [`run`](Self::run), retrying failed checkouts and updates `retries` times.
    pub async fn run_with_retries(
        &self,
        cmd: RunCommand,
        vcs: &dyn VersionControl,
        package_manager: &dyn PackageManager,
        retries: usize,
    ) -> Result<RunReport> {
        let manifest = HostManifest::load(&self.manifest_path())?;
        let mut options = cmd.resolve_options(&GlobalConfig::default(), &manifest);
        options.retries = retries;
        let config = CliConfig {
            quiet: true,
            no_progress: true,
            manifest_path: Some(self.manifest_path()),
            ..Default::default()
        };
        cmd.run_pipeline(&manifest, &options, vcs, package_manager, &config).await
    }

    /// The `svnpm` binary, isolated from the user's global config.
    pub fn svnpm(&self) -> Command {
        let mut cmd = Command::cargo_bin("svnpm").unwrap();
        cmd.current_dir(self.path())
            .env("SVNPM_CONFIG", self.path().join("no-global-config.toml"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// `svnpm` outside any project.
pub fn svnpm_in(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("svnpm").unwrap();
    cmd.current_dir(dir)
        .env("SVNPM_CONFIG", dir.join("no-global-config.toml"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}
