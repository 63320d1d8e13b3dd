//! `svnpm run`: install every svn dependency of the host project.

use anyhow::{Context, Result};
use clap::Args;

use super::CliConfig;
use crate::cache::RevisionCache;
use crate::config::{EffectiveOptions, GlobalConfig};
use crate::core::SvnpmError;
use crate::descriptor::build_descriptors;
use crate::manifest::{HostManifest, find_manifest_with_optional};
use crate::npm::{Npm, PackageManager};
use crate::pipeline::{self, PipelineContext, PipelineSettings, RunReport};
use crate::svn::{SvnClient, VersionControl};
use crate::utils::ProgressBar;

/// Fetch, package and install all `svnDependencies`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunCommand {
    /// Reinstall every dependency, ignoring the revision cache
    #[arg(short, long)]
    pub force: bool,

    /// Maximum number of dependencies processed at once (default: 4)
    #[arg(long, value_name = "NUM")]
    pub max_parallel: Option<usize>,

    /// Run `npm install` once per dependency instead of once for all of them
    #[arg(long)]
    pub per_dependency: bool,

    /// Start from an empty cache when the cache file is corrupt
    #[arg(long)]
    pub repair_cache: bool,
}

impl RunCommand {
    /// Loads the manifest and global config, then runs with the real svn and npm.
    ///
    /// # Errors
    ///
    /// Fatal configuration or cache errors, and [`SvnpmError::DependenciesFailed`]
    /// when any dependency failed (the report was printed already).
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let manifest_path = find_manifest_with_optional(config.manifest_path.clone())?;
        let manifest = HostManifest::load(&manifest_path)?;
        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;

        let options = self.resolve_options(&global, &manifest);
        let svn = SvnClient::new(options.timeout);
        let npm = Npm::new(options.timeout);

        let report = self.run_pipeline(&manifest, &options, &svn, &npm, config).await?;
        let failures = report.failures().len();
        if failures > 0 {
            return Err(SvnpmError::DependenciesFailed {
                count: failures,
            }
            .into());
        }
        Ok(())
    }

    /// Global and project options, with this command's flags on top.
    pub fn resolve_options(&self, global: &GlobalConfig, manifest: &HostManifest) -> EffectiveOptions {
        let mut options = EffectiveOptions::resolve(&global.svn, manifest.svn_options());
        if let Some(max_parallel) = self.max_parallel {
            options.max_parallel = max_parallel.max(1);
        }
        if self.per_dependency {
            options.batch_install = false;
        }
        options
    }

    /// Runs the pipeline for `manifest` and prints the report.
    ///
    /// Dependency failures are in the returned report, not in the error.
    ///
    /// # Errors
    ///
    /// Cache load or flush failures, and [`SvnpmError::Interrupted`] on Ctrl-C.
    pub async fn run_pipeline(
        &self,
        manifest: &HostManifest,
        options: &EffectiveOptions,
        vcs: &dyn VersionControl,
        package_manager: &dyn PackageManager,
        config: &CliConfig,
    ) -> Result<RunReport> {
        let staging_root = manifest.staging_root();
        let mut descriptors = build_descriptors(
            manifest.svn_dependencies().iter().map(|(key, location)| (key, location)),
            &staging_root,
        );

        if descriptors.is_empty() {
            if !config.quiet {
                println!("No svnDependencies in {}", manifest.path().display());
            }
            return Ok(RunReport::default());
        }

        let cache_path = RevisionCache::path_in(&staging_root);
        let cache = if self.repair_cache {
            RevisionCache::load_or_recover(&cache_path)
        } else {
            RevisionCache::load(&cache_path)
        }
        .context("Failed to load revision cache")?;
        pipeline::mark_up_to_date(&mut descriptors, &cache, self.force);

        let settings = PipelineSettings::new(manifest.project_dir()).with_options(options);
        let progress = ProgressBar::new(descriptors.len() as u64, config.progress_disabled());
        let ctx = PipelineContext::new(settings, vcs, package_manager, &cache)
            .with_progress(progress.clone());

        let report = tokio::select! {
            result = pipeline::run(&ctx, descriptors) => result,
            Ok(()) = tokio::signal::ctrl_c() => {
                progress.finish_and_clear();
                return Err(SvnpmError::Interrupted.into());
            }
        };
        progress.finish_and_clear();
        let report = report?;

        if !config.quiet {
            println!("{}", report.render());
        } else if !report.is_success() {
            eprintln!("{}", report.render());
        }
        Ok(report)
    }
}
