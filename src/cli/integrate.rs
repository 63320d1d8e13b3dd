//! `svnpm integrate` and `svnpm deintegrate`.
//!
//! Integration hooks svnpm into the host project's npm lifecycle, so a plain
//! `npm install` also installs the svn dependencies.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{CliConfig, RunCommand};
use crate::constants::{DEFAULT_HOOK, INTEGRATION_SCRIPT};
use crate::manifest::{HostManifest, find_manifest_with_optional};

/// Register `svnpm run` in a `package.json` script.
#[derive(Args, Debug, Clone)]
pub struct IntegrateCommand {
    /// Script to register in
    #[arg(long, value_name = "SCRIPT", default_value = DEFAULT_HOOK)]
    pub hook: String,

    /// Only edit package.json, do not install now
    #[arg(long)]
    pub no_run: bool,
}

impl IntegrateCommand {
    /// Edits the manifest, then runs the pipeline once unless `--no-run`.
    ///
    /// # Errors
    ///
    /// Manifest errors, and whatever [`RunCommand::execute`] returns.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let manifest_path = find_manifest_with_optional(config.manifest_path.clone())?;
        let mut manifest = HostManifest::load(&manifest_path)?;

        if manifest.integrate(&self.hook, INTEGRATION_SCRIPT)? {
            manifest.save()?;
            if !config.quiet {
                println!(
                    "{} `{INTEGRATION_SCRIPT}` in scripts.{}",
                    "Registered".green(),
                    self.hook
                );
            }
        } else {
            tracing::debug!("scripts.{} already runs svnpm", self.hook);
            if !config.quiet {
                println!("`{INTEGRATION_SCRIPT}` is already registered in scripts.{}", self.hook);
            }
        }

        if self.no_run {
            return Ok(());
        }

        let config = CliConfig {
            manifest_path: Some(manifest_path),
            ..config.clone()
        };
        RunCommand::default().execute(&config).await
    }
}

/// Remove `svnpm run` from a `package.json` script.
#[derive(Args, Debug, Clone)]
pub struct DeintegrateCommand {
    /// Script to remove the registration from
    #[arg(long, value_name = "SCRIPT", default_value = DEFAULT_HOOK)]
    pub hook: String,
}

impl DeintegrateCommand {
    /// Edits the manifest.
    ///
    /// # Errors
    ///
    /// Manifest load, parse or write errors.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let manifest_path = find_manifest_with_optional(config.manifest_path.clone())?;
        let mut manifest = HostManifest::load(&manifest_path)?;

        if manifest.deintegrate(&self.hook)? {
            manifest.save()?;
            if !config.quiet {
                println!("{} svnpm from scripts.{}", "Removed".green(), self.hook);
            }
        } else if !config.quiet {
            println!("scripts.{} does not run svnpm", self.hook);
        }
        Ok(())
    }
}
