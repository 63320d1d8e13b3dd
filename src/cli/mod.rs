//! Command-line interface for svnpm.
//!
//! # Commands
//!
//! - `integrate` - register `svnpm run` in a `package.json` script and run it once
//! - `deintegrate` - remove that registration again
//! - `run` - fetch, package and install every svn dependency
//! - `cache` - inspect or clear the revision cache
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - debug logging (svn and npm command lines, state transitions)
//! - `--quiet` / `-q` - only errors
//! - `--config` / `-c` - global config file instead of `~/.svnpm/config.toml`
//! - `--manifest-path` - host `package.json` instead of searching from the current directory
//! - `--no-progress` - never draw the progress bar
//!
//! ```bash
//! # One-time setup in a project
//! svnpm integrate
//!
//! # What `npm install` then runs
//! svnpm run
//!
//! # Reinstall everything, one dependency at a time
//! svnpm run --force --max-parallel 1
//! ```

mod cache;
mod integrate;
mod run;

pub use cache::CacheCommand;
pub use integrate::{DeintegrateCommand, IntegrateCommand};
pub use run::RunCommand;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tracing targets used across the crate, besides the crate's module paths.
const LOG_TARGETS: &[&str] = &["svnpm_cli", "svn", "npm", "pipeline", "cache"];

/// Options every command sees.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// `--verbose`
    pub verbose: bool,
    /// `--quiet`
    pub quiet: bool,
    /// `--no-progress`
    pub no_progress: bool,
    /// `--config`
    pub config_path: Option<PathBuf>,
    /// `--manifest-path`
    pub manifest_path: Option<PathBuf>,
}

impl CliConfig {
    /// Whether the progress bar should stay hidden.
    pub const fn progress_disabled(&self) -> bool {
        self.no_progress || self.quiet
    }
}

/// Install Subversion-hosted packages into an npm project.
#[derive(Parser, Debug)]
#[command(
    name = "svnpm",
    about = "Install Subversion-hosted packages into an npm project",
    version,
    long_about = "svnpm checks out the svnDependencies of package.json from Subversion, \
                  locates the package archive in each checkout and installs it with npm."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the global config file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the host package.json
    #[arg(long, global = true, value_name = "FILE")]
    manifest_path: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register `svnpm run` in a package.json script and run it once
    Integrate(IntegrateCommand),
    /// Remove `svnpm run` from a package.json script
    Deintegrate(DeintegrateCommand),
    /// Install all svn dependencies
    Run(RunCommand),
    /// Inspect or clear the revision cache
    Cache(CacheCommand),
}

impl Cli {
    /// Runs the selected command.
    ///
    /// # Errors
    ///
    /// Returns the command's error; the caller renders it.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        match self.command {
            Commands::Integrate(cmd) => cmd.execute(&config).await,
            Commands::Deintegrate(cmd) => cmd.execute(&config).await,
            Commands::Run(cmd) => cmd.execute(&config).await,
            Commands::Cache(cmd) => cmd.execute(&config).await,
        }
    }

    /// Global options as a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        CliConfig {
            verbose: self.verbose,
            quiet: self.quiet,
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            manifest_path: self.manifest_path.clone(),
        }
    }

    /// Default `EnvFilter` directives for the chosen verbosity.
    #[must_use]
    pub fn log_filter(&self) -> String {
        log_filter(self.verbose, self.quiet)
    }
}

fn log_filter(verbose: bool, quiet: bool) -> String {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    LOG_TARGETS.iter().map(|target| format!("{target}={level}")).collect::<Vec<_>>().join(",")
}
