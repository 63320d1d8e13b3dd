//! `svnpm cache`: inspect or clear the revision cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use crate::cache::RevisionCache;
use crate::manifest::{HostManifest, find_manifest_with_optional};

/// Revision cache maintenance.
#[derive(Args, Debug, Clone)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
enum CacheSubcommand {
    /// List installed dependency revisions
    List,
    /// Forget every installed revision; the next run reinstalls everything
    Clear,
}

impl CacheCommand {
    /// Runs the subcommand against the host project's cache.
    ///
    /// # Errors
    ///
    /// Manifest errors, a corrupt cache (for `list`), or I/O errors.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let manifest_path = find_manifest_with_optional(config.manifest_path.clone())?;
        let manifest = HostManifest::load(&manifest_path)?;
        let cache_path = RevisionCache::path_in(&manifest.staging_root());

        match self.command {
            CacheSubcommand::List => {
                let cache = RevisionCache::load(&cache_path)?;
                if cache.entries().is_empty() {
                    println!("No svn dependencies installed yet");
                    return Ok(());
                }
                for entry in cache.entries().values() {
                    let installed_at = entry
                        .installed_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    println!(
                        "{}|{}  {}  {}",
                        entry.name.bold(),
                        entry.revision,
                        entry.source_location.dimmed(),
                        installed_at
                    );
                }
            }
            CacheSubcommand::Clear => {
                let removed = RevisionCache::clear(&cache_path).await?;
                if !config.quiet {
                    if removed {
                        println!("{} {}", "Cleared".green(), cache_path.display());
                    } else {
                        println!("No revision cache at {}", cache_path.display());
                    }
                }
            }
        }
        Ok(())
    }
}
