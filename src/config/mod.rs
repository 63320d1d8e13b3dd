//! Option layering for svnpm runs.
//!
//! Options come from three places, most specific last:
//!
//! 1. Built-in defaults ([`crate::constants`])
//! 2. The user's global config, `~/.svnpm/config.toml` ([`GlobalConfig`])
//! 3. The host project's `svnOptions` block in `package.json`
//!
//! Both files deserialize into the same [`OptionsLayer`], where every field is
//! optional. [`EffectiveOptions::resolve`] merges the layers field by field; a
//! field set in the project wins over the same field in the global config.
//! CLI flags are applied on top by the `run` command.
//!
//! ```toml
//! # ~/.svnpm/config.toml
//! [svn]
//! username = "builder"
//! password = "s3cret"
//! trust_server_cert = true
//! max_parallel = 2
//! ```

mod global;

pub use global::GlobalConfig;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_FETCH_RETRIES, DEFAULT_MAX_PARALLEL};
use crate::svn::SvnOptions;

/// One layer of svn and pipeline options.
///
/// Field names are camelCase in `package.json` and snake_case in the TOML
/// config; both spellings are accepted in both places. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsLayer {
    /// svn username passed as `--username`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// svn password passed as `--password`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Accept unknown server certificates (`--trust-server-cert`)
    #[serde(default, alias = "trust_server_cert", skip_serializing_if = "Option::is_none")]
    pub trust_server_cert: Option<bool>,

    /// Pass `--quiet` to checkout and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,

    /// Pass `--force` to checkout and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,

    /// Retries for checkout and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<usize>,

    /// Timeout in seconds for a single svn or npm invocation
    #[serde(default, alias = "timeout_secs", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Number of dependency pipelines run concurrently
    #[serde(default, alias = "max_parallel", skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    /// Install all archives with a single npm call (default `true`)
    #[serde(default, alias = "batch_install", skip_serializing_if = "Option::is_none")]
    pub batch_install: Option<bool>,
}

impl OptionsLayer {
    /// Overlays `other` on `self`: fields set in `other` win.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            username: other.username.clone().or_else(|| self.username.clone()),
            password: other.password.clone().or_else(|| self.password.clone()),
            trust_server_cert: other.trust_server_cert.or(self.trust_server_cert),
            quiet: other.quiet.or(self.quiet),
            force: other.force.or(self.force),
            retries: other.retries.or(self.retries),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            max_parallel: other.max_parallel.or(self.max_parallel),
            batch_install: other.batch_install.or(self.batch_install),
        }
    }
}

/// Fully resolved options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveOptions {
    /// Options passed through to every svn call
    pub svn: SvnOptions,
    /// Retries for checkout and update
    pub retries: usize,
    /// Timeout for a single svn or npm invocation, `None` when disabled with 0
    pub timeout: Option<Duration>,
    /// Number of dependency pipelines run concurrently (at least 1)
    pub max_parallel: usize,
    /// Install all archives with a single npm call
    pub batch_install: bool,
}

impl EffectiveOptions {
    /// Merges the global and project layers over the built-in defaults.
    #[must_use]
    pub fn resolve(global: &OptionsLayer, project: &OptionsLayer) -> Self {
        let merged = global.overlay(project);
        let timeout = match merged.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_COMMAND_TIMEOUT),
        };

        Self {
            svn: SvnOptions {
                username: merged.username,
                password: merged.password,
                trust_server_cert: merged.trust_server_cert.unwrap_or(false),
                quiet: merged.quiet.unwrap_or(false),
                force: merged.force.unwrap_or(false),
            },
            retries: merged.retries.unwrap_or(DEFAULT_FETCH_RETRIES),
            timeout,
            max_parallel: merged.max_parallel.unwrap_or(DEFAULT_MAX_PARALLEL).max(1),
            batch_install: merged.batch_install.unwrap_or(true),
        }
    }
}

impl Default for EffectiveOptions {
    fn default() -> Self {
        Self::resolve(&OptionsLayer::default(), &OptionsLayer::default())
    }
}
