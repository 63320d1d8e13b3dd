//! Subversion access for the fetch stage.
//!
//! The pipeline talks to Subversion through the [`VersionControl`] trait so it
//! can be driven by a scripted double in tests. [`SvnClient`] is the real
//! implementation and shells out to the system `svn` client via
//! [`SvnCommand`](command_builder::SvnCommand).
//!
//! A fetch is always `checkout`, `cleanup`, `update`, `cleanup` against the
//! dependency's staging directory. Checking out into an existing working copy
//! of the same URL is a cheap no-op in svn, and the explicit update pins the
//! working copy to the requested revision even when it already existed.

pub mod command_builder;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::constants::DEFAULT_COMMAND_TIMEOUT;
use command_builder::SvnCommand;

/// Options passed through to every svn invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvnOptions {
    /// `--username`
    pub username: Option<String>,
    /// `--password`
    pub password: Option<String>,
    /// `--trust-server-cert`
    pub trust_server_cert: bool,
    /// `--quiet` on checkout and update
    pub quiet: bool,
    /// `--force` on checkout and update
    pub force: bool,
}

/// Version-control operations used by the fetch stage.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Checks out `url` at `revision` into `dest`.
    async fn checkout(
        &self,
        url: &str,
        dest: &Path,
        revision: &str,
        options: &SvnOptions,
    ) -> Result<()>;

    /// Brings the working copy at `dest` to `revision`.
    async fn update(&self, dest: &Path, revision: &str, options: &SvnOptions) -> Result<()>;

    /// Releases stale working-copy locks at `dest`. A no-op on a clean copy.
    async fn cleanup(&self, dest: &Path, options: &SvnOptions) -> Result<()>;
}

/// [`VersionControl`] backed by the `svn` command line client.
#[derive(Debug, Clone)]
pub struct SvnClient {
    timeout: Option<Duration>,
}

impl Default for SvnClient {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

impl SvnClient {
    /// Client whose commands are killed after `timeout` (`None` disables it).
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
        }
    }
}

fn label_for(dest: &Path) -> String {
    dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "svn".to_string())
}

#[async_trait]
impl VersionControl for SvnClient {
    async fn checkout(
        &self,
        url: &str,
        dest: &Path,
        revision: &str,
        options: &SvnOptions,
    ) -> Result<()> {
        SvnCommand::checkout(url, dest, revision)
            .options(options)
            .with_timeout(self.timeout)
            .with_context(label_for(dest))
            .execute_success()
            .await
    }

    async fn update(&self, dest: &Path, revision: &str, options: &SvnOptions) -> Result<()> {
        SvnCommand::update(dest, revision)
            .options(options)
            .with_timeout(self.timeout)
            .with_context(label_for(dest))
            .execute_success()
            .await
    }

    async fn cleanup(&self, dest: &Path, options: &SvnOptions) -> Result<()> {
        SvnCommand::cleanup(dest)
            .credentials(options)
            .with_timeout(self.timeout)
            .with_context(label_for(dest))
            .execute_success()
            .await
    }
}
