//! npm access for the install stage.
//!
//! Archives are installed with
//!
//! ```text
//! npm install --no-save --no-package-lock --legacy-peer-deps <archive>...
//! ```
//!
//! from the host project root. svnpm usually runs inside an npm lifecycle
//! script, where npm exports dozens of `npm_*` variables describing the outer
//! invocation; a nested npm that inherits them installs into the wrong place.
//! Every spawn therefore gets the inherited environment minus those variables,
//! computed by the pure [`filter_env`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{DEFAULT_COMMAND_TIMEOUT, NPM_ENV_PREFIX};
use crate::core::SvnpmError;
use crate::utils::platform::{find_command, get_npm_command};

/// Flags passed to every `npm install`.
pub const INSTALL_FLAGS: &[&str] = &["--no-save", "--no-package-lock", "--legacy-peer-deps"];

/// Package-manager operations used by the install stage.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Installs `archives` into the project at `project_dir`.
    async fn install(&self, project_dir: &Path, archives: &[PathBuf]) -> Result<()>;
}

/// Drops every variable whose name starts with `npm_`, ignoring case.
///
/// Names that are not valid Unicode are compared lossily.
pub fn filter_env<I>(vars: I) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter(|(name, _)| {
            let name = name.to_string_lossy();
            !name
                .get(..NPM_ENV_PREFIX.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(NPM_ENV_PREFIX))
        })
        .collect()
}

/// Builder for one `npm install` process.
#[derive(Debug)]
pub struct NpmCommand {
    project_dir: PathBuf,
    archives: Vec<PathBuf>,
    timeout_duration: Option<Duration>,
    program: Option<PathBuf>,
}

impl NpmCommand {
    /// `npm install` of `archives` in `project_dir`.
    pub fn install(project_dir: &Path, archives: &[PathBuf]) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            archives: archives.to_vec(),
            timeout_duration: Some(DEFAULT_COMMAND_TIMEOUT),
            program: None,
        }
    }

    /// Overrides the default timeout; `None` waits forever.
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Full argument list after the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["install".into()];
        args.extend(INSTALL_FLAGS.iter().map(OsString::from));
        args.extend(self.archives.iter().map(|a| a.as_os_str().to_os_string()));
        args
    }

    fn targets(&self) -> String {
        self.archives
            .iter()
            .map(|a| a.file_name().unwrap_or(a.as_os_str()).to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Runs the install.
    ///
    /// # Errors
    ///
    /// - [`SvnpmError::NpmNotFound`] when no `npm` executable is on `PATH`
    /// - [`SvnpmError::InstallFailed`] for a non-zero exit or a timeout
    pub async fn execute(self) -> Result<()> {
        let program = match &self.program {
            Some(program) => program.clone(),
            None => find_command(get_npm_command()).ok_or(SvnpmError::NpmNotFound)?,
        };
        let args = self.args();
        let targets = self.targets();
        tracing::debug!(
            target: "npm",
            "Executing command: npm {} (in {})",
            args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" "),
            self.project_dir.display()
        );

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&self.project_dir)
            .env_clear()
            .envs(filter_env(std::env::vars_os()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result.context("Failed to execute npm install")?,
                Err(_) => {
                    tracing::warn!(
                        target: "npm",
                        "npm install of {targets} timed out after {} seconds",
                        duration.as_secs()
                    );
                    return Err(SvnpmError::InstallFailed {
                        targets,
                        code: "timeout".to_string(),
                        stderr: format!("timed out after {} seconds", duration.as_secs()),
                    }
                    .into());
                }
            },
            None => output_future.await.context("Failed to execute npm install")?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            tracing::debug!(target: "npm", "{}", stdout.trim());
        }

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |code| code.to_string());
            tracing::debug!(target: "npm", "npm install failed with exit code {code}");
            return Err(SvnpmError::InstallFailed {
                targets,
                code,
                stderr: last_error_lines(&stderr),
            }
            .into());
        }

        if !stderr.trim().is_empty() {
            tracing::debug!(target: "npm", "{}", stderr.trim());
        }
        Ok(())
    }
}

/// The tail of npm's error output; the full text is far too long for a report.
fn last_error_lines(stderr: &str) -> String {
    const MAX_LINES: usize = 5;
    let lines: Vec<&str> = stderr.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return "no output".to_string();
    }
    lines[lines.len().saturating_sub(MAX_LINES)..].join("\n")
}

/// [`PackageManager`] backed by the system `npm`.
#[derive(Debug, Clone)]
pub struct Npm {
    timeout: Option<Duration>,
}

impl Default for Npm {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

impl Npm {
    /// npm whose installs are killed after `timeout` (`None` disables it).
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
        }
    }
}

#[async_trait]
impl PackageManager for Npm {
    async fn install(&self, project_dir: &Path, archives: &[PathBuf]) -> Result<()> {
        NpmCommand::install(project_dir, archives).with_timeout(self.timeout).execute().await
    }
}
