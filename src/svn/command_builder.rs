//! Type-safe builder for `svn` invocations.
//!
//! Every command runs with `--non-interactive`, a timeout, and `kill_on_drop`
//! so an interrupted run never leaves an svn process behind. Failures are
//! mapped to typed [`SvnpmError`] variants by operation rather than by parsing
//! the argument list. The password is appended at spawn time and never logged.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use super::SvnOptions;
use crate::constants::DEFAULT_COMMAND_TIMEOUT;
use crate::core::SvnpmError;
use crate::utils::platform::{find_command, get_svn_command};

/// What a command does, used to pick the error variant on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    Checkout {
        url: String,
    },
    Update {
        path: PathBuf,
        revision: String,
    },
    Other(String),
}

/// Builder for a single `svn` process.
///
/// ```rust,ignore
/// use svnpm_cli::svn::command_builder::SvnCommand;
///
/// SvnCommand::checkout("svn://host/libfoo/trunk", dest, "HEAD")
///     .options(&options)
///     .with_context("libfoo")
///     .execute_success()
///     .await?;
/// ```
#[derive(Debug)]
pub struct SvnCommand {
    operation: Operation,
    args: Vec<String>,
    password: Option<String>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
    program: Option<PathBuf>,
}

/// Captured output of a successful command.
#[derive(Debug, Clone)]
pub struct SvnCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl SvnCommand {
    fn new(operation: Operation, args: Vec<String>) -> Self {
        Self {
            operation,
            args,
            password: None,
            timeout_duration: Some(DEFAULT_COMMAND_TIMEOUT),
            context: None,
            program: None,
        }
    }

    /// `svn checkout <url> <dest> --revision <revision>`
    pub fn checkout(url: &str, dest: &Path, revision: &str) -> Self {
        Self::new(
            Operation::Checkout {
                url: url.to_string(),
            },
            vec![
                "checkout".to_string(),
                url.to_string(),
                dest.display().to_string(),
                "--revision".to_string(),
                revision.to_string(),
            ],
        )
    }

    /// `svn update <path> --revision <revision>`
    pub fn update(path: &Path, revision: &str) -> Self {
        Self::new(
            Operation::Update {
                path: path.to_path_buf(),
                revision: revision.to_string(),
            },
            vec![
                "update".to_string(),
                path.display().to_string(),
                "--revision".to_string(),
                revision.to_string(),
            ],
        )
    }

    /// `svn cleanup <path>`
    pub fn cleanup(path: &Path) -> Self {
        Self::new(
            Operation::Other("cleanup".to_string()),
            vec!["cleanup".to_string(), path.display().to_string()],
        )
    }

    /// Adds credentials and certificate trust from `options`.
    pub fn credentials(mut self, options: &SvnOptions) -> Self {
        if let Some(username) = &options.username {
            self.args.push("--username".to_string());
            self.args.push(username.clone());
        }
        self.password.clone_from(&options.password);
        if options.trust_server_cert {
            self.args.push("--trust-server-cert".to_string());
        }
        self
    }

    /// Adds credentials plus `--quiet` and `--force` from `options`.
    ///
    /// Only checkout and update accept `--force`.
    pub fn options(self, options: &SvnOptions) -> Self {
        let mut cmd = self.credentials(options);
        if options.quiet {
            cmd.args.push("--quiet".to_string());
        }
        if options.force {
            cmd.args.push("--force".to_string());
        }
        cmd
    }

    /// Overrides the default timeout; `None` waits forever.
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label shown in log lines, usually the dependency name.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    #[cfg(test)]
    pub(crate) fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Arguments as they will be logged, with the password masked.
    pub fn display_args(&self) -> String {
        let mut args = self.args.clone();
        args.push("--non-interactive".to_string());
        if self.password.is_some() {
            args.push("--password".to_string());
            args.push("********".to_string());
        }
        args.join(" ")
    }

    fn operation_name(&self) -> String {
        match &self.operation {
            Operation::Checkout { .. } => "checkout".to_string(),
            Operation::Update { .. } => "update".to_string(),
            Operation::Other(name) => name.clone(),
        }
    }

    /// Runs the command and captures its output.
    ///
    /// # Errors
    ///
    /// - [`SvnpmError::SvnNotFound`] when no `svn` executable is on `PATH`
    /// - [`SvnpmError::SvnCheckoutFailed`] / [`SvnpmError::SvnUpdateFailed`] /
    ///   [`SvnpmError::SvnCommandError`] for a non-zero exit or a timeout
    pub async fn execute(self) -> Result<SvnCommandOutput> {
        let start = std::time::Instant::now();
        let program = match &self.program {
            Some(program) => program.clone(),
            None => find_command(get_svn_command()).ok_or(SvnpmError::SvnNotFound)?,
        };
        let display_args = self.display_args();
        let label = self.context.as_deref().unwrap_or("svn");
        tracing::debug!(target: "svn", "({label}) Executing command: svn {display_args}");

        let mut cmd = Command::new(&program);
        cmd.args(&self.args).arg("--non-interactive");
        if let Some(password) = &self.password {
            cmd.arg("--password").arg(password);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result.with_context(|| format!("Failed to execute svn {display_args}"))?,
                Err(_) => {
                    tracing::warn!(
                        target: "svn",
                        "({label}) Command timed out after {} seconds: svn {display_args}",
                        duration.as_secs()
                    );
                    let reason = format!(
                        "timed out after {} seconds (network problem or a server waiting for input?)",
                        duration.as_secs()
                    );
                    return Err(self.failure(reason).into());
                }
            },
            None => output_future.await.with_context(|| format!("Failed to execute svn {display_args}"))?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "svn",
                "({label}) Command failed with exit code: {:?}",
                output.status.code()
            );
            let reason = if !stderr.trim().is_empty() {
                stderr.trim().to_string()
            } else if !stdout.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                format!("exit code {:?}", output.status.code())
            };
            return Err(self.failure(reason).into());
        }

        if !stdout.trim().is_empty() {
            tracing::debug!(target: "svn", "({label}) {}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(target: "svn", "({label}) {}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "svn::perf",
                "({label}) svn {} took {:.2}s",
                self.operation_name(),
                elapsed.as_secs_f64()
            );
        }

        Ok(SvnCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Runs the command, discarding its output.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    fn failure(&self, reason: String) -> SvnpmError {
        match &self.operation {
            Operation::Checkout {
                url,
            } => SvnpmError::SvnCheckoutFailed {
                url: url.clone(),
                reason,
            },
            Operation::Update {
                path,
                revision,
            } => SvnpmError::SvnUpdateFailed {
                path: path.display().to_string(),
                revision: revision.clone(),
                reason,
            },
            Operation::Other(operation) => SvnpmError::SvnCommandError {
                operation: operation.clone(),
                stderr: reason,
            },
        }
    }
}
