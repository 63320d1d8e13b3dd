//! Error handling for svnpm
//!
//! This module provides the error type shared by every svnpm component and the
//! user-facing error reporting used by the CLI. The error system follows two rules:
//! 1. **Strongly-typed errors** so the pipeline can classify what went wrong
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`SvnpmError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Configuration**: [`SvnpmError::ConfigMissing`], [`SvnpmError::ManifestParseError`],
//!   [`SvnpmError::ConfigError`]
//! - **Revision cache**: [`SvnpmError::CacheCorrupt`]
//! - **Fetch**: [`SvnpmError::SvnNotFound`], [`SvnpmError::SvnCheckoutFailed`], etc.
//! - **Packaging**: [`SvnpmError::NoArchiveFound`], [`SvnpmError::AmbiguousArchive`]
//! - **Install**: [`SvnpmError::NpmNotFound`], [`SvnpmError::InstallFailed`]
//! - **Run outcome**: [`SvnpmError::DependenciesFailed`], [`SvnpmError::Interrupted`]
//!
//! Only configuration and cache errors abort a run. Fetch, packaging and install
//! errors are caught by the pipeline and recorded against the failing dependency.
//!
//! # Examples
//!
//! ```rust,no_run
//! use svnpm_cli::core::{SvnpmError, ErrorContext};
//!
//! let context = ErrorContext::new(SvnpmError::SvnNotFound)
//!     .with_suggestion("Install Subversion and make sure `svn` is on your PATH");
//!
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for svnpm operations.
///
/// Variants carry owned strings rather than borrowed data so that errors can be
/// moved freely between pipeline tasks and stored in the run report.
#[derive(Error, Debug, Clone)]
pub enum SvnpmError {
    /// The host project's `package.json` could not be found.
    ///
    /// Fatal: raised before any dependency pipeline starts.
    #[error("Host manifest not found: {path}")]
    ConfigMissing {
        /// Path where `package.json` was expected
        path: String,
    },

    /// The host manifest exists but is not valid JSON or has the wrong shape.
    #[error("Invalid host manifest {file}: {reason}")]
    ManifestParseError {
        /// Path to the manifest that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// The global config file exists but is not valid TOML of the expected shape.
    #[error("Failed to parse global config from {path}: {reason}")]
    ConfigError {
        /// Path to the global config file
        path: String,
        /// Parser diagnostic
        reason: String,
    },

    /// The persisted revision cache exists but cannot be trusted.
    ///
    /// A corrupt cache cannot decide skips, so the run stops unless the user asked
    /// for recovery with `--repair-cache`.
    #[error("Revision cache {path} is corrupt: {reason}")]
    CacheCorrupt {
        /// Path to the cache file
        path: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Subversion client not found in PATH
    #[error("Subversion is not installed or `svn` was not found in PATH")]
    SvnNotFound,

    /// An svn command exited with a non-zero status
    #[error("svn {operation} failed: {stderr}")]
    SvnCommandError {
        /// The svn subcommand that failed (e.g., "cleanup")
        operation: String,
        /// The diagnostic output from svn
        stderr: String,
    },

    /// svn checkout failed
    #[error("Failed to check out {url}: {reason}")]
    SvnCheckoutFailed {
        /// The repository URL that failed to check out
        url: String,
        /// The diagnostic output from svn
        reason: String,
    },

    /// svn update failed
    #[error("Failed to update {path} to revision {revision}: {reason}")]
    SvnUpdateFailed {
        /// The working copy path
        path: String,
        /// The requested revision
        revision: String,
        /// The diagnostic output from svn
        reason: String,
    },

    /// npm not found in PATH
    #[error("npm is not installed or was not found in PATH")]
    NpmNotFound,

    /// `npm install` exited with a non-zero status
    #[error("npm install failed for {targets} (exit code {code}): {stderr}")]
    InstallFailed {
        /// Names of the dependencies covered by the failing install call
        targets: String,
        /// Exit code, or "signal" when the process was killed
        code: String,
        /// The diagnostic output from npm
        stderr: String,
    },

    /// The staging directory contains no archive to install
    #[error("No package archive (*.tgz, *.tar.gz) found for '{name}' in {path}")]
    NoArchiveFound {
        /// Dependency name
        name: String,
        /// Staging directory that was scanned
        path: String,
    },

    /// The staging directory contains more than one archive
    #[error("Ambiguous package archives for '{name}': {candidates}")]
    AmbiguousArchive {
        /// Dependency name
        name: String,
        /// Comma separated list of the candidate file names
        candidates: String,
    },

    /// File system error
    #[error("File system error: {operation} ({path})")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation} ({path})")]
    PermissionDenied {
        /// The operation that was denied due to insufficient permissions
        operation: String,
        /// Path where permission was denied
        path: String,
    },

    /// Staging removal failed. Only ever logged.
    #[error("Could not remove {path}: {reason}")]
    CleanupWarning {
        /// Directory that could not be removed
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// One or more dependencies failed; the summary was already printed.
    #[error("Failed to install {count} svn dependencies")]
    DependenciesFailed {
        /// Number of failed dependencies
        count: usize,
    },

    /// The run was interrupted before the cache was flushed
    #[error("Interrupted; the revision cache was left unchanged")]
    Interrupted,

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// Pairs an [`SvnpmError`] with an optional suggestion (printed in green) and
/// optional details (printed in yellow).
///
/// # Examples
///
/// ```rust,no_run
/// use svnpm_cli::core::{SvnpmError, ErrorContext};
///
/// let context = ErrorContext::new(SvnpmError::NpmNotFound)
///     .with_suggestion("Install Node.js from https://nodejs.org/")
///     .with_details("svnpm installs the fetched archives with `npm install`");
///
/// println!("{}", context);
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying svnpm error
    pub error: SvnpmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`SvnpmError`]
    #[must_use]
    pub const fn new(error: SvnpmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`SvnpmError`] anywhere in the context chain and I/O errors by kind.
/// Everything else is shown with its full `Caused by:` chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(svnpm_error) = error.downcast_ref::<SvnpmError>() {
        return create_error_context(svnpm_error);
    }

    // Bare I/O errors only; a context message already names the file
    let bare_io = error.chain().count() == 1;
    if let Some(io_error) = error.downcast_ref::<std::io::Error>().filter(|_| bare_io) {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(SvnpmError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check the ownership of node_modules and the project directory")
                .with_details("svnpm needs to create and remove staging directories inside node_modules");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(SvnpmError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(SvnpmError::Other {
        message,
    })
}

fn create_error_context(error: &SvnpmError) -> ErrorContext {
    let context = ErrorContext::new(error.clone());
    match error {
        SvnpmError::ConfigMissing { .. } => context
            .with_suggestion("Run svnpm from your project directory or pass --manifest-path <path/to/package.json>")
            .with_details("svnpm reads `svnDependencies` and `svnOptions` from the host project's package.json"),

        SvnpmError::ManifestParseError { file, .. } => context
            .with_suggestion(format!("Check the JSON syntax in {file}"))
            .with_details("`svnDependencies` must be an object of strings and `svnOptions` an object"),

        SvnpmError::ConfigError { path, .. } => context
            .with_suggestion(format!(
                "Fix the TOML in {path}, or pass --config (or set SVNPM_CONFIG) to use another file"
            ))
            .with_details("Options belong under an [svn] table, e.g. `[svn]` then `username = \"builder\"`"),

        SvnpmError::CacheCorrupt { path, .. } => context
            .with_suggestion(format!(
                "Re-run with --repair-cache to start from an empty cache, or delete {path}"
            ))
            .with_details("A corrupt cache cannot decide which dependencies are already up to date"),

        SvnpmError::SvnNotFound => context
            .with_suggestion("Install Subversion (e.g., 'brew install subversion', 'apt install subversion')")
            .with_details("svnpm shells out to the `svn` command line client"),

        SvnpmError::NpmNotFound => context
            .with_suggestion("Install Node.js and npm from https://nodejs.org/")
            .with_details("svnpm installs fetched archives with `npm install`"),

        SvnpmError::DependenciesFailed { .. } => context
            .with_suggestion("Re-run with --verbose to see the svn and npm output for each dependency"),

        SvnpmError::SvnCheckoutFailed { url, .. } => context
            .with_suggestion(format!(
                "Verify the repository URL {url} and the credentials in svnOptions"
            )),

        _ => context,
    }
}
