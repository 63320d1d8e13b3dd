//! Global constants used throughout the svnpm codebase.
//!
//! File names, timeouts, retry parameters and parallelism defaults that are
//! shared across modules live here so they are easy to find.

use std::time::Duration;

/// Name of the host project manifest.
pub const HOST_MANIFEST: &str = "package.json";

/// Directory (relative to the host project root) that holds staging directories.
pub const STAGING_ROOT_DIR: &str = "node_modules";

/// Revision cache file name inside the staging root.
pub const CACHE_FILE: &str = ".svnpm-cache.json";

/// Shared directory for batched installs inside the staging root.
pub const BATCH_DIR: &str = ".svnpm-install";

/// Revision used when a dependency key carries no `|revision` suffix.
pub const HEAD_REVISION: &str = "HEAD";

/// Script registered in the host manifest by `svnpm integrate`.
pub const INTEGRATION_SCRIPT: &str = "svnpm run";

/// Marker used to recognise our own registration inside a script line.
pub const INTEGRATION_MARKER: &str = "svnpm";

/// Default `package.json` script that runs svnpm.
pub const DEFAULT_HOOK: &str = "install";

/// Environment variable prefix npm sets for nested lifecycle invocations.
///
/// Variables starting with it (any case) are removed before spawning npm.
pub const NPM_ENV_PREFIX: &str = "npm_";

/// Archive file suffixes accepted by the packaging stage.
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tgz", ".tar.gz"];

/// Default timeout for a single svn or npm invocation (5 minutes).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Default number of retries for svn checkout and update.
pub const DEFAULT_FETCH_RETRIES: usize = 2;

/// Backoff factor between fetch retries (ms). Delays run 500ms, 1s, 2s and so on.
pub const BACKOFF_FACTOR_MS: u64 = 250;

/// Maximum backoff delay between fetch retries (ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 8_000;

/// Environment variable that overrides the global config file location.
pub const CONFIG_ENV_VAR: &str = "SVNPM_CONFIG";

/// Default number of dependency pipelines run concurrently.
///
/// Kept small so a run does not flood the svn server.
pub const DEFAULT_MAX_PARALLEL: usize = 4;
