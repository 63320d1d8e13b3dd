//! Platform helpers for locating external tools.

use std::path::PathBuf;

/// Returns `true` when running on Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the platform-specific Subversion command name.
#[must_use]
pub const fn get_svn_command() -> &'static str {
    if is_windows() {
        "svn.exe"
    } else {
        "svn"
    }
}

/// Returns the platform-specific npm command name.
///
/// On Windows npm ships as a `.cmd` shim, which `CreateProcess` only finds by
/// its full name.
#[must_use]
pub const fn get_npm_command() -> &'static str {
    if is_windows() {
        "npm.cmd"
    } else {
        "npm"
    }
}

/// Resolves a command on `PATH`.
#[must_use]
pub fn find_command(cmd: &str) -> Option<PathBuf> {
    which::which(cmd).ok()
}
