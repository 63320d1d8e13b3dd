//! Editing of `package.json` script lines.
//!
//! npm scripts are shell lines; svnpm registers itself as one `&&`-separated
//! part of a hook such as `install`:
//!
//! ```text
//! "install": "node setup.js && svnpm run"
//! ```
//!
//! A part belongs to svnpm when its program (first word, ignoring any
//! directory prefix) is `svnpm`. Registering leaves a line that already has
//! such a part untouched, flags and position included, which makes it
//! idempotent.

use crate::constants::INTEGRATION_MARKER;

const SEPARATOR: &str = "&&";

/// Splits a script line into its trimmed, non-empty parts.
pub fn split_parts(line: &str) -> Vec<String> {
    line.split(SEPARATOR)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Whether a script part invokes svnpm.
pub fn is_svnpm_part(part: &str) -> bool {
    let Some(program) = part.split_whitespace().next() else {
        return false;
    };
    let name = program.rsplit(['/', '\\']).next().unwrap_or(program);
    name == INTEGRATION_MARKER || name == format!("{INTEGRATION_MARKER}.exe")
}

/// Returns `line` with every svnpm part removed, or `None` if nothing remains.
pub fn without_svnpm(line: &str) -> Option<String> {
    let parts: Vec<String> = split_parts(line).into_iter().filter(|p| !is_svnpm_part(p)).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&format!(" {SEPARATOR} ")))
    }
}

/// Returns `line` with `command` appended as its last part.
///
/// A line that already runs svnpm is returned as is.
pub fn with_svnpm(line: Option<&str>, command: &str) -> String {
    let mut parts = line.map(split_parts).unwrap_or_default();
    if parts.iter().any(|p| is_svnpm_part(p)) {
        return line.unwrap_or_default().to_string();
    }
    parts.push(command.to_string());
    parts.join(&format!(" {SEPARATOR} "))
}
