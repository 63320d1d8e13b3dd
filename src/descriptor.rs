//! Dependency descriptors built from the host manifest.
//!
//! The `svnDependencies` block of `package.json` maps *keys* to source
//! locations. A key is either a bare dependency name or `name|revision`:
//!
//! ```json
//! {
//!   "svnDependencies": {
//!     "libfoo": "svn://host/libfoo/trunk",
//!     "libbar|1432": "https://svn.example.com/repos/libbar/tags/2.1"
//!   }
//! }
//! ```
//!
//! Each entry becomes one [`DependencyDescriptor`] whose staging directory is a
//! pure function of its name.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::HEAD_REVISION;

/// Normalized record of one svn dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// Dependency name, unique among the configured dependencies
    pub name: String,
    /// URL of the version-controlled resource
    pub source_location: String,
    /// Target revision, `HEAD` when the key carries none
    pub revision: String,
    /// Staging directory the source is checked out into
    pub install_dir: PathBuf,
    skip: bool,
}

impl DependencyDescriptor {
    /// Builds a descriptor from a manifest key and its source location.
    ///
    /// The key is split on its last `|`. Keys that would produce an empty name or
    /// an empty revision are not rejected; they fall back to `name` = whole key
    /// and revision `HEAD`.
    pub fn from_key(key: &str, source_location: &str, staging_root: &Path) -> Self {
        let (name, revision) = parse_key(key);
        Self {
            install_dir: install_dir_for(staging_root, &name),
            name,
            source_location: source_location.to_string(),
            revision,
            skip: false,
        }
    }

    /// Whether the revision cache already covers this dependency.
    pub const fn skip(&self) -> bool {
        self.skip
    }

    /// Marks the descriptor as up to date. Called once, before fetching.
    pub(crate) fn mark_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    /// Whether the target revision is the moving `HEAD` sentinel.
    pub fn is_head(&self) -> bool {
        self.revision == HEAD_REVISION
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.revision)
    }
}

fn parse_key(key: &str) -> (String, String) {
    match key.rsplit_once('|') {
        Some((name, revision)) if !name.is_empty() && !revision.is_empty() => {
            (name.to_string(), revision.to_string())
        }
        _ => (key.to_string(), HEAD_REVISION.to_string()),
    }
}

/// Staging directory for a dependency: `<staging-root>/.<name>-package`.
pub fn install_dir_for(staging_root: &Path, name: &str) -> PathBuf {
    staging_root.join(format!(".{}-package", encode_name(name)))
}

/// Encodes a dependency name as a single path component.
///
/// Path separators are percent-encoded (and `%` itself with them), so every
/// encoded name stays a direct child of its parent directory and two distinct
/// names never encode to the same component.
pub fn encode_name(name: &str) -> String {
    let mut safe = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => safe.push_str("%25"),
            '/' => safe.push_str("%2F"),
            '\\' => safe.push_str("%5C"),
            c => safe.push(c),
        }
    }
    safe
}

/// Builds descriptors for every manifest entry, preserving manifest order.
pub fn build_descriptors<'a, I>(entries: I, staging_root: &Path) -> Vec<DependencyDescriptor>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    entries
        .into_iter()
        .map(|(key, location)| DependencyDescriptor::from_key(key, location, staging_root))
        .collect()
}
