//! Archive discovery inside a checked-out staging directory.
//!
//! The svn source of a dependency is expected to carry exactly one prebuilt
//! npm package archive at its top level. Only direct children are scanned and
//! candidates are ordered by file name, so discovery is deterministic.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::constants::ARCHIVE_SUFFIXES;
use crate::core::SvnpmError;

/// Whether `file_name` looks like an npm package archive.
pub fn is_archive(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    ARCHIVE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix) && lower.len() > suffix.len())
}

/// All archive candidates directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns an error if `dir` cannot be read.
pub fn archive_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("Failed to scan staging directory {}", dir.display()))?;
        if entry.file_type().is_file() && is_archive(&entry.file_name().to_string_lossy()) {
            candidates.push(entry.into_path());
        }
    }
    Ok(candidates)
}

/// The single archive of dependency `name` inside `dir`.
///
/// # Errors
///
/// - [`SvnpmError::NoArchiveFound`] when there is none
/// - [`SvnpmError::AmbiguousArchive`] when there are several
pub fn find_archive(name: &str, dir: &Path) -> Result<PathBuf> {
    let mut candidates = archive_candidates(dir)?;
    match candidates.len() {
        0 => Err(SvnpmError::NoArchiveFound {
            name: name.to_string(),
            path: dir.display().to_string(),
        }
        .into()),
        1 => Ok(candidates.remove(0)),
        _ => Err(SvnpmError::AmbiguousArchive {
            name: name.to_string(),
            candidates: candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", "),
        }
        .into()),
    }
}
