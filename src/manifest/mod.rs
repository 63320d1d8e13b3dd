//! The host project's `package.json`.
//!
//! svnpm reads two blocks from the host manifest and edits a third:
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "scripts": {
//!     "install": "svnpm run"
//!   },
//!   "svnDependencies": {
//!     "libfoo": "svn://host/libfoo/trunk",
//!     "libbar|1432": "https://svn.example.com/repos/libbar/tags/2.1"
//!   },
//!   "svnOptions": {
//!     "username": "builder",
//!     "trustServerCert": true
//!   }
//! }
//! ```
//!
//! - `svnDependencies`: keys are `name` or `name|revision`, values are svn URLs.
//!   Absent means no dependencies.
//! - `svnOptions`: see [`OptionsLayer`]. Absent means no project options.
//! - `scripts`: edited by `svnpm integrate` / `svnpm deintegrate`.
//!
//! The document is kept as an order-preserving JSON map, so rewriting the
//! manifest keeps every other key where the user put it. The original
//! indentation is detected and reused (a tab when it cannot be detected).

pub mod scripts;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::config::OptionsLayer;
use crate::constants::{HOST_MANIFEST, STAGING_ROOT_DIR};
use crate::core::SvnpmError;
use crate::utils::atomic_write;

const DEPENDENCIES_KEY: &str = "svnDependencies";
const OPTIONS_KEY: &str = "svnOptions";
const SCRIPTS_KEY: &str = "scripts";

/// A loaded host manifest.
#[derive(Debug, Clone)]
pub struct HostManifest {
    path: PathBuf,
    document: Map<String, Value>,
    dependencies: Vec<(String, String)>,
    options: OptionsLayer,
    indent: String,
    trailing_newline: bool,
}

impl HostManifest {
    /// Loads and validates the manifest at `path`.
    ///
    /// # Errors
    ///
    /// - [`SvnpmError::ConfigMissing`] when the file does not exist
    /// - [`SvnpmError::ManifestParseError`] when it is not a JSON object, or
    ///   `svnDependencies`/`svnOptions` have the wrong shape
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SvnpmError::ConfigMissing {
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read host manifest {}", path.display()));
            }
        };
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let parse_error = |reason: String| SvnpmError::ManifestParseError {
            file: path.display().to_string(),
            reason,
        };

        let document: Map<String, Value> =
            serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?;

        let dependencies = match document.get(DEPENDENCIES_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(key, location)| match location {
                    Value::String(location) => Ok((key.clone(), location.clone())),
                    other => Err(parse_error(format!(
                        "{DEPENDENCIES_KEY}.{key} must be a string URL, found {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(parse_error(format!("{DEPENDENCIES_KEY} must be an object")).into()),
        };

        let options = match document.get(OPTIONS_KEY) {
            None | Some(Value::Null) => OptionsLayer::default(),
            Some(value @ Value::Object(_)) => OptionsLayer::deserialize(value)
                .map_err(|e| parse_error(format!("{OPTIONS_KEY}: {e}")))?,
            Some(_) => return Err(parse_error(format!("{OPTIONS_KEY} must be an object")).into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
            dependencies,
            options,
            indent: detect_indent(content),
            trailing_newline: content.ends_with('\n'),
        })
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest, i.e. the host project root.
    pub fn project_dir(&self) -> &Path {
        self.path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."))
    }

    /// Directory that holds staging directories and the revision cache.
    pub fn staging_root(&self) -> PathBuf {
        self.project_dir().join(STAGING_ROOT_DIR)
    }

    /// `svnDependencies` entries in manifest order.
    pub fn svn_dependencies(&self) -> &[(String, String)] {
        &self.dependencies
    }

    /// The project's `svnOptions` layer.
    pub fn svn_options(&self) -> &OptionsLayer {
        &self.options
    }

    /// Current line of script `hook`, if any.
    pub fn script(&self, hook: &str) -> Option<&str> {
        self.document.get(SCRIPTS_KEY)?.get(hook)?.as_str()
    }

    /// Registers `command` in script `hook`. Returns whether the manifest changed.
    ///
    /// # Errors
    ///
    /// Returns [`SvnpmError::ManifestParseError`] if `scripts` is not an object
    /// or the hook is not a string.
    pub fn integrate(&mut self, hook: &str, command: &str) -> Result<bool> {
        let current = self.script_line(hook)?;
        let updated = scripts::with_svnpm(current.as_deref(), command);
        if current.as_deref() == Some(updated.as_str()) {
            return Ok(false);
        }

        let scripts = self.document.entry(SCRIPTS_KEY).or_insert(Value::Null);
        if !scripts.is_object() {
            *scripts = Value::Object(Map::new());
        }
        if let Value::Object(scripts) = scripts {
            scripts.insert(hook.to_string(), Value::String(updated));
        }
        Ok(true)
    }

    /// Removes svnpm from script `hook`, dropping the hook if nothing remains.
    /// Returns whether the manifest changed.
    ///
    /// # Errors
    ///
    /// Returns [`SvnpmError::ManifestParseError`] if `scripts` is not an object
    /// or the hook is not a string.
    pub fn deintegrate(&mut self, hook: &str) -> Result<bool> {
        let Some(current) = self.script_line(hook)? else {
            return Ok(false);
        };
        if !scripts::split_parts(&current).iter().any(|part| scripts::is_svnpm_part(part)) {
            return Ok(false);
        }
        let updated = scripts::without_svnpm(&current);

        if let Some(Value::Object(scripts)) = self.document.get_mut(SCRIPTS_KEY) {
            match updated {
                Some(line) => {
                    scripts.insert(hook.to_string(), Value::String(line));
                }
                None => {
                    scripts.shift_remove(hook);
                }
            }
        }
        Ok(true)
    }

    fn script_line(&self, hook: &str) -> Result<Option<String>> {
        let parse_error = |reason: String| SvnpmError::ManifestParseError {
            file: self.path.display().to_string(),
            reason,
        };
        match self.document.get(SCRIPTS_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(scripts)) => match scripts.get(hook) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(line)) => Ok(Some(line.clone())),
                Some(_) => Err(parse_error(format!("{SCRIPTS_KEY}.{hook} must be a string")).into()),
            },
            Some(_) => Err(parse_error(format!("{SCRIPTS_KEY} must be an object")).into()),
        }
    }

    /// Serializes the manifest with its original indentation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.document.serialize(&mut serializer).context("Failed to serialize host manifest")?;

        let mut json = String::from_utf8(buf).context("Host manifest is not valid UTF-8")?;
        if self.trailing_newline {
            json.push('\n');
        }
        Ok(json)
    }

    /// Writes the manifest back to its file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self) -> Result<()> {
        let json = self.to_json()?;
        atomic_write(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to write host manifest {}", self.path.display()))
    }
}

fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .find_map(|line| {
            let indent: String = line.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
            (!indent.is_empty()).then_some(indent)
        })
        .unwrap_or_else(|| "\t".to_string())
}

/// Finds `package.json` in the current directory or one of its ancestors.
///
/// # Errors
///
/// Returns [`SvnpmError::ConfigMissing`] naming `./package.json` when no
/// ancestor has one.
pub fn find_manifest() -> Result<PathBuf> {
    let current = std::env::current_dir().context("Cannot determine current working directory")?;
    find_manifest_from(&current)
}

/// Uses `explicit_path` when given, otherwise searches from the current directory.
///
/// # Errors
///
/// Returns [`SvnpmError::ConfigMissing`] when the explicit path does not exist
/// or the search finds nothing.
pub fn find_manifest_with_optional(explicit_path: Option<PathBuf>) -> Result<PathBuf> {
    match explicit_path {
        Some(path) if path.exists() => Ok(path),
        Some(path) => Err(SvnpmError::ConfigMissing {
            path: path.display().to_string(),
        }
        .into()),
        None => find_manifest(),
    }
}

/// Walks up from `start` looking for `package.json`.
///
/// # Errors
///
/// Returns [`SvnpmError::ConfigMissing`] when no ancestor has one.
pub fn find_manifest_from(start: &Path) -> Result<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(HOST_MANIFEST);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(SvnpmError::ConfigMissing {
        path: start.join(HOST_MANIFEST).display().to_string(),
    }
    .into())
}
