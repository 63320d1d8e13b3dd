//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - Directory preparation, removal and atomic writes
//! - [`platform`] - Locating the `svn` and `npm` executables
//! - [`progress`] - Progress spinner for the pipeline run
//!
//! # Example
//!
//! ```rust,no_run
//! use svnpm_cli::utils::{ensure_dir, atomic_write};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("node_modules"))?;
//! atomic_write(Path::new("node_modules/.svnpm-cache.json"), b"{}")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod platform;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, remove_dir_if_exists};
pub use progress::ProgressBar;
