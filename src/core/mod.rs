//! Core types for svnpm
//!
//! This module holds the error types shared by every other module. Errors are
//! strongly typed ([`SvnpmError`]) so the pipeline can classify per-dependency
//! failures, and wrapped in [`ErrorContext`] when shown to the user.
//!
//! # Error Handling Pattern
//!
//! ```rust
//! use svnpm_cli::core::{SvnpmError, user_friendly_error};
//!
//! fn load() -> anyhow::Result<()> {
//!     Err(SvnpmError::ConfigMissing { path: "package.json".to_string() }.into())
//! }
//!
//! if let Err(e) = load() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.suggestion.is_some());
//! }
//! ```

pub mod error;

pub use error::{ErrorContext, SvnpmError, user_friendly_error};
