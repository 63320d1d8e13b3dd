//! Progress indicators for svnpm runs
//!
//! A thin wrapper over `indicatif` with svnpm styling. Progress is hidden when
//! the caller disables it (`--no-progress`), when `SVNPM_NO_PROGRESS` is set, or
//! when stderr is not a terminal (npm lifecycle scripts, CI logs).
//!
//! # Examples
//!
//! ```rust
//! use svnpm_cli::utils::progress::ProgressBar;
//!
//! let progress = ProgressBar::new(3, false);
//! progress.set_message("libfoo: checkout");
//! progress.inc(1);
//! progress.finish_and_clear();
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Checks `SVNPM_NO_PROGRESS` and whether stderr is interactive.
fn is_progress_disabled() -> bool {
    std::env::var_os("SVNPM_NO_PROGRESS").is_some() || !std::io::stderr().is_terminal()
}

/// A progress bar with consistent styling.
///
/// Cloning is cheap: clones share the same underlying bar, so a clone can be
/// moved into every dependency future of a run.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a bar tracking `len` units of work.
    ///
    /// With `disabled` (or when progress is disabled by the environment) the bar
    /// is hidden and silently ignores all operations.
    pub fn new(len: u64, disabled: bool) -> Self {
        let bar = if disabled || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        Self {
            inner: bar,
        }
    }

    /// A bar that never draws anything.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Sets the message displayed alongside the progress bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advances the position by `delta` units.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Removes the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .progress_chars("━╸━")
}
