//! Run-scoped state shared by every dependency pipeline.

use std::path::{Path, PathBuf};

use crate::cache::RevisionCache;
use crate::config::EffectiveOptions;
use crate::constants::{DEFAULT_FETCH_RETRIES, DEFAULT_MAX_PARALLEL, STAGING_ROOT_DIR};
use crate::installer::{BatchDir, InstallLock, InstallMode};
use crate::npm::PackageManager;
use crate::svn::{SvnOptions, VersionControl};
use crate::utils::ProgressBar;

/// Lifecycle of one dependency.
///
/// `Pending → Preparing → Fetching → Packaging → Installed`, any working state
/// may move to `Failed`, and a skipped dependency goes straight from
/// `Pending` to `Installed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyState {
    Pending,
    Preparing,
    Fetching,
    Packaging,
    Installed,
    Failed,
}

impl DependencyState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Preparing | Self::Installed)
                | (Self::Preparing, Self::Fetching | Self::Failed)
                | (Self::Fetching, Self::Packaging | Self::Failed)
                | (Self::Packaging, Self::Installed | Self::Failed)
        )
    }

    /// `Installed` and `Failed` are terminal.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Installed | Self::Failed)
    }
}

/// Tracks the state of one dependency and logs every transition.
#[derive(Debug)]
pub(crate) struct StateTracker<'a> {
    name: &'a str,
    state: DependencyState,
}

impl<'a> StateTracker<'a> {
    pub(crate) const fn new(name: &'a str) -> Self {
        Self {
            name,
            state: DependencyState::Pending,
        }
    }

    pub(crate) fn advance(&mut self, next: DependencyState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {next:?} for {}",
            self.state,
            self.name
        );
        tracing::debug!(target: "pipeline", "{}: {:?} -> {next:?}", self.name, self.state);
        self.state = next;
    }

    pub(crate) const fn state(&self) -> DependencyState {
        self.state
    }
}

/// Settings of one run, after config layering and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Host project root; npm runs here
    pub project_dir: PathBuf,
    /// Directory holding staging directories, normally `<project>/node_modules`
    pub staging_root: PathBuf,
    /// Options for every svn call
    pub svn: SvnOptions,
    /// Retries for checkout and update
    pub retries: usize,
    /// Pipelines run concurrently
    pub max_parallel: usize,
    /// Per-dependency or batched installs
    pub install_mode: InstallMode,
}

impl PipelineSettings {
    /// Default settings for the project at `project_dir`.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            project_dir: project_dir.to_path_buf(),
            staging_root: project_dir.join(STAGING_ROOT_DIR),
            svn: SvnOptions::default(),
            retries: DEFAULT_FETCH_RETRIES,
            max_parallel: DEFAULT_MAX_PARALLEL,
            install_mode: InstallMode::default(),
        }
    }

    /// Applies resolved options.
    #[must_use]
    pub fn with_options(mut self, options: &EffectiveOptions) -> Self {
        self.svn = options.svn.clone();
        self.retries = options.retries;
        self.max_parallel = options.max_parallel.max(1);
        self.install_mode = if options.batch_install {
            InstallMode::Batched
        } else {
            InstallMode::PerDependency
        };
        self
    }
}

/// Everything a run needs, passed by reference into every pipeline.
pub struct PipelineContext<'a> {
    pub(crate) settings: PipelineSettings,
    pub(crate) vcs: &'a dyn VersionControl,
    pub(crate) package_manager: &'a dyn PackageManager,
    pub(crate) cache: &'a RevisionCache,
    pub(crate) install_lock: InstallLock,
    pub(crate) batch: BatchDir,
    pub(crate) progress: ProgressBar,
}

impl<'a> PipelineContext<'a> {
    /// Context for one run.
    pub fn new(
        settings: PipelineSettings,
        vcs: &'a dyn VersionControl,
        package_manager: &'a dyn PackageManager,
        cache: &'a RevisionCache,
    ) -> Self {
        let batch = BatchDir::new(&settings.staging_root);
        Self {
            settings,
            vcs,
            package_manager,
            cache,
            install_lock: InstallLock::new(),
            batch,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports progress on `progress` instead of staying silent.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Settings of this run.
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}
