//! Per-dependency outcomes and the aggregated run report.

use colored::Colorize;
use std::fmt;

/// Stage of a dependency pipeline, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Staging directory preparation
    Prepare,
    /// svn checkout, cleanup and update
    Fetch,
    /// Archive discovery (and the batch copy)
    Package,
    /// `npm install`
    Install,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prepare => "prepare",
            Self::Fetch => "fetch",
            Self::Package => "package",
            Self::Install => "install",
        };
        f.write_str(name)
    }
}

/// A dependency failure as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Failed dependency
    pub dependency_name: String,
    /// Stage the failure happened in
    pub stage: PipelineStage,
    /// Human-readable reason, including the tool's diagnostic output
    pub message: String,
}

impl ErrorRecord {
    /// Record built from an error chain.
    pub fn new(dependency_name: &str, stage: PipelineStage, error: &anyhow::Error) -> Self {
        Self {
            dependency_name: dependency_name.to_string(),
            stage,
            message: format!("{error:#}"),
        }
    }
}

/// Terminal result of one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyOutcome {
    /// Fetched, packaged and installed this run
    Installed,
    /// Skipped because the cache already covers the pinned revision
    Unchanged,
    /// Failed in some stage
    Failed(ErrorRecord),
}

/// Outcome of one dependency, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    /// Dependency name
    pub name: String,
    /// Target revision
    pub revision: String,
    /// What happened
    pub outcome: DependencyOutcome,
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One entry per configured dependency, in manifest order
    pub dependencies: Vec<DependencyReport>,
}

impl RunReport {
    /// Number of dependencies installed this run.
    pub fn installed_count(&self) -> usize {
        self.count(|o| matches!(o, DependencyOutcome::Installed))
    }

    /// Number of dependencies skipped as up to date.
    pub fn unchanged_count(&self) -> usize {
        self.count(|o| matches!(o, DependencyOutcome::Unchanged))
    }

    fn count(&self, pred: impl Fn(&DependencyOutcome) -> bool) -> usize {
        self.dependencies.iter().filter(|d| pred(&d.outcome)).count()
    }

    /// Error records of every failed dependency.
    pub fn failures(&self) -> Vec<&ErrorRecord> {
        self.dependencies
            .iter()
            .filter_map(|d| match &d.outcome {
                DependencyOutcome::Failed(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Outcome of dependency `name`.
    pub fn outcome(&self, name: &str) -> Option<&DependencyOutcome> {
        self.dependencies.iter().find(|d| d.name == name).map(|d| &d.outcome)
    }

    /// `true` when no dependency failed.
    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }

    /// Human-readable summary, one line per dependency plus a verdict.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for dep in &self.dependencies {
            match &dep.outcome {
                DependencyOutcome::Installed => {
                    lines.push(format!("{} {}|{}", "Installed".green(), dep.name, dep.revision));
                }
                DependencyOutcome::Unchanged => {
                    lines.push(format!(
                        "{} {}|{} (already installed)",
                        "Unchanged".dimmed(),
                        dep.name,
                        dep.revision
                    ));
                }
                DependencyOutcome::Failed(_) => {}
            }
        }

        let failures = self.failures();
        if failures.is_empty() {
            lines.push(format!(
                "{} ({} installed, {} unchanged)",
                "Finished installing svn dependencies".green().bold(),
                self.installed_count(),
                self.unchanged_count()
            ));
        } else {
            lines.push("Encountered errors installing svn dependencies:".red().bold().to_string());
            for record in failures {
                lines.push(format!(
                    " * {} [{}] {}",
                    record.dependency_name.red(),
                    record.stage,
                    record.message
                ));
            }
        }
        lines.join("\n")
    }
}
