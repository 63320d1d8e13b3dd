//! Orchestration of dependency pipelines.
//!
//! Every configured dependency gets one future that walks its stages in
//! order: prepare the staging directory, fetch from svn, locate the archive,
//! install it. The futures run with bounded concurrency (`max_parallel`) and
//! a failure is a value: it ends that dependency's pipeline with an
//! [`ErrorRecord`] and never touches the others.
//!
//! Once every pipeline settled (and, in batched mode, the single batched
//! install ran), each dependency that was actually installed is recorded in
//! the [`RevisionCache`](crate::cache::RevisionCache) and the cache is flushed
//! once. Only a failing flush turns the run itself into an error.
//!
//! ```rust,ignore
//! let ctx = PipelineContext::new(settings, &svn, &npm, &cache);
//! let report = pipeline::run(&ctx, descriptors).await?;
//! println!("{}", report.render());
//! ```

pub mod context;
pub mod report;

pub use context::{DependencyState, PipelineContext, PipelineSettings};
pub use report::{DependencyOutcome, DependencyReport, ErrorRecord, PipelineStage, RunReport};

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::constants::{BACKOFF_FACTOR_MS, MAX_BACKOFF_DELAY_MS};
use crate::core::SvnpmError;
use crate::descriptor::DependencyDescriptor;
use crate::installer::{self, InstallMode};
use context::StateTracker;

/// Where a pipeline stopped.
enum Settled {
    Done(DependencyOutcome),
    /// Archive copied into the batch directory, waiting for the batched install
    Staged(PathBuf),
}

/// Marks up-to-date descriptors as skipped. With `force` nothing is skipped.
pub fn mark_up_to_date(
    descriptors: &mut [DependencyDescriptor],
    cache: &crate::cache::RevisionCache,
    force: bool,
) {
    for descriptor in descriptors {
        let skip = !force && cache.is_up_to_date(descriptor);
        if skip {
            tracing::debug!(target: "pipeline", "{descriptor} is up to date");
        }
        descriptor.mark_skip(skip);
    }
}

/// Runs every dependency pipeline and flushes the cache.
///
/// Descriptors are expected to be marked with [`mark_up_to_date`] already.
///
/// # Errors
///
/// Only when the cache flush fails; dependency failures are in the report.
pub async fn run(ctx: &PipelineContext<'_>, descriptors: Vec<DependencyDescriptor>) -> Result<RunReport> {
    let settings = ctx.settings();
    let batched = settings.install_mode == InstallMode::Batched;
    let needs_work = descriptors.iter().any(|d| !d.skip());

    if batched && needs_work {
        if let Err(e) = ctx.batch.prepare().await {
            tracing::warn!(target: "pipeline", "Could not clear stale batch directory: {e:#}");
        }
    }

    let concurrency = settings.max_parallel.max(1);
    tracing::debug!(
        target: "pipeline",
        "Running {} dependencies ({} at a time, {:?} install)",
        descriptors.len(),
        concurrency,
        settings.install_mode
    );

    let mut settled: Vec<(usize, Settled)> = stream::iter(descriptors.iter().enumerate())
        .map(|(index, descriptor)| async move {
            let result = run_dependency(ctx, descriptor).await;
            ctx.progress.inc(1);
            (index, result)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;
    settled.sort_by_key(|(index, _)| *index);

    let mut outcomes: Vec<Option<DependencyOutcome>> = Vec::with_capacity(descriptors.len());
    let mut staged: Vec<(usize, PathBuf)> = Vec::new();
    for (index, result) in settled {
        match result {
            Settled::Done(outcome) => outcomes.push(Some(outcome)),
            Settled::Staged(archive) => {
                staged.push((index, archive));
                outcomes.push(None);
            }
        }
    }

    if !staged.is_empty() {
        let archives: Vec<PathBuf> = staged.iter().map(|(_, a)| a.clone()).collect();
        ctx.progress.set_message(format!("npm install ({} archives)", archives.len()));
        let result = ctx
            .install_lock
            .install(ctx.package_manager, &settings.project_dir, &archives)
            .await;

        for (index, _) in &staged {
            let descriptor = &descriptors[*index];
            outcomes[*index] = Some(match &result {
                Ok(()) => {
                    tracing::debug!(target: "pipeline", "{}: Packaging -> Installed", descriptor.name);
                    DependencyOutcome::Installed
                }
                Err(e) => {
                    tracing::debug!(target: "pipeline", "{}: Packaging -> Failed", descriptor.name);
                    DependencyOutcome::Failed(ErrorRecord::new(
                        &descriptor.name,
                        PipelineStage::Install,
                        e,
                    ))
                }
            });
        }
    }
    if batched && needs_work {
        ctx.batch.remove().await;
    }

    let mut report = RunReport::default();
    for (descriptor, outcome) in descriptors.iter().zip(outcomes) {
        let outcome = outcome.unwrap_or(DependencyOutcome::Failed(ErrorRecord {
            dependency_name: descriptor.name.clone(),
            stage: PipelineStage::Install,
            message: "install did not run".to_string(),
        }));
        if outcome == DependencyOutcome::Installed {
            ctx.cache.record(descriptor);
        }
        report.dependencies.push(DependencyReport {
            name: descriptor.name.clone(),
            revision: descriptor.revision.clone(),
            outcome,
        });
    }

    ctx.cache.flush().await?;
    Ok(report)
}

async fn run_dependency(ctx: &PipelineContext<'_>, descriptor: &DependencyDescriptor) -> Settled {
    let mut tracker = StateTracker::new(&descriptor.name);

    if descriptor.skip() {
        tracker.advance(DependencyState::Installed);
        return Settled::Done(DependencyOutcome::Unchanged);
    }

    let settings = ctx.settings();
    let install_dir = &descriptor.install_dir;

    tracker.advance(DependencyState::Preparing);
    ctx.progress.set_message(format!("{descriptor}: preparing"));
    if let Err(e) = installer::ensure_staging(&settings.staging_root, install_dir).await {
        return fail(&mut tracker, descriptor, PipelineStage::Prepare, &e).await;
    }

    tracker.advance(DependencyState::Fetching);
    ctx.progress.set_message(format!("{descriptor}: fetching"));
    if let Err(e) = fetch(ctx, descriptor).await {
        return fail(&mut tracker, descriptor, PipelineStage::Fetch, &e).await;
    }

    tracker.advance(DependencyState::Packaging);
    let archive = match installer::find_archive(&descriptor.name, install_dir) {
        Ok(archive) => archive,
        Err(e) => return fail(&mut tracker, descriptor, PipelineStage::Package, &e).await,
    };
    tracing::debug!(target: "pipeline", "{}: packaged {}", descriptor.name, archive.display());

    match settings.install_mode {
        InstallMode::Batched => match ctx.batch.add(&descriptor.name, &archive).await {
            Ok(copy) => {
                installer::remove_staging(install_dir).await;
                tracing::debug!(
                    target: "pipeline",
                    "{}: {:?}, waiting for batched install",
                    descriptor.name,
                    tracker.state()
                );
                Settled::Staged(copy)
            }
            Err(e) => fail(&mut tracker, descriptor, PipelineStage::Package, &e).await,
        },
        InstallMode::PerDependency => {
            ctx.progress.set_message(format!("{descriptor}: installing"));
            let result = ctx
                .install_lock
                .install(ctx.package_manager, &settings.project_dir, &[archive])
                .await;
            match result {
                Ok(()) => {
                    installer::remove_staging(install_dir).await;
                    tracker.advance(DependencyState::Installed);
                    Settled::Done(DependencyOutcome::Installed)
                }
                Err(e) => fail(&mut tracker, descriptor, PipelineStage::Install, &e).await,
            }
        }
    }
}

async fn fail(
    tracker: &mut StateTracker<'_>,
    descriptor: &DependencyDescriptor,
    stage: PipelineStage,
    error: &anyhow::Error,
) -> Settled {
    tracing::debug!(target: "pipeline", "{descriptor} failed in {stage}: {error:#}");
    installer::remove_staging(&descriptor.install_dir).await;
    tracker.advance(DependencyState::Failed);
    Settled::Done(DependencyOutcome::Failed(ErrorRecord::new(&descriptor.name, stage, error)))
}

/// checkout, cleanup, update, cleanup.
async fn fetch(ctx: &PipelineContext<'_>, descriptor: &DependencyDescriptor) -> Result<()> {
    let settings = ctx.settings();
    let options = &settings.svn;
    let dest = descriptor.install_dir.as_path();

    with_retries(settings.retries, "checkout", &descriptor.name, || {
        ctx.vcs.checkout(&descriptor.source_location, dest, &descriptor.revision, options)
    })
    .await?;
    ctx.vcs.cleanup(dest, options).await?;
    with_retries(settings.retries, "update", &descriptor.name, || {
        ctx.vcs.update(dest, &descriptor.revision, options)
    })
    .await?;
    ctx.vcs.cleanup(dest, options).await?;
    Ok(())
}

/// Backoff between fetch retries: 500ms, 1s, 2s, ... capped, with jitter.
fn retry_strategy(retries: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2)
        .factor(BACKOFF_FACTOR_MS)
        .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS))
        .map(jitter)
        .take(retries)
}

/// A missing svn binary will not appear between attempts.
fn is_transient(error: &anyhow::Error) -> bool {
    !matches!(error.downcast_ref::<SvnpmError>(), Some(SvnpmError::SvnNotFound))
}

async fn with_retries<F, Fut>(retries: usize, operation: &str, name: &str, action: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    RetryIf::spawn(retry_strategy(retries), action, |e: &anyhow::Error| {
        let retry = is_transient(e);
        if retry && retries > 0 {
            tracing::debug!(target: "svn", "{name}: svn {operation} attempt failed: {e:#}");
        }
        retry
    })
    .await
}
