//! Pipeline scenarios: fetch, package, install and failure isolation.

use svnpm_cli::cli::RunCommand;
use svnpm_cli::core::SvnpmError;
use svnpm_cli::pipeline::{DependencyOutcome, PipelineStage};
use svnpm_cli::test_utils::{MockPackageManager, MockVcs, VcsCall};

use crate::common::TestProject;

const FOO: &str = "svn://svn.example.com/libfoo/trunk";
const BAR: &str = "svn://svn.example.com/libbar/trunk";

#[tokio::test]
async fn test_head_dependency_is_fetched_installed_and_recorded() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(npm.installs(), vec![vec!["package-1.0.0.tgz".to_string()]]);

    let staging = project.node_modules().join(".libfoo-package");
    assert_eq!(
        vcs.calls(),
        vec![
            VcsCall::Checkout {
                url: FOO.to_string(),
                dest: staging.clone(),
                revision: "HEAD".to_string(),
            },
            VcsCall::Cleanup {
                dest: staging.clone(),
            },
            VcsCall::Update {
                dest: staging.clone(),
                revision: "HEAD".to_string(),
            },
            VcsCall::Cleanup {
                dest: staging.clone(),
            },
        ]
    );
    assert!(!staging.exists(), "staging directory should be removed after install");

    let cache = project.cached();
    let entry = &cache.entries()["libfoo"];
    assert_eq!(entry.revision, "HEAD");
    assert_eq!(entry.source_location, FOO);
    assert!(entry.installed_at.is_some());
}

#[tokio::test]
async fn test_pinned_revision_is_passed_to_svn() {
    let project = TestProject::with_dependencies(&[("libfoo|1432", FOO)]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    let revisions: Vec<String> = vcs
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            VcsCall::Checkout {
                revision, ..
            }
            | VcsCall::Update {
                revision, ..
            } => Some(revision),
            VcsCall::Cleanup {
                ..
            } => None,
        })
        .collect();
    assert_eq!(revisions, vec!["1432".to_string(), "1432".to_string()]);
    assert_eq!(project.cached().entries()["libfoo"].revision, "1432");
}

#[tokio::test]
async fn test_failing_dependency_does_not_affect_others() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO), ("libbar|7", BAR)]);
    let vcs = MockVcs::new().failing("libbar");
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].dependency_name, "libbar");
    assert_eq!(failures[0].stage, PipelineStage::Fetch);
    assert!(failures[0].message.contains("E170013"));

    assert_eq!(npm.installs().len(), 1);
    assert!(!project.node_modules().join(".libbar-package").exists());

    let cache = project.cached();
    assert!(cache.entries().contains_key("libfoo"));
    assert!(!cache.entries().contains_key("libbar"));

    let rendered = report.render();
    assert!(rendered.contains("Encountered errors installing svn dependencies"));
    assert!(rendered.contains("libbar"));
}

#[tokio::test]
async fn test_failed_update_is_retried_then_isolated() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO), ("libbar|7", BAR)]);
    let vcs = MockVcs::new().failing_update(".libbar-package");
    let npm = MockPackageManager::new();

    let report = project.run_with_retries(RunCommand::default(), &vcs, &npm, 2).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].dependency_name, "libbar");
    assert_eq!(failures[0].stage, PipelineStage::Fetch);
    assert!(failures[0].message.contains("E155004"));

    let bar = project.node_modules().join(".libbar-package");
    let foo = project.node_modules().join(".libfoo-package");
    let updates = vcs.updates();
    assert_eq!(updates.iter().filter(|dest| **dest == bar).count(), 3);
    assert_eq!(updates.iter().filter(|dest| **dest == foo).count(), 1);
    assert!(!bar.exists());

    assert_eq!(npm.installs(), vec![vec!["package-1.0.0.tgz".to_string()]]);
    let cache = project.cached();
    assert!(cache.entries().contains_key("libfoo"));
    assert!(!cache.entries().contains_key("libbar"));
}

#[tokio::test]
async fn test_failed_cleanup_fails_only_its_dependency() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO), ("libbar", BAR)]);
    let vcs = MockVcs::new().failing_cleanup(".libbar-package");
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].stage, PipelineStage::Fetch);
    // Cleanup is not retried, and update never runs after it failed
    let bar = project.node_modules().join(".libbar-package");
    assert!(!vcs.updates().contains(&bar));
    assert!(!bar.exists());
}

#[tokio::test]
async fn test_report_keeps_manifest_order() {
    let project = TestProject::with_dependencies(&[
        ("zeta", "svn://h/zeta"),
        ("alpha", "svn://h/alpha"),
        ("mid", "svn://h/mid"),
    ]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    let names: Vec<&str> = report.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert_eq!(report.installed_count(), 3);
    assert_eq!(npm.installs().len(), 1);
    assert_eq!(npm.installs()[0].len(), 3);
}

#[tokio::test]
async fn test_checkout_without_archive_fails_in_package_stage() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    let vcs = MockVcs::new().with_files(FOO, &["README.md"]);
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stage, PipelineStage::Package);
    assert!(failures[0].message.contains("No package archive"));
    assert!(npm.installs().is_empty());
    assert!(!project.cache_path().exists());
}

#[tokio::test]
async fn test_two_archives_are_ambiguous() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    let vcs = MockVcs::new().with_files(FOO, &["libfoo-1.0.0.tgz", "libfoo-1.0.1.tar.gz"]);
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stage, PipelineStage::Package);
    assert!(failures[0].message.contains("libfoo-1.0.0.tgz"));
    assert!(failures[0].message.contains("libfoo-1.0.1.tar.gz"));
}

#[tokio::test]
async fn test_install_failure_is_reported_per_dependency() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::failing();
    let cmd = RunCommand {
        per_dependency: true,
        ..Default::default()
    };

    let report = project.run(cmd, &vcs, &npm).await.unwrap();

    assert_eq!(report.failures()[0].stage, PipelineStage::Install);
    assert!(!project.node_modules().join(".libfoo-package").exists());
    assert!(!project.cache_path().exists());
}

#[tokio::test]
async fn test_per_dependency_mode_installs_each_archive_separately() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO), ("libbar", BAR)]);
    let vcs = MockVcs::new()
        .with_files(FOO, &["libfoo-1.0.0.tgz"])
        .with_files(BAR, &["libbar-2.1.0.tgz"]);
    let npm = MockPackageManager::new();
    let cmd = RunCommand {
        per_dependency: true,
        ..Default::default()
    };

    let report = project.run(cmd, &vcs, &npm).await.unwrap();

    assert_eq!(report.installed_count(), 2);
    let mut installs = npm.installs();
    installs.sort();
    assert_eq!(
        installs,
        vec![vec!["libbar-2.1.0.tgz".to_string()], vec!["libfoo-1.0.0.tgz".to_string()]]
    );
    assert!(!project.node_modules().join(".svnpm-install").exists());
    assert_eq!(project.cached().entries().len(), 2);
}

#[tokio::test]
async fn test_default_install_runs_npm_once() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO), ("libbar", BAR)]);
    let vcs = MockVcs::new()
        .with_files(FOO, &["libfoo-1.0.0.tgz"])
        .with_files(BAR, &["libbar-2.1.0.tgz"]);
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.installed_count(), 2);
    let installs = npm.installs();
    assert_eq!(installs.len(), 1);
    let mut archives = installs[0].clone();
    archives.sort();
    assert_eq!(archives, vec!["libbar-2.1.0.tgz".to_string(), "libfoo-1.0.0.tgz".to_string()]);

    assert!(!project.node_modules().join(".svnpm-install").exists());
    assert_eq!(project.cached().entries().len(), 2);
}

#[tokio::test]
async fn test_batched_install_failure_fails_every_batched_dependency() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO), ("libbar", BAR)]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::failing();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    let failures = report.failures();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.stage == PipelineStage::Install));
    assert_eq!(npm.installs().len(), 1);
    assert!(!project.cache_path().exists());
}

#[tokio::test]
async fn test_batched_fetch_failure_leaves_others_batched() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO), ("libbar", BAR)]);
    let vcs = MockVcs::new().failing("libbar");
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(report.failures()[0].stage, PipelineStage::Fetch);
    assert_eq!(npm.installs().len(), 1);
    assert_eq!(npm.installs()[0].len(), 1);
}

#[tokio::test]
async fn test_sequential_run_with_max_parallel_one() {
    let project = TestProject::with_dependencies(&[("a", "svn://h/a"), ("b", "svn://h/b")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();
    let cmd = RunCommand {
        max_parallel: Some(1),
        ..Default::default()
    };

    let report = project.run(cmd, &vcs, &npm).await.unwrap();

    assert!(report.is_success());
    assert_eq!(vcs.checkouts(), vec!["svn://h/a".to_string(), "svn://h/b".to_string()]);
}

#[tokio::test]
async fn test_no_dependencies_touches_nothing() {
    let project = TestProject::with_manifest(r#"{"name": "host-app"}"#);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert!(report.dependencies.is_empty());
    assert!(vcs.calls().is_empty());
    assert!(!project.node_modules().exists());
}

#[tokio::test]
async fn test_invalid_dependencies_block_is_a_manifest_error() {
    let project = TestProject::with_manifest(r#"{"svnDependencies": {"libfoo": 42}}"#);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let err = project.run(RunCommand::default(), &vcs, &npm).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SvnpmError>(),
        Some(SvnpmError::ManifestParseError { .. })
    ));
}
