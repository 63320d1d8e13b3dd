//! Revision cache: skipping, idempotence and recovery.

use svnpm_cli::cli::RunCommand;
use svnpm_cli::core::SvnpmError;
use svnpm_cli::pipeline::DependencyOutcome;
use svnpm_cli::test_utils::{MockPackageManager, MockVcs};

use crate::common::TestProject;

const FOO: &str = "svn://svn.example.com/libfoo/trunk";

#[tokio::test]
async fn test_cached_revision_is_skipped() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO)]);
    project.seed_cache(&[("libfoo", "42")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Unchanged));
    assert_eq!(report.unchanged_count(), 1);
    assert!(vcs.calls().is_empty());
    assert!(npm.installs().is_empty());
    assert!(report.render().contains("already installed"));
}

#[tokio::test]
async fn test_changed_revision_is_reinstalled() {
    let project = TestProject::with_dependencies(&[("libfoo|43", FOO)]);
    project.seed_cache(&[("libfoo", "42")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(project.cached().entries()["libfoo"].revision, "43");
}

#[tokio::test]
async fn test_cached_head_is_skipped() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    project.seed_cache(&[("libfoo", "HEAD")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Unchanged));
    assert!(vcs.calls().is_empty());
    assert!(npm.installs().is_empty());
}

#[tokio::test]
async fn test_cached_pinned_revision_does_not_satisfy_head() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    project.seed_cache(&[("libfoo", "42")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(project.cached().entries()["libfoo"].revision, "HEAD");
}

#[tokio::test]
async fn test_second_head_run_is_a_no_op() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    let npm = MockPackageManager::new();

    let first_vcs = MockVcs::new();
    let first = project.run(RunCommand::default(), &first_vcs, &npm).await.unwrap();
    assert_eq!(first.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(project.cached().entries()["libfoo"].revision, "HEAD");
    let cache_after_first = std::fs::read_to_string(project.cache_path()).unwrap();

    let second_vcs = MockVcs::new();
    let second = project.run(RunCommand::default(), &second_vcs, &npm).await.unwrap();

    assert_eq!(second.outcome("libfoo"), Some(&DependencyOutcome::Unchanged));
    assert!(second_vcs.calls().is_empty());
    assert_eq!(npm.installs().len(), 1);
    assert_eq!(std::fs::read_to_string(project.cache_path()).unwrap(), cache_after_first);
}

#[tokio::test]
async fn test_force_refetches_cached_head() {
    let project = TestProject::with_dependencies(&[("libfoo", FOO)]);
    project.seed_cache(&[("libfoo", "HEAD")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();
    let cmd = RunCommand {
        force: true,
        ..Default::default()
    };

    let report = project.run(cmd, &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(vcs.checkouts(), vec![FOO.to_string()]);
    assert_eq!(npm.installs().len(), 1);
}

#[tokio::test]
async fn test_force_ignores_cache() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO)]);
    project.seed_cache(&[("libfoo", "42")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();
    let cmd = RunCommand {
        force: true,
        ..Default::default()
    };

    let report = project.run(cmd, &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    assert_eq!(vcs.checkouts().len(), 1);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO), ("libbar|7", "svn://h/libbar")]);

    let first_vcs = MockVcs::new();
    let npm = MockPackageManager::new();
    let first = project.run(RunCommand::default(), &first_vcs, &npm).await.unwrap();
    assert_eq!(first.installed_count(), 2);
    let installs_after_first = npm.installs().len();
    let cache_after_first = std::fs::read_to_string(project.cache_path()).unwrap();

    let second_vcs = MockVcs::new();
    let second = project.run(RunCommand::default(), &second_vcs, &npm).await.unwrap();

    assert_eq!(second.unchanged_count(), 2);
    assert!(second_vcs.calls().is_empty());
    assert_eq!(npm.installs().len(), installs_after_first);
    assert_eq!(std::fs::read_to_string(project.cache_path()).unwrap(), cache_after_first);
}

#[tokio::test]
async fn test_entries_of_removed_dependencies_are_kept() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO)]);
    project.seed_cache(&[("legacy", "9")]);
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    let cache = project.cached();
    assert_eq!(cache.entries().len(), 2);
    assert_eq!(cache.entries()["legacy"].revision, "9");
}

#[tokio::test]
async fn test_corrupt_cache_is_fatal() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO)]);
    std::fs::create_dir_all(project.node_modules()).unwrap();
    std::fs::write(project.cache_path(), "{not json").unwrap();
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let err = project.run(RunCommand::default(), &vcs, &npm).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<SvnpmError>(), Some(SvnpmError::CacheCorrupt { .. })));
    assert!(vcs.calls().is_empty());
    assert_eq!(std::fs::read_to_string(project.cache_path()).unwrap(), "{not json");
}

#[tokio::test]
async fn test_repair_cache_rebuilds_corrupt_cache() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO)]);
    std::fs::create_dir_all(project.node_modules()).unwrap();
    std::fs::write(project.cache_path(), "{not json").unwrap();
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();
    let cmd = RunCommand {
        repair_cache: true,
        ..Default::default()
    };

    let report = project.run(cmd, &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Installed));
    let cache = project.cached();
    assert_eq!(cache.entries().len(), 1);
    assert_eq!(cache.entries()["libfoo"].revision, "42");
}

#[tokio::test]
async fn test_legacy_field_names_are_understood() {
    let project = TestProject::with_dependencies(&[("libfoo|42", FOO)]);
    std::fs::create_dir_all(project.node_modules()).unwrap();
    std::fs::write(
        project.cache_path(),
        r#"{"libfoo": {"rev": "42", "url": "svn://svn.example.com/libfoo/trunk", "installDir": "/old"}}"#,
    )
    .unwrap();
    let vcs = MockVcs::new();
    let npm = MockPackageManager::new();

    let report = project.run(RunCommand::default(), &vcs, &npm).await.unwrap();

    assert_eq!(report.outcome("libfoo"), Some(&DependencyOutcome::Unchanged));
}
