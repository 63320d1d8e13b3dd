//! Binary invocations: exit codes and messages.

use predicates::prelude::*;
use tempfile::TempDir;

use crate::common::{TestProject, svnpm_in};

#[test]
fn test_run_without_manifest_fails() {
    let temp = TempDir::new().unwrap();

    svnpm_in(temp.path())
        .args(["run", "--manifest-path"])
        .arg(temp.path().join("package.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Host manifest not found"))
        .stderr(predicate::str::contains("--manifest-path"));
}

#[test]
fn test_run_with_malformed_manifest_fails() {
    let project = TestProject::with_manifest("{ not json");

    project
        .svnpm()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid host manifest"));
}

#[test]
fn test_run_without_dependencies_succeeds() {
    let project = TestProject::with_manifest(r#"{"name": "host-app", "svnDependencies": {}}"#);

    project
        .svnpm()
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("No svnDependencies"));
    assert!(!project.node_modules().exists());
}

#[test]
fn test_manifest_is_found_from_subdirectory() {
    let project = TestProject::with_manifest(r#"{"name": "host-app"}"#);
    let nested = project.path().join("src").join("lib");
    std::fs::create_dir_all(&nested).unwrap();

    svnpm_in(&nested)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("No svnDependencies"));
}

#[cfg(unix)]
#[test]
fn test_missing_svn_fails_the_run() {
    let project = TestProject::with_dependencies(&[("libfoo|42", "svn://h/libfoo")]);
    let empty_path = TempDir::new().unwrap();

    project
        .svnpm()
        .env("PATH", empty_path.path())
        .args(["run", "--no-progress"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Encountered errors installing svn dependencies"))
        .stdout(predicate::str::contains("libfoo [fetch]"))
        .stderr(predicate::str::contains("Failed to install 1 svn dependencies"));
    assert!(!project.cache_path().exists());
}

#[test]
fn test_explicit_global_config_must_exist() {
    let project = TestProject::with_manifest(r#"{"name": "host-app"}"#);

    project
        .svnpm()
        .args(["run", "--config"])
        .arg(project.path().join("missing.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read global config"));
}

#[test]
fn test_invalid_global_config_fails() {
    let project = TestProject::with_manifest(r#"{"name": "host-app"}"#);
    let config = project.path().join("config.toml");
    std::fs::write(&config, "[svn\nusername = ").unwrap();

    project
        .svnpm()
        .env("SVNPM_CONFIG", &config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse global config"))
        .stderr(predicate::str::contains("suggestion: Fix the TOML in"));
}

#[test]
fn test_cache_list_and_clear() {
    let project = TestProject::with_dependencies(&[("libfoo|42", "svn://h/libfoo")]);

    project
        .svnpm()
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No svn dependencies installed yet"));

    project.seed_cache(&[("libfoo", "42")]);
    project
        .svnpm()
        .args(["cache", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("libfoo|42"));

    project
        .svnpm()
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared"));
    assert!(!project.cache_path().exists());
}

#[test]
fn test_verbose_and_quiet_are_exclusive() {
    let temp = TempDir::new().unwrap();

    svnpm_in(temp.path()).args(["-v", "-q", "run"]).assert().failure();
}

#[test]
fn test_version_flag() {
    let temp = TempDir::new().unwrap();

    svnpm_in(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
