//! `svnpm integrate` and `svnpm deintegrate` against real `package.json` files.

use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_integrate_registers_install_script() {
    let project = TestProject::with_manifest(r#"{"name": "host-app", "version": "1.0.0"}"#);

    project
        .svnpm()
        .args(["integrate", "--no-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered"));

    let json = project.manifest_json();
    assert_eq!(json["scripts"]["install"], "svnpm run");
    assert_eq!(json["name"], "host-app");
}

#[test]
fn test_integrate_keeps_existing_script_and_is_idempotent() {
    let project = TestProject::with_manifest(
        r#"{"name": "host-app", "scripts": {"install": "node setup.js", "test": "jest"}}"#,
    );

    project.svnpm().args(["integrate", "--no-run"]).assert().success();
    let after_first = std::fs::read_to_string(project.manifest_path()).unwrap();

    project
        .svnpm()
        .args(["integrate", "--no-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already registered"));

    assert_eq!(std::fs::read_to_string(project.manifest_path()).unwrap(), after_first);
    let json = project.manifest_json();
    assert_eq!(json["scripts"]["install"], "node setup.js && svnpm run");
    assert_eq!(json["scripts"]["test"], "jest");
}

#[test]
fn test_integrate_keeps_existing_invocation_flags() {
    let project = TestProject::with_manifest(
        r#"{"name": "host-app", "scripts": {"install": "svnpm run --per-dependency && node setup.js"}}"#,
    );
    let before = std::fs::read_to_string(project.manifest_path()).unwrap();

    project
        .svnpm()
        .args(["integrate", "--no-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already registered in scripts.install"));

    assert_eq!(std::fs::read_to_string(project.manifest_path()).unwrap(), before);
}

#[test]
fn test_integrate_custom_hook() {
    let project = TestProject::with_manifest(r#"{"name": "host-app"}"#);

    project.svnpm().args(["integrate", "--no-run", "--hook", "postinstall"]).assert().success();

    let json = project.manifest_json();
    assert_eq!(json["scripts"]["postinstall"], "svnpm run");
    assert!(json["scripts"].get("install").is_none());
}

#[test]
fn test_integrate_preserves_key_order_and_indentation() {
    let original = "{\n    \"version\": \"1.0.0\",\n    \"name\": \"host-app\"\n}\n";
    let project = TestProject::with_manifest(original);

    project.svnpm().args(["integrate", "--no-run"]).assert().success();

    let written = std::fs::read_to_string(project.manifest_path()).unwrap();
    assert!(written.starts_with("{\n    \"version\": \"1.0.0\",\n    \"name\": \"host-app\","));
    assert!(written.ends_with("}\n"));
}

#[test]
fn test_integrate_runs_pipeline_unless_no_run() {
    let project = TestProject::with_manifest(r#"{"name": "host-app"}"#);

    project
        .svnpm()
        .arg("integrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("No svnDependencies"));
}

#[test]
fn test_deintegrate_restores_original_script() {
    let project = TestProject::with_manifest(
        r#"{"scripts": {"install": "node setup.js && svnpm run --force"}}"#,
    );

    project
        .svnpm()
        .arg("deintegrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    assert_eq!(project.manifest_json()["scripts"]["install"], "node setup.js");
}

#[test]
fn test_deintegrate_drops_emptied_hook() {
    let project = TestProject::with_manifest(
        r#"{"scripts": {"install": "svnpm run", "test": "jest"}}"#,
    );

    project.svnpm().arg("deintegrate").assert().success();

    let json = project.manifest_json();
    assert!(json["scripts"].get("install").is_none());
    assert_eq!(json["scripts"]["test"], "jest");
}

#[test]
fn test_deintegrate_without_registration_leaves_file_alone() {
    let original = "{\"scripts\":{\"install\":\"node setup.js\"}}";
    let project = TestProject::with_manifest(original);

    project
        .svnpm()
        .arg("deintegrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("does not run svnpm"));

    assert_eq!(std::fs::read_to_string(project.manifest_path()).unwrap(), original);
}
