//! End-to-end tests for the iteration commands (`foreach`, `git`,
//! `status`, `checkout`).

mod common;

use common::{git_stdout, GitFixture};
use predicates::prelude::*;

fn two_project_workspace(fixture: &GitFixture) {
    fixture.create_repo("lib", &[("lib.txt", "lib")]);
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"lib\"\nrevision = \"main\"\n",
        )],
    );
    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_foreach_runs_in_every_project() {
    let fixture = GitFixture::new();
    two_project_workspace(&fixture);

    fixture
        .cmd()
        .args(["foreach", "--", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("===== app (MAIN"))
        .stdout(predicate::str::contains("===== lib"))
        .stdout(predicate::str::contains("lib.txt"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_git_passthrough_and_project_filter() {
    let fixture = GitFixture::new();
    two_project_workspace(&fixture);

    fixture
        .cmd()
        .args(["git", "-P", "lib", "--", "rev-parse", "--abbrev-ref", "HEAD"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SKIPPING app"))
        .stdout(predicate::str::contains("main"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_status_prefixes_paths() {
    let fixture = GitFixture::new();
    two_project_workspace(&fixture);
    std::fs::write(fixture.project_dir("lib").join("scratch.txt"), "wip").unwrap();

    fixture
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("?? lib/scratch.txt"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_checkout_restores_manifest_revision() {
    let fixture = GitFixture::new();
    two_project_workspace(&fixture);

    // Move lib somewhere else, then let checkout bring it back.
    let lib = fixture.project_dir("lib");
    let main_sha = git_stdout(&lib, &["rev-parse", "HEAD"]);
    common::git(&lib, &["checkout", "--detach", "HEAD"]);
    fixture.cmd().arg("checkout").assert().success();
    assert_eq!(
        git_stdout(&lib, &["rev-parse", "--abbrev-ref", "HEAD"]),
        "main"
    );
    assert_eq!(git_stdout(&lib, &["rev-parse", "HEAD"]), main_sha);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_checkout_single_file() {
    let fixture = GitFixture::new();
    two_project_workspace(&fixture);

    let file = fixture.project_dir("lib").join("lib.txt");
    std::fs::write(&file, "local edit").unwrap();

    fixture
        .cmd()
        .args(["checkout", "lib/lib.txt"])
        .assert()
        .success();
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "lib");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_foreach_failure_sets_exit_code() {
    let fixture = GitFixture::new();
    two_project_workspace(&fixture);

    fixture
        .cmd()
        .args(["foreach", "--", "false"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("project(s) failed"));
}
