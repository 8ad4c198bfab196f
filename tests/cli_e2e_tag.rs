//! End-to-end test for the `tag` command and frozen-manifest restore.

mod common;

use common::{git, git_stdout, GitFixture};
use predicates::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_tag_freezes_and_restores_workspace() {
    let fixture = GitFixture::new();
    fixture.create_repo("lib", &[("lib.txt", "v1")]);
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"lib\"\nrevision = \"main\"\n",
        )],
    );
    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();

    // Freeze the workspace into a tag.
    fixture
        .cmd()
        .args(["tag", "v1.2.3", "-m", "release v1.2.3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tagging 'v1.2.3'"));

    let app = fixture.project_dir("app");
    let frozen = app.join(".git-ws").join("manifests").join("v1.2.3.toml");
    assert!(frozen.exists());
    let frozen_content = std::fs::read_to_string(&frozen).unwrap();
    assert!(frozen_content.contains("name = \"lib\""));

    // The frozen manifest is part of the main project's history.
    assert_eq!(git_stdout(&app, &["tag", "--list", "v1.2.3"]), "v1.2.3");
    let last_message = git_stdout(&app, &["log", "-1", "--format=%s"]);
    assert_eq!(last_message, "release v1.2.3");

    // Tagging the same name twice fails.
    fixture
        .cmd()
        .args(["tag", "v1.2.3", "-m", "again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    // The lib moves on after the release.
    let frozen_lib_sha = git_stdout(&fixture.project_dir("lib"), &["rev-parse", "HEAD"]);
    fixture.commit_files("lib", &[("lib.txt", "v2")], "post-release work");
    fixture.cmd().arg("update").assert().success();
    assert_eq!(
        std::fs::read_to_string(fixture.project_dir("lib").join("lib.txt")).unwrap(),
        "v2"
    );

    // Checking out the tag restores the frozen state on update.
    git(&app, &["checkout", "v1.2.3"]);
    fixture
        .cmd()
        .args(["update", "--skip-main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using frozen manifest"));
    assert_eq!(
        git_stdout(&fixture.project_dir("lib"), &["rev-parse", "HEAD"]),
        frozen_lib_sha
    );
    assert_eq!(
        std::fs::read_to_string(fixture.project_dir("lib").join("lib.txt")).unwrap(),
        "v1"
    );
}
