//! End-to-end tests for the `update` command: cloning, revision sync,
//! first-wins overrides, group filters and pruning.

mod common;

use common::{git, git_stdout, GitFixture};
use predicates::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_clones_sibling_at_tag() {
    let fixture = GitFixture::new();
    fixture.create_repo("mylib", &[("lib.txt", "lib")]);
    fixture.tag_repo("mylib", "v1.0");
    fixture.commit_files("mylib", &[("lib.txt", "lib v2")], "later work");
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"mylib\"\nrevision = \"v1.0\"\n",
        )],
    );

    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();

    let mylib = fixture.project_dir("mylib");
    assert!(mylib.join("lib.txt").exists());
    assert_eq!(
        git_stdout(&mylib, &["describe", "--exact-match", "--tags"]),
        "v1.0"
    );
    assert_eq!(
        std::fs::read_to_string(mylib.join("lib.txt")).unwrap(),
        "lib"
    );
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_is_idempotent() {
    let fixture = GitFixture::new();
    fixture.create_repo("mylib", &[("lib.txt", "lib")]);
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"mylib\"\nrevision = \"main\"\n",
        )],
    );

    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();
    fixture.cmd().arg("update").assert().success();
    assert!(fixture.project_dir("mylib").join("lib.txt").exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_transitive_dependency_with_override() {
    let fixture = GitFixture::new();

    fixture.create_repo("BarLib", &[("bar.txt", "bar v42")]);
    fixture.tag_repo("BarLib", "v42");
    fixture.commit_files("BarLib", &[("bar.txt", "bar v44")], "v44 content");
    fixture.tag_repo("BarLib", "v44");

    fixture.create_repo(
        "FooLib",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"BarLib\"\nrevision = \"v42\"\n",
        )],
    );
    fixture.tag_repo("FooLib", "v2.4.0");
    fixture.create_repo(
        "BazLib",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"BarLib\"\nrevision = \"v44\"\n",
        )],
    );
    fixture.tag_repo("BazLib", "v5.6.7");

    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            concat!(
                "[[dependencies]]\nname = \"FooLib\"\nrevision = \"v2.4.0\"\n",
                "[[dependencies]]\nname = \"BazLib\"\nrevision = \"v5.6.7\"\n",
            ),
        )],
    );

    fixture.clone_and_init(&url);
    // Resolution interleaves with cloning, so one run reaches the whole
    // transitive graph.
    fixture
        .cmd()
        .arg("update")
        .assert()
        .success()
        .stderr(predicate::str::contains("DUPLICATE BarLib"));

    // First-wins: FooLib's v42 beats BazLib's v44.
    let barlib = fixture.project_dir("BarLib");
    assert_eq!(
        git_stdout(&barlib, &["describe", "--exact-match", "--tags"]),
        "v42"
    );
    assert_eq!(
        std::fs::read_to_string(barlib.join("bar.txt")).unwrap(),
        "bar v42"
    );
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_group_filter_selects_optional_dependency() {
    let fixture = GitFixture::new();
    fixture.create_repo("IOLib", &[("io.txt", "io")]);
    fixture.create_repo("SimpleUT", &[("ut.txt", "ut")]);
    fixture.create_repo(
        "PrintLib",
        &[(
            "git-ws.toml",
            concat!(
                "[[dependencies]]\nname = \"IOLib\"\nrevision = \"main\"\n",
                "[[dependencies]]\nname = \"SimpleUT\"\nrevision = \"main\"\ngroups = [\"dev\"]\n",
            ),
        )],
    );
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"PrintLib\"\nrevision = \"main\"\n",
        )],
    );

    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();

    assert!(fixture.project_dir("PrintLib").exists());
    assert!(fixture.project_dir("IOLib").exists());
    assert!(!fixture.project_dir("SimpleUT").exists());

    fixture
        .cmd()
        .args(["update", "--group-filter", "+dev"])
        .assert()
        .success();
    assert!(fixture.project_dir("SimpleUT").exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_prune() {
    let fixture = GitFixture::new();
    fixture.create_repo("lib1", &[("1.txt", "1")]);
    fixture.create_repo("lib2", &[("2.txt", "2")]);
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            concat!(
                "[[dependencies]]\nname = \"lib1\"\nrevision = \"main\"\n",
                "[[dependencies]]\nname = \"lib2\"\nrevision = \"main\"\n",
            ),
        )],
    );

    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();
    assert!(fixture.project_dir("lib2").exists());

    // Drop lib2 from the manifest (uncommitted edit in the main clone).
    std::fs::write(
        fixture.project_dir("app").join("git-ws.toml"),
        "[[dependencies]]\nname = \"lib1\"\nrevision = \"main\"\n",
    )
    .unwrap();

    // Clean lib2: pruned.
    fixture
        .cmd()
        .args(["update", "--skip-main", "--prune"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lib2 (OBSOLETE)"));
    assert!(!fixture.project_dir("lib2").exists());

    // Reintroduce lib2 with an untracked file: prune refuses.
    git(
        &fixture.workspace_dir(),
        &["clone", &fixture.repo_url("lib2"), "lib2"],
    );
    std::fs::write(fixture.project_dir("lib2").join("scratch.txt"), "wip").unwrap();
    fixture
        .cmd()
        .args(["update", "--skip-main", "--prune"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("untracked files"));
    assert!(fixture.project_dir("lib2").exists());

    // --force removes it anyway.
    fixture
        .cmd()
        .args(["update", "--skip-main", "--prune", "--force"])
        .assert()
        .success();
    assert!(!fixture.project_dir("lib2").exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_moves_clone_to_new_revision() {
    let fixture = GitFixture::new();
    fixture.create_repo("mylib", &[("lib.txt", "v1")]);
    fixture.tag_repo("mylib", "v1.0");
    fixture.commit_files("mylib", &[("lib.txt", "v2")], "v2");
    fixture.tag_repo("mylib", "v2.0");

    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"mylib\"\nrevision = \"v1.0\"\n",
        )],
    );
    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();
    assert_eq!(
        std::fs::read_to_string(fixture.project_dir("mylib").join("lib.txt")).unwrap(),
        "v1"
    );

    // Bump the manifest revision; update fetches and checks out.
    std::fs::write(
        fixture.project_dir("app").join("git-ws.toml"),
        "[[dependencies]]\nname = \"mylib\"\nrevision = \"v2.0\"\n",
    )
    .unwrap();
    fixture
        .cmd()
        .args(["update", "--skip-main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checking out 'v2.0'"));
    assert_eq!(
        std::fs::read_to_string(fixture.project_dir("mylib").join("lib.txt")).unwrap(),
        "v2"
    );
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_reports_not_a_git_clone() {
    let fixture = GitFixture::new();
    fixture.create_repo("mylib", &[("lib.txt", "lib")]);
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            "[[dependencies]]\nname = \"mylib\"\nrevision = \"main\"\n",
        )],
    );
    fixture.clone_and_init(&url);

    // Occupy the target path with a plain directory.
    std::fs::create_dir(fixture.project_dir("mylib")).unwrap();
    std::fs::write(fixture.project_dir("mylib").join("junk"), "junk").unwrap();

    fixture
        .cmd()
        .args(["update", "--skip-main"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git clone"));

    // With --force the target is skipped and update succeeds.
    fixture
        .cmd()
        .args(["update", "--skip-main", "--force"])
        .assert()
        .success();
    assert!(fixture.project_dir("mylib").join("junk").exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_linkfiles_and_copyfiles() {
    let fixture = GitFixture::new();
    fixture.create_repo("mylib", &[("scripts/env.sh", "env"), ("rules.mk", "rules")]);
    let url = fixture.create_repo(
        "app",
        &[(
            "git-ws.toml",
            concat!(
                "[[dependencies]]\nname = \"mylib\"\nrevision = \"main\"\n",
                "[[dependencies.linkfiles]]\nsrc = \"scripts/env.sh\"\ndest = \"env.sh\"\n",
                "[[dependencies.copyfiles]]\nsrc = \"rules.mk\"\ndest = \"rules.mk\"\n",
            ),
        )],
    );

    fixture.clone_and_init(&url);
    fixture.cmd().arg("update").assert().success();

    assert_eq!(
        std::fs::read_to_string(fixture.workspace_dir().join("rules.mk")).unwrap(),
        "rules"
    );
    let link = fixture.workspace_dir().join("env.sh");
    assert_eq!(std::fs::read_to_string(link).unwrap(), "env");
}
