//! Shared test utilities for end-to-end tests.
//!
//! Provides a fixture which builds local git repositories (served via
//! `file://` URLs) and a workspace directory, so the full clone/update
//! cycle runs without any network access.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::GitFixture;
//!
//! #[test]
//! #[cfg_attr(not(feature = "integration-tests"), ignore)]
//! fn test_example() {
//!     let fixture = GitFixture::new();
//!     fixture.create_repo("app", &[("git-ws.toml", "...")]);
//!     // ...
//! }
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

/// Run git with `args` in `dir`, asserting success.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Run git with `args` in `dir` and return trimmed stdout.
#[allow(dead_code)]
pub fn git_stdout(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A temp directory with `remotes/` (clone sources) and `workspace/`.
pub struct GitFixture {
    pub temp: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GitFixture {
    pub fn new() -> GitFixture {
        let temp = assert_fs::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("remotes")).unwrap();
        std::fs::create_dir_all(temp.path().join("workspace")).unwrap();
        GitFixture { temp }
    }

    /// Directory all commands run in.
    pub fn workspace_dir(&self) -> PathBuf {
        self.temp.path().join("workspace")
    }

    /// Path of a clone-source repository.
    pub fn repo_dir(&self, name: &str) -> PathBuf {
        self.temp.path().join("remotes").join(name)
    }

    /// `file://` URL of a clone-source repository.
    pub fn repo_url(&self, name: &str) -> String {
        format!("file://{}", self.repo_dir(name).display())
    }

    /// Create a repository under `remotes/` with one initial commit.
    pub fn create_repo(&self, name: &str, files: &[(&str, &str)]) -> String {
        let dir = self.repo_dir(name);
        std::fs::create_dir_all(&dir).unwrap();
        git(&dir, &["init", "-b", "main"]);
        git(&dir, &["config", "user.email", "test@example.com"]);
        git(&dir, &["config", "user.name", "Test"]);
        // Allow clones of this repository to pull from it while a branch
        // is checked out.
        git(&dir, &["config", "receive.denyCurrentBranch", "ignore"]);
        self.commit_files(name, files, "initial commit");
        self.repo_url(name)
    }

    /// Add/overwrite files in a repository and commit them.
    pub fn commit_files(&self, name: &str, files: &[(&str, &str)], message: &str) {
        let dir = self.repo_dir(name);
        for (rel, content) in files {
            let path = dir.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        git(&dir, &["add", "-A"]);
        git(&dir, &["commit", "--allow-empty", "-m", message]);
    }

    /// Tag the current head of a repository.
    pub fn tag_repo(&self, name: &str, tag: &str) {
        git(&self.repo_dir(name), &["tag", tag]);
    }

    /// A `git-ws` command running inside the workspace directory.
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("git-ws").unwrap();
        cmd.current_dir(self.workspace_dir());
        cmd.env("NO_COLOR", "1");
        cmd.env_remove("GIT_WS_MANIFEST_PATH");
        cmd.env_remove("GIT_WS_GROUP_FILTERS");
        cmd.env_remove("GIT_WS_CLONE_DEPTH");
        cmd
    }

    /// A `git-ws` command running in a subdirectory of the workspace.
    pub fn cmd_in(&self, rel: &str) -> assert_cmd::Command {
        let mut cmd = self.cmd();
        cmd.current_dir(self.workspace_dir().join(rel));
        cmd
    }

    /// Clone the `app` repository into the workspace and initialize the
    /// workspace around it.
    pub fn clone_and_init(&self, url: &str) {
        self.cmd()
            .args(["clone", url])
            .assert()
            .success();
    }

    /// Path of a project inside the workspace.
    pub fn project_dir(&self, rel: &str) -> PathBuf {
        self.workspace_dir().join(rel)
    }
}
