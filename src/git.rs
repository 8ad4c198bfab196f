//! # Git Driver
//!
//! A lean programmatic interface to the external `git` executable, with
//! just the operations the materializer and the transform commands need.
//! Every operation returns a structured result; stderr is captured and
//! carried inside [`Error::GitOperationFailed`], never parsed beyond that.
//!
//! Operations within one clone directory run sequentially through a single
//! [`Git`] value, which keeps git's own locking happy.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::error::{Error, GitOp, Result};

/// Status letter of one side (index or working tree) in porcelain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Untracked,
    Ignored,
    Unmodified,
    Modified,
    TypeChanged,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
}

impl State {
    fn from_char(ch: char) -> Option<State> {
        Some(match ch {
            '?' => State::Untracked,
            '!' => State::Ignored,
            ' ' => State::Unmodified,
            'M' => State::Modified,
            'T' => State::TypeChanged,
            'A' => State::Added,
            'D' => State::Deleted,
            'R' => State::Renamed,
            'C' => State::Copied,
            'U' => State::Unmerged,
            _ => return None,
        })
    }

    fn as_char(self) -> char {
        match self {
            State::Untracked => '?',
            State::Ignored => '!',
            State::Unmodified => ' ',
            State::Modified => 'M',
            State::TypeChanged => 'T',
            State::Added => 'A',
            State::Deleted => 'D',
            State::Renamed => 'R',
            State::Copied => 'C',
            State::Unmerged => 'U',
        }
    }
}

/// One `git status --porcelain=v1` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub index: State,
    pub work: State,
    pub path: PathBuf,
    pub orig_path: Option<PathBuf>,
}

impl FileStatus {
    /// Parse a porcelain v1 line like `?? file.txt` or `R  src -> dest`.
    pub fn parse(line: &str) -> Option<FileStatus> {
        let mut chars = line.chars();
        let index = State::from_char(chars.next()?)?;
        let work = State::from_char(chars.next()?)?;
        let rest = line.get(3..)?;
        let (orig_path, path) = match rest.split_once(" -> ") {
            Some((orig, dest)) => (Some(PathBuf::from(orig)), PathBuf::from(dest)),
            None => (None, PathBuf::from(rest)),
        };
        Some(FileStatus {
            index,
            work,
            path,
            orig_path,
        })
    }

    /// Render the line with `base` prepended to the path(s).
    pub fn with_base(&self, base: &Path) -> String {
        let index = self.index.as_char();
        let work = self.work.as_char();
        match &self.orig_path {
            Some(orig) => format!(
                "{index}{work} {} -> {}",
                base.join(orig).display(),
                base.join(&self.path).display()
            ),
            None => format!("{index}{work} {}", base.join(&self.path).display()),
        }
    }

    /// Whether the index side carries staged changes.
    pub fn has_index_changes(&self) -> bool {
        !matches!(
            self.index,
            State::Unmodified | State::Ignored | State::Untracked
        )
    }
}

/// Handle on one (potential) git clone directory.
#[derive(Debug, Clone)]
pub struct Git {
    path: PathBuf,
}

impl Git {
    pub fn new(path: impl Into<PathBuf>) -> Git {
        Git { path: path.into() }
    }

    /// Directory this handle operates on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Determine the top directory of the clone containing `path`.
    pub fn find_root(path: &Path) -> Result<PathBuf> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(path)
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .output()?;
        if !output.status.success() {
            return Err(Error::NotAGitClone {
                path: path.to_path_buf(),
            });
        }
        let top = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(PathBuf::from(top))
    }

    /// Check if the directory exists and is the top of a git clone.
    pub fn is_cloned(&self) -> bool {
        if !self.path.is_dir() {
            return false;
        }
        let output = Command::new("git")
            .args(["rev-parse", "--show-cdup"])
            .current_dir(&self.path)
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .output();
        match output {
            Ok(output) => {
                output.status.success() && output.stdout.iter().all(|b| b.is_ascii_whitespace())
            }
            Err(_) => false,
        }
    }

    /// Clone `url` into this handle's directory.
    ///
    /// With a `revision`, the clone is made without checkout and the
    /// revision is checked out explicitly afterwards, which is faster than
    /// cloning the default branch first. `depth` requests a shallow clone.
    pub fn clone(&self, url: &str, revision: Option<&str>, depth: Option<u32>) -> Result<()> {
        debug!(
            "git clone {url} -> {} (revision={revision:?}, depth={depth:?})",
            self.path.display()
        );
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut args: Vec<String> = vec!["clone".to_string()];
        if let Some(depth) = depth {
            args.push(format!("--depth={depth}"));
        }
        if revision.is_some() {
            args.push("--no-checkout".to_string());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args.push(self.path.to_string_lossy().into_owned());

        let output = Command::new("git")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            return Err(self.op_error(GitOp::Clone, &output));
        }
        if let Some(revision) = revision {
            self.checkout(Some(revision))?;
        }
        Ok(())
    }

    pub fn fetch(&self) -> Result<()> {
        self.run(GitOp::Fetch, &["fetch"]).map(|_| ())
    }

    pub fn pull(&self) -> Result<()> {
        self.run(GitOp::Pull, &["pull"]).map(|_| ())
    }

    pub fn merge(&self) -> Result<()> {
        self.run(GitOp::Merge, &["merge"]).map(|_| ())
    }

    pub fn rebase(&self) -> Result<()> {
        self.run(GitOp::Rebase, &["rebase"]).map(|_| ())
    }

    pub fn checkout(&self, revision: Option<&str>) -> Result<()> {
        match revision {
            Some(revision) => self.run(GitOp::Checkout, &["checkout", revision]),
            None => self.run(GitOp::Checkout, &["checkout"]),
        }
        .map(|_| ())
    }

    /// Check out `revision` limited to `paths`.
    pub fn checkout_paths(&self, revision: Option<&str>, paths: &[PathBuf]) -> Result<()> {
        let mut args: Vec<String> = vec!["checkout".to_string()];
        if let Some(revision) = revision {
            args.push(revision.to_string());
        }
        args.push("--".to_string());
        args.extend(paths.iter().map(|path| path.to_string_lossy().into_owned()));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(GitOp::Checkout, &refs).map(|_| ())
    }

    pub fn submodule_update(&self) -> Result<()> {
        self.run(
            GitOp::SubmoduleUpdate,
            &["submodule", "update", "--init", "--recursive"],
        )
        .map(|_| ())
    }

    /// Currently checked out branch, if HEAD is not detached.
    pub fn branch(&self) -> Result<Option<String>> {
        self.run_query(GitOp::Branch, &["branch", "--show-current"])
    }

    /// Tag pointing exactly at HEAD, if any.
    pub fn tag_at_head(&self) -> Result<Option<String>> {
        Ok(self
            .run_query(GitOp::Describe, &["describe", "--exact-match", "--tags"])
            .unwrap_or(None))
    }

    /// Commit SHA of HEAD. `None` for an empty repository.
    pub fn head_sha(&self) -> Result<Option<String>> {
        Ok(self
            .run_query(GitOp::RevParse, &["rev-parse", "HEAD"])
            .unwrap_or(None))
    }

    /// Best description of the current revision: tag, then branch, then
    /// SHA; `None` for an empty repository.
    pub fn revision(&self) -> Result<Option<String>> {
        if let Some(tag) = self.tag_at_head()? {
            return Ok(Some(tag));
        }
        if let Some(branch) = self.branch()? {
            return Ok(Some(branch));
        }
        self.head_sha()
    }

    /// URL of the `origin` remote, if configured.
    pub fn remote_url(&self) -> Result<Option<String>> {
        Ok(self
            .run_query(GitOp::RemoteUrl, &["remote", "get-url", "origin"])
            .unwrap_or(None))
    }

    /// Porcelain v1 status lines.
    pub fn status(&self) -> Result<Vec<FileStatus>> {
        let raw = self
            .run_query(GitOp::Status, &["status", "--porcelain=v1"])?
            .unwrap_or_default();
        Ok(raw.lines().filter_map(FileStatus::parse).collect())
    }

    /// Clone has neither local changes nor commits ahead of its upstream.
    pub fn is_clean(&self) -> Result<bool> {
        let raw = self
            .run_query(GitOp::Status, &["status", "--porcelain=v1", "--branch"])?
            .unwrap_or_default();
        let mut lines = raw.lines();
        if let Some(branch_line) = lines.next() {
            // "## main...origin/main [ahead 1]" marks unpushed commits.
            if branch_line.contains('[') {
                return Ok(false);
            }
        }
        Ok(lines.next().is_none())
    }

    pub fn has_untracked(&self) -> Result<bool> {
        Ok(self
            .status()?
            .iter()
            .any(|status| status.index == State::Untracked))
    }

    pub fn has_staged(&self) -> Result<bool> {
        Ok(self.status()?.iter().any(FileStatus::has_index_changes))
    }

    /// Commits on any local branch which no remote branch contains.
    pub fn has_unpushed(&self) -> Result<bool> {
        let count = self
            .run_query(
                GitOp::RevList,
                &["rev-list", "--branches", "--not", "--remotes", "--count"],
            )?
            .unwrap_or_default();
        Ok(count.trim().parse::<u64>().unwrap_or(0) > 0)
    }

    pub fn has_stash(&self) -> Result<bool> {
        let raw = self
            .run_query(GitOp::Stash, &["stash", "list"])?
            .unwrap_or_default();
        Ok(!raw.is_empty())
    }

    pub fn add(&self, paths: &[PathBuf]) -> Result<()> {
        let mut args: Vec<String> = vec!["add".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|path| path.to_string_lossy().into_owned()));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(GitOp::Add, &refs).map(|_| ())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(GitOp::Commit, &["commit", "-m", message]).map(|_| ())
    }

    pub fn tag(&self, name: &str, message: Option<&str>) -> Result<()> {
        match message {
            Some(message) => self.run(GitOp::Tag, &["tag", name, "-m", message]),
            None => self.run(GitOp::Tag, &["tag", name]),
        }
        .map(|_| ())
    }

    pub fn tag_exists(&self, name: &str) -> Result<bool> {
        let raw = self
            .run_query(GitOp::Tag, &["tag", "--list", name])?
            .unwrap_or_default();
        Ok(!raw.is_empty())
    }

    /// Run an arbitrary git command in the clone with inherited stdio,
    /// for `foreach`-style passthrough. Returns the exit code.
    pub fn run_passthrough(&self, args: &[String]) -> Result<i32> {
        debug!("git {} (cwd={})", args.join(" "), self.path.display());
        let status = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .status()?;
        Ok(status.code().unwrap_or(-1))
    }

    /// Run an arbitrary command in the clone with inherited stdio.
    pub fn run_command_passthrough(&self, command: &[String]) -> Result<i32> {
        let (program, args) = command.split_first().ok_or_else(|| Error::Config {
            message: "empty command".to_string(),
        })?;
        debug!("{} {} (cwd={})", program, args.join(" "), self.path.display());
        let status = Command::new(program)
            .args(args)
            .current_dir(&self.path)
            .status()?;
        Ok(status.code().unwrap_or(-1))
    }

    /// Run git, failing with a structured error on non-zero exit.
    fn run(&self, op: GitOp, args: &[&str]) -> Result<String> {
        debug!("git {} (cwd={})", args.join(" "), self.path.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            return Err(self.op_error(op, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a git query; non-zero exit or empty output yields `Ok(None)`.
    fn run_query(&self, op: GitOp, args: &[&str]) -> Result<Option<String>> {
        debug!("git {} (cwd={})", args.join(" "), self.path.display());
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if !output.status.success() {
            return Err(self.op_error(op, &output));
        }
        let raw = String::from_utf8_lossy(&output.stdout);
        let trimmed = raw.trim_end();
        if trimmed.is_empty() {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }

    fn op_error(&self, op: GitOp, output: &std::process::Output) -> Error {
        Error::GitOperationFailed {
            op,
            path: self.path.clone(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}
