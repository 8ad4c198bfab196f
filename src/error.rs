//! Error handling types for the git-ws application.

use std::path::PathBuf;

use thiserror::Error;

/// Manifest validation failure details.
///
/// Produced while loading or validating a `git-ws.toml` file. Each variant
/// names the offending field or value so callers can point the user at the
/// exact entry to fix.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestErrorKind {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("field '{field}' has the wrong type, expected {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("required field '{field}' is missing")]
    MissingRequired { field: String },

    #[error("remote '{name}' is declared more than once")]
    DuplicateRemote { name: String },

    #[error("remote '{name}' is not declared in the 'remotes' section")]
    UnknownRemote { name: String },

    #[error("dependency '{name}': 'remote' and 'url' are mutually exclusive")]
    ConflictingUrlSources { name: String },

    #[error("dependency '{name}': 'sub-url' requires 'remote'")]
    InvalidSubUrl { name: String },

    #[error("'{value}' is not a valid identifier")]
    BadIdentifier { value: String },

    #[error("{message}")]
    Syntax { message: String },
}

/// Git operation kinds, used to classify [`Error::GitOperationFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitOp {
    Clone,
    Checkout,
    Pull,
    Fetch,
    Merge,
    Rebase,
    SubmoduleUpdate,
    Status,
    RevParse,
    RemoteUrl,
    Branch,
    Describe,
    Tag,
    Add,
    Commit,
    Stash,
    RevList,
    Other,
}

impl std::fmt::Display for GitOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GitOp::Clone => "clone",
            GitOp::Checkout => "checkout",
            GitOp::Pull => "pull",
            GitOp::Fetch => "fetch",
            GitOp::Merge => "merge",
            GitOp::Rebase => "rebase",
            GitOp::SubmoduleUpdate => "submodule update",
            GitOp::Status => "status",
            GitOp::RevParse => "rev-parse",
            GitOp::RemoteUrl => "remote get-url",
            GitOp::Branch => "branch",
            GitOp::Describe => "describe",
            GitOp::Tag => "tag",
            GitOp::Add => "add",
            GitOp::Commit => "commit",
            GitOp::Stash => "stash",
            GitOp::RevList => "rev-list",
            GitOp::Other => "git",
        };
        f.write_str(name)
    }
}

/// Reason a clone may not be pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    Untracked,
    Staged,
    Unpushed,
    Stashed,
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            PruneReason::Untracked => "untracked files",
            PruneReason::Staged => "staged changes",
            PruneReason::Unpushed => "unpushed commits",
            PruneReason::Stashed => "stash entries",
        };
        f.write_str(reason)
    }
}

/// Main error type for git-ws operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("manifest has not been found at '{}'", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("manifest '{}' is broken: {kind}", path.display())]
    ManifestInvalid {
        path: PathBuf,
        kind: ManifestErrorKind,
    },

    #[error(
        "manifest '{}' has schema version {version}, this tool supports up to {supported}",
        path.display()
    )]
    ManifestSchemaTooNew {
        path: PathBuf,
        version: i64,
        supported: i64,
    },

    #[error("manifest already exists at '{}'", path.display())]
    ManifestExists { path: PathBuf },

    #[error("cannot resolve URL for '{project}': {reason}")]
    UrlResolutionFailed { project: String, reason: String },

    #[error("git {op} failed in '{}': {stderr}", path.display())]
    GitOperationFailed {
        op: GitOp,
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("workspace has not been initialized yet")]
    WorkspaceNotFound,

    #[error(
        "workspace has already been initialized at '{}' with main repo at '{}'",
        path.display(),
        main_path.display()
    )]
    WorkspaceExists { path: PathBuf, main_path: PathBuf },

    #[error("workspace '{}' is not an empty directory", path.display())]
    WorkspaceNotEmpty { path: PathBuf },

    #[error("'{}' exists but is not a git clone", path.display())]
    NotAGitClone { path: PathBuf },

    #[error("git clone '{}' is missing", path.display())]
    GitCloneMissing { path: PathBuf },

    #[error("git clone '{}' has no remote 'origin'", path.display())]
    NoOrigin { path: PathBuf },

    #[error("'{}' is located outside the workspace '{}'", path.display(), workspace.display())]
    PathOutsideWorkspace { workspace: PathBuf, path: PathBuf },

    #[error("{reason} at '{}', use --force to override", path.display())]
    ForceRequired { path: PathBuf, reason: String },

    #[error("refusing to prune '{}': {reason}", path.display())]
    PruneRefused { path: PathBuf, reason: PruneReason },

    #[error("copy destination '{}' was modified, use --force to overwrite", dest.display())]
    CopyFileModified { dest: PathBuf },

    #[error("tag '{name}' already exists")]
    TagExists { name: String },

    #[error("cannot lock workspace '{}': {message}", path.display())]
    Lock { path: PathBuf, message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid group filter '{expr}': {reason}")]
    InvalidGroupFilter { expr: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for git-ws operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes used by the command line interface.
pub mod exit_codes {
    /// Command finished without failures.
    pub const SUCCESS: i32 = 0;
    /// Recoverable failure (validation error, partial materialize).
    pub const ERROR: i32 = 1;
    /// User error (bad flags); also emitted by clap itself.
    pub const USAGE: i32 = 2;
}
