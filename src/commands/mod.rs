//! Command implementations for the git-ws CLI.
//!
//! Each module implements one subcommand (or one closely related group of
//! subcommands) with an `Args` struct parsed by clap and an `execute`
//! function which wires the library together.

pub mod checkout;
pub mod clone;
pub mod default;
pub mod deinit;
pub mod dep;
pub mod foreach;
pub mod group_filters;
pub mod info;
pub mod init;
pub mod manifest;
pub mod remote;
pub mod tag;
pub mod update;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use git_ws::groups::GroupFilter;
use git_ws::workspace::Workspace;

/// Options shared by every command which iterates resolved projects.
#[derive(Args, Debug, Clone, Default)]
pub struct IterArgs {
    /// Limit to projects whose workspace path matches PATTERN (glob).
    #[arg(short = 'P', long = "project", value_name = "PATTERN")]
    pub project: Vec<String>,

    /// Group filter expression like '+test' or '-doc@third_party'.
    /// Repeatable; highest precedence.
    #[arg(
        short = 'G',
        long = "group-filter",
        value_name = "FILTER",
        allow_hyphen_values = true,
        env = "GIT_WS_GROUP_FILTERS",
        value_delimiter = ','
    )]
    pub group_filter: Vec<String>,

    /// Alternative manifest path, relative to the main project.
    #[arg(long, value_name = "PATH", env = "GIT_WS_MANIFEST_PATH")]
    pub manifest: Option<PathBuf>,
}

impl IterArgs {
    /// Parse the `--group-filter` expressions.
    pub fn filters(&self) -> Result<Vec<GroupFilter>> {
        Ok(GroupFilter::parse_list(&self.group_filter)?)
    }
}

/// Open the workspace containing the current working directory.
pub fn find_workspace() -> Result<Workspace> {
    Ok(Workspace::find(None)?)
}
