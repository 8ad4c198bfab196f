//! Tag command implementation
//!
//! Freezes the workspace into `.git-ws/manifests/<name>.toml` inside the
//! main project, commits that file and creates the git tag. Checking out
//! the tag later reproduces the workspace exactly as it was frozen.

use anyhow::Result;
use clap::Args;

use git_ws::output::OutputConfig;
use git_ws::transform::tag_workspace;

use super::find_workspace;

/// Arguments for the tag command
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Tag name
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Tag and commit message
    #[arg(short, long, value_name = "MSG")]
    pub message: String,
}

/// Execute the tag command
pub fn execute(args: TagArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let workspace = find_workspace()?;
    let _lock = workspace.lock()?;
    let path = tag_workspace(&workspace, &output, &args.name, &args.message)?;
    output.action(&format!("Frozen manifest written to '{}'.", path.display()));
    Ok(())
}
