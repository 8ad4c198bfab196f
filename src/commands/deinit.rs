//! Deinit command implementation
//!
//! Removes the `.git-ws/` metadata folder. The clones themselves are left
//! untouched.

use anyhow::Result;
use clap::Args;

use git_ws::output::OutputConfig;

use super::find_workspace;

/// Arguments for the deinit command
#[derive(Args, Debug)]
pub struct DeinitArgs {}

/// Execute the deinit command
pub fn execute(_args: DeinitArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let workspace = find_workspace()?;
    let root = workspace.root().to_path_buf();
    workspace.deinit()?;
    output.action(&format!("Workspace at '{}' deinitialized.", root.display()));
    Ok(())
}
