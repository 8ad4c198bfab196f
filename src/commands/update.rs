//! Update command implementation
//!
//! Runs the resolver and the materializer: missing clones are created,
//! existing clones are moved to their manifest revision and pulled (or
//! rebased), link/copy files are refreshed and `--prune` removes clones
//! which left the manifest.
//!
//! When the main clone sits exactly on a tag with a frozen manifest under
//! `.git-ws/manifests/`, that manifest supersedes the live one.

use anyhow::Result;
use clap::Args;

use git_ws::materializer::{Materializer, UpdateOptions};
use git_ws::output::OutputConfig;
use git_ws::transform::frozen_manifest_for_head;

use super::{find_workspace, IterArgs};

/// Arguments for the update command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub iter: IterArgs,

    /// Do not touch the main project
    #[arg(long)]
    pub skip_main: bool,

    /// Rebase instead of pull/merge on branches
    #[arg(long)]
    pub rebase: bool,

    /// Remove clones which are no longer part of the manifest
    #[arg(long)]
    pub prune: bool,

    /// Override safety checks
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the update command
pub fn execute(args: UpdateArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let workspace = find_workspace()?;
    let _lock = workspace.lock()?;

    let mut manifest = args.iter.manifest.clone();
    if manifest.is_none() {
        if let Some(frozen) = frozen_manifest_for_head(&workspace) {
            output.action(&format!(
                "Using frozen manifest '{}'.",
                frozen.display()
            ));
            manifest = Some(frozen);
        }
    }

    let options = UpdateOptions {
        skip_main: args.skip_main,
        rebase: args.rebase,
        prune: args.prune,
        force: args.force,
        project_paths: args.iter.project.clone(),
        group_filters: args.iter.filters()?,
        manifest,
    };

    let report = Materializer::new(&workspace, &output).update(&options)?;
    if !report.ok() {
        anyhow::bail!("update failed for {} project(s)", report.failures.len());
    }
    Ok(())
}
