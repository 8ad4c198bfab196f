//! Checkout command implementation
//!
//! Without arguments, every clone is reset to its manifest-declared
//! revision (cloning what is missing). With file paths, only those paths
//! are checked out within the clones containing them.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use git_ws::git::Git;
use git_ws::materializer::Materializer;
use git_ws::output::OutputConfig;
use git_ws::resolver::Resolver;
use git_ws::transform::frozen_manifest_for_head;
use git_ws::Error;

use super::{find_workspace, IterArgs};

/// Arguments for the checkout command
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    /// Limit the checkout to these files
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub iter: IterArgs,
}

/// Execute the checkout command
pub fn execute(args: CheckoutArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let workspace = find_workspace()?;
    let _lock = workspace.lock()?;

    let manifest = args
        .iter
        .manifest
        .clone()
        .or_else(|| frozen_manifest_for_head(&workspace));

    if args.paths.is_empty() {
        let report =
            Materializer::new(&workspace, &output).checkout(args.iter.filters()?, manifest)?;
        if !report.ok() {
            anyhow::bail!("checkout failed for {} project(s)", report.failures.len());
        }
        return Ok(());
    }

    // Path-limited checkout: route every given file to the clone
    // containing it.
    let resolution = Resolver::new(&workspace)
        .with_cli_filters(args.iter.filters()?)
        .with_manifest(manifest)
        .resolve()?;

    let cwd = std::env::current_dir()?;
    for path in &args.paths {
        let absolute = if path.is_absolute() {
            path.clone()
        } else {
            cwd.join(path)
        };
        let workspace_rel = absolute
            .strip_prefix(workspace.root())
            .map_err(|_| Error::PathOutsideWorkspace {
                workspace: workspace.root().to_path_buf(),
                path: absolute.clone(),
            })?
            .to_path_buf();

        let project = resolution
            .projects
            .iter()
            .filter(|project| workspace_rel.starts_with(&project.path))
            .max_by_key(|project| project.path.len())
            .ok_or_else(|| Error::GitCloneMissing {
                path: absolute.clone(),
            })?;

        let clone_rel = workspace_rel
            .strip_prefix(&project.path)
            .expect("prefix checked above")
            .to_path_buf();
        output.banner(&project.info());
        let git = Git::new(workspace.project_path(&project.path));
        git.checkout_paths(project.revision.as_deref(), &[clone_rel])?;
    }
    Ok(())
}
