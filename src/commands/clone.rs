//! Clone command implementation
//!
//! Clones the main repository into an empty workspace directory and
//! initializes the workspace metadata around it. With `--update`, the
//! dependencies are materialized right away.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use git_ws::git::Git;
use git_ws::manifest::MANIFEST_PATH_DEFAULT;
use git_ws::materializer::{Materializer, UpdateOptions};
use git_ws::output::OutputConfig;
use git_ws::settings::AppSettings;
use git_ws::workspace::Workspace;
use git_ws::Error;

/// Arguments for the clone command
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// URL of the main repository
    #[arg(value_name = "URL")]
    pub url: String,

    /// Workspace directory (defaults to the current directory)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Manifest path, relative to the main project
    #[arg(
        short = 'M',
        long,
        value_name = "PATH",
        env = "GIT_WS_MANIFEST_PATH"
    )]
    pub manifest: Option<PathBuf>,

    /// Group filter expression, repeatable (stored in the workspace)
    #[arg(
        short = 'G',
        long = "group-filter",
        value_name = "FILTER",
        allow_hyphen_values = true
    )]
    pub group_filter: Vec<String>,

    /// Shallow clone depth for dependency clones
    #[arg(long, value_name = "NUM", env = "GIT_WS_CLONE_DEPTH")]
    pub depth: Option<u32>,

    /// Revision of the main repository to check out
    #[arg(long, value_name = "REVISION")]
    pub revision: Option<String>,

    /// Clone into a non-empty directory
    #[arg(short, long)]
    pub force: bool,

    /// Run update right away
    #[arg(short, long)]
    pub update: bool,
}

/// Execute the clone command
pub fn execute(args: CloneArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let settings = AppSettings::load();

    let root = match &args.path {
        Some(path) => {
            std::fs::create_dir_all(path)?;
            path.clone()
        }
        None => std::env::current_dir()?,
    };
    if !args.force && root.read_dir()?.next().is_some() {
        return Err(Error::WorkspaceNotEmpty { path: root }.into());
    }

    let name = clone_name(&args.url);
    output.banner(&name);
    output.action(&format!("Cloning '{}'.", args.url));
    let main_path = root.join(&name);
    Git::new(&main_path).clone(&args.url, args.revision.as_deref(), None)?;

    let manifest_path = args
        .manifest
        .as_deref()
        .map(|path| path.to_string_lossy().into_owned())
        .or(settings.manifest_path)
        .unwrap_or_else(|| MANIFEST_PATH_DEFAULT.to_string());
    let group_filters = if args.group_filter.is_empty() {
        settings.group_filters
    } else {
        args.group_filter.clone()
    };
    let depth = args.depth.or(settings.clone_depth);

    let workspace = Workspace::init(&root, Some(&main_path), &manifest_path, group_filters, depth)?;

    if args.update {
        let _lock = workspace.lock()?;
        let report = Materializer::new(&workspace, &output).update(&UpdateOptions::default())?;
        if !report.ok() {
            anyhow::bail!("update failed for {} project(s)", report.failures.len());
        }
    } else {
        output.action("Please continue with:\n\n    git ws update\n");
    }
    Ok(())
}

/// Derive the clone directory name from a git URL.
fn clone_name(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        // scp-like or plain path
        Err(_) => url.rsplit(':').next().unwrap_or(url).to_string(),
    };
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(&path);
    name.strip_suffix(".git").unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_name() {
        assert_eq!(clone_name("https://example.com/group/app.git"), "app");
        assert_eq!(clone_name("https://example.com/app"), "app");
        assert_eq!(clone_name("git@github.com:user/repo.git"), "repo");
        assert_eq!(clone_name("file:///srv/git/tool"), "tool");
        assert_eq!(clone_name("/srv/git/tool"), "tool");
    }
}
