//! Init command implementation
//!
//! Initializes workspace metadata around an existing git clone. The clone
//! becomes the main project and its parent directory becomes the workspace
//! root. With `--no-main`, the current directory itself becomes a
//! main-less workspace whose manifest lives at the workspace root.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use git_ws::git::Git;
use git_ws::manifest::MANIFEST_PATH_DEFAULT;
use git_ws::materializer::{Materializer, UpdateOptions};
use git_ws::output::OutputConfig;
use git_ws::settings::AppSettings;
use git_ws::workspace::Workspace;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path within the main git clone (defaults to the current directory)
    #[arg(value_name = "PATH")]
    pub main_path: Option<PathBuf>,

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

    /// Initialize a workspace without a main project
    #[arg(long)]
    pub no_main: bool,

    /// Run update right away
    #[arg(short, long)]
    pub update: bool,
}

/// Execute the init command
pub fn execute(args: InitArgs, color: &str) -> Result<()> {
    let output = OutputConfig::from_env_and_flag(color);
    let settings = AppSettings::load();

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

    let workspace = if args.no_main {
        let root = match &args.main_path {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        output.banner(&root.file_name().unwrap_or_default().to_string_lossy());
        Workspace::init(&root, None, &manifest_path, group_filters, depth)?
    } else {
        let start = match &args.main_path {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        let main_path = Git::find_root(&start)?;
        let name = main_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        output.banner(&name);
        let root = main_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("main project has no parent directory"))?
            .to_path_buf();
        Workspace::init(&root, Some(&main_path), &manifest_path, group_filters, depth)?
    };
    output.action(&format!(
        "Workspace initialized at '{}'.",
        workspace.root().display()
    ));

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
