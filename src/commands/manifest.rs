//! Manifest command implementation
//!
//! Transform operations on the manifest: `resolve` flattens the recursive
//! graph, `freeze` pins revisions to commit SHAs, `validate` checks the
//! current manifest, `upgrade` rewrites it at the latest schema version,
//! `path`/`paths` print manifest locations and `create` writes a fresh
//! documented manifest.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use git_ws::manifest::{ManifestSpec, MANIFEST_PATH_DEFAULT};
use git_ws::resolver::Resolver;
use git_ws::transform::{freeze_manifest, resolve_manifest};
use git_ws::Error;

use super::{find_workspace, IterArgs};

/// Arguments for the manifest command
#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[command(subcommand)]
    pub command: ManifestCommands,
}

#[derive(Subcommand, Debug)]
pub enum ManifestCommands {
    /// Flatten the manifest graph into a single self-contained manifest
    Resolve {
        #[command(flatten)]
        iter: IterArgs,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Like resolve, with every revision pinned to its commit SHA
    Freeze {
        #[command(flatten)]
        iter: IterArgs,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Load and validate the manifest
    Validate {
        #[command(flatten)]
        iter: IterArgs,
    },

    /// Rewrite the manifest at the latest schema version
    Upgrade {
        #[command(flatten)]
        iter: IterArgs,
    },

    /// Print the path of the main manifest
    Path,

    /// Print the paths of all resolved manifests
    Paths {
        #[command(flatten)]
        iter: IterArgs,
    },

    /// Create a fresh manifest
    Create {
        /// Manifest location
        #[arg(value_name = "PATH", default_value = MANIFEST_PATH_DEFAULT)]
        path: PathBuf,

        /// Overwrite an existing manifest
        #[arg(short, long)]
        force: bool,
    },
}

/// Execute the manifest command
pub fn execute(args: ManifestArgs, _color: &str) -> Result<()> {
    match args.command {
        ManifestCommands::Resolve { iter, output } => {
            let workspace = find_workspace()?;
            let manifest = resolve_manifest(&workspace, &iter.filters()?, iter.manifest)?;
            emit(&manifest, output.as_deref())
        }
        ManifestCommands::Freeze { iter, output } => {
            let workspace = find_workspace()?;
            let manifest = freeze_manifest(&workspace, &iter.filters()?, iter.manifest)?;
            emit(&manifest, output.as_deref())
        }
        ManifestCommands::Validate { iter } => {
            let workspace = find_workspace()?;
            let path = workspace.manifest_path(iter.manifest.as_deref());
            ManifestSpec::load(&path)?;
            println!("OK: {}", path.display());
            Ok(())
        }
        ManifestCommands::Upgrade { iter } => {
            let workspace = find_workspace()?;
            let path = workspace.manifest_path(iter.manifest.as_deref());
            ManifestSpec::upgrade(&path)?;
            println!("Upgraded: {}", path.display());
            Ok(())
        }
        ManifestCommands::Path => {
            let workspace = find_workspace()?;
            println!("{}", workspace.manifest_path(None).display());
            Ok(())
        }
        ManifestCommands::Paths { iter } => {
            let workspace = find_workspace()?;
            let resolution = Resolver::new(&workspace)
                .with_cli_filters(iter.filters()?)
                .with_manifest(iter.manifest)
                .resolve()?;
            for project in &resolution.projects {
                let path = workspace
                    .project_path(&project.path)
                    .join(&project.manifest_path);
                if path.exists() {
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
        ManifestCommands::Create { path, force } => {
            if path.exists() && !force {
                return Err(Error::ManifestExists { path }.into());
            }
            ManifestSpec::default().save(&path, false)?;
            println!("Created: {}", path.display());
            Ok(())
        }
    }
}

fn emit(manifest: &ManifestSpec, output: Option<&std::path::Path>) -> Result<()> {
    match output {
        Some(path) => {
            manifest.save(path, false)?;
            println!("Written: {}", path.display());
        }
        None => print!("{}", manifest.dump()),
    }
    Ok(())
}
