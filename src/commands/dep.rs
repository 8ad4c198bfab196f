//! Dep command implementation
//!
//! Editing operations on the manifest's dependency list. All edits keep
//! user comments and unknown fields of the manifest file.

use anyhow::Result;
use clap::{Args, Subcommand};

use git_ws::manifest::{ManifestSpec, ProjectSpec};
use git_ws::Error;

use super::find_workspace;

/// Arguments for the dep command
#[derive(Args, Debug)]
pub struct DepArgs {
    #[command(subcommand)]
    pub command: DepCommands,
}

#[derive(Subcommand, Debug)]
pub enum DepCommands {
    /// Add a dependency to the manifest
    Add {
        /// Dependency name
        name: String,

        /// Remote alias (mutually exclusive with --url)
        #[arg(long, conflicts_with = "url")]
        remote: Option<String>,

        /// URL relative to the remote's url-base (requires --remote)
        #[arg(long = "sub-url", requires = "remote")]
        sub_url: Option<String>,

        /// Absolute or manifest-relative URL
        #[arg(long)]
        url: Option<String>,

        /// Revision to be checked out
        #[arg(long)]
        revision: Option<String>,

        /// Workspace path (defaults to the name)
        #[arg(long)]
        path: Option<String>,

        /// Dependency groups
        #[arg(long, value_delimiter = ',')]
        groups: Vec<String>,
    },

    /// Remove a dependency by name
    Remove {
        /// Dependency name
        name: String,
    },

    /// List the dependencies of the manifest
    List,
}

/// Execute the dep command
pub fn execute(args: DepArgs) -> Result<()> {
    let workspace = find_workspace()?;
    let manifest_path = workspace.manifest_path(None);
    let mut manifest = ManifestSpec::load(&manifest_path)?;

    match args.command {
        DepCommands::Add {
            name,
            remote,
            sub_url,
            url,
            revision,
            path,
            groups,
        } => {
            let mut spec = ProjectSpec::new(name);
            spec.remote = remote;
            spec.sub_url = sub_url;
            spec.url = url;
            spec.revision = revision;
            spec.path = path;
            spec.groups = groups;
            manifest.dependencies.push(spec);
            manifest.validate(&manifest_path)?;
            let _lock = workspace.lock()?;
            manifest.save(&manifest_path, true)?;
        }
        DepCommands::Remove { name } => {
            let before = manifest.dependencies.len();
            manifest.dependencies.retain(|dep| dep.name != name);
            if manifest.dependencies.len() == before {
                return Err(Error::Config {
                    message: format!("unknown dependency '{name}'"),
                }
                .into());
            }
            let _lock = workspace.lock()?;
            manifest.save(&manifest_path, true)?;
        }
        DepCommands::List => {
            for dep in &manifest.dependencies {
                let mut line = dep.name.clone();
                if let Some(revision) = &dep.revision {
                    line.push_str(&format!(" revision={revision}"));
                }
                if let Some(path) = &dep.path {
                    line.push_str(&format!(" path={path}"));
                }
                if !dep.groups.is_empty() {
                    line.push_str(&format!(" groups={}", dep.groups.join(",")));
                }
                println!("{line}");
            }
        }
    }
    Ok(())
}
