//! Remote command implementation
//!
//! Editing operations on the manifest's remote aliases.

use anyhow::Result;
use clap::{Args, Subcommand};

use git_ws::manifest::{ManifestSpec, Remote};
use git_ws::Error;

use super::find_workspace;

/// Arguments for the remote command
#[derive(Args, Debug)]
pub struct RemoteArgs {
    #[command(subcommand)]
    pub command: RemoteCommands,
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Add a remote alias to the manifest
    Add {
        /// Remote name
        name: String,

        /// URL prefix the dependency sub-url or name is appended to
        #[arg(value_name = "URL_BASE")]
        url_base: String,
    },

    /// Remove a remote alias by name
    Remove {
        /// Remote name
        name: String,
    },

    /// List the remote aliases of the manifest
    List,
}

/// Execute the remote command
pub fn execute(args: RemoteArgs) -> Result<()> {
    let workspace = find_workspace()?;
    let manifest_path = workspace.manifest_path(None);
    let mut manifest = ManifestSpec::load(&manifest_path)?;

    match args.command {
        RemoteCommands::Add { name, url_base } => {
            manifest.remotes.push(Remote { name, url_base });
            manifest.validate(&manifest_path)?;
            let _lock = workspace.lock()?;
            manifest.save(&manifest_path, true)?;
        }
        RemoteCommands::Remove { name } => {
            let before = manifest.remotes.len();
            manifest.remotes.retain(|remote| remote.name != name);
            if manifest.remotes.len() == before {
                return Err(Error::Config {
                    message: format!("unknown remote '{name}'"),
                }
                .into());
            }
            manifest.validate(&manifest_path)?;
            let _lock = workspace.lock()?;
            manifest.save(&manifest_path, true)?;
        }
        RemoteCommands::List => {
            for remote in &manifest.remotes {
                println!("{} {}", remote.name, remote.url_base);
            }
        }
    }
    Ok(())
}
