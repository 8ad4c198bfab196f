//! Info command implementation
//!
//! Read-only introspection of the workspace and the resolver output.

use anyhow::Result;
use clap::{Args, Subcommand};

use git_ws::deptree;
use git_ws::resolver::{GitOriginUrls, Resolver};

use super::{find_workspace, IterArgs};

/// Arguments for the info command
#[derive(Args, Debug)]
pub struct InfoArgs {
    #[command(subcommand)]
    pub command: InfoCommands,
}

#[derive(Subcommand, Debug)]
pub enum InfoCommands {
    /// Print the path of the main project
    MainPath,

    /// Print the path of the workspace root
    WorkspacePath,

    /// Print the paths of all resolved projects
    ProjectPaths {
        #[command(flatten)]
        iter: IterArgs,
    },

    /// Display the dependency tree
    DepTree {
        #[command(flatten)]
        iter: IterArgs,

        /// Annotate every grouped dependency with its deciding filter rule
        #[arg(long)]
        primary: bool,
    },
}

/// Execute the info command
pub fn execute(args: InfoArgs) -> Result<()> {
    let workspace = find_workspace()?;
    match args.command {
        InfoCommands::MainPath => {
            if let Some(main_path) = workspace.main_path() {
                println!("{}", main_path.display());
            }
            Ok(())
        }
        InfoCommands::WorkspacePath => {
            println!("{}", workspace.root().display());
            Ok(())
        }
        InfoCommands::ProjectPaths { iter } => {
            let resolution = Resolver::new(&workspace)
                .with_cli_filters(iter.filters()?)
                .with_manifest(iter.manifest)
                .resolve()?;
            for project in &resolution.projects {
                println!("{}", workspace.project_path(&project.path).display());
            }
            Ok(())
        }
        InfoCommands::DepTree { iter, primary } => {
            let tree = deptree::build(&workspace, &GitOriginUrls, &iter.filters()?, primary)?;
            deptree::print(&tree)?;
            Ok(())
        }
    }
}
