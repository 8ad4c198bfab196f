//! # CLI Argument Parsing and Command Dispatch
//!
//! This module defines the command-line interface for the `git-ws` tool
//! using the `clap` library. It is responsible for:
//!
//! - Defining the top-level CLI structure, including global arguments like
//!   `--color` and `--log-level`.
//! - Defining the available subcommands (e.g., `init`, `update`, `manifest`).
//! - Dispatching to the appropriate command implementation based on the
//!   parsed arguments.
//!
//! Each subcommand is implemented in its own module under `src/commands/`
//! to keep the code organized and maintainable.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::commands;

/// Git Workspace - compose a workspace from multiple git repositories
#[derive(Parser, Debug)]
#[command(name = "git-ws")]
#[command(
    version,
    about,
    long_about = "Git Workspace - compose a single working directory from multiple independently versioned git repositories"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Increase output verbosity (can be repeated)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Suppress output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a workspace around an existing git clone
    Init(commands::init::InitArgs),

    /// Clone a main repository and initialize a workspace around it
    Clone(commands::clone::CloneArgs),

    /// Create or update all dependent projects
    Update(commands::update::UpdateArgs),

    /// Reset clones to their manifest-declared revisions
    Checkout(commands::checkout::CheckoutArgs),

    /// Run a command once per project
    Foreach(commands::foreach::ForeachArgs),

    /// Run a git command once per project
    Git(commands::foreach::GitArgs),

    /// Pull every project
    Pull(commands::foreach::IterOnlyArgs),

    /// Push every project
    Push(commands::foreach::IterOnlyArgs),

    /// Fetch every project
    Fetch(commands::foreach::IterOnlyArgs),

    /// Rebase every project
    Rebase(commands::foreach::IterOnlyArgs),

    /// Show status lines of every project
    Status(commands::foreach::IterOnlyArgs),

    /// Show diffs of every project
    Diff(commands::foreach::IterOnlyArgs),

    /// Manifest transform operations
    Manifest(commands::manifest::ManifestArgs),

    /// Edit the dependency list of the manifest
    Dep(commands::dep::DepArgs),

    /// Edit the remote list of the manifest
    Remote(commands::remote::RemoteArgs),

    /// Show or set manifest default values
    Default(commands::default::DefaultArgs),

    /// Show or set group filters
    GroupFilters(commands::group_filters::GroupFiltersArgs),

    /// Read-only workspace introspection
    Info(commands::info::InfoArgs),

    /// Freeze the workspace into a tagged manifest
    Tag(commands::tag::TagArgs),

    /// Remove the workspace metadata
    Deinit(commands::deinit::DeinitArgs),
}

impl Cli {
    /// Execute the parsed CLI command
    pub fn execute(self) -> Result<()> {
        self.init_logger()?;
        let color = self.color.clone();

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &color),
            Commands::Clone(args) => commands::clone::execute(args, &color),
            Commands::Update(args) => commands::update::execute(args, &color),
            Commands::Checkout(args) => commands::checkout::execute(args, &color),
            Commands::Foreach(args) => commands::foreach::execute_foreach(args, &color),
            Commands::Git(args) => commands::foreach::execute_git(args, &color),
            Commands::Pull(args) => commands::foreach::execute_op(args, commands::foreach::GitIterOp::Pull, &color),
            Commands::Push(args) => commands::foreach::execute_op(args, commands::foreach::GitIterOp::Push, &color),
            Commands::Fetch(args) => commands::foreach::execute_op(args, commands::foreach::GitIterOp::Fetch, &color),
            Commands::Rebase(args) => commands::foreach::execute_op(args, commands::foreach::GitIterOp::Rebase, &color),
            Commands::Status(args) => commands::foreach::execute_op(args, commands::foreach::GitIterOp::Status, &color),
            Commands::Diff(args) => commands::foreach::execute_op(args, commands::foreach::GitIterOp::Diff, &color),
            Commands::Manifest(args) => commands::manifest::execute(args, &color),
            Commands::Dep(args) => commands::dep::execute(args),
            Commands::Remote(args) => commands::remote::execute(args),
            Commands::Default(args) => commands::default::execute(args),
            Commands::GroupFilters(args) => commands::group_filters::execute(args),
            Commands::Info(args) => commands::info::execute(args),
            Commands::Tag(args) => commands::tag::execute(args, &color),
            Commands::Deinit(args) => commands::deinit::execute(args, &color),
        }
    }

    /// Initialize the logger with the specified log level and color settings
    fn init_logger(&self) -> Result<()> {
        let log_level = self.parse_log_level()?;
        let use_color = git_ws::output::OutputConfig::from_env_and_flag(&self.color).use_color;

        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .write_style(if use_color {
                env_logger::WriteStyle::Auto
            } else {
                env_logger::WriteStyle::Never
            })
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

        Ok(())
    }

    /// Parse the log level, considering --verbose and --quiet flags
    ///
    /// Priority order:
    /// 1. --quiet (always sets to Error level)
    /// 2. --verbose (Info for 1, Debug for 2, Trace for 3+)
    /// 3. --log-level (explicit level)
    fn parse_log_level(&self) -> Result<LevelFilter> {
        if self.quiet {
            return Ok(LevelFilter::Error);
        }
        if self.verbose > 0 {
            return Ok(match self.verbose {
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            });
        }
        match self.log_level.to_lowercase().as_str() {
            "error" => Ok(LevelFilter::Error),
            "warn" => Ok(LevelFilter::Warn),
            "info" => Ok(LevelFilter::Info),
            "debug" => Ok(LevelFilter::Debug),
            "trace" => Ok(LevelFilter::Trace),
            "off" => Ok(LevelFilter::Off),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: '{}'. Valid options are: error, warn, info, debug, trace, off",
                self.log_level
            )),
        }
    }
}
