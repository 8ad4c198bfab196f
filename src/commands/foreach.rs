//! Project iteration commands
//!
//! `foreach` runs an arbitrary command once per resolved project, `git`
//! runs a git command, and `pull`/`push`/`fetch`/`rebase`/`status`/`diff`
//! are shortcuts for the everyday operations. Projects are visited in BFS
//! order; `--reverse` visits them leaves-first, which is what `push`
//! wants by default.

use anyhow::Result;
use clap::Args;

use git_ws::git::Git;
use git_ws::output::OutputConfig;
use git_ws::resolver::{Project, Resolver};
use git_ws::workspace::Workspace;
use git_ws::Error;

use super::{find_workspace, IterArgs};

/// Arguments for the foreach command
#[derive(Args, Debug)]
pub struct ForeachArgs {
    #[command(flatten)]
    pub iter: IterOnlyArgs,

    /// Command to run in every project
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Arguments for the git passthrough command
#[derive(Args, Debug)]
pub struct GitArgs {
    #[command(flatten)]
    pub iter: IterOnlyArgs,

    /// Git arguments to run in every project
    #[arg(
        value_name = "ARGS",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Arguments for the plain iteration commands (pull, push, ...)
#[derive(Args, Debug, Clone)]
pub struct IterOnlyArgs {
    #[command(flatten)]
    pub iter: IterArgs,

    /// Iterate in reverse (leaves-first) order
    #[arg(long)]
    pub reverse: bool,
}

/// The built-in per-project git operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitIterOp {
    Pull,
    Push,
    Fetch,
    Rebase,
    Status,
    Diff,
}

/// Execute the foreach command
pub fn execute_foreach(args: ForeachArgs, color: &str) -> Result<()> {
    run_over_projects(&args.iter, color, |_, git| {
        let code = git.run_command_passthrough(&args.command)?;
        if code != 0 {
            return Err(Error::Config {
                message: format!("command exited with {code}"),
            });
        }
        Ok(())
    })
}

/// Execute the git command
pub fn execute_git(args: GitArgs, color: &str) -> Result<()> {
    run_over_projects(&args.iter, color, |_, git| {
        let code = git.run_passthrough(&args.args)?;
        if code != 0 {
            return Err(Error::Config {
                message: format!("git exited with {code}"),
            });
        }
        Ok(())
    })
}

/// Execute one of the built-in iteration commands
pub fn execute_op(args: IterOnlyArgs, op: GitIterOp, color: &str) -> Result<()> {
    run_over_projects(&args, color, |project, git| match op {
        GitIterOp::Pull => git.pull(),
        GitIterOp::Push => git.run_passthrough(&["push".to_string()]).and_then(|code| {
            if code == 0 {
                Ok(())
            } else {
                Err(Error::Config {
                    message: format!("git push exited with {code}"),
                })
            }
        }),
        GitIterOp::Fetch => git.fetch(),
        GitIterOp::Rebase => git.rebase(),
        GitIterOp::Status => {
            for status in git.status()? {
                println!("{}", status.with_base(std::path::Path::new(&project.path)));
            }
            Ok(())
        }
        GitIterOp::Diff => git
            .run_passthrough(&["diff".to_string()])
            .map(|_| ()),
    })
}

/// Resolve the workspace and run `action` once per selected project.
fn run_over_projects<F>(args: &IterOnlyArgs, color: &str, action: F) -> Result<()>
where
    F: Fn(&Project, &Git) -> std::result::Result<(), Error>,
{
    let output = OutputConfig::from_env_and_flag(color);
    let workspace = find_workspace()?;

    let mut resolution = Resolver::new(&workspace)
        .with_cli_filters(args.iter.filters()?)
        .with_manifest(args.iter.manifest.clone())
        .resolve()?;
    if args.reverse {
        resolution.projects.reverse();
    }

    let path_filter = compile_filter(&args.iter.project)?;
    let mut failures = 0usize;
    for project in &resolution.projects {
        if !path_filter(&project.path) {
            output.skip(&format!("===== SKIPPING {} =====", project.info()));
            continue;
        }
        output.banner(&project.info());
        let git = Git::new(project_dir(&workspace, project));
        if !git.is_cloned() {
            output.error(
                &Error::GitCloneMissing {
                    path: git.path().to_path_buf(),
                }
                .to_string(),
            );
            failures += 1;
            continue;
        }
        if let Err(err) = action(project, &git) {
            output.error(&err.to_string());
            failures += 1;
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} project(s) failed");
    }
    Ok(())
}

fn project_dir(workspace: &Workspace, project: &Project) -> std::path::PathBuf {
    workspace.project_path(&project.path)
}

fn compile_filter(patterns: &[String]) -> Result<Box<dyn Fn(&str) -> bool>> {
    if patterns.is_empty() {
        return Ok(Box::new(|_| true));
    }
    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        compiled.push(glob::Pattern::new(pattern.trim_end_matches('/')).map_err(|err| {
            anyhow::anyhow!("invalid --project pattern '{pattern}': {err}")
        })?);
    }
    Ok(Box::new(move |path| {
        compiled.iter().any(|pattern| pattern.matches(path))
    }))
}
