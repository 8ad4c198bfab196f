//! # Workspace Materializer
//!
//! Reconciles the resolved project list with the filesystem: clones what
//! is missing, moves existing clones to their manifest revision, keeps
//! link/copy files in shape and prunes clones which left the manifest.
//!
//! Every project is handled independently; a failure is reported under the
//! project's banner and the loop carries on. The exit status reflects
//! whether any project failed. Re-running over a clean tree is a no-op.

use std::fs;
use std::path::PathBuf;

use glob::Pattern;
use log::debug;

use crate::error::{Error, PruneReason, Result};
use crate::filerefs::{FileRefUpdater, ProjectFileRefs};
use crate::git::Git;
use crate::groups::{GroupFilter, GroupSelection};
use crate::manifest::{FileRef, ManifestSpec};
use crate::output::OutputConfig;
use crate::resolver::{Project, Resolution, Resolver};
use crate::workspace::Workspace;

/// Options for [`Materializer::update`].
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Do not touch the main project.
    pub skip_main: bool,
    /// Rebase instead of pull/merge on branches.
    pub rebase: bool,
    /// Remove clones which are no longer part of the resolved set.
    pub prune: bool,
    /// Override safety checks (not-a-clone targets, dirty prune
    /// candidates, modified copy destinations).
    pub force: bool,
    /// Limit to projects whose path matches one of these glob patterns.
    pub project_paths: Vec<String>,
    /// Command-line group filters (highest precedence).
    pub group_filters: Vec<GroupFilter>,
    /// Alternative manifest path, relative to the main project.
    pub manifest: Option<PathBuf>,
}

/// Outcome of a materializer run.
#[derive(Debug, Default)]
pub struct Report {
    /// Per-project failures, in BFS order.
    pub failures: Vec<(String, Error)>,
}

impl Report {
    pub fn ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives clone/checkout/pull/prune against a resolved project list.
pub struct Materializer<'a> {
    workspace: &'a Workspace,
    output: &'a OutputConfig,
}

impl<'a> Materializer<'a> {
    pub fn new(workspace: &'a Workspace, output: &'a OutputConfig) -> Self {
        Materializer { workspace, output }
    }

    /// Create or update all projects of the workspace.
    ///
    /// Materialization interleaves with resolution: each project is synced
    /// the moment the resolver produced it, so the manifests of freshly
    /// cloned dependencies are reachable within the same run.
    pub fn update(&self, options: &UpdateOptions) -> Result<Report> {
        let path_filter = compile_path_filter(&options.project_paths)?;
        let mut report = Report::default();

        let resolution = {
            let mut visitor = SyncVisitor {
                materializer: self,
                options,
                path_filter: &path_filter,
                report: &mut report,
            };
            Resolver::new(self.workspace)
                .with_cli_filters(options.group_filters.clone())
                .with_manifest(options.manifest.clone())
                .require_absolute_urls(true)
                .resolve_with(&mut visitor)?
        };
        self.emit_diagnostics(&resolution);

        self.update_filerefs(&resolution, options, &mut report)?;

        if options.prune {
            let used: Vec<String> = resolution
                .projects
                .iter()
                .map(|project| project.path.clone())
                .collect();
            self.prune(&used, options.force, &mut report);
        }
        Ok(report)
    }

    /// Reset every clone to its manifest-declared revision, cloning what
    /// is missing.
    pub fn checkout(
        &self,
        group_filters: Vec<GroupFilter>,
        manifest: Option<PathBuf>,
    ) -> Result<Report> {
        let mut report = Report::default();
        let resolution = {
            let mut visitor = CheckoutVisitor {
                materializer: self,
                report: &mut report,
            };
            Resolver::new(self.workspace)
                .with_cli_filters(group_filters)
                .with_manifest(manifest)
                .require_absolute_urls(true)
                .resolve_with(&mut visitor)?
        };
        self.emit_diagnostics(&resolution);
        Ok(report)
    }

    fn emit_diagnostics(&self, resolution: &Resolution) {
        for diagnostic in &resolution.diagnostics {
            self.output.warning(&diagnostic.to_string());
        }
    }

    fn sync_project(&self, project: &Project, rebase: bool, force: bool) -> Result<()> {
        let path = self.workspace.project_path(&project.path);
        let git = Git::new(&path);

        if path.exists() && !git.is_cloned() {
            if force {
                self.output
                    .warning(&format!("'{}' is not a git clone, skipping", project.path));
                return Ok(());
            }
            return Err(Error::NotAGitClone { path });
        }

        if !git.is_cloned() {
            let url = project.url.as_deref().ok_or_else(|| Error::GitCloneMissing {
                path: path.clone(),
            })?;
            self.output.action(&format!("Cloning '{url}'."));
            git.clone(url, project.revision.as_deref(), self.workspace.info.clone_depth)?;
        } else {
            self.sync_existing(&git, project, rebase)?;
        }

        if project.submodules {
            git.submodule_update()?;
        }
        Ok(())
    }

    fn sync_existing(&self, git: &Git, project: &Project, rebase: bool) -> Result<()> {
        let Some(wanted) = project.revision.as_deref() else {
            self.output.warning(&format!(
                "'{}' has no revision, leaving checkout alone",
                project.path
            ));
            return Ok(());
        };

        let tag = git.tag_at_head()?;
        let mut branch = git.branch()?;
        let sha = git.head_sha()?;

        // A pinned tag or SHA which is already checked out needs no work.
        if branch.is_none()
            && (tag.as_deref() == Some(wanted) || sha.as_deref() == Some(wanted))
        {
            self.output.action("Nothing to do.");
            return Ok(());
        }

        let current = tag.clone().or_else(|| branch.clone()).or_else(|| sha.clone());
        let mut fetched = false;
        if current.as_deref() != Some(wanted) {
            self.output.action("Fetching.");
            git.fetch()?;
            fetched = true;
            match &current {
                Some(current) => self.output.action(&format!(
                    "Checking out '{wanted}' (previously '{current}')."
                )),
                None => self.output.action(&format!("Checking out '{wanted}'.")),
            }
            git.checkout(Some(wanted))?;
            branch = git.branch()?;
        }

        // On a branch, bring it up to date.
        if let Some(branch) = branch {
            if rebase {
                if !fetched {
                    self.output.action("Fetching.");
                    git.fetch()?;
                }
                self.output.action(&format!("Rebasing branch '{branch}'."));
                git.rebase()?;
            } else if fetched {
                self.output.action(&format!("Merging branch '{branch}'."));
                git.merge()?;
            } else {
                self.output.action(&format!("Pulling branch '{branch}'."));
                git.pull()?;
            }
        }
        Ok(())
    }

    fn checkout_project(&self, project: &Project) -> Result<()> {
        let path = self.workspace.project_path(&project.path);
        let git = Git::new(&path);
        if !git.is_cloned() {
            if project.is_main {
                return Err(Error::GitCloneMissing { path });
            }
            let url = project.url.as_deref().ok_or(Error::GitCloneMissing {
                path: path.clone(),
            })?;
            self.output.action(&format!("Cloning '{url}'."));
            git.clone(url, project.revision.as_deref(), self.workspace.info.clone_depth)?;
        } else if let Some(revision) = project.revision.as_deref() {
            self.output.action(&format!("Checking out '{revision}'."));
            git.checkout(Some(revision))?;
        }
        if project.submodules {
            git.submodule_update()?;
        }
        Ok(())
    }

    /// Link/copy files of the main project and its direct dependencies.
    /// References declared in deeper manifests are ignored.
    fn update_filerefs(
        &self,
        resolution: &Resolution,
        options: &UpdateOptions,
        report: &mut Report,
    ) -> Result<()> {
        let manifest_path = self.workspace.manifest_path(options.manifest.as_deref());
        let manifest = match ManifestSpec::load(&manifest_path) {
            Ok(manifest) => manifest,
            Err(Error::ManifestNotFound { .. }) => return Ok(()),
            Err(err) => return Err(err),
        };
        let manifest_filters = GroupFilter::parse_list(&manifest.group_filters)?;
        let cli_filters = if options.group_filters.is_empty() {
            GroupFilter::parse_list(&self.workspace.info.group_filters)?
        } else {
            options.group_filters.clone()
        };
        let selection = GroupSelection::new(&manifest_filters, &cli_filters);

        let select_refs = |path: &str, refs: &[FileRef]| -> Vec<FileRef> {
            refs.iter()
                .filter(|fileref| selection.decide(path, &fileref.groups, false).selected)
                .cloned()
                .collect()
        };

        let mut wanted = Vec::new();
        let main_rel = self.workspace.info.main_path.clone();
        if !manifest.linkfiles.is_empty() || !manifest.copyfiles.is_empty() {
            wanted.push(ProjectFileRefs {
                linkfiles: select_refs(&main_rel, &manifest.linkfiles),
                copyfiles: select_refs(&main_rel, &manifest.copyfiles),
                project: main_rel,
            });
        }
        for project in &resolution.projects {
            if project.level != 1
                || (project.linkfiles.is_empty() && project.copyfiles.is_empty())
            {
                continue;
            }
            wanted.push(ProjectFileRefs {
                project: project.path.clone(),
                linkfiles: select_refs(&project.path, &project.linkfiles),
                copyfiles: select_refs(&project.path, &project.copyfiles),
            });
        }

        let updater = FileRefUpdater::new(self.workspace, self.output, options.force);
        for failure in updater.update(&wanted)? {
            self.output.error(&failure.to_string());
            report.failures.push((String::from("<filerefs>"), failure));
        }
        Ok(())
    }

    /// Remove directories which were clones of dropped dependencies.
    fn prune(&self, used: &[String], force: bool, report: &mut Report) {
        for obsolete in self.workspace.iter_obsoletes(used) {
            let rel = obsolete
                .strip_prefix(self.workspace.root())
                .unwrap_or(&obsolete)
                .to_string_lossy()
                .into_owned();
            self.output.banner(&format!("{rel} (OBSOLETE)"));
            match self.prune_one(&obsolete, force) {
                Ok(()) => self.output.action(&format!("Removing '{rel}'.")),
                Err(err) => {
                    self.output.error(&err.to_string());
                    report.failures.push((rel, err));
                }
            }
        }
    }

    fn prune_one(&self, path: &PathBuf, force: bool) -> Result<()> {
        let git = Git::new(path);
        if !force && git.is_cloned() {
            self.check_prunable(&git, path)?;
        }
        debug!("removing {}", path.display());
        fs::remove_dir_all(path)?;
        Ok(())
    }

    /// A prune candidate must carry no unsaved work of any kind.
    fn check_prunable(&self, git: &Git, path: &PathBuf) -> Result<()> {
        let refuse = |reason: PruneReason| Error::PruneRefused {
            path: path.clone(),
            reason,
        };
        if git.has_untracked()? {
            return Err(refuse(PruneReason::Untracked));
        }
        if git.has_staged()? {
            return Err(refuse(PruneReason::Staged));
        }
        if git.has_unpushed()? {
            return Err(refuse(PruneReason::Unpushed));
        }
        if git.has_stash()? {
            return Err(refuse(PruneReason::Stashed));
        }
        Ok(())
    }
}

/// Syncs each project as the resolver produces it.
struct SyncVisitor<'a, 'b> {
    materializer: &'a Materializer<'a>,
    options: &'a UpdateOptions,
    path_filter: &'a (dyn Fn(&str) -> bool),
    report: &'b mut Report,
}

impl crate::resolver::ProjectVisitor for SyncVisitor<'_, '_> {
    fn visit(&mut self, project: &Project) {
        if project.is_main && self.options.skip_main {
            return;
        }
        let output = self.materializer.output;
        if !(self.path_filter)(&project.path) {
            output.skip(&format!("===== SKIPPING {} =====", project.info()));
            return;
        }
        output.banner(&project.info());
        if let Err(err) =
            self.materializer
                .sync_project(project, self.options.rebase, self.options.force)
        {
            output.error(&err.to_string());
            self.report.failures.push((project.path.clone(), err));
        }
    }
}

/// Checks out each project as the resolver produces it.
struct CheckoutVisitor<'a, 'b> {
    materializer: &'a Materializer<'a>,
    report: &'b mut Report,
}

impl crate::resolver::ProjectVisitor for CheckoutVisitor<'_, '_> {
    fn visit(&mut self, project: &Project) {
        let output = self.materializer.output;
        output.banner(&project.info());
        if let Err(err) = self.materializer.checkout_project(project) {
            output.error(&err.to_string());
            self.report.failures.push((project.path.clone(), err));
        }
    }
}

/// Compile `--project` glob patterns into a match predicate.
fn compile_path_filter(patterns: &[String]) -> Result<Box<dyn Fn(&str) -> bool>> {
    if patterns.is_empty() {
        return Ok(Box::new(|_| true));
    }
    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let pattern = Pattern::new(pattern.trim_end_matches('/')).map_err(|err| Error::Config {
            message: format!("invalid --project pattern '{pattern}': {err}"),
        })?;
        compiled.push(pattern);
    }
    Ok(Box::new(move |path| {
        compiled.iter().any(|pattern| pattern.matches(path))
    }))
}
