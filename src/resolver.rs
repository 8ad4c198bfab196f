//! # Project Resolver
//!
//! The resolver walks the dependency graph breadth-first, starting at the
//! main project's manifest, and materializes every [`ProjectSpec`] into a
//! concrete [`Project`]: absolute URL, workspace-relative path, effective
//! revision and groups.
//!
//! Two dependencies may resolve to the same workspace path; the first
//! occurrence in BFS order wins and later ones are recorded as `DUPLICATE`
//! diagnostics. This also makes cycles harmless: a dependency whose path
//! was already resolved is simply dropped. A dependency without its own
//! manifest contributes an empty subtree.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::git::Git;
use crate::groups::{FilterRule, GroupFilter, GroupSelection};
use crate::manifest::{FileRef, ManifestSpec, ProjectSpec, MANIFEST_PATH_DEFAULT};
use crate::urls;
use crate::workspace::Workspace;

/// A resolved project: one git clone the workspace is made of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Dependency name.
    pub name: String,

    /// Workspace-relative directory, normalized.
    pub path: String,

    /// BFS depth; the main project is level 0.
    pub level: usize,

    /// Git URL, absolute or workspace-relative. `None` for the main
    /// project, whose clone already exists.
    pub url: Option<String>,

    /// Revision to be checked out.
    pub revision: Option<String>,

    /// Path to the project's own manifest, relative to `path`.
    pub manifest_path: String,

    /// Groups this project belongs to.
    pub groups: Vec<String>,

    /// Groups activated within the project's own manifest.
    pub with_groups: Vec<String>,

    /// Whether submodules are initialized and updated.
    pub submodules: bool,

    pub linkfiles: Vec<FileRef>,
    pub copyfiles: Vec<FileRef>,

    /// Project is the main project.
    pub is_main: bool,
}

impl Project {
    /// Resolve a [`ProjectSpec`] against its manifest's defaults, remotes
    /// and the URL of the repository containing the manifest.
    pub fn from_spec(
        manifest: &ManifestSpec,
        spec: &ProjectSpec,
        base_url: Option<&str>,
        level: usize,
    ) -> Result<Project> {
        let defaults = &manifest.defaults;
        let remote = spec.remote.as_deref().or(defaults.remote.as_deref());

        let url = match &spec.url {
            Some(url) => url.clone(),
            None => {
                let sub_url = match &spec.sub_url {
                    Some(sub_url) => sub_url.clone(),
                    None => urls::url_sub(base_url, &spec.name),
                };
                match remote {
                    Some(remote_name) => {
                        let remote = manifest
                            .remotes
                            .iter()
                            .find(|remote| remote.name == remote_name)
                            .ok_or_else(|| Error::UrlResolutionFailed {
                                project: spec.name.clone(),
                                reason: format!("unknown remote '{remote_name}'"),
                            })?;
                        format!("{}/{sub_url}", remote.url_base.trim_end_matches('/'))
                    }
                    None => format!("../{sub_url}"),
                }
            }
        };
        let url = urls::join(base_url, &url);

        let groups = if spec.groups.is_empty() {
            defaults.groups.clone()
        } else {
            spec.groups.clone()
        };
        let with_groups = if spec.with_groups.is_empty() {
            defaults.with_groups.clone()
        } else {
            spec.with_groups.clone()
        };

        Ok(Project {
            name: spec.name.clone(),
            path: spec.effective_path().to_string(),
            level,
            url: Some(url),
            revision: spec
                .revision
                .clone()
                .or_else(|| defaults.revision.clone()),
            manifest_path: spec.effective_manifest_path().to_string(),
            groups,
            with_groups,
            submodules: spec.submodules.or(defaults.submodules).unwrap_or(true),
            linkfiles: spec.linkfiles.clone(),
            copyfiles: spec.copyfiles.clone(),
            is_main: false,
        })
    }

    /// Turn the resolved project back into a declarative entry, as emitted
    /// by `manifest resolve`. Some resolution steps are irreversible; the
    /// spec carries the resolved values verbatim.
    pub fn to_spec(&self) -> ProjectSpec {
        let mut spec = ProjectSpec::new(self.name.clone());
        spec.url = self.url.clone();
        spec.revision = self.revision.clone();
        if self.path != self.name {
            spec.path = Some(self.path.clone());
        }
        if self.manifest_path != MANIFEST_PATH_DEFAULT {
            spec.manifest_path = Some(self.manifest_path.clone());
        }
        spec.groups = self.groups.clone();
        spec.with_groups = self.with_groups.clone();
        if !self.submodules {
            spec.submodules = Some(false);
        }
        spec.linkfiles = self.linkfiles.clone();
        spec.copyfiles = self.copyfiles.clone();
        spec
    }

    /// Condensed one-line description for banners and logs.
    pub fn info(&self) -> String {
        let mut options = Vec::new();
        if self.is_main {
            options.push("MAIN".to_string());
        }
        if let Some(revision) = &self.revision {
            options.push(format!("revision='{revision}'"));
        }
        if self.path != self.name {
            options.push(format!("path='{}'", self.path));
        }
        if !self.groups.is_empty() {
            options.push(format!("groups='{}'", self.groups.join(",")));
        }
        if options.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, options.join(", "))
        }
    }
}

/// Non-fatal observations made while resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A later spec resolved to an already-taken path and was skipped.
    Duplicate {
        name: String,
        path: String,
        revision: Option<String>,
    },
    /// A spec was deselected by the group filters.
    FilteredOut {
        name: String,
        path: String,
        winner: Option<FilterRule>,
    },
    /// A dependency carries no revision; its clone is left unmanaged.
    MissingRevision { name: String, path: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Duplicate {
                name,
                path,
                revision,
            } => match revision {
                Some(revision) => {
                    write!(f, "DUPLICATE {name} (path='{path}', revision='{revision}')")
                }
                None => write!(f, "DUPLICATE {name} (path='{path}')"),
            },
            Diagnostic::FilteredOut { name, path, winner } => match winner {
                Some(rule) => write!(
                    f,
                    "FILTERED OUT {name} (path='{path}') by '{}' from {}",
                    rule.filter, rule.source
                ),
                None => write!(f, "FILTERED OUT {name} (path='{path}')"),
            },
            Diagnostic::MissingRevision { name, path } => {
                write!(f, "{name} (path='{path}') has an empty revision")
            }
        }
    }
}

/// Result of one resolver run.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Resolved projects, BFS order, main project first (when present and
    /// not skipped).
    pub projects: Vec<Project>,

    /// Ordered diagnostics gathered along the way.
    pub diagnostics: Vec<Diagnostic>,
}

/// Source of `origin` remote URLs for relative-URL arithmetic.
///
/// Production reads them from the clones via the git driver; tests stub
/// this out.
pub trait OriginUrls {
    fn origin_url(&self, project_dir: &Path) -> Option<String>;
}

/// Default [`OriginUrls`] backed by the git driver.
pub struct GitOriginUrls;

impl OriginUrls for GitOriginUrls {
    fn origin_url(&self, project_dir: &Path) -> Option<String> {
        let git = Git::new(project_dir);
        if !git.is_cloned() {
            return None;
        }
        git.remote_url().ok().flatten()
    }
}

/// Hook invoked for every resolved project, in BFS order.
///
/// The materializer uses this to clone each project *before* the resolver
/// tries to read its manifest: a transitive dependency's manifest only
/// exists once its clone does, so resolution and materialization have to
/// interleave to reach the whole graph in one run.
pub trait ProjectVisitor {
    /// Called right after `project` entered the resolved set, before its
    /// manifest is consulted. The visitor records its own failures.
    fn visit(&mut self, project: &Project);
}

/// Breadth-first manifest resolver.
pub struct Resolver<'a> {
    workspace: &'a Workspace,
    origins: &'a dyn OriginUrls,
    cli_filters: Vec<GroupFilter>,
    manifest_override: Option<PathBuf>,
    skip_main: bool,
    require_absolute_urls: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(workspace: &'a Workspace) -> Resolver<'a> {
        Resolver {
            workspace,
            origins: &GitOriginUrls,
            cli_filters: Vec::new(),
            manifest_override: None,
            skip_main: false,
            require_absolute_urls: false,
        }
    }

    /// Use `origins` instead of the git driver.
    pub fn with_origins(mut self, origins: &'a dyn OriginUrls) -> Self {
        self.origins = origins;
        self
    }

    /// Append command-line group filters (highest precedence). When none
    /// are given, the workspace's stored filters apply.
    pub fn with_cli_filters(mut self, filters: Vec<GroupFilter>) -> Self {
        self.cli_filters = filters;
        self
    }

    /// Resolve against this manifest instead of the stored one.
    pub fn with_manifest(mut self, path: Option<PathBuf>) -> Self {
        self.manifest_override = path;
        self
    }

    /// Leave the main project out of the result.
    pub fn skip_main(mut self, skip: bool) -> Self {
        self.skip_main = skip;
        self
    }

    /// Fail with [`Error::UrlResolutionFailed`] when a project URL cannot
    /// be made absolute. Required by the materializer and `freeze`.
    pub fn require_absolute_urls(mut self, require: bool) -> Self {
        self.require_absolute_urls = require;
        self
    }

    /// Run the breadth-first traversal.
    pub fn resolve(&self) -> Result<Resolution> {
        self.run(None)
    }

    /// Run the traversal, handing every resolved project to `visitor`
    /// before its manifest is consulted.
    pub fn resolve_with(&self, visitor: &mut dyn ProjectVisitor) -> Result<Resolution> {
        self.run(Some(visitor))
    }

    fn run(&self, mut visitor: Option<&mut dyn ProjectVisitor>) -> Result<Resolution> {
        let workspace = self.workspace;
        let mut resolution = Resolution::default();
        let mut seen: Vec<String> = Vec::new();

        let main_dir = workspace.main_path();
        if let Some(main_dir) = &main_dir {
            seen.push(workspace.info.main_path.clone());
            if !self.skip_main {
                let revision = Git::new(main_dir).revision().ok().flatten();
                let main_project = Project {
                    name: main_dir
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    path: workspace.info.main_path.clone(),
                    level: 0,
                    url: None,
                    revision,
                    manifest_path: workspace.info.manifest_path.clone(),
                    groups: Vec::new(),
                    with_groups: Vec::new(),
                    submodules: true,
                    linkfiles: Vec::new(),
                    copyfiles: Vec::new(),
                    is_main: true,
                };
                if let Some(visitor) = visitor.as_mut() {
                    visitor.visit(&main_project);
                }
                resolution.projects.push(main_project);
            }
        }

        let manifest_path = workspace.manifest_path(self.manifest_override.as_deref());
        let manifest = match ManifestSpec::load(&manifest_path) {
            Ok(manifest) => manifest,
            // A project without a manifest simply has no dependencies.
            Err(Error::ManifestNotFound { .. }) => return Ok(resolution),
            Err(err) => return Err(err),
        };

        let cli_filters = if self.cli_filters.is_empty() {
            GroupFilter::parse_list(&workspace.info.group_filters)?
        } else {
            self.cli_filters.clone()
        };
        let manifest_filters = GroupFilter::parse_list(&manifest.group_filters)?;
        let selection = GroupSelection::new(&manifest_filters, &cli_filters);

        let root_dir = main_dir.unwrap_or_else(|| workspace.root().to_path_buf());
        let mut queue: VecDeque<(PathBuf, ManifestSpec, GroupSelection, usize)> =
            VecDeque::new();
        queue.push_back((root_dir, manifest, selection, 1));

        while let Some((project_dir, manifest, selection, level)) = queue.pop_front() {
            self.expand(
                &project_dir,
                &manifest,
                &selection,
                level,
                &mut seen,
                &mut resolution,
                &mut queue,
                &mut visitor,
            )?;
        }
        Ok(resolution)
    }

    #[allow(clippy::too_many_arguments)]
    fn expand(
        &self,
        project_dir: &Path,
        manifest: &ManifestSpec,
        selection: &GroupSelection,
        level: usize,
        seen: &mut Vec<String>,
        resolution: &mut Resolution,
        queue: &mut VecDeque<(PathBuf, ManifestSpec, GroupSelection, usize)>,
        visitor: &mut Option<&mut dyn ProjectVisitor>,
    ) -> Result<()> {
        let base_url = if manifest.dependencies.is_empty() {
            None
        } else {
            self.origins.origin_url(project_dir)
        };

        for spec in &manifest.dependencies {
            let mut project = Project::from_spec(manifest, spec, base_url.as_deref(), level)?;
            project.path = urls::normalize_path(&project.path).ok_or_else(|| {
                Error::PathOutsideWorkspace {
                    workspace: self.workspace.root().to_path_buf(),
                    path: PathBuf::from(spec.effective_path()),
                }
            })?;

            // Every path is handled just once; the first occurrence wins,
            // including its attributes.
            if seen.contains(&project.path) {
                debug!("DUPLICATE {}", project.info());
                resolution.diagnostics.push(Diagnostic::Duplicate {
                    name: project.name,
                    path: project.path,
                    revision: project.revision,
                });
                continue;
            }
            seen.push(project.path.clone());

            let decision = selection.decide(&project.path, &project.groups, false);
            if !decision.selected {
                debug!("FILTERED OUT {}", project.info());
                resolution.diagnostics.push(Diagnostic::FilteredOut {
                    name: project.name,
                    path: project.path,
                    winner: decision.winner,
                });
                continue;
            }

            if self.require_absolute_urls {
                let url = project.url.as_deref().unwrap_or_default();
                if !urls::is_absolute(url) {
                    let reason = if base_url.is_none() {
                        format!(
                            "relative URL '{url}' and no origin for '{}'",
                            project_dir.display()
                        )
                    } else {
                        format!("relative URL '{url}'")
                    };
                    return Err(Error::UrlResolutionFailed {
                        project: project.name,
                        reason,
                    });
                }
            }

            if project.revision.is_none() {
                resolution.diagnostics.push(Diagnostic::MissingRevision {
                    name: project.name.clone(),
                    path: project.path.clone(),
                });
            }

            debug!("{}", project.info());
            let dep_dir = self.workspace.project_path(&project.path);
            let dep_manifest_path = dep_dir.join(&project.manifest_path);
            let child_selection = selection.child(&project.with_groups);
            if let Some(visitor) = visitor.as_mut() {
                visitor.visit(&project);
            }
            resolution.projects.push(project);

            match ManifestSpec::load(&dep_manifest_path) {
                Ok(dep_manifest) => {
                    queue.push_back((dep_dir, dep_manifest, child_selection, level + 1));
                }
                // No manifest, no subtree.
                Err(Error::ManifestNotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
