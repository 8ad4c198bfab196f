//! # Workspace Handling
//!
//! A workspace is the directory holding the main project, all dependency
//! clones and the `.git-ws/` metadata folder. This module persists the
//! small amount of state that survives between invocations: the main
//! project location, the manifest path, the active group filters and the
//! shallow clone depth.
//!
//! The workspace root is discovered by walking upward from the current
//! working directory until a `.git-ws/` directory is found.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;

use crate::error::{Error, Result};
use crate::lock::WorkspaceLock;
use crate::manifest::{write_atomic, MANIFEST_PATH_DEFAULT};

/// Metadata folder name, relative to the workspace root.
pub const GIT_WS_DIR: &str = ".git-ws";

/// Metadata file name within [`GIT_WS_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Folder for frozen tag manifests, within a project's own [`GIT_WS_DIR`].
pub const MANIFESTS_DIR: &str = "manifests";

/// Persisted workspace information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    /// Path to the main project, relative to the workspace root. Empty for
    /// a main-less workspace.
    #[serde(default)]
    pub main_path: String,

    /// Path to the manifest file, relative to the main project (or to the
    /// workspace root when there is no main project).
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Active group filters, in evaluation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_filters: Vec<String>,

    /// Shallow clone depth for new clones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_depth: Option<u32>,
}

fn default_manifest_path() -> String {
    MANIFEST_PATH_DEFAULT.to_string()
}

/// An initialized workspace on disk.
#[derive(Debug, Clone)]
pub struct Workspace {
    path: PathBuf,
    pub info: WorkspaceInfo,
}

impl Workspace {
    /// Find the workspace containing `start` (or the current directory).
    pub fn find(start: Option<&Path>) -> Result<Workspace> {
        let start = match start {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let mut current = Some(start.as_path());
        while let Some(dir) = current {
            if dir.join(GIT_WS_DIR).is_dir() {
                return Workspace::open(dir);
            }
            current = dir.parent();
        }
        Err(Error::WorkspaceNotFound)
    }

    /// Open the workspace rooted at `path`.
    pub fn open(path: &Path) -> Result<Workspace> {
        let config_path = path.join(GIT_WS_DIR).join(CONFIG_FILE);
        let content = match fs::read_to_string(&config_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::WorkspaceNotFound)
            }
            Err(err) => return Err(err.into()),
        };
        let doc: DocumentMut = content.parse().map_err(|err| Error::Config {
            message: format!("{}: {err}", config_path.display()),
        })?;
        let info: WorkspaceInfo =
            toml_edit::de::from_document(doc).map_err(|err| Error::Config {
                message: format!("{}: {err}", config_path.display()),
            })?;
        let workspace = Workspace {
            path: path.to_path_buf(),
            info,
        };
        info!(
            "workspace {} main={:?}",
            workspace.path.display(),
            workspace.info.main_path
        );
        Ok(workspace)
    }

    /// Initialize a new workspace at `path`.
    ///
    /// `main_path` is the main project clone (relative or absolute, must be
    /// inside `path`), or `None` for a main-less workspace.
    pub fn init(
        path: &Path,
        main_path: Option<&Path>,
        manifest_path: &str,
        group_filters: Vec<String>,
        clone_depth: Option<u32>,
    ) -> Result<Workspace> {
        if path.join(GIT_WS_DIR).join(CONFIG_FILE).exists() {
            let existing = Workspace::open(path)?;
            return Err(Error::WorkspaceExists {
                path: path.to_path_buf(),
                main_path: PathBuf::from(existing.info.main_path),
            });
        }

        let main_rel = match main_path {
            Some(main_path) => {
                let absolute = if main_path.is_absolute() {
                    main_path.to_path_buf()
                } else {
                    path.join(main_path)
                };
                let canonical_root = path.canonicalize()?;
                let canonical_main = absolute.canonicalize()?;
                let rel = canonical_main
                    .strip_prefix(&canonical_root)
                    .map_err(|_| Error::PathOutsideWorkspace {
                        workspace: path.to_path_buf(),
                        path: main_path.to_path_buf(),
                    })?;
                rel.to_string_lossy().into_owned()
            }
            None => String::new(),
        };

        let info = WorkspaceInfo {
            main_path: main_rel,
            manifest_path: manifest_path.to_string(),
            group_filters,
            clone_depth,
        };
        let workspace = Workspace {
            path: path.to_path_buf(),
            info,
        };
        workspace.save()?;
        info!("initialized workspace at {}", path.display());
        Ok(workspace)
    }

    /// Remove the metadata folder, forgetting the workspace.
    pub fn deinit(self) -> Result<()> {
        fs::remove_dir_all(self.path.join(GIT_WS_DIR))?;
        Ok(())
    }

    /// Workspace root directory.
    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Metadata directory `<workspace>/.git-ws`.
    pub fn git_ws_dir(&self) -> PathBuf {
        self.path.join(GIT_WS_DIR)
    }

    /// Absolute path of the main project, `None` for main-less workspaces.
    pub fn main_path(&self) -> Option<PathBuf> {
        if self.info.main_path.is_empty() {
            None
        } else {
            Some(self.path.join(&self.info.main_path))
        }
    }

    /// Absolute manifest path. `override_path` (from `--manifest`) replaces
    /// the stored relative path.
    pub fn manifest_path(&self, override_path: Option<&Path>) -> PathBuf {
        let rel: &Path = override_path.unwrap_or_else(|| Path::new(&self.info.manifest_path));
        match self.main_path() {
            Some(main) => main.join(rel),
            None => self.path.join(rel),
        }
    }

    /// Absolute path of a workspace-relative project path.
    pub fn project_path(&self, rel: &str) -> PathBuf {
        self.path.join(rel)
    }

    /// Persist the metadata, atomically.
    pub fn save(&self) -> Result<()> {
        let dir = self.git_ws_dir();
        fs::create_dir_all(&dir)?;
        let mut doc =
            toml_edit::ser::to_document(&self.info).map_err(|err| Error::Config {
                message: err.to_string(),
            })?;
        if let Some((mut key, _)) = doc.get_key_value_mut("main_path") {
            key.leaf_decor_mut()
                .set_prefix("# Git Workspace system file. DO NOT EDIT.\n");
        }
        write_atomic(&dir.join(CONFIG_FILE), &doc.to_string())
    }

    /// Acquire the workspace lock for the duration of a mutating command.
    pub fn lock(&self) -> Result<WorkspaceLock> {
        WorkspaceLock::acquire(&self.git_ws_dir())
    }

    /// Enumerate directories which were materialized earlier but are no
    /// longer part of `used` (workspace-relative paths). The metadata
    /// folder and the main project are never reported.
    pub fn iter_obsoletes(&self, used: &[String]) -> Vec<PathBuf> {
        let mut keep = UseMap::default();
        keep.insert(GIT_WS_DIR);
        if !self.info.main_path.is_empty() {
            keep.insert(&self.info.main_path);
        }
        for path in used {
            keep.insert(path);
        }
        let mut obsoletes = Vec::new();
        collect_obsoletes(&self.path, &keep, &mut obsoletes);
        obsoletes
    }
}

/// Nested map of path components in use.
#[derive(Debug, Default)]
struct UseMap {
    children: std::collections::BTreeMap<String, UseMap>,
}

impl UseMap {
    fn insert(&mut self, path: &str) {
        let mut node = self;
        for part in path.split('/').filter(|part| !part.is_empty()) {
            node = node.children.entry(part.to_string()).or_default();
        }
    }
}

fn collect_obsoletes(dir: &Path, keep: &UseMap, obsoletes: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        match keep.children.get(&name) {
            Some(subtree) => {
                if !subtree.children.is_empty() {
                    collect_obsoletes(&path, subtree, obsoletes);
                }
            }
            None => {
                if path.is_dir() {
                    obsoletes.push(path);
                }
            }
        }
    }
}
