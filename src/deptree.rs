//! # Dependency Tree View
//!
//! A derived, display-only view of the dependency graph for `info
//! dep-tree`. The resolver itself stores no back-references, so the tree
//! is composed here by re-walking the manifests with the same first-wins
//! and filter rules. Duplicates and filtered-out dependencies stay visible
//! as annotated leaves; `--primary` additionally names the filter rule
//! which decided each grouped dependency.

use std::borrow::Cow;
use std::io;

use ptree::{print_tree, TreeItem};

use crate::error::{Error, Result};
use crate::groups::{GroupFilter, GroupSelection};
use crate::manifest::ManifestSpec;
use crate::resolver::{OriginUrls, Project};
use crate::workspace::Workspace;

/// One displayable node of the dependency tree.
#[derive(Debug, Clone)]
pub struct DepTreeNode {
    label: String,
    children: Vec<DepTreeNode>,
}

impl DepTreeNode {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn children(&self) -> &[DepTreeNode] {
        &self.children
    }
}

impl TreeItem for DepTreeNode {
    type Child = DepTreeNode;

    fn write_self<W: io::Write>(&self, f: &mut W, _style: &ptree::Style) -> io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}

/// Build the dependency tree of the workspace.
pub fn build(
    workspace: &Workspace,
    origins: &dyn OriginUrls,
    cli_filters: &[GroupFilter],
    primary: bool,
) -> Result<DepTreeNode> {
    let root_label = match workspace.main_path() {
        Some(main) => format!(
            "{} (MAIN)",
            main.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        ),
        None => "<workspace>".to_string(),
    };
    let mut root = DepTreeNode {
        label: root_label,
        children: Vec::new(),
    };

    let manifest_path = workspace.manifest_path(None);
    let manifest = match ManifestSpec::load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(Error::ManifestNotFound { .. }) => return Ok(root),
        Err(err) => return Err(err),
    };

    let cli = if cli_filters.is_empty() {
        GroupFilter::parse_list(&workspace.info.group_filters)?
    } else {
        cli_filters.to_vec()
    };
    let manifest_filters = GroupFilter::parse_list(&manifest.group_filters)?;
    let selection = GroupSelection::new(&manifest_filters, &cli);

    let mut seen: Vec<String> = Vec::new();
    if !workspace.info.main_path.is_empty() {
        seen.push(workspace.info.main_path.clone());
    }
    let base_dir = workspace
        .main_path()
        .unwrap_or_else(|| workspace.root().to_path_buf());

    grow(
        workspace,
        origins,
        &base_dir,
        &manifest,
        &selection,
        primary,
        &mut seen,
        &mut root,
    )?;
    Ok(root)
}

/// Print `tree` to stdout via ptree.
pub fn print(tree: &DepTreeNode) -> Result<()> {
    print_tree(tree)?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn grow(
    workspace: &Workspace,
    origins: &dyn OriginUrls,
    project_dir: &std::path::Path,
    manifest: &ManifestSpec,
    selection: &GroupSelection,
    primary: bool,
    seen: &mut Vec<String>,
    parent: &mut DepTreeNode,
) -> Result<()> {
    let base_url = if manifest.dependencies.is_empty() {
        None
    } else {
        origins.origin_url(project_dir)
    };

    for spec in &manifest.dependencies {
        let project = Project::from_spec(manifest, spec, base_url.as_deref(), 0)?;

        if seen.contains(&project.path) {
            parent.children.push(DepTreeNode {
                label: format!("{} (DUPLICATE)", project.info()),
                children: Vec::new(),
            });
            continue;
        }
        seen.push(project.path.clone());

        let decision = selection.decide(&project.path, &project.groups, false);
        if !decision.selected {
            let label = match &decision.winner {
                Some(rule) => format!(
                    "{} (deselected by '{}' from {})",
                    project.info(),
                    rule.filter,
                    rule.source
                ),
                None => format!("{} (deselected)", project.info()),
            };
            parent.children.push(DepTreeNode {
                label,
                children: Vec::new(),
            });
            continue;
        }

        let mut label = project.info();
        if primary {
            if let Some(rule) = &decision.winner {
                label = format!("{label} [{} from {}]", rule.filter, rule.source);
            }
        }
        let mut node = DepTreeNode {
            label,
            children: Vec::new(),
        };

        let dep_dir = workspace.project_path(&project.path);
        let dep_manifest_path = dep_dir.join(&project.manifest_path);
        match ManifestSpec::load(&dep_manifest_path) {
            Ok(dep_manifest) => {
                let child_selection = selection.child(&project.with_groups);
                grow(
                    workspace,
                    origins,
                    &dep_dir,
                    &dep_manifest,
                    &child_selection,
                    primary,
                    seen,
                    &mut node,
                )?;
            }
            Err(Error::ManifestNotFound { .. }) => {}
            Err(err) => return Err(err),
        }
        parent.children.push(node);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_PATH_DEFAULT;
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    struct StubOrigins {
        urls: HashMap<PathBuf, String>,
    }

    impl OriginUrls for StubOrigins {
        fn origin_url(&self, project_dir: &Path) -> Option<String> {
            self.urls.get(project_dir).cloned()
        }
    }

    #[test]
    fn test_tree_structure() {
        let dir = tempfile::tempdir().unwrap();
        let mut origins = StubOrigins {
            urls: HashMap::new(),
        };
        for (rel, manifest) in [
            (
                "app",
                concat!(
                    "[[dependencies]]\nname = \"lib\"\nrevision = \"main\"\n",
                    "[[dependencies]]\nname = \"tools\"\nrevision = \"main\"\ngroups = [\"dev\"]\n",
                ),
            ),
            ("lib", "[[dependencies]]\nname = \"app\"\n"),
        ] {
            let project_dir = dir.path().join(rel);
            fs::create_dir_all(&project_dir).unwrap();
            fs::write(project_dir.join(MANIFEST_PATH_DEFAULT), manifest).unwrap();
            origins
                .urls
                .insert(project_dir, format!("https://example.com/{rel}"));
        }
        let workspace = Workspace::init(
            dir.path(),
            Some(Path::new("app")),
            MANIFEST_PATH_DEFAULT,
            Vec::new(),
            None,
        )
        .unwrap();

        let tree = build(&workspace, &origins, &[], false).unwrap();
        assert_eq!(tree.label(), "app (MAIN)");
        assert_eq!(tree.children().len(), 2);

        let lib = &tree.children()[0];
        assert_eq!(lib.label(), "lib (revision='main')");
        // The cycle back to the main project shows up as a duplicate leaf.
        assert_eq!(lib.children().len(), 1);
        assert!(lib.children()[0].label().contains("DUPLICATE"));

        let tools = &tree.children()[1];
        assert!(tools.label().contains("deselected"));
    }

    #[test]
    fn test_tree_primary_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let mut origins = StubOrigins {
            urls: HashMap::new(),
        };
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(
            app.join(MANIFEST_PATH_DEFAULT),
            "[[dependencies]]\nname = \"tools\"\nrevision = \"main\"\ngroups = [\"dev\"]\n",
        )
        .unwrap();
        origins
            .urls
            .insert(app, "https://example.com/app".to_string());
        let workspace = Workspace::init(
            dir.path(),
            Some(Path::new("app")),
            MANIFEST_PATH_DEFAULT,
            Vec::new(),
            None,
        )
        .unwrap();

        let filters = vec![GroupFilter::parse("+dev").unwrap()];
        let tree = build(&workspace, &origins, &filters, true).unwrap();
        let tools = &tree.children()[0];
        assert!(tools.label().contains("[+dev from command line]"));
    }
}
