//! # Manifest Transform Operations
//!
//! `resolve` flattens the recursive manifest graph into a single
//! self-contained manifest; `freeze` additionally pins every revision to
//! the commit SHA currently checked out; `tag` persists a frozen manifest
//! inside the main project and tags it, so any historical workspace can be
//! reproduced later.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::git::Git;
use crate::groups::GroupFilter;
use crate::manifest::ManifestSpec;
use crate::output::OutputConfig;
use crate::resolver::Resolver;
use crate::workspace::{Workspace, GIT_WS_DIR, MANIFESTS_DIR};

/// Flatten the manifest graph into one self-contained manifest.
///
/// The result carries every resolved non-main project in BFS order with an
/// absolute URL, the revision it resolved to and its group membership. The
/// `defaults` section is empty and the group filters are flattened into a
/// single list (manifest filters first, active filters last).
pub fn resolve_manifest(
    workspace: &Workspace,
    cli_filters: &[GroupFilter],
    manifest_override: Option<PathBuf>,
) -> Result<ManifestSpec> {
    let manifest_path = workspace.manifest_path(manifest_override.as_deref());
    let source = ManifestSpec::load(&manifest_path)?;

    let resolution = Resolver::new(workspace)
        .with_cli_filters(cli_filters.to_vec())
        .with_manifest(manifest_override)
        .skip_main(true)
        .require_absolute_urls(true)
        .resolve()?;

    let mut group_filters = source.group_filters.clone();
    let active: Vec<String> = if cli_filters.is_empty() {
        workspace.info.group_filters.clone()
    } else {
        cli_filters.iter().map(|filter| filter.to_string()).collect()
    };
    for filter in active {
        if !group_filters.contains(&filter) {
            group_filters.push(filter);
        }
    }

    let mut flat = ManifestSpec {
        group_filters,
        linkfiles: source.linkfiles.clone(),
        copyfiles: source.copyfiles.clone(),
        ..ManifestSpec::default()
    };
    flat.dependencies = resolution
        .projects
        .iter()
        .map(|project| project.to_spec())
        .collect();
    Ok(flat)
}

/// Like [`resolve_manifest`], with every revision overwritten by the
/// commit SHA currently checked out. Fails if any project is not cloned.
pub fn freeze_manifest(
    workspace: &Workspace,
    cli_filters: &[GroupFilter],
    manifest_override: Option<PathBuf>,
) -> Result<ManifestSpec> {
    let mut manifest = resolve_manifest(workspace, cli_filters, manifest_override)?;
    for dep in &mut manifest.dependencies {
        let path = workspace.project_path(dep.effective_path());
        let git = Git::new(&path);
        if !git.is_cloned() {
            return Err(Error::GitCloneMissing { path });
        }
        let sha = git
            .head_sha()?
            .ok_or(Error::GitCloneMissing { path })?;
        dep.revision = Some(sha);
    }
    Ok(manifest)
}

/// Freeze the workspace into `<main>/.git-ws/manifests/<name>.toml`,
/// commit that file in the main project and create git tag `name`.
pub fn tag_workspace(
    workspace: &Workspace,
    output: &OutputConfig,
    name: &str,
    message: &str,
) -> Result<PathBuf> {
    let main_path = workspace.main_path().ok_or_else(|| Error::Config {
        message: "a main-less workspace cannot be tagged".to_string(),
    })?;
    let git = Git::new(&main_path);
    if git.tag_exists(name)? {
        return Err(Error::TagExists {
            name: name.to_string(),
        });
    }

    let frozen = freeze_manifest(workspace, &[], None)?;
    let rel_path = PathBuf::from(GIT_WS_DIR)
        .join(MANIFESTS_DIR)
        .join(format!("{name}.toml"));
    let full_path = main_path.join(&rel_path);
    frozen.save(&full_path, false)?;

    output.action(&format!("Committing '{}'.", rel_path.display()));
    git.add(&[rel_path])?;
    git.commit(message)?;
    output.action(&format!("Tagging '{name}'."));
    git.tag(name, Some(message))?;
    Ok(full_path)
}

/// If the main clone sits exactly on a tag with a frozen manifest, return
/// that manifest's path relative to the main project. It supersedes the
/// live manifest during `update` and `checkout`.
pub fn frozen_manifest_for_head(workspace: &Workspace) -> Option<PathBuf> {
    let main_path = workspace.main_path()?;
    let tag = Git::new(&main_path).tag_at_head().ok().flatten()?;
    let rel_path = PathBuf::from(GIT_WS_DIR)
        .join(MANIFESTS_DIR)
        .join(format!("{tag}.toml"));
    if main_path.join(&rel_path).exists() {
        Some(rel_path)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_PATH_DEFAULT;
    use std::fs;
    use std::path::Path;

    // `resolve_manifest` reads origins through the git driver; the
    // fixtures use explicit absolute URLs, which need no origin at all.
    fn fixture() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(&app).unwrap();
        fs::write(
            app.join(MANIFEST_PATH_DEFAULT),
            concat!(
                "group-filters = [\"-doc\"]\n",
                "[[dependencies]]\nname = \"lib\"\nurl = \"https://example.com/lib\"\nrevision = \"v1\"\n",
                "[[dependencies]]\nname = \"docs\"\nurl = \"https://example.com/docs\"\nrevision = \"main\"\ngroups = [\"doc\"]\n",
            ),
        )
        .unwrap();
        let workspace = Workspace::init(
            dir.path(),
            Some(Path::new("app")),
            MANIFEST_PATH_DEFAULT,
            Vec::new(),
            None,
        )
        .unwrap();
        (dir, workspace)
    }

    #[test]
    fn test_resolve_flattens() {
        let (_dir, workspace) = fixture();
        let flat = resolve_manifest(&workspace, &[], None).unwrap();
        assert_eq!(flat.dependencies.len(), 1);
        let dep = &flat.dependencies[0];
        assert_eq!(dep.name, "lib");
        assert_eq!(dep.url.as_deref(), Some("https://example.com/lib"));
        assert_eq!(dep.revision.as_deref(), Some("v1"));
        assert_eq!(flat.defaults, Default::default());
        assert_eq!(flat.group_filters, vec!["-doc"]);
    }

    #[test]
    fn test_resolve_with_cli_filter_keeps_selection() {
        let (_dir, workspace) = fixture();
        let filters = vec![GroupFilter::parse("+doc").unwrap()];
        let flat = resolve_manifest(&workspace, &filters, None).unwrap();
        let names: Vec<&str> = flat
            .dependencies
            .iter()
            .map(|dep| dep.name.as_str())
            .collect();
        assert_eq!(names, vec!["lib", "docs"]);
        assert_eq!(flat.group_filters, vec!["-doc", "+doc"]);
    }

    #[test]
    fn test_resolve_round_trip() {
        let (dir, workspace) = fixture();
        let flat = resolve_manifest(&workspace, &[], None).unwrap();

        // Resolving the flattened manifest again yields the same set.
        let resolved_path = Path::new("resolved.toml");
        flat.save(&dir.path().join("app").join(resolved_path), false)
            .unwrap();
        let again =
            resolve_manifest(&workspace, &[], Some(resolved_path.to_path_buf())).unwrap();
        assert_eq!(again.dependencies, flat.dependencies);
    }

    #[test]
    fn test_freeze_requires_clones() {
        let (_dir, workspace) = fixture();
        let err = freeze_manifest(&workspace, &[], None).unwrap_err();
        assert!(matches!(err, Error::GitCloneMissing { .. }));
    }

    #[test]
    fn test_frozen_manifest_for_head_without_main() {
        let dir = tempfile::tempdir().unwrap();
        let workspace =
            Workspace::init(dir.path(), None, MANIFEST_PATH_DEFAULT, Vec::new(), None).unwrap();
        assert_eq!(frozen_manifest_for_head(&workspace), None);
    }
}
