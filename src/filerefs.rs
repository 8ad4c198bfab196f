//! # Link and Copy File Reconciliation
//!
//! Projects may publish files into the workspace root, either symlinked
//! (`linkfiles`) or copied (`copyfiles`). The materializer hands the
//! wanted references here; this module creates, refreshes and removes them
//! and keeps a tracking record under `.git-ws/filerefs.toml` so obsolete
//! references can be cleaned up on the next run.
//!
//! Copy destinations are fingerprinted at write time. A destination whose
//! content no longer matches the recorded fingerprint was edited by the
//! user and is not overwritten without `--force`.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;

use crate::error::{Error, Result};
use crate::manifest::{write_atomic, FileRef};
use crate::output::OutputConfig;
use crate::workspace::Workspace;

const FILEREFS_FILE: &str = "filerefs.toml";

/// One tracked reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TrackedRef {
    /// Workspace-relative path of the declaring project.
    project: String,
    src: String,
    dest: String,
    /// Content fingerprint of the destination at write time (copies only).
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
}

/// Persisted tracking state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TrackState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    linkfiles: Vec<TrackedRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    copyfiles: Vec<TrackedRef>,
}

/// Wanted references of one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectFileRefs {
    /// Workspace-relative project path.
    pub project: String,
    pub linkfiles: Vec<FileRef>,
    pub copyfiles: Vec<FileRef>,
}

/// Reconciles the on-disk link/copy files with the wanted set.
pub struct FileRefUpdater<'a> {
    workspace: &'a Workspace,
    output: &'a OutputConfig,
    force: bool,
}

impl<'a> FileRefUpdater<'a> {
    pub fn new(workspace: &'a Workspace, output: &'a OutputConfig, force: bool) -> Self {
        FileRefUpdater {
            workspace,
            output,
            force,
        }
    }

    /// Bring the workspace in line with `wanted`. Returns the failures;
    /// each reference is handled independently.
    pub fn update(&self, wanted: &[ProjectFileRefs]) -> Result<Vec<Error>> {
        let mut failures = Vec::new();
        let mut state = self.load_state()?;

        self.remove_obsolete(&mut state, wanted, &mut failures);

        for refs in wanted {
            for fileref in &refs.linkfiles {
                match self.update_link(&refs.project, fileref) {
                    Ok(()) => track(&mut state.linkfiles, &refs.project, fileref, None),
                    Err(err) => failures.push(err),
                }
            }
            for fileref in &refs.copyfiles {
                match self.update_copy(&state, &refs.project, fileref) {
                    Ok(hash) => track(&mut state.copyfiles, &refs.project, fileref, hash),
                    Err(err) => failures.push(err),
                }
            }
        }

        self.save_state(&state)?;
        Ok(failures)
    }

    fn remove_obsolete(
        &self,
        state: &mut TrackState,
        wanted: &[ProjectFileRefs],
        failures: &mut Vec<Error>,
    ) {
        let is_wanted = |tracked: &TrackedRef, copies: bool| {
            wanted.iter().any(|refs| {
                refs.project == tracked.project
                    && (if copies {
                        &refs.copyfiles
                    } else {
                        &refs.linkfiles
                    })
                    .iter()
                    .any(|fileref| fileref.src == tracked.src && fileref.dest == tracked.dest)
            })
        };

        let root = self.workspace.root().to_path_buf();
        for (copies, refs) in [
            (false, &mut state.linkfiles),
            (true, &mut state.copyfiles),
        ] {
            refs.retain(|tracked| {
                if is_wanted(tracked, copies) {
                    return true;
                }
                let dest = root.join(&tracked.dest);
                if dest.symlink_metadata().is_ok() {
                    if copies && !self.force {
                        if let Some(recorded) = &tracked.hash {
                            if hash_file(&dest).as_ref() != Some(recorded) {
                                failures.push(Error::CopyFileModified { dest });
                                return true;
                            }
                        }
                    }
                    self.output.action(&format!("Removing '{}'.", tracked.dest));
                    if let Err(err) = fs::remove_file(&dest) {
                        failures.push(err.into());
                        return true;
                    }
                }
                false
            });
        }
    }

    fn update_link(&self, project: &str, fileref: &FileRef) -> Result<()> {
        let (src, dest) = self.resolve_pair(project, fileref)?;
        if !src.exists() {
            warn!("link source '{}' does not exist", fileref.src);
            return Ok(());
        }
        if dest.symlink_metadata().is_ok() {
            // Refresh links pointing somewhere else; leave correct ones be.
            if fs::read_link(&dest).map(|target| target == src).unwrap_or(false) {
                return Ok(());
            }
            fs::remove_file(&dest)?;
        }
        self.output
            .action(&format!("Linking '{}' -> '{}'.", fileref.src, fileref.dest));
        symlink(&src, &dest)?;
        Ok(())
    }

    /// Returns the new destination fingerprint, or `None` when nothing was
    /// written.
    fn update_copy(
        &self,
        state: &TrackState,
        project: &str,
        fileref: &FileRef,
    ) -> Result<Option<String>> {
        let (src, dest) = self.resolve_pair(project, fileref)?;
        if !src.exists() {
            warn!("copy source '{}' does not exist", fileref.src);
            return Ok(None);
        }
        let src_hash = hash_file(&src);
        if dest.exists() {
            let dest_hash = hash_file(&dest);
            if dest_hash == src_hash {
                return Ok(dest_hash);
            }
            if !self.force {
                let recorded = state
                    .copyfiles
                    .iter()
                    .find(|tracked| {
                        tracked.project == project
                            && tracked.src == fileref.src
                            && tracked.dest == fileref.dest
                    })
                    .and_then(|tracked| tracked.hash.clone());
                if recorded.is_some() && dest_hash != recorded {
                    return Err(Error::CopyFileModified { dest });
                }
            }
        }
        self.output
            .action(&format!("Copying '{}' -> '{}'.", fileref.src, fileref.dest));
        fs::copy(&src, &dest)?;
        Ok(src_hash)
    }

    /// Resolve source and destination, guarding against references which
    /// escape the workspace.
    fn resolve_pair(&self, project: &str, fileref: &FileRef) -> Result<(PathBuf, PathBuf)> {
        let root = self.workspace.root();
        let src = normalized(&root.join(project).join(&fileref.src));
        let dest = normalized(&root.join(&fileref.dest));
        for path in [&src, &dest] {
            if !path.starts_with(root) {
                return Err(Error::PathOutsideWorkspace {
                    workspace: root.to_path_buf(),
                    path: path.clone(),
                });
            }
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok((src, dest))
    }

    fn state_path(&self) -> PathBuf {
        self.workspace.git_ws_dir().join(FILEREFS_FILE)
    }

    fn load_state(&self) -> Result<TrackState> {
        let path = self.state_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TrackState::default())
            }
            Err(err) => return Err(err.into()),
        };
        let doc: DocumentMut = content.parse().map_err(|err| Error::Config {
            message: format!("{}: {err}", path.display()),
        })?;
        toml_edit::de::from_document(doc).map_err(|err| Error::Config {
            message: format!("{}: {err}", path.display()),
        })
    }

    fn save_state(&self, state: &TrackState) -> Result<()> {
        fs::create_dir_all(self.workspace.git_ws_dir())?;
        let doc = toml_edit::ser::to_document(state).map_err(|err| Error::Config {
            message: err.to_string(),
        })?;
        write_atomic(&self.state_path(), &doc.to_string())
    }
}

fn track(refs: &mut Vec<TrackedRef>, project: &str, fileref: &FileRef, hash: Option<String>) {
    let tracked = TrackedRef {
        project: project.to_string(),
        src: fileref.src.clone(),
        dest: fileref.dest.clone(),
        hash,
    };
    match refs.iter_mut().find(|existing| {
        existing.project == tracked.project
            && existing.src == tracked.src
            && existing.dest == tracked.dest
    }) {
        Some(existing) => *existing = tracked,
        None => refs.push(tracked),
    }
}

/// Lexically collapse `.` and `..` segments without touching the disk.
fn normalized(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                result.pop();
            }
            other => result.push(other),
        }
    }
    result
}

fn hash_file(path: &Path) -> Option<String> {
    let content = fs::read(path).ok()?;
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    Some(format!("{:016x}", hasher.finish()))
}

#[cfg(unix)]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dest)
}

#[cfg(not(unix))]
fn symlink(src: &Path, dest: &Path) -> std::io::Result<()> {
    // Symbolic links need elevated rights on some platforms; fall back to
    // a copy there.
    fs::copy(src, dest).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_PATH_DEFAULT;

    struct Fixture {
        dir: tempfile::TempDir,
        workspace: Workspace,
        output: OutputConfig,
    }

    impl Fixture {
        fn new() -> Fixture {
            let dir = tempfile::tempdir().unwrap();
            let workspace =
                Workspace::init(dir.path(), None, MANIFEST_PATH_DEFAULT, Vec::new(), None)
                    .unwrap();
            Fixture {
                dir,
                workspace,
                output: OutputConfig::without_color(),
            }
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }

        fn refs(&self, links: &[(&str, &str)], copies: &[(&str, &str)]) -> Vec<ProjectFileRefs> {
            vec![ProjectFileRefs {
                project: "app".to_string(),
                linkfiles: links
                    .iter()
                    .map(|(src, dest)| FileRef {
                        src: src.to_string(),
                        dest: dest.to_string(),
                        groups: Vec::new(),
                    })
                    .collect(),
                copyfiles: copies
                    .iter()
                    .map(|(src, dest)| FileRef {
                        src: src.to_string(),
                        dest: dest.to_string(),
                        groups: Vec::new(),
                    })
                    .collect(),
            }]
        }

        fn updater(&self, force: bool) -> FileRefUpdater<'_> {
            FileRefUpdater::new(&self.workspace, &self.output, force)
        }
    }

    #[test]
    fn test_copy_created_and_removed() {
        let fixture = Fixture::new();
        fixture.write("app/rules.mk", "rules");

        let wanted = fixture.refs(&[], &[("rules.mk", "rules.mk")]);
        let failures = fixture.updater(false).update(&wanted).unwrap();
        assert!(failures.is_empty());
        assert_eq!(
            fs::read_to_string(fixture.dir.path().join("rules.mk")).unwrap(),
            "rules"
        );

        // Dropping the reference removes the destination.
        let failures = fixture.updater(false).update(&[]).unwrap();
        assert!(failures.is_empty());
        assert!(!fixture.dir.path().join("rules.mk").exists());
    }

    #[test]
    fn test_modified_copy_is_protected() {
        let fixture = Fixture::new();
        fixture.write("app/rules.mk", "rules");
        let wanted = fixture.refs(&[], &[("rules.mk", "rules.mk")]);
        fixture.updater(false).update(&wanted).unwrap();

        // User edits the destination, source changes too.
        fixture.write("rules.mk", "user edit");
        fixture.write("app/rules.mk", "new rules");

        let failures = fixture.updater(false).update(&wanted).unwrap();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Error::CopyFileModified { .. }));
        assert_eq!(
            fs::read_to_string(fixture.dir.path().join("rules.mk")).unwrap(),
            "user edit"
        );

        let failures = fixture.updater(true).update(&wanted).unwrap();
        assert!(failures.is_empty());
        assert_eq!(
            fs::read_to_string(fixture.dir.path().join("rules.mk")).unwrap(),
            "new rules"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_link_created() {
        let fixture = Fixture::new();
        fixture.write("app/scripts/env.sh", "env");
        let wanted = fixture.refs(&[("scripts/env.sh", "env.sh")], &[]);
        let failures = fixture.updater(false).update(&wanted).unwrap();
        assert!(failures.is_empty());
        let dest = fixture.dir.path().join("env.sh");
        assert!(dest.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(dest).unwrap(), "env");
    }

    #[test]
    fn test_missing_source_is_a_warning_only() {
        let fixture = Fixture::new();
        let wanted = fixture.refs(&[("nope.sh", "nope.sh")], &[("nope.mk", "nope.mk")]);
        let failures = fixture.updater(false).update(&wanted).unwrap();
        assert!(failures.is_empty());
        assert!(!fixture.dir.path().join("nope.sh").exists());
        assert!(!fixture.dir.path().join("nope.mk").exists());
    }

    #[test]
    fn test_escaping_destination_rejected() {
        let fixture = Fixture::new();
        fixture.write("app/rules.mk", "rules");
        let wanted = fixture.refs(&[], &[("rules.mk", "../outside.mk")]);
        let failures = fixture.updater(false).update(&wanted).unwrap();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], Error::PathOutsideWorkspace { .. }));
    }

    #[test]
    fn test_copy_refresh_follows_source() {
        let fixture = Fixture::new();
        fixture.write("app/rules.mk", "v1");
        let wanted = fixture.refs(&[], &[("rules.mk", "rules.mk")]);
        fixture.updater(false).update(&wanted).unwrap();

        // Untouched destination follows the source.
        fixture.write("app/rules.mk", "v2");
        let failures = fixture.updater(false).update(&wanted).unwrap();
        assert!(failures.is_empty());
        assert_eq!(
            fs::read_to_string(fixture.dir.path().join("rules.mk")).unwrap(),
            "v2"
        );
    }
}
