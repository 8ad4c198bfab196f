//! Group-filters command implementation
//!
//! Without arguments, prints the effective filter list: the manifest's
//! `group-filters` followed by the filters stored in the workspace
//! metadata. With arguments, rewrites the manifest's list (or, with
//! `--store`, the workspace metadata).

use anyhow::Result;
use clap::Args;

use git_ws::groups::GroupFilter;
use git_ws::manifest::ManifestSpec;
use git_ws::Error;

use super::find_workspace;

/// Arguments for the group-filters command
#[derive(Args, Debug)]
pub struct GroupFiltersArgs {
    /// Filter expressions like '+test' or '-doc@third_party'
    #[arg(value_name = "FILTER", allow_hyphen_values = true)]
    pub filters: Vec<String>,

    /// Write to the workspace metadata instead of the manifest
    #[arg(long)]
    pub store: bool,
}

/// Execute the group-filters command
pub fn execute(args: GroupFiltersArgs) -> Result<()> {
    let mut workspace = find_workspace()?;
    let manifest_path = workspace.manifest_path(None);

    if args.filters.is_empty() {
        let manifest = match ManifestSpec::load(&manifest_path) {
            Ok(manifest) => manifest,
            Err(Error::ManifestNotFound { .. }) => ManifestSpec::default(),
            Err(err) => return Err(err.into()),
        };
        for filter in &manifest.group_filters {
            println!("{filter}  (manifest)");
        }
        for filter in &workspace.info.group_filters {
            println!("{filter}  (workspace)");
        }
        return Ok(());
    }

    // Validate before anything is written.
    GroupFilter::parse_list(&args.filters)?;

    if args.store {
        let _lock = workspace.lock()?;
        workspace.info.group_filters = args.filters;
        workspace.save()?;
    } else {
        let mut manifest = ManifestSpec::load(&manifest_path)?;
        manifest.group_filters = args.filters;
        let _lock = workspace.lock()?;
        manifest.save(&manifest_path, true)?;
    }
    Ok(())
}
