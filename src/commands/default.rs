//! Default command implementation
//!
//! Shows or sets the `defaults` section of the manifest.

use anyhow::Result;
use clap::Args;

use git_ws::manifest::ManifestSpec;
use git_ws::Error;

use super::find_workspace;

/// Arguments for the default command
#[derive(Args, Debug)]
pub struct DefaultArgs {
    /// Defaults key: remote, revision, groups, with-groups or submodules
    #[arg(value_name = "KEY")]
    pub key: Option<String>,

    /// New value; an empty string clears the key
    #[arg(value_name = "VALUE")]
    pub value: Option<String>,
}

/// Execute the default command
pub fn execute(args: DefaultArgs) -> Result<()> {
    let workspace = find_workspace()?;
    let manifest_path = workspace.manifest_path(None);
    let mut manifest = ManifestSpec::load(&manifest_path)?;

    let Some(key) = args.key else {
        show(&manifest);
        return Ok(());
    };

    let Some(value) = args.value else {
        // Show a single key.
        let defaults = &manifest.defaults;
        match key.as_str() {
            "remote" => println!("{}", defaults.remote.as_deref().unwrap_or_default()),
            "revision" => println!("{}", defaults.revision.as_deref().unwrap_or_default()),
            "groups" => println!("{}", defaults.groups.join(",")),
            "with-groups" => println!("{}", defaults.with_groups.join(",")),
            "submodules" => match defaults.submodules {
                Some(submodules) => println!("{submodules}"),
                None => println!(),
            },
            _ => return Err(unknown_key(&key).into()),
        }
        return Ok(());
    };

    let defaults = &mut manifest.defaults;
    match key.as_str() {
        "remote" => defaults.remote = non_empty(value),
        "revision" => defaults.revision = non_empty(value),
        "groups" => defaults.groups = split_list(&value),
        "with-groups" => defaults.with_groups = split_list(&value),
        "submodules" => {
            defaults.submodules = if value.is_empty() {
                None
            } else {
                Some(value.parse().map_err(|_| Error::Config {
                    message: format!("'{value}' is not a boolean"),
                })?)
            }
        }
        _ => return Err(unknown_key(&key).into()),
    }

    manifest.validate(&manifest_path)?;
    let _lock = workspace.lock()?;
    manifest.save(&manifest_path, true)?;
    Ok(())
}

fn show(manifest: &ManifestSpec) {
    let defaults = &manifest.defaults;
    if let Some(remote) = &defaults.remote {
        println!("remote = {remote}");
    }
    if let Some(revision) = &defaults.revision {
        println!("revision = {revision}");
    }
    if !defaults.groups.is_empty() {
        println!("groups = {}", defaults.groups.join(","));
    }
    if !defaults.with_groups.is_empty() {
        println!("with-groups = {}", defaults.with_groups.join(","));
    }
    if let Some(submodules) = defaults.submodules {
        println!("submodules = {submodules}");
    }
}

fn unknown_key(key: &str) -> Error {
    Error::Config {
        message: format!(
            "unknown defaults key '{key}', expected remote, revision, groups, with-groups or submodules"
        ),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
