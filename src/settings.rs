//! # Application Settings
//!
//! Optional user-level defaults, layered below the workspace metadata:
//!
//! 1. user configuration file (`<config dir>/git-ws/config.toml`)
//! 2. workspace metadata (`.git-ws/config.toml`, see [`crate::workspace`])
//! 3. `GIT_WS_*` environment variables (highest precedence)
//!
//! Every value is optional; consumers fall back to built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;

use crate::error::{Error, Result};

/// User-configurable application options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Default manifest path for `init`/`clone`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<String>,

    /// Whether output is colored when `--color=auto`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_ui: Option<bool>,

    /// Default shallow clone depth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clone_depth: Option<u32>,

    /// Default group filters for freshly initialized workspaces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_filters: Vec<String>,
}

impl AppSettings {
    /// Load user settings and apply environment overrides.
    pub fn load() -> AppSettings {
        let mut settings = Self::user_config_path()
            .and_then(|path| Self::load_file(&path).ok())
            .unwrap_or_default();
        settings.apply_env();
        settings
    }

    /// Path of the user configuration file, if a config directory exists.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("git-ws").join("config.toml"))
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_file(path: &Path) -> Result<AppSettings> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AppSettings::default())
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

    /// Apply `GIT_WS_<OPTION>` environment overrides.
    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var("GIT_WS_MANIFEST_PATH") {
            if !value.is_empty() {
                self.manifest_path = Some(value);
            }
        }
        if let Ok(value) = std::env::var("GIT_WS_COLOR_UI") {
            if let Ok(parsed) = value.parse::<bool>() {
                self.color_ui = Some(parsed);
            }
        }
        if let Ok(value) = std::env::var("GIT_WS_CLONE_DEPTH") {
            if let Ok(parsed) = value.parse::<u32>() {
                self.clone_depth = Some(parsed);
            }
        }
        if let Ok(value) = std::env::var("GIT_WS_GROUP_FILTERS") {
            if !value.is_empty() {
                self.group_filters = value
                    .split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect();
            }
        }
    }
}
