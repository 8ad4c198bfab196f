//! # Output Configuration
//!
//! Controls CLI output appearance. Colors honor the `--color` flag and the
//! usual environment switches: `NO_COLOR` (https://no-color.org/),
//! `CLICOLOR=0`, `CLICOLOR_FORCE=1` and `TERM=dumb`.
//!
//! Diagnostics are grouped under per-project banners so captured git
//! output stays attributable to the clone it came from.

use std::env;

use console::style;

/// Output configuration for controlling colored output.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `--color=always` forces colors on (overriding `NO_COLOR`),
    /// `--color=never` forces them off, and `auto` detects from the
    /// environment and terminal.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even empty) disables colors.
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        // User configuration (or GIT_WS_COLOR_UI) decides before terminal
        // detection does.
        if let Some(color_ui) = crate::settings::AppSettings::load().color_ui {
            return color_ui;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// Print the banner identifying a project section.
    pub fn banner(&self, label: &str) {
        let text = format!("===== {label} =====");
        if self.use_color {
            println!("{}", style(text).green().bold());
        } else {
            println!("{text}");
        }
    }

    /// Print an action line (cloning, fetching, checking out).
    pub fn action(&self, text: &str) {
        if self.use_color {
            println!("{}", style(text).magenta());
        } else {
            println!("{text}");
        }
    }

    /// Print a skip note.
    pub fn skip(&self, text: &str) {
        if self.use_color {
            println!("{}", style(text).blue());
        } else {
            println!("{text}");
        }
    }

    /// Print a warning to stderr.
    pub fn warning(&self, text: &str) {
        if self.use_color {
            eprintln!("{}", style(format!("WARNING: {text}")).yellow());
        } else {
            eprintln!("WARNING: {text}");
        }
    }

    /// Print an error to stderr.
    pub fn error(&self, text: &str) {
        if self.use_color {
            eprintln!("{}", style(format!("ERROR: {text}")).red().bold());
        } else {
            eprintln!("ERROR: {text}");
        }
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
