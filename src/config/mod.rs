//! Board configuration from `tablo.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [feed], [layout], [animation]
//! ├── error.rs       # ConfigError, ConfigDiagnostics
//! └── mod.rs         # DisplayConfig (this file)
//! ```
//!
//! Every section has defaults and the file itself is optional: a board with
//! no config connects to the default feed address. Unknown keys are reported
//! and ignored, never fatal, since displays run unattended.

mod error;
pub mod section;

pub use error::{ConfigDiagnostics, ConfigError, FieldPath};
pub use section::{AnimationConfig, FeedConfig, LayoutSectionConfig};

use crate::cli::Cli;
use crate::{debug, log};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing tablo.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Path the config was loaded from (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub layout: LayoutSectionConfig,

    #[serde(default)]
    pub animation: AnimationConfig,
}

impl DisplayConfig {
    /// Load configuration for the given command line.
    ///
    /// A missing file yields the defaults. CLI flags override file values,
    /// then everything is validated at once.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_path(&cli.config)?
        } else {
            debug!("config"; "{} not found, using defaults", cli.config.display());
            Self::default()
        };

        config.config_path = cli.config.clone();
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = cli.url_override() {
            self.feed.url = url.to_string();
        }
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Validate all sections, reporting every problem together.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();
        self.feed.validate(&mut diag);
        self.layout.validate(&mut diag);
        self.animation.validate(&mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Parsed feed address
    pub fn feed_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.feed.url)
            .map_err(|e| ConfigError::Validation(format!("feed.url `{}`: {e}", self.feed.url)))
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text. Panics on unknown fields to catch typos in tests.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DisplayConfig {
    let (parsed, ignored) = DisplayConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("tablo").chain(args.iter().copied()))
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result = DisplayConfig::parse_with_ignored("[feed\nurl = \"ws://x\"");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (config, ignored) =
            DisplayConfig::parse_with_ignored("[feed]\nmax_attempts = 3\nretry = true\n[theme]\nx = 1")
                .unwrap();
        assert_eq!(config.feed.max_attempts, 3);
        assert_eq!(ignored, ["feed.retry", "theme"]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablo.toml");
        let config = DisplayConfig::load(&cli(&["-C", path.to_str().unwrap(), "decode"])).unwrap();
        assert_eq!(config.feed, FeedConfig::default());
        assert_eq!(config.config_path, path);
    }

    #[test]
    fn test_load_from_file_with_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablo.toml");
        fs::write(&path, "[feed]\nurl = \"ws://10.0.0.1:8000/ws/\"\n[layout]\npadding = 80.0\n")
            .unwrap();

        let config = DisplayConfig::load(&cli(&["-C", path.to_str().unwrap(), "decode"])).unwrap();
        assert_eq!(config.feed.url, "ws://10.0.0.1:8000/ws/");
        assert_eq!(config.layout.padding, 80.0);

        let config = DisplayConfig::load(&cli(&[
            "-C",
            path.to_str().unwrap(),
            "watch",
            "--url",
            "ws://10.0.0.9/ws/",
        ]))
        .unwrap();
        assert_eq!(config.feed.url, "ws://10.0.0.9/ws/");
        assert_eq!(config.feed_url().unwrap().host_str(), Some("10.0.0.9"));
    }

    #[test]
    fn test_validation_errors_reported_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablo.toml");
        fs::write(
            &path,
            "[feed]\nurl = \"http://x\"\nmax_attempts = 0\n[animation]\nframe_ms = 0\n",
        )
        .unwrap();

        let err = DisplayConfig::load(&cli(&["-C", path.to_str().unwrap(), "decode"])).unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Diagnostics(diag)) => assert_eq!(diag.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }
}
