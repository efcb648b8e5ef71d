//! Packaging configuration
//!
//! A run is fully described by a [`PackConfig`]. It is read from
//! `unrealpack.toml` at the plugin root when that file exists; every field has
//! a default, so a plugin without a config file is packaged exactly the way the
//! Pubnub plugin always was.
//!
//! # Examples
//!
//! ```no_run
//! use unrealpack::PackConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = PackConfig::load("path/to/plugin")?;
//! config.target_versions = vec!["5.3.0".to_string()];
//! println!("Packaging {} for {:?}", config.product_name, config.target_versions);
//! # Ok(())
//! # }
//! ```

use crate::license::CommentStyle;
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the config file looked up at the plugin root
pub const CONFIG_FILE_NAME: &str = "unrealpack.toml";

/// Accepted shape of an engine version string (e.g. "5.3" or "5.3.0")
const ENGINE_VERSION_PATTERN: &str = r"^\d+\.\d+(\.\d+)?$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackConfig {
    /// Folder name inside the archives and first part of each archive name
    #[serde(default = "default_product_name")]
    pub product_name: String,

    /// Literal placed before the engine version in archive names
    #[serde(default = "default_engine_tag")]
    pub engine_tag: String,

    /// Manifest path relative to the plugin root; auto-detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_file: Option<String>,

    /// Engine versions to package for, in output order
    #[serde(default = "default_target_versions")]
    pub target_versions: Vec<String>,

    /// Where archives are written; defaults to the plugin root's parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    #[serde(default)]
    pub staging: StagingConfig,

    #[serde(default)]
    pub license: LicenseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Glob patterns, relative to the plugin root, left out of the staged copy
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Fail when an exclusion pattern matches nothing in the source tree
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Stamp native sources with the license header
    #[serde(default = "default_license_enabled")]
    pub enabled: bool,

    /// License file relative to the plugin root. When unset, `LICENSE` is
    /// used if it exists and stamping is skipped if it does not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default)]
    pub style: CommentStyle,

    /// Glob patterns selecting the files to stamp
    #[serde(default = "default_license_patterns")]
    pub patterns: Vec<String>,
}

fn default_product_name() -> String {
    "Pubnub".to_string()
}

fn default_engine_tag() -> String {
    "ue".to_string()
}

fn default_target_versions() -> Vec<String> {
    ["5.0.0", "5.1.0", "5.2.0", "5.3.0", "5.4.0", "5.5.0"]
        .iter()
        .map(|v| v.to_string())
        .collect()
}

fn default_exclude() -> Vec<String> {
    [
        // Licensing and packaging tooling
        "LICENSE",
        "make_packages.py",
        CONFIG_FILE_NAME,
        // Version control and CI
        ".gitignore",
        ".git",
        ".github",
        ".pubnub.yml",
        // Documentation
        "README.md",
        "readme_content",
        // Editor-only config
        "Config/FilterPlugin.ini",
        // Unreal build artifacts
        "Binaries",
        "Intermediate",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_license_enabled() -> bool {
    true
}

pub const DEFAULT_LICENSE_FILE: &str = "LICENSE";

fn default_license_patterns() -> Vec<String> {
    ["**/*.cpp", "**/*.hpp", "**/*.c", "**/*.h"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            product_name: default_product_name(),
            engine_tag: default_engine_tag(),
            manifest_file: None,
            target_versions: default_target_versions(),
            output_dir: None,
            staging: StagingConfig::default(),
            license: LicenseConfig::default(),
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            strict: false,
        }
    }
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            enabled: default_license_enabled(),
            file: None,
            style: CommentStyle::default(),
            patterns: default_license_patterns(),
        }
    }
}

impl PackConfig {
    /// Load `unrealpack.toml` from the plugin root, or defaults if absent
    pub fn load<P: AsRef<Path>>(source_root: P) -> Result<Self> {
        let path = source_root.as_ref().join(CONFIG_FILE_NAME);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(path)
    }

    /// Load config from an explicit file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&content)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded config");
        Ok(config)
    }

    /// Save config as `unrealpack.toml` in the given directory
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(dir.as_ref().join(CONFIG_FILE_NAME), content)?;
        Ok(())
    }

    /// Reject configurations that cannot produce one distinct archive per
    /// target version
    pub fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(Error::InvalidConfig("product_name is empty".to_string()));
        }

        if self
            .product_name
            .chars()
            .any(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(Error::InvalidConfig(format!(
                "product_name '{}' must be a plain folder name",
                self.product_name
            )));
        }

        if self.target_versions.is_empty() {
            return Err(Error::InvalidConfig(
                "target_versions must list at least one engine version".to_string(),
            ));
        }

        let re = Regex::new(ENGINE_VERSION_PATTERN)?;
        let mut seen = HashSet::new();

        for version in &self.target_versions {
            if !re.is_match(version) {
                return Err(Error::InvalidConfig(format!(
                    "'{}' is not an engine version (expected e.g. 5.3 or 5.3.0)",
                    version
                )));
            }
            if !seen.insert(version.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "engine version {} is listed twice",
                    version
                )));
            }
        }

        Ok(())
    }

    /// Output directory for archives, with `~` expanded
    ///
    /// Falls back to the plugin root's parent, next to the staging directory.
    pub fn resolve_output_dir(&self, source_root: &Path) -> Result<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Ok(PathBuf::from(shellexpand::tilde(dir).to_string()));
        }

        source_root.parent().map(Path::to_path_buf).ok_or_else(|| {
            Error::Other(format!(
                "Plugin root {} has no parent directory",
                source_root.display()
            ))
        })
    }

    /// License file to stamp from, and whether it was explicitly configured
    pub fn license_file(&self, source_root: &Path) -> (PathBuf, bool) {
        match &self.license.file {
            Some(file) => (source_root.join(file), true),
            None => (source_root.join(DEFAULT_LICENSE_FILE), false),
        }
    }
}
