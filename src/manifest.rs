//! Plugin manifest (.uplugin) handling
//!
//! The packager only ever touches two fields of a `.uplugin` file: it reads
//! `VersionName` to name the archives and rewrites `EngineVersion` once per
//! target engine. Everything else in the file is passed through untouched, so
//! the manifest is kept as an order-preserving JSON object instead of a typed
//! struct.
//!
//! # Examples
//!
//! ```no_run
//! use unrealpack::PluginManifest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let path = PluginManifest::find("MyPlugin")?;
//! let mut manifest = PluginManifest::load(&path)?;
//! manifest.set_engine_version("5.3.0");
//! manifest.save(&path)?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENGINE_VERSION_KEY: &str = "EngineVersion";
pub const VERSION_NAME_KEY: &str = "VersionName";

/// Indentation used when writing the manifest back
const MANIFEST_INDENT: &[u8] = b"    ";

/// Unreal Engine plugin file (.uplugin)
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    fields: Map<String, Value>,
}

impl PluginManifest {
    /// Find the .uplugin file at the top level of the given directory
    ///
    /// Exactly one candidate must exist; a plugin root with several
    /// manifests is ambiguous and must be configured explicitly.
    pub fn find<P: AsRef<Path>>(dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let mut found = Vec::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("uplugin") {
                found.push(path);
            }
        }

        match found.len() {
            0 => Err(Error::InvalidManifest(format!(
                "No .uplugin file found in {}",
                dir.display()
            ))),
            1 => Ok(found.remove(0)),
            n => Err(Error::InvalidManifest(format!(
                "Found {} .uplugin files in {}; set manifest_file in unrealpack.toml",
                n,
                dir.display()
            ))),
        }
    }

    /// Parse a manifest from JSON text
    pub fn parse(content: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(Error::InvalidManifest(
                "manifest root must be a JSON object".to_string(),
            )),
        }
    }

    /// Load .uplugin file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Serialize with four-space indentation, keeping the original field order
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(MANIFEST_INDENT);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::Other(e.to_string()))
    }

    /// Write the manifest back to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn engine_version(&self) -> Option<&str> {
        self.fields.get(ENGINE_VERSION_KEY).and_then(Value::as_str)
    }

    /// The plugin's human-readable version, used in archive names
    pub fn version_name(&self) -> Result<&str> {
        match self.fields.get(VERSION_NAME_KEY) {
            Some(Value::String(name)) if !name.is_empty() => Ok(name.as_str()),
            Some(Value::String(_)) => Err(Error::InvalidManifest(format!(
                "{} is empty",
                VERSION_NAME_KEY
            ))),
            Some(other) => Err(Error::InvalidManifest(format!(
                "{} must be a string, found {}",
                VERSION_NAME_KEY, other
            ))),
            None => Err(Error::InvalidManifest(format!(
                "{} field is missing",
                VERSION_NAME_KEY
            ))),
        }
    }

    pub fn set_engine_version(&mut self, version: &str) {
        self.fields.insert(
            ENGINE_VERSION_KEY.to_string(),
            Value::String(version.to_string()),
        );
    }

    /// Raw access to a field, for callers that need anything beyond the two
    /// fields above
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get plugin name from filename
    pub fn name<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .file_stem()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string())
    }
}

/// Rewrite `EngineVersion` in the manifest at `path` and return its
/// `VersionName`
///
/// The file is fully written before this returns, so an archive built
/// afterwards always sees the patched version.
pub fn patch_engine_version<P: AsRef<Path>>(path: P, target_version: &str) -> Result<String> {
    let path = path.as_ref();
    let mut manifest = PluginManifest::load(path)?;
    let version_name = manifest.version_name()?.to_string();

    manifest.set_engine_version(target_version);
    manifest.save(path)?;

    tracing::debug!(
        manifest = %path.display(),
        engine_version = target_version,
        "patched manifest"
    );

    Ok(version_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const UPLUGIN: &str = r#"{
    "FileVersion": 3,
    "Version": 12,
    "VersionName": "0.2.5",
    "FriendlyName": "Pubnub",
    "EngineVersion": "5.0.0",
    "CanContainContent": false,
    "Modules": [
        {
            "Name": "PubnubLibrary",
            "Type": "Runtime",
            "LoadingPhase": "Default"
        }
    ]
}"#;

    #[test]
    fn test_parse_reads_fields() {
        let manifest = PluginManifest::parse(UPLUGIN).unwrap();
        assert_eq!(manifest.engine_version(), Some("5.0.0"));
        assert_eq!(manifest.version_name().unwrap(), "0.2.5");
        assert_eq!(manifest.get("FileVersion"), Some(&Value::from(3)));
    }

    #[test]
    fn test_to_json_is_stable() {
        // Four-space indent and original field order reproduce the input
        let manifest = PluginManifest::parse(UPLUGIN).unwrap();
        assert_eq!(manifest.to_json().unwrap(), UPLUGIN);
    }

    #[test]
    fn test_set_engine_version_touches_only_that_field() {
        let mut manifest = PluginManifest::parse(UPLUGIN).unwrap();
        manifest.set_engine_version("5.4.0");

        let json = manifest.to_json().unwrap();
        assert_eq!(json, UPLUGIN.replace("\"5.0.0\"", "\"5.4.0\""));
    }

    #[test]
    fn test_set_engine_version_adds_missing_field() {
        let mut manifest = PluginManifest::parse(r#"{"VersionName": "1.0"}"#).unwrap();
        assert_eq!(manifest.engine_version(), None);

        manifest.set_engine_version("5.1.0");
        assert_eq!(manifest.engine_version(), Some("5.1.0"));
    }

    #[test]
    fn test_version_name_missing() {
        let manifest = PluginManifest::parse(r#"{"EngineVersion": "5.0.0"}"#).unwrap();
        assert!(matches!(
            manifest.version_name(),
            Err(Error::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_version_name_wrong_type() {
        let manifest = PluginManifest::parse(r#"{"VersionName": 3}"#).unwrap();
        assert!(manifest.version_name().is_err());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(matches!(
            PluginManifest::parse("[1, 2]"),
            Err(Error::InvalidManifest(_))
        ));
        assert!(matches!(PluginManifest::parse("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_patch_engine_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Pubnub.uplugin");
        fs::write(&path, UPLUGIN).unwrap();

        let version_name = patch_engine_version(&path, "5.3.0").unwrap();
        assert_eq!(version_name, "0.2.5");

        let reloaded = PluginManifest::load(&path).unwrap();
        assert_eq!(reloaded.engine_version(), Some("5.3.0"));
        assert_eq!(reloaded.version_name().unwrap(), "0.2.5");
    }

    #[test]
    fn test_find_single_uplugin() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("MyPlugin.uplugin"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let found = PluginManifest::find(dir.path()).unwrap();
        assert_eq!(PluginManifest::name(&found), Some("MyPlugin".to_string()));
    }

    #[test]
    fn test_find_none_or_many() {
        let dir = TempDir::new().unwrap();
        assert!(PluginManifest::find(dir.path()).is_err());

        fs::write(dir.path().join("A.uplugin"), "{}").unwrap();
        fs::write(dir.path().join("B.uplugin"), "{}").unwrap();
        assert!(matches!(
            PluginManifest::find(dir.path()),
            Err(Error::InvalidManifest(_))
        ));
    }
}
