//! UnrealPack - distributable archives for Unreal Engine plugins
//!
//! UnrealPack turns a plugin source tree into one zip archive per supported
//! engine version, ready to hand to users or upload to a marketplace:
//!
//! - Stages a copy of the plugin next to its source, leaving out VCS, CI,
//!   documentation and build output
//! - Stamps C/C++ sources with a license header, exactly once
//! - Rewrites the `.uplugin` `EngineVersion` for every target engine
//! - Zips the staged tree as `<Product>-<VersionName>-ue<Engine>.zip`
//! - Removes the staging directory on every exit path
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//! use unrealpack::{PackConfig, Packager};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Path::new("/work/PubnubLibrary");
//! let mut config = PackConfig::load(source)?;
//! config.target_versions = vec!["5.3.0".to_string(), "5.4.0".to_string()];
//!
//! let report = Packager::new(config).run(source)?;
//! for archive in &report.archives {
//!     println!("{} ({})", archive.path.display(), archive.checksum);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`config`] - `unrealpack.toml` loading and validation
//! - [`staging`] - Staged copy of the plugin and its cleanup guard
//! - [`license`] - License header formatting and stamping
//! - [`manifest`] - `.uplugin` reading and `EngineVersion` patching
//! - [`archive`] - Zip archive creation and checksums
//! - [`packager`] - The end-to-end pipeline
//! - [`error`] - Error types and result handling

pub mod archive;
pub mod config;
pub mod error;
pub mod license;
pub mod manifest;
pub mod packager;
pub mod staging;

pub use archive::{archive_file_name, calculate_checksum, format_size, write_archive, ArchiveSummary};
pub use config::{PackConfig, CONFIG_FILE_NAME};
pub use error::{Error, Result};
pub use license::{format_header, stamp_tree, CommentStyle, StampSummary};
pub use manifest::{patch_engine_version, PluginManifest};
pub use packager::{PackPlan, PackReport, Packager, ProgressCallback};
pub use staging::{stage, ExclusionRules, StageSummary, StagingDir};
