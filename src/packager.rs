//! The packaging pipeline
//!
//! Stage, stamp, then patch-and-zip once per target engine version. Each
//! target is fully written before the next one patches the shared staged
//! manifest, so every archive's manifest declares exactly the engine version
//! its name carries.

use crate::archive::{self, ArchiveSummary};
use crate::config::PackConfig;
use crate::license;
use crate::manifest::{self, PluginManifest};
use crate::staging::{self, ExclusionRules};
use crate::{Error, Result};
use std::env;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Progress callback for the per-version loop
///
/// Called with:
/// - `message`: Description of current operation
/// - `current`: Number of target versions finished so far
/// - `total`: Number of target versions
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// What a run would produce, computed without writing anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackPlan {
    pub source_root: PathBuf,
    pub staging_path: PathBuf,
    pub manifest_path: PathBuf,
    pub version_name: String,
    pub archives: Vec<PathBuf>,
    pub file_count: usize,
    pub license_file: Option<PathBuf>,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub version_name: String,
    pub archives: Vec<ArchiveSummary>,
    pub files_staged: usize,
    pub files_stamped: usize,
    /// Set when the staging directory was kept on request
    pub kept_staging: Option<PathBuf>,
}

pub struct Packager {
    config: PackConfig,
    keep_staging: bool,
    progress: Option<ProgressCallback>,
}

impl Packager {
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            keep_staging: false,
            progress: None,
        }
    }

    /// Leave the staging directory on disk after a successful run
    pub fn keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    fn staging_path(&self, source_root: &Path) -> Result<PathBuf> {
        let parent = source_root.parent().ok_or_else(|| {
            Error::Other(format!(
                "Plugin root {} has no parent directory",
                source_root.display()
            ))
        })?;
        Ok(parent.join(&self.config.product_name))
    }

    /// Absolute plugin root, staging directory and output directory of a run
    ///
    /// The output directory must lie outside the staging directory, which is
    /// removed together with everything inside it.
    fn resolve_paths(&self, source_root: &Path) -> Result<(PathBuf, PathBuf, PathBuf)> {
        if !source_root.is_dir() {
            return Err(Error::SourceNotFound(source_root.to_path_buf()));
        }

        let source_root = source_root.canonicalize()?;
        let staging_path = self.staging_path(&source_root)?;

        let mut output_dir = self.config.resolve_output_dir(&source_root)?;
        if output_dir.is_relative() {
            output_dir = env::current_dir()?.join(output_dir);
        }
        let output_dir = match output_dir.canonicalize() {
            Ok(path) => path,
            Err(_) => normalize(&output_dir),
        };

        if output_dir.starts_with(&staging_path) {
            return Err(Error::InvalidConfig(format!(
                "output directory {} lies inside the staging directory {}",
                output_dir.display(),
                staging_path.display()
            )));
        }

        Ok((source_root, staging_path, output_dir))
    }

    /// Manifest path relative to a plugin root (source or staged)
    fn manifest_relative(&self, source_root: &Path) -> Result<PathBuf> {
        match &self.config.manifest_file {
            Some(file) => Ok(PathBuf::from(file)),
            None => {
                let found = PluginManifest::find(source_root)?;
                Ok(found
                    .strip_prefix(source_root)
                    .map(Path::to_path_buf)
                    .unwrap_or(found))
            }
        }
    }

    /// License file to stamp with, if stamping applies to this run
    fn license_source(&self, source_root: &Path) -> Result<Option<PathBuf>> {
        if !self.config.license.enabled {
            return Ok(None);
        }

        let (path, explicit) = self.config.license_file(source_root);
        if path.is_file() {
            Ok(Some(path))
        } else if explicit {
            Err(Error::LicenseNotFound(path))
        } else {
            tracing::info!(path = %path.display(), "no license file, skipping stamping");
            Ok(None)
        }
    }

    /// Resolve everything a run would do, without touching the disk
    pub fn plan(&self, source_root: &Path) -> Result<PackPlan> {
        self.config.validate()?;

        let (source_root, staging_path, output_dir) = self.resolve_paths(source_root)?;
        let manifest_path = source_root.join(self.manifest_relative(&source_root)?);
        let version_name = PluginManifest::load(&manifest_path)?
            .version_name()?
            .to_string();

        let archives = self
            .config
            .target_versions
            .iter()
            .map(|target| {
                output_dir.join(archive::archive_file_name(
                    &self.config.product_name,
                    &version_name,
                    &self.config.engine_tag,
                    target,
                ))
            })
            .collect();

        let rules = ExclusionRules::new(&self.config.staging.exclude, self.config.staging.strict)?;
        let walker = WalkDir::new(&source_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !rules.is_excluded(e.path().strip_prefix(&source_root).unwrap_or(e.path()))
            });

        let mut file_count = 0;
        for entry in walker {
            if staging::is_staged_file(&entry?)? {
                file_count += 1;
            }
        }

        let license_file = self.license_source(&source_root)?;

        Ok(PackPlan {
            source_root,
            staging_path,
            manifest_path,
            version_name,
            archives,
            file_count,
            license_file,
        })
    }

    /// Stage, stamp and produce one archive per target version
    ///
    /// The staging directory is removed on every exit path unless
    /// [`keep_staging`](Self::keep_staging) was requested and the run
    /// succeeded.
    pub fn run(&self, source_root: &Path) -> Result<PackReport> {
        self.config.validate()?;

        let (source_root, staging_path, output_dir) = self.resolve_paths(source_root)?;
        let manifest_relative = self.manifest_relative(&source_root)?;
        let license_file = self.license_source(&source_root)?;

        let rules = ExclusionRules::new(&self.config.staging.exclude, self.config.staging.strict)?;
        let (staged, stage_summary) = staging::stage(&source_root, &staging_path, &rules)?;

        let staged_manifest = staged.path().join(&manifest_relative);
        if !staged_manifest.is_file() {
            return Err(Error::InvalidManifest(format!(
                "{} is missing from the staged tree (is it excluded?)",
                manifest_relative.display()
            )));
        }

        let files_stamped = match license_file {
            Some(path) => {
                let text = std::fs::read_to_string(&path)?;
                let header = license::format_header(&text, self.config.license.style);
                let summary =
                    license::stamp_tree(staged.path(), &self.config.license.patterns, &header)?;
                summary.stamped.len()
            }
            None => 0,
        };

        let total = self.config.target_versions.len() as u64;
        let mut archives = Vec::with_capacity(self.config.target_versions.len());
        let mut version_name = String::new();

        for (i, target) in self.config.target_versions.iter().enumerate() {
            self.report(&format!("Packaging for Unreal Engine {}", target), i as u64, total);

            version_name = manifest::patch_engine_version(&staged_manifest, target)?;
            let archive_path = output_dir.join(archive::archive_file_name(
                &self.config.product_name,
                &version_name,
                &self.config.engine_tag,
                target,
            ));

            archives.push(archive::write_archive(staged.path(), &archive_path, target)?);
        }

        self.report("Done", total, total);

        let kept_staging = if self.keep_staging {
            Some(staged.keep())
        } else {
            None
        };

        Ok(PackReport {
            version_name,
            archives,
            files_staged: stage_summary.files_copied,
            files_stamped,
            kept_staging,
        })
    }

    fn report(&self, message: &str, current: u64, total: u64) {
        if let Some(ref cb) = self.progress {
            cb(message, current, total);
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
