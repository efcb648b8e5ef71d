//! Staging of the plugin source tree
//!
//! Packaging never touches the source tree. It is copied into a sibling
//! directory, minus development-only files, and every later step (stamping,
//! manifest patching, archiving) works on that copy. The copy is owned by a
//! [`StagingDir`] guard and removed when the guard drops, whether the run
//! succeeded or not.

use crate::{Error, Result};
use filetime::FileTime;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Owns a staging directory for the duration of a run
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    keep: bool,
}

impl StagingDir {
    /// Create the directory, refusing to adopt one that already exists
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match fs::create_dir(&path) {
            Ok(()) => Ok(Self { path, keep: false }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::StagingExists(path)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the directory without deleting it
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.keep {
            return;
        }

        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed staging directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove staging directory"
            ),
        }
    }
}

/// Which entries of the source tree stay out of the staged copy
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    patterns: Vec<String>,
    set: GlobSet,
    strict: bool,
}

impl ExclusionRules {
    /// Compile exclusion patterns
    ///
    /// Patterns are matched against `/`-separated paths relative to the
    /// plugin root, and `*` does not cross directory boundaries, so a bare
    /// `LICENSE` only matches the top-level file.
    pub fn new(patterns: &[String], strict: bool) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
        }

        Ok(Self {
            patterns: patterns.to_vec(),
            set: builder.build()?,
            strict,
        })
    }

    /// Indices of the patterns matching a relative path
    fn matches(&self, relative: &Path) -> Vec<usize> {
        self.set.matches(relative)
    }

    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.set.is_match(relative)
    }
}

/// Whether a walked entry ends up as a regular file in the staged copy
///
/// Symlinks are not followed by the walk, so a symlinked file only shows up
/// here and is copied as its target's content. Symlinked directories are not.
pub(crate) fn is_staged_file(entry: &DirEntry) -> Result<bool> {
    let file_type = entry.file_type();
    if file_type.is_file() {
        Ok(true)
    } else if file_type.is_symlink() {
        Ok(fs::metadata(entry.path())?.is_file())
    } else {
        Ok(false)
    }
}

/// Copy one file, carrying its modification time over
fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)?;
    let modified = FileTime::from_last_modification_time(&fs::metadata(from)?);
    filetime::set_file_mtime(to, modified)?;
    Ok(())
}

/// Summary of a staging pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub files_copied: usize,
    pub entries_excluded: Vec<PathBuf>,
}

/// Copy `source_root` into a new `staging_path`, leaving out excluded entries
///
/// An excluded directory is skipped together with everything below it.
pub fn stage(
    source_root: &Path,
    staging_path: &Path,
    rules: &ExclusionRules,
) -> Result<(StagingDir, StageSummary)> {
    if !source_root.is_dir() {
        return Err(Error::SourceNotFound(source_root.to_path_buf()));
    }

    let staging = StagingDir::create(staging_path)?;
    let mut files_copied = 0;
    let mut entries_excluded = Vec::new();
    let mut matched = vec![false; rules.patterns.len()];

    let walker = WalkDir::new(source_root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let relative = entry.path().strip_prefix(source_root).unwrap_or(entry.path());
            let hits = rules.matches(relative);
            if hits.is_empty() {
                return true;
            }
            for i in hits {
                matched[i] = true;
            }
            entries_excluded.push(relative.to_path_buf());
            false
        });

    for entry in walker {
        let entry = entry?;
        if entry.depth() == 0 {
            continue;
        }

        let relative = entry.path().strip_prefix(source_root).unwrap_or(entry.path());
        let target = staging.path().join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if is_staged_file(&entry)? {
            copy_file(entry.path(), &target)?;
            files_copied += 1;
        } else {
            tracing::warn!(path = %relative.display(), "skipping symlinked directory");
        }
    }

    let summary = StageSummary {
        files_copied,
        entries_excluded,
    };

    if rules.strict {
        if let Some(i) = matched.iter().position(|hit| !hit) {
            return Err(Error::MissingExclusion(rules.patterns[i].clone()));
        }
    } else {
        for (pattern, _) in rules.patterns.iter().zip(&matched).filter(|(_, hit)| !**hit) {
            tracing::debug!(pattern = %pattern, "exclusion pattern matched nothing");
        }
    }

    tracing::info!(
        staging = %staging.path().display(),
        files = summary.files_copied,
        excluded = summary.entries_excluded.len(),
        "staged plugin source"
    );

    Ok((staging, summary))
}
