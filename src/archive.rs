//! Zip archive creation
//!
//! Each archive holds the whole staged tree under a single top-level folder
//! named after the staging directory, so extracting it next to a project's
//! `Plugins/` folder yields a ready-to-use plugin.

use crate::Result;
use chrono::{Datelike, Local, Timelike};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const ARCHIVE_EXTENSION: &str = "zip";

/// Suffix of the file an archive is written to before it is complete
const PARTIAL_SUFFIX: &str = "part";

/// One produced archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub target_version: String,
    pub file_count: usize,
    pub size_bytes: u64,
    pub checksum: String,
}

/// `<product>-<version_name>-<engine_tag><target_version>.zip`
pub fn archive_file_name(
    product: &str,
    version_name: &str,
    engine_tag: &str,
    target_version: &str,
) -> String {
    format!(
        "{}-{}-{}{}.{}",
        product, version_name, engine_tag, target_version, ARCHIVE_EXTENSION
    )
}

/// Name of an entry inside the archive, relative to the staged root's parent
///
/// Components that are not valid UTF-8 are stored lossily, with U+FFFD in
/// place of the offending bytes.
fn entry_name(staged_root: &Path, root_name: &str, path: &Path) -> String {
    let relative = path.strip_prefix(staged_root).unwrap_or(path);
    if relative.to_str().is_none() {
        tracing::warn!(
            path = %relative.display(),
            "file name is not valid UTF-8, storing it lossily"
        );
    }

    let mut name = root_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

/// Local modification time of a file as a zip timestamp
///
/// `None` when the time is unavailable or outside the DOS range
/// (1980-2107); the entry then gets the zip default.
fn modified_time(path: &Path) -> Option<DateTime> {
    let modified: chrono::DateTime<Local> = fs::metadata(path).ok()?.modified().ok()?.into();
    DateTime::from_date_and_time(
        u16::try_from(modified.year()).ok()?,
        modified.month() as u8,
        modified.day() as u8,
        modified.hour() as u8,
        modified.minute() as u8,
        modified.second() as u8,
    )
    .ok()
}

/// Zip every file under `staged_root` into `output_path`
///
/// The archive is assembled in a `.part` file that is renamed into place
/// once the zip is finished, and removed if anything fails, so `output_path`
/// only ever holds a complete archive.
pub fn write_archive(
    staged_root: &Path,
    output_path: &Path,
    target_version: &str,
) -> Result<ArchiveSummary> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let partial_path = partial_path(output_path);
    let written = write_zip(staged_root, &partial_path).and_then(|count| {
        fs::rename(&partial_path, output_path)?;
        Ok(count)
    });
    let file_count = match written {
        Ok(count) => count,
        Err(e) => {
            let _ = fs::remove_file(&partial_path);
            return Err(e);
        }
    };

    let size_bytes = fs::metadata(output_path)?.len();
    let checksum = calculate_checksum(output_path)?;

    tracing::info!(
        archive = %output_path.display(),
        files = file_count,
        size_bytes,
        "wrote archive"
    );

    Ok(ArchiveSummary {
        path: output_path.to_path_buf(),
        target_version: target_version.to_string(),
        file_count,
        size_bytes,
        checksum,
    })
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    output_path.with_file_name(name)
}

fn write_zip(staged_root: &Path, zip_path: &Path) -> Result<usize> {
    let root_name = staged_root
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            crate::Error::Other(format!(
                "Could not determine folder name of {}",
                staged_root.display()
            ))
        })?;

    let mut zip = ZipWriter::new(File::create(zip_path)?);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(staged_root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry_name(staged_root, root_name, entry.path());
        let options = match modified_time(entry.path()) {
            Some(time) => options.last_modified_time(time),
            None => options,
        };

        zip.start_file(name, options)?;
        let mut file = File::open(entry.path())?;
        io::copy(&mut file, &mut zip)?;
        count += 1;
    }

    let mut inner = zip.finish()?;
    inner.flush()?;
    inner.sync_all()?;

    Ok(count)
}

/// SHA-256 of a file as lowercase hex
pub fn calculate_checksum(file_path: &Path) -> Result<String> {
    let mut file = File::open(file_path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    let hash = hasher.finalize();
    Ok(format!("{:x}", hash))
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn staged_tree(root: &Path) -> PathBuf {
        let staged = root.join("Pubnub");
        fs::create_dir_all(staged.join("Source/Private")).unwrap();
        fs::create_dir_all(staged.join("Resources")).unwrap();
        fs::write(staged.join("Pubnub.uplugin"), "{}").unwrap();
        fs::write(staged.join("Source/Private/A.cpp"), "int main(){}").unwrap();
        fs::write(staged.join("Resources/Icon128.png"), [0x89, b'P', b'N', b'G']).unwrap();
        staged
    }

    fn entry_names(path: &Path) -> Vec<String> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(
            archive_file_name("Pubnub", "0.2.5", "ue", "5.3.0"),
            "Pubnub-0.2.5-ue5.3.0.zip"
        );
    }

    #[test]
    fn test_write_archive_roots_entries_at_staged_folder() {
        let dir = TempDir::new().unwrap();
        let staged = staged_tree(dir.path());
        let out = dir.path().join("Pubnub-1.0-ue5.3.0.zip");

        let summary = write_archive(&staged, &out, "5.3.0").unwrap();
        assert_eq!(summary.file_count, 3);
        assert_eq!(summary.target_version, "5.3.0");
        assert_eq!(summary.size_bytes, fs::metadata(&out).unwrap().len());
        assert_eq!(summary.checksum.len(), 64);

        let mut names = entry_names(&out);
        names.sort();
        assert_eq!(
            names,
            vec![
                "Pubnub/Pubnub.uplugin",
                "Pubnub/Resources/Icon128.png",
                "Pubnub/Source/Private/A.cpp",
            ]
        );
    }

    #[test]
    fn test_write_archive_preserves_content() {
        let dir = TempDir::new().unwrap();
        let staged = staged_tree(dir.path());
        let out = dir.path().join("out.zip");
        write_archive(&staged, &out, "5.0.0").unwrap();

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let mut entry = archive.by_name("Pubnub/Source/Private/A.cpp").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "int main(){}");
    }

    #[test]
    fn test_write_archive_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let staged = staged_tree(dir.path());
        let out = dir.path().join("dist/out.zip");

        write_archive(&staged, &out, "5.0.0").unwrap();
        assert!(out.exists());
        assert!(!dir.path().join("dist/out.zip.part").exists());
    }

    #[test]
    fn test_write_archive_missing_root_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.zip");

        assert!(write_archive(&dir.path().join("missing"), &out, "5.0.0").is_err());
        assert!(!out.exists());
        assert!(!dir.path().join("out.zip.part").exists());
    }

    #[test]
    fn test_calculate_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello");
        fs::write(&path, "hello").unwrap();
        assert_eq!(
            calculate_checksum(&path).unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_write_archive_keeps_modification_time() {
        let dir = TempDir::new().unwrap();
        let staged = staged_tree(dir.path());
        // 2020-06-15 12:00:00 UTC, mid-day so any local offset keeps the date
        let mtime = filetime::FileTime::from_unix_time(1_592_222_400, 0);
        filetime::set_file_mtime(staged.join("Source/Private/A.cpp"), mtime).unwrap();

        let out = dir.path().join("out.zip");
        write_archive(&staged, &out, "5.0.0").unwrap();

        let mut archive = ZipArchive::new(File::open(&out).unwrap()).unwrap();
        let entry = archive.by_name("Pubnub/Source/Private/A.cpp").unwrap();
        let stamp = entry.last_modified();
        assert_eq!((stamp.year(), stamp.month(), stamp.day()), (2020, 6, 15));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_archive_non_utf8_name_is_stored_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let staged = staged_tree(dir.path());
        let odd = staged.join("Resources").join(OsStr::from_bytes(b"Icon\xff.png"));
        if fs::write(&odd, "x").is_err() {
            // Some filesystems refuse non-UTF-8 names outright
            return;
        }

        let out = dir.path().join("out.zip");
        let summary = write_archive(&staged, &out, "5.0.0").unwrap();
        assert_eq!(summary.file_count, 4);
        assert!(entry_names(&out).contains(&"Pubnub/Resources/Icon\u{fffd}.png".to_string()));
    }
}
