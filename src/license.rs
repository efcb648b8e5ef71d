//! License header stamping for native sources
//!
//! The license text is turned into a comment block and prepended to every
//! matching C/C++ file in the staged tree. A file that already starts with the
//! exact header is left alone, so stamping a tree twice is harmless.

use crate::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Comment syntax used for the license header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStyle {
    /// `// text` on every line
    #[default]
    Line,
    /// A single `/* ... */` block with ` * ` gutters
    Block,
}

/// Result of stamping a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StampSummary {
    pub stamped: Vec<PathBuf>,
    pub already_stamped: Vec<PathBuf>,
}

/// Format license text as a comment header
///
/// Trailing blank lines are dropped first, so the header never ends in an
/// empty comment line.
pub fn format_header(license_text: &str, style: CommentStyle) -> String {
    let lines: Vec<&str> = license_text.lines().collect();
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |i| i + 1);
    let lines = &lines[..end];

    match style {
        CommentStyle::Line => lines
            .iter()
            .map(|line| comment_line("//", line))
            .collect::<Vec<_>>()
            .join("\n"),
        CommentStyle::Block => {
            let mut out = vec!["/*".to_string()];
            out.extend(lines.iter().map(|line| comment_line(" *", line)));
            out.push(" */".to_string());
            out.join("\n")
        }
    }
}

fn comment_line(marker: &str, line: &str) -> String {
    let line = line.trim_end();
    if line.is_empty() {
        marker.to_string()
    } else {
        format!("{} {}", marker, line)
    }
}

/// Compile stamping patterns into a single matcher
///
/// Patterns are matched against paths relative to the stamped root.
pub fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Prepend `header` and a blank line to one file, unless it already starts
/// with the header
///
/// Returns `true` when the file was rewritten.
pub fn stamp_file(path: &Path, header: &str) -> Result<bool> {
    let content = fs::read(path)?;
    let prefix = format!("{}\n\n", header);

    if content.starts_with(prefix.as_bytes()) {
        return Ok(false);
    }

    let mut stamped = Vec::with_capacity(prefix.len() + content.len());
    stamped.extend_from_slice(prefix.as_bytes());
    stamped.extend_from_slice(&content);
    fs::write(path, stamped)?;

    Ok(true)
}

/// Stamp every file under `root` whose relative path matches `patterns`
pub fn stamp_tree(root: &Path, patterns: &[String], header: &str) -> Result<StampSummary> {
    let matcher = build_matcher(patterns)?;
    let mut summary = StampSummary::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if !matcher.is_match(relative) {
            continue;
        }

        if stamp_file(entry.path(), header)? {
            tracing::debug!(file = %relative.display(), "stamped license header");
            summary.stamped.push(entry.path().to_path_buf());
        } else {
            summary.already_stamped.push(entry.path().to_path_buf());
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LICENSE: &str = "MIT License\n\nCopyright (c) 2024 PubNub\n\n";

    fn default_patterns() -> Vec<String> {
        ["**/*.cpp", "**/*.hpp", "**/*.c", "**/*.h"]
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn test_format_header_line_style() {
        let header = format_header(LICENSE, CommentStyle::Line);
        assert_eq!(header, "// MIT License\n//\n// Copyright (c) 2024 PubNub");
    }

    #[test]
    fn test_format_header_block_style() {
        let header = format_header(LICENSE, CommentStyle::Block);
        assert_eq!(
            header,
            "/*\n * MIT License\n *\n * Copyright (c) 2024 PubNub\n */"
        );
    }

    #[test]
    fn test_format_header_handles_crlf() {
        let header = format_header("A\r\nB\r\n", CommentStyle::Line);
        assert_eq!(header, "// A\n// B");
    }

    #[test]
    fn test_stamp_file_prepends_header() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.cpp");
        fs::write(&file, "int main(){}").unwrap();

        assert!(stamp_file(&file, "// License").unwrap());
        assert_eq!(fs::read_to_string(&file).unwrap(), "// License\n\nint main(){}");
    }

    #[test]
    fn test_stamp_file_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("main.h");
        fs::write(&file, "#pragma once\n").unwrap();

        assert!(stamp_file(&file, "// License").unwrap());
        assert!(!stamp_file(&file, "// License").unwrap());
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "// License\n\n#pragma once\n"
        );
    }

    #[test]
    fn test_stamp_file_keeps_non_utf8_bytes() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("blob.c");
        let original = vec![0xff, 0xfe, b'x', 0x00];
        fs::write(&file, &original).unwrap();

        stamp_file(&file, "// L").unwrap();
        let content = fs::read(&file).unwrap();
        assert_eq!(&content[..6], b"// L\n\n");
        assert_eq!(&content[6..], &original[..]);
    }

    #[test]
    fn test_stamp_tree_matches_patterns_only() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Source/Private")).unwrap();
        fs::create_dir_all(root.join("Source/Public")).unwrap();
        fs::write(root.join("Source/Private/A.cpp"), "a").unwrap();
        fs::write(root.join("Source/Public/A.h"), "h").unwrap();
        fs::write(root.join("Source/Module.Build.cs"), "cs").unwrap();
        fs::write(root.join("top.c"), "c").unwrap();

        let summary = stamp_tree(root, &default_patterns(), "// L").unwrap();
        assert_eq!(summary.stamped.len(), 3);
        assert!(summary.already_stamped.is_empty());
        assert_eq!(
            fs::read_to_string(root.join("Source/Module.Build.cs")).unwrap(),
            "cs"
        );
        assert_eq!(fs::read_to_string(root.join("top.c")).unwrap(), "// L\n\nc");

        let again = stamp_tree(root, &default_patterns(), "// L").unwrap();
        assert!(again.stamped.is_empty());
        assert_eq!(again.already_stamped.len(), 3);
    }

    #[test]
    fn test_build_matcher_rejects_bad_pattern() {
        assert!(build_matcher(&["a[".to_string()]).is_err());
    }
}
