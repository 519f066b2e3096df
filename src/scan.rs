//! Recursive PDF discovery under the configured documents root.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::DocumentsConfig;

/// A PDF discovered under the documents root.
#[derive(Debug, Clone)]
pub struct PdfFile {
    /// Full path, used for extraction and recorded as chunk metadata.
    pub path: PathBuf,
    /// Path relative to the documents root, used for progress output.
    pub relative: String,
}

/// Walk the documents root and collect files matching the include globs
/// (default `**/*.pdf`), minus excludes. Results are sorted by relative
/// path so ingestion order, and therefore chunk ids, are deterministic.
pub fn scan_pdfs(config: &DocumentsConfig) -> Result<Vec<PdfFile>> {
    let root = &config.root;
    if !root.exists() {
        bail!("documents root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(PdfFile {
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn docs_config(root: &std::path::Path) -> DocumentsConfig {
        DocumentsConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.pdf".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        }
    }

    #[test]
    fn finds_only_pdfs_recursively_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("b.pdf"), b"x").unwrap();
        fs::write(tmp.path().join("a.txt"), b"x").unwrap();
        fs::write(tmp.path().join("nested/a.pdf"), b"x").unwrap();

        let files = scan_pdfs(&docs_config(tmp.path())).unwrap();
        let rels: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rels, vec!["b.pdf", "nested/a.pdf"]);
    }

    #[test]
    fn exclude_globs_applied() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("drafts")).unwrap();
        fs::write(tmp.path().join("keep.pdf"), b"x").unwrap();
        fs::write(tmp.path().join("drafts/skip.pdf"), b"x").unwrap();

        let mut config = docs_config(tmp.path());
        config.exclude_globs = vec!["drafts/**".to_string()];
        let files = scan_pdfs(&config).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "keep.pdf");
    }

    #[test]
    fn missing_root_errors() {
        let tmp = TempDir::new().unwrap();
        let config = docs_config(&tmp.path().join("nope"));
        assert!(scan_pdfs(&config).is_err());
    }
}
