//! Directory-backed content source.
//!
//! Sections are HTML files below a root directory: reference `ch1` maps to
//! `ch1.html` or `ch1/index.html`, and `ch2/p3` to `ch2/p3.html` or
//! `ch2/p3/index.html`.

use super::{ContentSource, SectionEntry};
use crate::error::{Error, FetchFailure, Result};
use log::debug;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const SECTION_EXTENSION: &str = "html";
const INDEX_FILE: &str = "index.html";

/// Serves sections from HTML files in a directory tree.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSource` if `root` is not a directory.
    pub fn new(root: PathBuf) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::InvalidSource(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Candidate files for a reference, in lookup order.
    fn candidates(&self, reference: &str) -> Option<[PathBuf; 2]> {
        let relative = Path::new(reference.trim_matches('/'));
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.as_os_str().is_empty() {
            return None;
        }
        let base = self.root.join(relative);
        // Append rather than replace: `1.1` is `1.1.html`, not `1.html`
        let mut file = base.clone().into_os_string();
        file.push(".");
        file.push(SECTION_EXTENSION);
        Some([PathBuf::from(file), base.join(INDEX_FILE)])
    }
}

impl ContentSource for DirectorySource {
    fn fetch(&self, reference: &str) -> Result<String> {
        let candidates = self
            .candidates(reference)
            .ok_or_else(|| Error::fetch(reference, FetchFailure::NotFound, "invalid reference"))?;

        for path in &candidates {
            match fs::read_to_string(path) {
                Ok(markup) => {
                    debug!("Read section '{}' from {}", reference, path.display());
                    return Ok(markup);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Err(Error::fetch(reference, FetchFailure::NotFound, ""))
    }

    fn sections(&self) -> Result<Vec<SectionEntry>> {
        let mut sections: Vec<SectionEntry> = WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| reference_for_path(&self.root, entry.path()))
            .map(|reference| SectionEntry::new(reference.clone(), reference))
            .collect();
        sections.sort_by(|a, b| a.reference.cmp(&b.reference));
        sections.dedup_by(|a, b| a.reference == b.reference);
        Ok(sections)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn watch_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

/// Map a file below `root` to the section reference it serves.
///
/// Hidden files and non-HTML files serve no section; the root `index.html`
/// serves none either.
pub fn reference_for_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    if relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    {
        return None;
    }
    if relative.extension().and_then(|e| e.to_str()) != Some(SECTION_EXTENSION) {
        return None;
    }

    let section_path = if relative.file_name().and_then(|n| n.to_str()) == Some(INDEX_FILE) {
        relative.parent()?.to_path_buf()
    } else {
        relative.with_extension("")
    };

    let parts: Vec<String> = section_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
