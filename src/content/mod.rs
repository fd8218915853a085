//! Content sources for Facing
//!
//! A content source turns a section reference (`ch1`, `ch2/p3`) into the
//! markup of that section. Sources are used from the loader thread, so they
//! must be `Send + Sync`.

mod directory;
mod http;
mod loader;
mod watcher;

pub use directory::DirectorySource;
pub use http::HttpSource;
pub use loader::{LoadEvent, LoadOutcome, LoadRequest, SectionLoader};
pub use watcher::ContentWatcher;

use crate::config::ContentSourceConfig;
use crate::error::{Error, Result};
use crate::markup::{flatten_blocks, parse, toc_entries, Block, Fragments, TocEntry};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// A section that can be chosen in a panel's selection control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    /// Reference passed to [`ContentSource::fetch`]
    pub reference: String,
    /// Human-readable label
    pub label: String,
}

impl SectionEntry {
    pub fn new(reference: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            label: label.into(),
        }
    }
}

/// Provider of section markup.
pub trait ContentSource: Send + Sync {
    /// Fetch the raw markup for a section reference.
    fn fetch(&self, reference: &str) -> Result<String>;

    /// List the sections this source knows about.
    fn sections(&self) -> Result<Vec<SectionEntry>> {
        Ok(Vec::new())
    }

    /// Short description for the status bar.
    fn describe(&self) -> String;

    /// Web address showing `location`, for sources that have one.
    fn browser_url(&self, _location: &str) -> Option<String> {
        None
    }

    /// Local directory to watch for changes, for sources that have one.
    fn watch_root(&self) -> Option<&Path> {
        None
    }
}

/// Loaded, render-ready content of a section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionContent {
    /// Table-of-contents entries, shown in the panel tool bar
    pub toc: Vec<TocEntry>,
    /// Body blocks, shown in the panel box
    pub blocks: Vec<Block>,
}

impl SectionContent {
    /// Build section content from a raw response.
    ///
    /// A response without a body fragment is shown as-is with an empty
    /// table of contents.
    pub fn from_markup(markup: &str) -> Self {
        match Fragments::extract(markup) {
            Ok(fragments) => Self {
                toc: fragments.toc.as_ref().map(toc_entries).unwrap_or_default(),
                blocks: flatten_blocks(&fragments.body),
            },
            Err(err) => {
                warn!("{}; showing the whole response", err);
                Self {
                    toc: Vec::new(),
                    blocks: flatten_blocks(&parse(markup.trim())),
                }
            }
        }
    }
}

/// Open the content source described by the configuration.
///
/// Returns `Ok(None)` when no source is configured.
pub fn open_source(config: &ContentSourceConfig) -> Result<Option<Arc<dyn ContentSource>>> {
    match config {
        ContentSourceConfig::None => Ok(None),
        ContentSourceConfig::Directory { path } => {
            Ok(Some(Arc::new(DirectorySource::new(path.clone())?)))
        }
        ContentSourceConfig::Http { base_url } => Ok(Some(Arc::new(HttpSource::new(base_url)?))),
    }
}

/// Interpret a command-line source argument as a URL or a directory.
pub fn source_config_from_arg(arg: &str) -> Result<ContentSourceConfig> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(Error::InvalidSource("empty source".to_string()));
    }
    if arg.starts_with("http://") || arg.starts_with("https://") {
        Ok(ContentSourceConfig::Http {
            base_url: arg.to_string(),
        })
    } else {
        Ok(ContentSourceConfig::Directory { path: arg.into() })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
