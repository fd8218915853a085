//! Sharing a location outside the application.
//!
//! The location string can be copied to the system clipboard, or opened in
//! a web browser when the content source is a web server.

use crate::content::ContentSource;
use crate::error::{Error, Result};
use arboard::Clipboard;
use log::info;

/// Copy plain text to the system clipboard.
pub fn copy_text_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = Clipboard::new()
        .map_err(|e| Error::Application(format!("Clipboard access error: {}", e)))?;
    clipboard
        .set_text(text)
        .map_err(|e| Error::Application(format!("Clipboard write error: {}", e)))?;
    Ok(())
}

/// Web address at which `source` shows `location`, if it has one.
pub fn browser_url(source: &dyn ContentSource, location: &str) -> Option<String> {
    if location.is_empty() {
        return None;
    }
    source.browser_url(location)
}

/// Open `location` in the default web browser.
pub fn open_in_browser(source: &dyn ContentSource, location: &str) -> Result<String> {
    let url = browser_url(source, location).ok_or_else(|| {
        Error::Application(format!("{} cannot be opened in a browser", source.describe()))
    })?;
    info!("Opening {} in browser", url);
    open::that(&url)?;
    Ok(url)
}
