//! Native dialog integration using the rfd crate
//!
//! The viewer only ever asks the user for one thing: a folder of section
//! files to use as the content source.

use rfd::FileDialog;
use std::path::{Path, PathBuf};

/// Opens a native folder picker for choosing a content directory.
///
/// Returns `Some(PathBuf)` if a folder was selected, `None` if cancelled.
pub fn open_folder_dialog(initial_dir: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = FileDialog::new().set_title("Open Text Folder");

    if let Some(dir) = initial_dir {
        dialog = dialog.set_directory(dir);
    }

    dialog.pick_folder()
}
