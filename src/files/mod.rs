//! File system integration for Facing
//!
//! Native dialogs for choosing where section files are read from.

pub mod dialogs;
