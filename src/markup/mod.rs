//! Markup handling for Facing
//!
//! This module parses the HTML-like markup served by content sources,
//! extracts the table-of-contents and body fragments, and flattens the body
//! into blocks the panels can render and index.

mod blocks;
mod parser;

pub use blocks::{
    flatten_blocks, toc_entries, Block, BlockKind, Fragments, SectionLink, Span, TextClass,
    TocEntry,
};
pub use parser::parse;
