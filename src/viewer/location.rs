//! Shareable location strings.
//!
//! A location lists each panel's selection in display order:
//! `ch1/ch2,p3` means panel 0 shows `ch1` and panel 1 shows `ch2` at
//! sub-location `p3`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separates panels in a location string.
pub const PANEL_SEPARATOR: char = '/';

/// Separates a section from its sub-location.
pub const SUB_LOCATION_SEPARATOR: char = ',';

/// What a panel shows: a section and an optional sub-location inside it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_location: Option<String>,
}

impl Selection {
    /// Select a whole section.
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            sub_location: None,
        }
    }

    /// Select a sub-location of a section. Empty sub-locations are dropped.
    pub fn with_sub_location(mut self, sub_location: impl Into<String>) -> Self {
        let sub_location = sub_location.into();
        self.sub_location = (!sub_location.is_empty()).then_some(sub_location);
        self
    }

    /// Check whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.section.is_empty()
    }

    /// Reference used to fetch this selection from a content source.
    pub fn reference(&self) -> String {
        match &self.sub_location {
            Some(sub) => format!("{}{}{}", self.section, PANEL_SEPARATOR, sub),
            None => self.section.clone(),
        }
    }

    /// Parse one panel's part of a location string.
    pub fn parse_part(part: &str) -> Self {
        let mut pieces = part.splitn(2, SUB_LOCATION_SEPARATOR);
        let section = pieces.next().unwrap_or_default().trim();
        let selection = Self::new(section);
        match pieces.next().map(str::trim) {
            Some(sub) if !section.is_empty() => selection.with_sub_location(sub),
            _ => selection,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.section)?;
        if let Some(sub) = &self.sub_location {
            write!(f, "{}{}", SUB_LOCATION_SEPARATOR, sub)?;
        }
        Ok(())
    }
}

/// Join panel selections into a location string.
pub fn build_location<'a>(selections: impl IntoIterator<Item = &'a Selection>) -> String {
    selections
        .into_iter()
        .map(Selection::to_string)
        .collect::<Vec<_>>()
        .join(&PANEL_SEPARATOR.to_string())
}

/// Split a location string into per-panel selections.
///
/// A leading `#` is ignored. An empty location yields no selections; parts
/// beyond the returned ones are left to the panels' current selections.
pub fn parse_location(location: &str) -> Vec<Selection> {
    let location = location.trim().trim_start_matches('#');
    if location.is_empty() {
        return Vec::new();
    }
    location
        .split(PANEL_SEPARATOR)
        .map(Selection::parse_part)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_location() {
        let selections = vec![
            Selection::new("ch1"),
            Selection::new("ch2").with_sub_location("p3"),
        ];
        assert_eq!(build_location(&selections), "ch1/ch2,p3");
    }

    #[test]
    fn test_build_location_with_empty_panel() {
        let selections = vec![Selection::default(), Selection::new("ch2")];
        assert_eq!(build_location(&selections), "/ch2");
    }

    #[test]
    fn test_round_trip() {
        let selections = vec![
            Selection::parse_part("ch1"),
            Selection::parse_part("ch2,p3"),
        ];
        let location = build_location(&selections);
        let parsed = parse_location(&format!("#{}", location));

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].section, "ch1");
        assert_eq!(parsed[0].sub_location, None);
        assert_eq!(parsed[1].section, "ch2");
        assert_eq!(parsed[1].sub_location.as_deref(), Some("p3"));
    }

    #[test]
    fn test_parse_empty_location() {
        assert!(parse_location("").is_empty());
        assert!(parse_location("#").is_empty());
    }

    #[test]
    fn test_parse_edge_cases() {
        let parsed = parse_location("ch1,/,p3/ch2,");
        assert_eq!(parsed[0], Selection::new("ch1"));
        // A sub-location without a section selects nothing
        assert_eq!(parsed[1], Selection::default());
        assert_eq!(parsed[2], Selection::new("ch2"));
    }

    #[test]
    fn test_reference_includes_sub_location() {
        assert_eq!(Selection::new("ch1").reference(), "ch1");
        assert_eq!(
            Selection::new("ch2").with_sub_location("p3").reference(),
            "ch2/p3"
        );
    }
}
