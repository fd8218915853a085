//! Per-panel location index.
//!
//! After a panel's content is laid out, the index holds the top offset of
//! every location identifier and element id, measured from the top of the
//! content. Visibility and synchronization query the index instead of the
//! rendered widgets.

/// A positioned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEntry {
    pub id: String,
    /// Offset of the element's top from the top of the content, in points
    pub top: f32,
}

impl LocationEntry {
    pub fn new(id: impl Into<String>, top: f32) -> Self {
        Self {
            id: id.into(),
            top,
        }
    }
}

/// Measured layout of a panel's content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelLayout {
    /// Location identifiers in document order
    pub locations: Vec<LocationEntry>,
    /// Element ids in document order
    pub anchors: Vec<LocationEntry>,
    /// Total content height
    pub content_height: f32,
}

/// Explicit `(identifier, position)` list of one panel.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    layout: PanelLayout,
}

impl LocationIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all positions (call when content changes).
    pub fn clear(&mut self) {
        self.layout = PanelLayout::default();
    }

    /// Replace the positions. Returns `false` if nothing changed.
    pub fn rebuild(&mut self, layout: PanelLayout) -> bool {
        if self.layout == layout {
            return false;
        }
        self.layout = layout;
        true
    }

    /// Whether nothing has been measured yet.
    pub fn is_empty(&self) -> bool {
        self.layout == PanelLayout::default()
    }

    /// Total content height.
    pub fn content_height(&self) -> f32 {
        self.layout.content_height
    }

    /// First entry carrying `id`.
    pub fn find(&self, id: &str) -> Option<&LocationEntry> {
        self.layout.locations.iter().find(|e| e.id == id)
    }

    /// Check whether any entry carries `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// First element with the given element id.
    pub fn find_anchor(&self, element_id: &str) -> Option<&LocationEntry> {
        self.layout.anchors.iter().find(|e| e.id == element_id)
    }

    /// The first visible entry for a box scrolled to `scroll_offset`.
    ///
    /// Entries are scanned in document order. An entry is a candidate while
    /// its top lies no more than `window` below the top of the box; the scan
    /// stops at the first entry at or below the box top. The last candidate
    /// wins, so an element that starts above the box but is not yet followed
    /// by another one is still the one in view.
    pub fn first_visible(&self, scroll_offset: f32, window: f32) -> Option<&LocationEntry> {
        let mut found = None;
        for entry in &self.layout.locations {
            let top = entry.top - scroll_offset;
            if top <= window {
                found = Some(entry);
            }
            if top >= 0.0 {
                break;
            }
        }
        found
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, f32)]) -> LocationIndex {
        let mut index = LocationIndex::new();
        index.rebuild(PanelLayout {
            locations: entries
                .iter()
                .map(|(id, top)| LocationEntry::new(*id, *top))
                .collect(),
            anchors: vec![LocationEntry::new("p3", 120.0)],
            content_height: 1000.0,
        });
        index
    }

    #[test]
    fn test_first_visible_at_top() {
        let index = index(&[("1", 0.0), ("2", 100.0), ("3", 200.0)]);
        assert_eq!(index.first_visible(0.0, 40.0).unwrap().id, "1");
    }

    #[test]
    fn test_first_visible_within_window() {
        let index = index(&[("1", 0.0), ("2", 100.0), ("3", 200.0)]);
        // "2" starts 30 below the box top, inside the window
        assert_eq!(index.first_visible(70.0, 40.0).unwrap().id, "2");
    }

    #[test]
    fn test_first_visible_element_above_box() {
        let index = index(&[("1", 0.0), ("2", 100.0), ("3", 200.0)]);
        // "2" starts 50 below the box top, outside the window: "1" is in view
        assert_eq!(index.first_visible(50.0, 40.0).unwrap().id, "1");
        // Scrolled past "2" but not to "3"
        assert_eq!(index.first_visible(150.0, 40.0).unwrap().id, "2");
    }

    #[test]
    fn test_first_visible_none() {
        assert!(LocationIndex::new().first_visible(0.0, 40.0).is_none());
        let index = index(&[("1", 100.0)]);
        assert!(index.first_visible(0.0, 40.0).is_none());
    }

    #[test]
    fn test_first_visible_past_last_entry() {
        let index = index(&[("1", 0.0), ("2", 100.0)]);
        assert_eq!(index.first_visible(900.0, 40.0).unwrap().id, "2");
    }

    #[test]
    fn test_find_returns_first_match() {
        let index = index(&[("1", 0.0), ("2", 100.0), ("2", 300.0)]);
        assert_eq!(index.find("2").unwrap().top, 100.0);
        assert!(index.contains("1"));
        assert!(!index.contains("9"));
        assert_eq!(index.find_anchor("p3").unwrap().top, 120.0);
    }

    #[test]
    fn test_rebuild_reports_changes() {
        let mut index = index(&[("1", 0.0)]);
        let same = PanelLayout {
            locations: vec![LocationEntry::new("1", 0.0)],
            anchors: vec![LocationEntry::new("p3", 120.0)],
            content_height: 1000.0,
        };
        assert!(!index.rebuild(same.clone()));
        let moved = PanelLayout {
            content_height: 1200.0,
            ..same
        };
        assert!(index.rebuild(moved));
        index.clear();
        assert!(index.find("1").is_none());
        assert_eq!(index.content_height(), 0.0);
    }
}
