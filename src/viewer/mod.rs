//! Panel coordination for Facing
//!
//! The [`Viewer`] owns the panels and the named feature switches. It keeps
//! the panels' scroll positions aligned on a shared location identifier,
//! highlights that identifier across panels, and aggregates the panels'
//! selections into a shareable location string.
//!
//! # Synchronization
//!
//! Every scroll or layout change is reported with a [`ScrollOrigin`]. A user
//! scroll or a navigation broadcasts the panel's topmost visible identifier:
//! every other panel scrolls to its first element with that identifier, with
//! origin [`ScrollOrigin::Sync`]. Sync-origin changes are never reported
//! back, so a broadcast cannot trigger another one. Resizes and re-layouts
//! only recompute what is visible. A panel laid out for the first time after
//! its content arrived scrolls to the shared identifier instead.

mod index;
mod location;
mod panel;

pub use index::{LocationEntry, PanelLayout};
pub use location::{build_location, parse_location, Selection};
pub use panel::{
    Panel, PanelGeometry, PanelStatus, ScrollOrigin, ViewportMetrics, DEFAULT_MARGIN,
    DEFAULT_MIN_HEIGHT, DEFAULT_VISIBILITY_WINDOW,
};

use crate::content::{LoadOutcome, LoadRequest};
use crate::markup::SectionLink;
use log::{debug, info};
use std::collections::HashMap;

/// Scroll the other panels along with the one being scrolled.
pub const SWITCH_SYNC: &str = "sync";

/// Highlight the shared location identifier in every panel.
pub const SWITCH_HIGHLIGHT: &str = "highlight";

/// Show editorial commentary.
pub const SWITCH_COMMENTARY: &str = "commentary";

/// Show collation marks.
pub const SWITCH_COLLATION: &str = "collation";

/// All switches the application exposes, in toolbar order.
pub const SWITCHES: &[&str] = &[
    SWITCH_SYNC,
    SWITCH_HIGHLIGHT,
    SWITCH_COMMENTARY,
    SWITCH_COLLATION,
];

/// Coordinator of all panels.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    /// Panels in display order; index equals panel position
    panels: Vec<Panel>,
    switches: HashMap<String, bool>,
    /// Last identifier broadcast by `synchronize_panels`, empty if none
    location_id: String,
    /// Last built location string
    location: String,
    /// Panel shown alone at full width
    expanded: Option<usize>,
    geometry: PanelGeometry,
}

impl Viewer {
    /// Create a viewer without panels.
    pub fn new(geometry: PanelGeometry) -> Self {
        Self {
            geometry,
            ..Self::default()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Panels
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a panel showing `selection`.
    ///
    /// Returns the request for its initial load, if anything is selected.
    /// Requests returned by successive calls must be run in order.
    pub fn add_panel(&mut self, selection: Selection) -> Option<LoadRequest> {
        let position = self.panels.len();
        self.panels
            .push(Panel::new(position, Selection::default(), self.geometry));
        self.select_section(position, selection)
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, index: usize) -> Option<&Panel> {
        self.panels.get(index)
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Switches
    // ─────────────────────────────────────────────────────────────────────────

    /// Read a switch. Unknown switches are off.
    pub fn switch(&self, name: &str) -> bool {
        self.switches.get(name).copied().unwrap_or(false)
    }

    /// Set a switch.
    pub fn set_switch(&mut self, name: &str, value: bool) {
        self.switches.insert(name.to_string(), value);
        if name == SWITCH_HIGHLIGHT && !value {
            for panel in &mut self.panels {
                panel.set_highlight(None);
            }
        }
    }

    /// Flip a switch and return its new value.
    pub fn toggle_switch(&mut self, name: &str) -> bool {
        let value = !self.switch(name);
        self.set_switch(name, value);
        value
    }

    /// All switches that have been set.
    pub fn switches(&self) -> &HashMap<String, bool> {
        &self.switches
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scrolling and synchronization
    // ─────────────────────────────────────────────────────────────────────────

    /// Last identifier broadcast to the panels, empty if none.
    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    /// Record where a panel's box starts in the window.
    pub fn set_box_top(&mut self, index: usize, top: f32) {
        if let Some(panel) = self.panels.get_mut(index) {
            panel.set_box_top(top);
        }
    }

    /// Let every panel recompute its height for new window measurements.
    ///
    /// Resizing never moves the other panels.
    pub fn on_resize(&mut self, metrics: &ViewportMetrics) {
        for panel in &mut self.panels {
            panel.on_resize(metrics);
        }
    }

    /// Report a scroll of panel `index`.
    ///
    /// Returns whether a synchronization was broadcast.
    pub fn on_scroll(&mut self, index: usize, offset: f32, origin: ScrollOrigin) -> bool {
        let Some(panel) = self.panels.get_mut(index) else {
            return false;
        };
        panel.on_scroll(offset, origin) && self.synchronize_panels(index)
    }

    /// Replace the measured layout of panel `index`.
    ///
    /// A pending element target is scrolled to first. A panel measured for
    /// the first time since its content arrived joins the shared location
    /// instead of broadcasting its own. Returns whether anything changed.
    pub fn apply_layout(&mut self, index: usize, layout: PanelLayout) -> bool {
        let Some(panel) = self.panels.get_mut(index) else {
            return false;
        };
        let first_layout = panel.index().is_empty();
        let changed = panel.apply_layout(layout);
        let anchor = panel.take_pending_anchor();
        if !changed && anchor.is_none() {
            return false;
        }

        let origin = match anchor {
            Some(element_id) => {
                if !panel.scroll_to_element(&element_id) {
                    debug!("Panel {} has no element '{}'", index, element_id);
                }
                ScrollOrigin::Navigation
            }
            None => ScrollOrigin::Layout,
        };
        if panel.on_visible_content_change(origin) {
            self.synchronize_panels(index);
        } else if first_layout && changed {
            self.follow_shared_location(index);
        }
        true
    }

    /// Scroll panel `index` to the shared location without broadcasting.
    fn follow_shared_location(&mut self, index: usize) {
        if !self.switch(SWITCH_SYNC) || self.location_id.is_empty() {
            return;
        }
        let current = self.location_id.clone();
        if self.panels[index].sync_to_location_id(&current) {
            self.highlight(&current, true, true);
        }
    }

    /// Align all other panels on the topmost visible identifier of `source`.
    ///
    /// Does nothing unless the `sync` switch is on. Returns whether a
    /// broadcast happened.
    pub fn synchronize_panels(&mut self, source: usize) -> bool {
        if !self.switch(SWITCH_SYNC) || source >= self.panels.len() {
            return false;
        }

        let previous = std::mem::take(&mut self.location_id);
        self.highlight(&previous, false, false);

        self.location_id = self.panels[source].location_id().to_string();
        let current = self.location_id.clone();
        self.highlight(&current, true, true);

        debug!("Panel {} broadcasts location '{}'", source, current);
        if current.is_empty() {
            return true;
        }
        for (index, panel) in self.panels.iter_mut().enumerate() {
            if index != source {
                panel.sync_to_location_id(&current);
            }
        }
        true
    }

    /// Add or remove the highlight of `id` in every panel holding it.
    ///
    /// When `both_panes` is set the highlight is only applied if at least two
    /// panels hold the identifier. Repeated matches inside one panel do not
    /// count as a pair.
    fn highlight(&mut self, id: &str, active: bool, both_panes: bool) {
        if id.is_empty() || !self.switch(SWITCH_HIGHLIGHT) {
            return;
        }
        if both_panes {
            let holders = self
                .panels
                .iter()
                .filter(|p| p.index().contains(id))
                .count();
            if holders < 2 {
                return;
            }
        }
        for panel in &mut self.panels {
            if active && panel.index().contains(id) {
                panel.set_highlight(Some(id.to_string()));
            } else if !active && panel.highlighted() == Some(id) {
                panel.set_highlight(None);
            }
        }
    }

    /// Show or hide inner note `note_id` of panel `index`.
    ///
    /// At most one note is open across all panels, so opening a note closes
    /// the previous one. Returns whether the note is now open.
    pub fn toggle_note(&mut self, index: usize, note_id: &str) -> bool {
        let Some(panel) = self.panels.get(index) else {
            return false;
        };
        if !panel.has_note(note_id) {
            debug!("Panel {} has no note '{}'", index, note_id);
            return false;
        }
        let open = panel.open_note() != Some(note_id);
        for panel in &mut self.panels {
            panel.set_open_note(None);
        }
        if open {
            self.panels[index].set_open_note(Some(note_id.to_string()));
        }
        open
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Change what panel `index` shows, as its selection control does.
    ///
    /// Returns the load to run, or `None` when the selection is empty (the
    /// panel is cleared) or the panel does not exist.
    pub fn select_section(&mut self, index: usize, selection: Selection) -> Option<LoadRequest> {
        let panel = self.panels.get_mut(index)?;
        let reference = selection.reference();
        let empty = selection.is_empty();
        panel.set_selection(selection);
        if empty {
            panel.clear();
            self.update_location();
            return None;
        }
        Some(panel.begin_load(reference))
    }

    /// Load an arbitrary reference into panel `index`, keeping its selection.
    pub fn begin_load(&mut self, index: usize, reference: &str) -> Option<LoadRequest> {
        let panel = self.panels.get_mut(index)?;
        Some(panel.begin_load(reference.to_string()))
    }

    /// Apply a finished load. Superseded loads are ignored.
    ///
    /// Returns whether the outcome was applied.
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> bool {
        let Some(panel) = self.panels.get_mut(outcome.panel) else {
            return false;
        };
        if !panel.complete_load(outcome) {
            return false;
        }
        self.update_location();
        true
    }

    /// Load a reference on the calling thread.
    #[cfg(test)]
    pub fn load_now(
        &mut self,
        index: usize,
        reference: &str,
        source: &dyn crate::content::ContentSource,
    ) -> bool {
        match self.begin_load(index, reference) {
            Some(request) => self.complete_load(request.run(source)),
            None => false,
        }
    }

    /// Fetch a failed panel again.
    pub fn retry(&mut self, index: usize) -> Option<LoadRequest> {
        let reference = self.panels.get(index)?.retry_reference()?;
        self.begin_load(index, &reference)
    }

    /// Reload every panel showing `reference`.
    pub fn reload_reference(&mut self, reference: &str) -> Vec<LoadRequest> {
        let showing: Vec<usize> = self
            .panels
            .iter()
            .filter(|p| !p.selection().is_empty() && p.selection().reference() == reference)
            .map(Panel::position)
            .collect();
        showing
            .into_iter()
            .filter_map(|i| self.begin_load(i, reference))
            .collect()
    }

    /// Reload every panel that has a selection.
    pub fn reload_all(&mut self) -> Vec<LoadRequest> {
        (0..self.panels.len())
            .filter_map(|i| {
                let selection = self.panels[i].selection().clone();
                (!selection.is_empty())
                    .then(|| self.begin_load(i, &selection.reference()))
                    .flatten()
            })
            .collect()
    }

    /// Follow a section link clicked in panel `index`.
    ///
    /// Links into the section already shown only scroll; others load the
    /// section and scroll to the element once it is laid out.
    pub fn follow_link(&mut self, index: usize, link: &SectionLink) -> Option<LoadRequest> {
        let panel = self.panels.get_mut(index)?;
        let same_section = panel.selection() == &Selection::new(link.section.clone())
            && matches!(panel.status(), PanelStatus::Ready);

        if same_section {
            if let Some(element_id) = &link.element {
                if panel.scroll_to_element(element_id)
                    && panel.on_visible_content_change(ScrollOrigin::Navigation)
                {
                    self.synchronize_panels(index);
                }
            }
            return None;
        }

        let request = self.select_section(index, Selection::new(link.section.clone()));
        if let Some(panel) = self.panels.get_mut(index) {
            panel.set_pending_anchor(link.element.clone());
        }
        request
    }

    /// Apply a location string: each listed panel selects its part.
    ///
    /// Panels not listed keep their selection. Sub-locations are also
    /// scrolled to once the section is laid out. Returns the loads to run,
    /// in panel order.
    pub fn restore_from_location(&mut self, location: &str) -> Vec<LoadRequest> {
        let selections = parse_location(location);
        info!("Restoring location '{}'", location);
        let mut requests = Vec::new();
        for (index, selection) in selections.into_iter().enumerate().take(self.panels.len()) {
            let anchor = selection.sub_location.clone();
            if let Some(request) = self.select_section(index, selection) {
                self.panels[index].set_pending_anchor(anchor);
                requests.push(request);
            }
        }
        requests
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Location string
    // ─────────────────────────────────────────────────────────────────────────

    /// Last built location string.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Rebuild the location string from the panel selections.
    ///
    /// Returns whether it changed.
    pub fn update_location(&mut self) -> bool {
        let location = build_location(self.panels.iter().map(Panel::selection));
        if location == self.location {
            return false;
        }
        debug!("Location is now '{}'", location);
        self.location = location;
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expansion
    // ─────────────────────────────────────────────────────────────────────────

    /// Show panel `index` alone, or all panels again if it already is.
    pub fn toggle_expanded(&mut self, index: usize) {
        if index >= self.panels.len() {
            return;
        }
        self.expanded = if self.expanded == Some(index) {
            None
        } else {
            Some(index)
        };
    }

    pub fn expanded(&self) -> Option<usize> {
        self.expanded
    }

    /// Positions of the panels currently shown.
    pub fn visible_panels(&self) -> Vec<usize> {
        match self.expanded {
            Some(index) => vec![index],
            None => (0..self.panels.len()).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tests::{section_markup, MemorySource};
    use crate::content::SectionContent;

    const BLOCK_HEIGHT: f32 = 100.0;

    /// Lay out a panel's blocks at a fixed height each.
    fn layout_of(content: &SectionContent, block_height: f32) -> PanelLayout {
        let mut layout = PanelLayout::default();
        for (i, block) in content.blocks.iter().enumerate() {
            let top = i as f32 * block_height;
            for id in &block.location_ids {
                layout.locations.push(LocationEntry::new(id.clone(), top));
            }
            for id in &block.element_ids {
                layout.anchors.push(LocationEntry::new(id.clone(), top));
            }
        }
        layout.content_height = content.blocks.len() as f32 * block_height;
        layout
    }

    fn lay_out(viewer: &mut Viewer, index: usize, block_height: f32) {
        let content = viewer.panel(index).unwrap().content().unwrap().clone();
        viewer.apply_layout(index, layout_of(&content, block_height));
    }

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
        range.map(|i| i.to_string()).collect()
    }

    fn source() -> MemorySource {
        let left = ids(1..=20);
        let left: Vec<&str> = left.iter().map(String::as_str).collect();
        let mut right: Vec<String> = ids(1..=20);
        right.insert(3, "only-right".to_string());
        let right: Vec<&str> = right.iter().map(String::as_str).collect();
        MemorySource::default()
            .with_page("ch1", &section_markup("ch1", &left))
            .with_page("ch2", &section_markup("ch2", &right))
            .with_page("ch2/p3", &section_markup("p3", &["5"]))
            .with_page("short", &section_markup("short", &["1"]))
    }

    /// Two loaded, laid-out panels: ch1 at 100pt per block, ch2 at 60pt.
    fn two_panels(sync: bool) -> Viewer {
        let source = source();
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.set_switch(SWITCH_SYNC, false);
        viewer.set_switch(SWITCH_HIGHLIGHT, true);
        for (index, section) in ["ch1", "ch2"].into_iter().enumerate() {
            viewer.add_panel(Selection::default());
            let request = viewer.select_section(index, Selection::new(section)).unwrap();
            assert!(viewer.complete_load(request.run(&source)));
        }
        lay_out(&mut viewer, 0, BLOCK_HEIGHT);
        lay_out(&mut viewer, 1, 60.0);
        viewer.set_switch(SWITCH_SYNC, sync);
        viewer
    }

    #[test]
    fn test_unknown_switch_reads_false() {
        let mut viewer = Viewer::new(PanelGeometry::default());
        assert!(!viewer.switch("nonexistent"));
        viewer.set_switch(SWITCH_COLLATION, true);
        assert!(viewer.switch(SWITCH_COLLATION));
        assert!(!viewer.toggle_switch(SWITCH_COLLATION));
        assert!(!viewer.switch(SWITCH_COLLATION));
    }

    #[test]
    fn test_add_panel_returns_initial_load_in_order() {
        let mut viewer = Viewer::new(PanelGeometry::default());
        let first = viewer.add_panel(Selection::new("ch1")).unwrap();
        let second = viewer.add_panel(Selection::new("ch2")).unwrap();
        assert!(viewer.add_panel(Selection::default()).is_none());
        assert_eq!((first.panel, first.reference.as_str()), (0, "ch1"));
        assert_eq!((second.panel, second.reference.as_str()), (1, "ch2"));
        assert!(viewer.panel(0).unwrap().is_loading());
        assert_eq!(viewer.panel(2).unwrap().status(), &PanelStatus::Empty);
    }

    #[test]
    fn test_user_scroll_syncs_other_panel() {
        let mut viewer = two_panels(true);

        // Block "8" of ch1 is the eighth block: top 700
        assert!(viewer.on_scroll(0, 700.0, ScrollOrigin::User));
        assert_eq!(viewer.location_id(), "8");

        let right = viewer.panel(1).unwrap();
        // In ch2 "8" is the ninth block (after "only-right"): top 8 * 60
        assert_eq!(right.scroll_offset(), 480.0);
        assert_eq!(right.location_id(), "8");
        // The source panel is left alone
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 700.0);
    }

    #[test]
    fn test_panel_laid_out_late_follows_shared_location() {
        let source = source();
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.set_switch(SWITCH_HIGHLIGHT, true);
        for (index, section) in ["ch1", "ch2"].into_iter().enumerate() {
            viewer.add_panel(Selection::default());
            let request = viewer.select_section(index, Selection::new(section)).unwrap();
            assert!(viewer.complete_load(request.run(&source)));
        }
        // Only the expanded panel is drawn and measured
        viewer.set_switch(SWITCH_SYNC, true);
        viewer.toggle_expanded(0);
        lay_out(&mut viewer, 0, BLOCK_HEIGHT);
        assert!(viewer.on_scroll(0, 700.0, ScrollOrigin::User));
        assert_eq!(viewer.location_id(), "8");
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 0.0);

        viewer.toggle_expanded(0);
        lay_out(&mut viewer, 1, 60.0);
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 700.0);
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 480.0);
        assert_eq!(viewer.location_id(), "8");
        assert_eq!(viewer.panel(0).unwrap().highlighted(), Some("8"));
        assert_eq!(viewer.panel(1).unwrap().highlighted(), Some("8"));
    }

    #[test]
    fn test_reloaded_panel_follows_without_moving_others() {
        let source = source();
        let mut viewer = two_panels(true);
        viewer.on_scroll(0, 700.0, ScrollOrigin::User);

        let request = viewer.select_section(1, Selection::new("ch2")).unwrap();
        assert!(viewer.complete_load(request.run(&source)));
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 0.0);
        lay_out(&mut viewer, 1, 60.0);

        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 700.0);
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 480.0);
        assert_eq!(viewer.location_id(), "8");
    }

    #[test]
    fn test_relayout_does_not_move_other_panels() {
        let mut viewer = two_panels(true);
        viewer.on_scroll(0, 700.0, ScrollOrigin::User);
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 480.0);

        // Taller blocks put "6" at the top of the right box
        assert!(viewer.apply_layout(1, {
            let content = viewer.panel(1).unwrap().content().unwrap().clone();
            layout_of(&content, 80.0)
        }));
        assert_eq!(viewer.panel(1).unwrap().location_id(), "6");
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 700.0);
        assert_eq!(viewer.location_id(), "8");

        viewer.on_resize(&ViewportMetrics {
            viewer_max_height: 600.0,
            window_height: 900.0,
            page_scroll_top: 0.0,
        });
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 700.0);
        assert_eq!(viewer.location_id(), "8");
    }

    #[test]
    fn test_scroll_sequence_converges_on_last_location() {
        let mut viewer = two_panels(true);
        for offset in [100.0, 350.0, 520.0, 1200.0] {
            viewer.on_scroll(0, offset, ScrollOrigin::User);
        }
        let last = viewer.panel(0).unwrap().location_id().to_string();
        assert_eq!(last, "13");
        assert_eq!(viewer.location_id(), last);
        assert_eq!(viewer.panel(1).unwrap().location_id(), last);
    }

    #[test]
    fn test_sync_origin_does_not_rebroadcast() {
        let mut viewer = two_panels(true);
        viewer.on_scroll(0, 700.0, ScrollOrigin::User);
        // A follow-up scroll event from the synced panel with Sync origin
        // must not move the source panel
        assert!(!viewer.on_scroll(1, 480.0, ScrollOrigin::Sync));
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 700.0);
        assert_eq!(viewer.location_id(), "8");
    }

    #[test]
    fn test_sync_off_stops_propagation_and_resumes() {
        let mut viewer = two_panels(false);
        assert!(!viewer.on_scroll(0, 700.0, ScrollOrigin::User));
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 0.0);
        assert_eq!(viewer.location_id(), "");

        viewer.set_switch(SWITCH_SYNC, true);
        // Nothing happens until the next scroll
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 0.0);
        assert!(viewer.on_scroll(0, 300.0, ScrollOrigin::User));
        assert_eq!(viewer.panel(1).unwrap().location_id(), "4");
    }

    #[test]
    fn test_highlight_both_panes() {
        let mut viewer = two_panels(true);
        viewer.on_scroll(0, 400.0, ScrollOrigin::User);
        assert_eq!(viewer.location_id(), "5");
        assert_eq!(viewer.panel(0).unwrap().highlighted(), Some("5"));
        assert_eq!(viewer.panel(1).unwrap().highlighted(), Some("5"));

        // Moving on removes the old highlight
        viewer.on_scroll(0, 500.0, ScrollOrigin::User);
        assert_eq!(viewer.panel(0).unwrap().highlighted(), Some("6"));
        assert_eq!(viewer.panel(1).unwrap().highlighted(), Some("6"));
    }

    #[test]
    fn test_highlight_skips_unpaired_identifier() {
        let mut viewer = two_panels(true);
        viewer.on_scroll(0, 400.0, ScrollOrigin::User);
        // "only-right" is the fourth block of ch2: top 3 * 60
        viewer.on_scroll(1, 180.0, ScrollOrigin::User);
        assert_eq!(viewer.location_id(), "only-right");
        assert_eq!(viewer.panel(0).unwrap().highlighted(), None);
        assert_eq!(viewer.panel(1).unwrap().highlighted(), None);
        // The left panel has no target and stays put
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 400.0);
    }

    #[test]
    fn test_highlight_needs_a_match_in_another_pane() {
        let source = MemorySource::default()
            .with_page("dup", &section_markup("dup", &["1", "x", "x", "2"]));
        let mut viewer = two_panels(false);
        let request = viewer.select_section(1, Selection::new("dup")).unwrap();
        assert!(viewer.complete_load(request.run(&source)));
        lay_out(&mut viewer, 1, 60.0);
        viewer.set_switch(SWITCH_SYNC, true);

        // Two "x" blocks in one pane are still only one pane
        viewer.on_scroll(1, 60.0, ScrollOrigin::User);
        assert_eq!(viewer.location_id(), "x");
        assert_eq!(viewer.panel(1).unwrap().highlighted(), None);

        viewer.on_scroll(1, 180.0, ScrollOrigin::User);
        assert_eq!(viewer.location_id(), "2");
        assert_eq!(viewer.panel(0).unwrap().highlighted(), Some("2"));
        assert_eq!(viewer.panel(1).unwrap().highlighted(), Some("2"));
    }

    #[test]
    fn test_highlight_switch_off() {
        let mut viewer = two_panels(true);
        viewer.set_switch(SWITCH_HIGHLIGHT, false);
        viewer.on_scroll(0, 400.0, ScrollOrigin::User);
        assert_eq!(viewer.panel(0).unwrap().highlighted(), None);

        viewer.set_switch(SWITCH_HIGHLIGHT, true);
        viewer.on_scroll(0, 500.0, ScrollOrigin::User);
        assert_eq!(viewer.panel(1).unwrap().highlighted(), Some("6"));
        viewer.set_switch(SWITCH_HIGHLIGHT, false);
        assert_eq!(viewer.panel(1).unwrap().highlighted(), None);
    }

    #[test]
    fn test_repeated_identical_load_is_idempotent() {
        let source = source();
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.add_panel(Selection::default());

        assert!(viewer.load_now(0, "ch1", &source));
        let first = viewer.panel(0).unwrap().content().cloned().unwrap();
        assert!(viewer.load_now(0, "ch1", &source));
        let second = viewer.panel(0).unwrap().content().cloned().unwrap();

        assert_eq!(first, second);
        assert_eq!(second.toc.len(), 1);
        assert_eq!(second.toc[0].link.section, "ch1");
        assert_eq!(second.blocks.len(), 20);
    }

    #[test]
    fn test_failed_load_and_retry() {
        let source = source();
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.add_panel(Selection::default());
        let request = viewer.select_section(0, Selection::new("missing")).unwrap();
        assert!(viewer.complete_load(request.run(&source)));
        assert!(matches!(
            viewer.panel(0).unwrap().status(),
            PanelStatus::Failed { .. }
        ));
        assert_eq!(viewer.location(), "missing");

        let retry = viewer.retry(0).unwrap();
        assert_eq!(retry.reference, "missing");
        assert!(viewer.panel(0).unwrap().is_loading());
    }

    #[test]
    fn test_superseded_load_is_ignored() {
        let source = source();
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.add_panel(Selection::default());
        let first = viewer.select_section(0, Selection::new("ch1")).unwrap();
        let second = viewer.select_section(0, Selection::new("short")).unwrap();

        assert!(viewer.complete_load(second.run(&source)));
        assert!(!viewer.complete_load(first.run(&source)));
        assert_eq!(viewer.panel(0).unwrap().content().unwrap().blocks.len(), 1);
        assert_eq!(viewer.location(), "short");
    }

    #[test]
    fn test_resize_bounds() {
        let mut viewer = two_panels(false);
        viewer.set_box_top(0, 100.0);
        viewer.set_box_top(1, 100.0);
        for (max, window) in [(50.0, 50.0), (600.0, 900.0), (3000.0, 700.0), (0.0, 0.0)] {
            viewer.on_resize(&ViewportMetrics {
                viewer_max_height: max,
                window_height: window,
                page_scroll_top: 0.0,
            });
            for panel in viewer.panels() {
                let ceiling = max - 100.0 - DEFAULT_MARGIN;
                assert!(panel.box_height() >= DEFAULT_MIN_HEIGHT);
                assert!(panel.box_height() <= ceiling.max(DEFAULT_MIN_HEIGHT));
            }
        }
    }

    #[test]
    fn test_location_string_and_restore_round_trip() {
        let source = source();
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.add_panel(Selection::default());
        viewer.add_panel(Selection::default());
        for request in viewer.restore_from_location("#ch1/ch2,p3") {
            viewer.complete_load(request.run(&source));
        }
        assert_eq!(viewer.location(), "ch1/ch2,p3");

        let mut fresh = Viewer::new(PanelGeometry::default());
        fresh.add_panel(Selection::default());
        fresh.add_panel(Selection::default());
        let requests = fresh.restore_from_location(viewer.location());
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].reference, "ch2/p3");
        assert_eq!(fresh.panel(0).unwrap().selection(), &Selection::new("ch1"));
        assert_eq!(
            fresh.panel(1).unwrap().selection(),
            &Selection::new("ch2").with_sub_location("p3")
        );
    }

    #[test]
    fn test_restore_keeps_unlisted_panels() {
        let mut viewer = Viewer::new(PanelGeometry::default());
        viewer.add_panel(Selection::default());
        viewer.add_panel(Selection::new("ch2"));
        let requests = viewer.restore_from_location("ch1");
        assert_eq!(requests.len(), 1);
        assert_eq!(viewer.panel(1).unwrap().selection(), &Selection::new("ch2"));
    }

    #[test]
    fn test_clearing_selection_updates_location() {
        let source = source();
        let mut viewer = two_panels(false);
        assert_eq!(viewer.location(), "ch1/ch2");
        assert!(viewer.select_section(1, Selection::default()).is_none());
        assert_eq!(viewer.location(), "ch1/");
        assert_eq!(viewer.panel(1).unwrap().status(), &PanelStatus::Empty);
        assert!(viewer.load_now(1, "short", &source));
    }

    #[test]
    fn test_follow_link_within_section_scrolls() {
        let mut viewer = two_panels(true);
        let link = SectionLink {
            section: "ch1".to_string(),
            element: Some("missing".to_string()),
            label: String::new(),
        };
        assert!(viewer.follow_link(0, &link).is_none());
        assert_eq!(viewer.panel(0).unwrap().scroll_offset(), 0.0);
    }

    #[test]
    fn test_follow_link_to_other_section_scrolls_after_layout() {
        let source = MemorySource::default().with_page(
            "notes",
            r#"<div id="text-content"><p>a</p><p>b</p><p id="n2" data-text-id="7">c</p>
               <p>d</p><p>e</p><p>f</p></div>"#,
        );
        let mut viewer = two_panels(false);
        let link = SectionLink {
            section: "notes".to_string(),
            element: Some("n2".to_string()),
            label: "note".to_string(),
        };
        let request = viewer.follow_link(1, &link).unwrap();
        assert!(viewer.complete_load(request.run(&source)));
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 0.0);

        // Box height is the 100pt minimum; six blocks give 500pt of scroll
        lay_out(&mut viewer, 1, BLOCK_HEIGHT);
        assert_eq!(viewer.panel(1).unwrap().scroll_offset(), 200.0);
        assert_eq!(viewer.panel(1).unwrap().location_id(), "7");
        assert_eq!(viewer.location(), "ch1/notes");
    }

    #[test]
    fn test_reload_reference() {
        let mut viewer = two_panels(false);
        let requests = viewer.reload_reference("ch2");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].panel, 1);
        assert!(viewer.reload_reference("nothing").is_empty());
        assert_eq!(viewer.reload_all().len(), 2);
    }

    #[test]
    fn test_one_inner_note_open_at_a_time() {
        let notes = r#"<div id="text-content">
            <p data-text-id="1">a<a class="inner-note-link" target="n1">*</a></p>
            <div class="inner-note" id="n1"><p>first</p></div>
            <p data-text-id="2">b<a class="inner-note-link" target="n2">*</a></p>
            <div class="inner-note" id="n2"><p>second</p></div>
        </div>"#;
        let source = MemorySource::default().with_page("notes", notes);
        let mut viewer = two_panels(false);
        assert!(viewer.load_now(1, "notes", &source));

        assert!(viewer.toggle_note(1, "n1"));
        assert_eq!(viewer.panel(1).unwrap().open_note(), Some("n1"));
        // Opening another note closes the first
        assert!(viewer.toggle_note(1, "n2"));
        assert_eq!(viewer.panel(1).unwrap().open_note(), Some("n2"));
        // Clicking the open note closes it
        assert!(!viewer.toggle_note(1, "n2"));
        assert_eq!(viewer.panel(1).unwrap().open_note(), None);

        assert!(!viewer.toggle_note(0, "n1"));
        assert!(!viewer.toggle_note(1, "missing"));
        assert_eq!(viewer.panel(1).unwrap().open_note(), None);

        viewer.toggle_note(1, "n1");
        assert!(viewer.load_now(1, "notes", &source));
        assert_eq!(viewer.panel(1).unwrap().open_note(), None);
    }

    #[test]
    fn test_toggle_expanded() {
        let mut viewer = two_panels(false);
        assert_eq!(viewer.visible_panels(), vec![0, 1]);
        viewer.toggle_expanded(1);
        assert_eq!(viewer.expanded(), Some(1));
        assert_eq!(viewer.visible_panels(), vec![1]);
        viewer.toggle_expanded(0);
        assert_eq!(viewer.visible_panels(), vec![0]);
        viewer.toggle_expanded(0);
        assert_eq!(viewer.visible_panels(), vec![0, 1]);
        viewer.toggle_expanded(7);
        assert_eq!(viewer.expanded(), None);
    }
}
