//! A single scrollable text panel.
//!
//! The panel owns its selection, load status, loaded content and location
//! index, and tracks which location identifier is at the top of its box.
//! It never talks to other panels; the [`Viewer`](super::Viewer) decides
//! what a visibility change means for them.

use super::index::{LocationIndex, PanelLayout};
use super::location::Selection;
use crate::content::{LoadOutcome, LoadRequest, SectionContent};
use log::debug;

/// Distance below the box top within which an element counts as visible.
pub const DEFAULT_VISIBILITY_WINDOW: f32 = 40.0;

/// Smallest height a panel box is given.
pub const DEFAULT_MIN_HEIGHT: f32 = 100.0;

/// Space kept between a box and the viewer's lower boundary.
pub const DEFAULT_MARGIN: f32 = 20.0;

/// Offsets closer than this are the same scroll position.
const SCROLL_EPSILON: f32 = 0.5;

// ─────────────────────────────────────────────────────────────────────────────
// Scroll Origin
// ─────────────────────────────────────────────────────────────────────────────

/// Origin of a scroll or visibility change, used to prevent feedback loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOrigin {
    /// The user scrolled the panel
    User,
    /// The box was resized or its content laid out again
    Layout,
    /// A section link or restored location moved the panel
    Navigation,
    /// The viewer moved the panel to follow another one
    Sync,
}

impl ScrollOrigin {
    /// Whether a change with this origin may start a synchronization.
    ///
    /// Only the user and explicit navigation move the shared location. A
    /// resize or re-layout keeps the panel where it was without pulling the
    /// others along.
    pub fn drives_sync(self) -> bool {
        matches!(self, ScrollOrigin::User | ScrollOrigin::Navigation)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Sizing and visibility parameters shared by all panels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelGeometry {
    pub visibility_window: f32,
    pub min_height: f32,
    pub margin: f32,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            visibility_window: DEFAULT_VISIBILITY_WINDOW,
            min_height: DEFAULT_MIN_HEIGHT,
            margin: DEFAULT_MARGIN,
        }
    }
}

/// Window measurements a resize is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportMetrics {
    /// Top of the viewer's lower boundary (the status bar)
    pub viewer_max_height: f32,
    /// Height of the window
    pub window_height: f32,
    /// How far the page itself is scrolled
    pub page_scroll_top: f32,
}

/// Height of a box whose top is at `box_top`.
///
/// The box ends `margin` above the viewer boundary or the window bottom,
/// whichever is higher, but is never shorter than `min_height`.
pub fn box_height(metrics: &ViewportMetrics, box_top: f32, geometry: &PanelGeometry) -> f32 {
    let max_height = metrics.viewer_max_height - box_top - geometry.margin;
    let height = metrics.window_height - metrics.page_scroll_top - box_top - geometry.margin;
    height.min(max_height).max(geometry.min_height).floor()
}

// ─────────────────────────────────────────────────────────────────────────────
// Panel
// ─────────────────────────────────────────────────────────────────────────────

/// Load state of a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    /// Nothing selected
    Empty,
    /// A fetch is in flight; the box shows a placeholder
    Loading { generation: u64 },
    /// Content is in place
    Ready,
    /// The last fetch failed
    Failed { message: String, retryable: bool },
}

/// One scrollable pane.
#[derive(Debug, Clone)]
pub struct Panel {
    position: usize,
    selection: Selection,
    status: PanelStatus,
    content: Option<SectionContent>,
    index: LocationIndex,
    /// Identifier of the topmost visible element, empty if none
    location_id: String,
    highlighted: Option<String>,
    /// Incremented on every load or clear; older completions are stale
    generation: u64,
    geometry: PanelGeometry,
    box_top: f32,
    box_height: f32,
    scroll_offset: f32,
    /// Element id to scroll to once the next layout is known
    pending_anchor: Option<String>,
    /// Inner note currently shown
    open_note: Option<String>,
}

impl Panel {
    /// Create an empty panel at `position`.
    pub fn new(position: usize, selection: Selection, geometry: PanelGeometry) -> Self {
        Self {
            position,
            selection,
            status: PanelStatus::Empty,
            content: None,
            index: LocationIndex::new(),
            location_id: String::new(),
            highlighted: None,
            generation: 0,
            geometry,
            box_top: 0.0,
            box_height: geometry.min_height,
            scroll_offset: 0.0,
            pending_anchor: None,
            open_note: None,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> &PanelStatus {
        &self.status
    }

    pub fn content(&self) -> Option<&SectionContent> {
        self.content.as_ref()
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    /// Identifier of the topmost visible element, empty if none.
    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    /// Id of the inner note currently shown, if any.
    pub fn open_note(&self) -> Option<&str> {
        self.open_note.as_deref()
    }

    /// Check whether the content has an inner note with this id.
    pub fn has_note(&self, note_id: &str) -> bool {
        self.content.as_ref().is_some_and(|content| {
            content
                .blocks
                .iter()
                .any(|block| block.note.as_deref() == Some(note_id))
        })
    }

    /// Where the box starts in the window.
    pub fn box_top(&self) -> f32 {
        self.box_top
    }

    pub fn box_height(&self) -> f32 {
        self.box_height
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, PanelStatus::Loading { .. })
    }

    pub(super) fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub(super) fn set_highlight(&mut self, id: Option<String>) {
        self.highlighted = id;
    }

    pub(super) fn set_open_note(&mut self, note_id: Option<String>) {
        self.open_note = note_id;
    }

    pub(super) fn set_pending_anchor(&mut self, element_id: Option<String>) {
        self.pending_anchor = element_id;
    }

    pub(super) fn take_pending_anchor(&mut self) -> Option<String> {
        self.pending_anchor.take()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the content with a placeholder and describe the fetch to run.
    pub(super) fn begin_load(&mut self, reference: String) -> LoadRequest {
        self.reset_content();
        self.status = PanelStatus::Loading {
            generation: self.generation,
        };
        debug!(
            "Panel {} loading '{}' (generation {})",
            self.position, reference, self.generation
        );
        LoadRequest {
            panel: self.position,
            generation: self.generation,
            reference,
        }
    }

    /// Apply a finished fetch. Returns `false` for superseded fetches.
    pub(super) fn complete_load(&mut self, outcome: LoadOutcome) -> bool {
        if outcome.generation != self.generation || !self.is_loading() {
            debug!(
                "Panel {} ignoring stale load of '{}' (generation {}, current {})",
                self.position, outcome.reference, outcome.generation, self.generation
            );
            return false;
        }

        match outcome.result {
            Ok(content) => {
                self.content = Some(content);
                self.status = PanelStatus::Ready;
            }
            Err(err) => {
                self.pending_anchor = None;
                self.status = PanelStatus::Failed {
                    message: err.to_string(),
                    retryable: err.is_retryable(),
                };
            }
        }
        true
    }

    /// Show nothing.
    pub(super) fn clear(&mut self) {
        self.reset_content();
        self.pending_anchor = None;
        self.status = PanelStatus::Empty;
    }

    fn reset_content(&mut self) {
        self.generation += 1;
        self.content = None;
        self.index.clear();
        self.location_id.clear();
        self.highlighted = None;
        self.open_note = None;
        self.scroll_offset = 0.0;
    }

    /// Reference to fetch again after a failure.
    pub fn retry_reference(&self) -> Option<String> {
        match &self.status {
            PanelStatus::Failed { .. } if !self.selection.is_empty() => {
                Some(self.selection.reference())
            }
            _ => None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sizing and visibility
    // ─────────────────────────────────────────────────────────────────────────

    /// Record where the box starts in the window.
    pub(super) fn set_box_top(&mut self, top: f32) {
        self.box_top = top;
    }

    /// Recompute the box height and what is visible in it.
    pub(super) fn on_resize(&mut self, metrics: &ViewportMetrics) {
        self.box_height = box_height(metrics, self.box_top, &self.geometry);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
        self.on_visible_content_change(ScrollOrigin::Layout);
    }

    /// Replace the measured layout. Returns `false` if it is unchanged.
    pub(super) fn apply_layout(&mut self, layout: PanelLayout) -> bool {
        if !self.index.rebuild(layout) {
            return false;
        }
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
        true
    }

    /// Largest offset the box can scroll to.
    pub fn max_scroll_offset(&self) -> f32 {
        (self.index.content_height() - self.box_height).max(0.0)
    }

    /// Record a new scroll offset and recompute the visible identifier.
    pub(super) fn on_scroll(&mut self, offset: f32, origin: ScrollOrigin) -> bool {
        self.scroll_offset = offset.max(0.0);
        self.on_visible_content_change(origin)
    }

    /// Recompute the topmost visible identifier.
    ///
    /// Returns whether the change should be reported to the viewer, see
    /// [`ScrollOrigin::drives_sync`].
    pub(super) fn on_visible_content_change(&mut self, origin: ScrollOrigin) -> bool {
        self.location_id = self
            .index
            .first_visible(self.scroll_offset, self.geometry.visibility_window)
            .map(|entry| entry.id.clone())
            .unwrap_or_default();
        origin.drives_sync()
    }

    /// Scroll so that content offset `top` is at the box top.
    ///
    /// Returns whether the scroll position changed.
    pub(super) fn scroll_box_to(&mut self, top: f32) -> bool {
        let target = top.clamp(0.0, self.max_scroll_offset());
        let moved = (target - self.scroll_offset).abs() > SCROLL_EPSILON;
        self.scroll_offset = target;
        moved
    }

    /// Scroll to the element with the given element id.
    ///
    /// Returns whether such an element exists.
    pub(super) fn scroll_to_element(&mut self, element_id: &str) -> bool {
        match self.index.find_anchor(element_id).map(|e| e.top) {
            Some(top) => {
                self.scroll_box_to(top);
                true
            }
            None => false,
        }
    }

    /// Follow another panel: scroll to the first element tagged `id`.
    ///
    /// The resulting visibility change has origin [`ScrollOrigin::Sync`] and
    /// is never reported back. Returns whether a target was found.
    pub(super) fn sync_to_location_id(&mut self, id: &str) -> bool {
        let Some(top) = self.index.find(id).map(|e| e.top) else {
            return false;
        };
        self.scroll_box_to(top);
        self.on_visible_content_change(ScrollOrigin::Sync);
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
