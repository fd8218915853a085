//! Rendering of one text panel.
//!
//! Draws a panel's tool bar (section selection, contents menu, expand
//! button) and its scrollable box. The widget never mutates the viewer; it
//! returns [`PanelAction`]s that the app applies afterwards, which keeps the
//! borrow of the panel read-only while egui lays it out.
//!
//! Scroll positions flow both ways. When the viewer moved the panel since the
//! last frame, the box is forced to the new offset and the settled offset is
//! reported back with origin `Sync`, so it never drives a broadcast. Any
//! other change of the observed offset is the user scrolling.

use crate::content::SectionEntry;
use crate::markup::{Block, BlockKind, SectionLink, Span, TextClass};
use crate::theme::ReadingPalette;
use crate::viewer::{LocationEntry, Panel, PanelLayout, PanelStatus, ScrollOrigin, Selection};
use eframe::egui::{self, Color32, RichText, Stroke};
use std::collections::HashSet;

/// Observed offsets closer than this count as unchanged.
const OFFSET_TOLERANCE: f32 = 0.5;

/// Something the user did to a panel, applied by the app after rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelAction {
    /// The selection control changed
    Select(Selection),
    /// A section link was clicked
    FollowLink(SectionLink),
    /// The retry button of a failed load was clicked
    Retry,
    /// The expand button was clicked
    ToggleExpanded,
    /// An inner note link was clicked
    ToggleNote(String),
    /// The box scrolled
    Scrolled { offset: f32, origin: ScrollOrigin },
    /// The content was laid out with these positions
    Layout(PanelLayout),
    /// Where the box starts in the window
    BoxTop(f32),
}

/// Which optional text classes are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFilter {
    pub commentary: bool,
    pub collation: bool,
}

impl TextFilter {
    pub fn shows(&self, class: TextClass) -> bool {
        match class {
            TextClass::Plain => true,
            TextClass::Commentary => self.commentary,
            TextClass::Collation => self.collation,
        }
    }

    /// Whether any text of `block` survives the filter.
    pub fn shows_block(&self, block: &Block) -> bool {
        self.shows(block.class)
            && block
                .spans
                .iter()
                .any(|s| self.shows(s.class) && !s.text.trim().is_empty())
    }
}

/// Per-panel widget state kept across frames.
#[derive(Debug, Clone, Default)]
pub struct PanelViewState {
    /// Scroll offset egui reported last frame
    observed_offset: Option<f32>,
    /// Free-form section input used when the source lists no sections
    reference_input: String,
    /// Contents entries whose scene list is unfolded, by section
    open_scene_lists: HashSet<String>,
}

impl PanelViewState {
    fn shows_scenes(&self, section: &str) -> bool {
        self.open_scene_lists.contains(section)
    }

    fn toggle_scenes(&mut self, section: &str) {
        if !self.open_scene_lists.remove(section) {
            self.open_scene_lists.insert(section.to_string());
        }
    }
}

/// Everything a panel needs from the app to render.
pub struct PanelContext<'a> {
    pub catalog: &'a [SectionEntry],
    pub filter: TextFilter,
    pub palette: &'a ReadingPalette,
    pub expanded: bool,
}

/// Render a panel and collect what the user did to it.
pub fn show_panel(
    ui: &mut egui::Ui,
    panel: &Panel,
    state: &mut PanelViewState,
    context: &PanelContext<'_>,
) -> Vec<PanelAction> {
    let mut actions = Vec::new();

    show_tool_bar(ui, panel, state, context, &mut actions);

    actions.push(PanelAction::BoxTop(ui.cursor().top()));
    let height = panel.box_height();

    match panel.status() {
        PanelStatus::Ready => show_box(ui, panel, state, context, &mut actions),
        status => {
            // Forget the offset so the next content starts from the model's
            state.observed_offset = None;
            let size = egui::vec2(ui.available_width(), height);
            ui.allocate_ui(size, |ui| {
                ui.set_min_size(size);
                show_placeholder(ui, status, context.palette, &mut actions);
            });
        }
    }

    actions
}

fn show_tool_bar(
    ui: &mut egui::Ui,
    panel: &Panel,
    state: &mut PanelViewState,
    context: &PanelContext<'_>,
    actions: &mut Vec<PanelAction>,
) {
    ui.horizontal(|ui| {
        let selection = panel.selection();
        if context.catalog.is_empty() {
            if state.reference_input.is_empty() && !selection.is_empty() {
                state.reference_input = selection.to_string();
            }
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.reference_input)
                    .hint_text("Section")
                    .desired_width(160.0),
            );
            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                actions.push(PanelAction::Select(Selection::parse_part(
                    &state.reference_input,
                )));
            }
        } else {
            let current = context
                .catalog
                .iter()
                .find(|entry| entry.reference == selection.section)
                .map(|entry| entry.label.clone())
                .unwrap_or_else(|| selection.to_string());
            egui::ComboBox::from_id_source(("panel-select", panel.position()))
                .selected_text(current)
                .width(200.0)
                .show_ui(ui, |ui| {
                    if ui.selectable_label(selection.is_empty(), "(none)").clicked() {
                        actions.push(PanelAction::Select(Selection::default()));
                    }
                    for entry in context.catalog {
                        let selected = entry.reference == selection.section;
                        if ui.selectable_label(selected, &entry.label).clicked() && !selected {
                            actions.push(PanelAction::Select(Selection::new(
                                entry.reference.clone(),
                            )));
                        }
                    }
                });
        }

        if let Some(content) = panel.content().filter(|c| !c.toc.is_empty()) {
            ui.menu_button("Contents", |ui| {
                for entry in &content.toc {
                    let section = entry.link.section.as_str();
                    ui.horizontal(|ui| {
                        if ui.button(&entry.link.label).clicked() {
                            actions.push(PanelAction::FollowLink(entry.link.clone()));
                            ui.close_menu();
                        }
                        if !entry.scenes.is_empty() {
                            let (icon, tooltip) = if state.shows_scenes(section) {
                                ("−", "Hide scenes")
                            } else {
                                ("+", "Show scenes")
                            };
                            if ui.small_button(icon).on_hover_text(tooltip).clicked() {
                                state.toggle_scenes(section);
                            }
                        }
                    });
                    if entry.scenes.is_empty() || !state.shows_scenes(section) {
                        continue;
                    }
                    ui.indent(("scenes", section), |ui| {
                        for scene in &entry.scenes {
                            if ui.button(&scene.label).clicked() {
                                actions.push(PanelAction::FollowLink(scene.clone()));
                                ui.close_menu();
                            }
                        }
                    });
                }
            });
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let (icon, tooltip) = if context.expanded {
                ("⊟", "Show all panels")
            } else {
                ("⊞", "Show this panel alone")
            };
            if ui.small_button(icon).on_hover_text(tooltip).clicked() {
                actions.push(PanelAction::ToggleExpanded);
            }
        });
    });
}

fn show_placeholder(
    ui: &mut egui::Ui,
    status: &PanelStatus,
    palette: &ReadingPalette,
    actions: &mut Vec<PanelAction>,
) {
    match status {
        PanelStatus::Empty => {
            ui.label(RichText::new("No section selected").color(palette.muted).italics());
        }
        PanelStatus::Loading { .. } => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Loading…").color(palette.muted));
            });
        }
        PanelStatus::Failed { message, retryable } => {
            ui.label(RichText::new(message).color(palette.error));
            if *retryable && ui.button("Retry").clicked() {
                actions.push(PanelAction::Retry);
            }
        }
        PanelStatus::Ready => {}
    }
}

fn show_box(
    ui: &mut egui::Ui,
    panel: &Panel,
    state: &mut PanelViewState,
    context: &PanelContext<'_>,
    actions: &mut Vec<PanelAction>,
) {
    let Some(content) = panel.content() else {
        return;
    };
    let height = panel.box_height();
    let model_offset = panel.scroll_offset();
    let forced = state
        .observed_offset
        .map_or(true, |seen| (seen - model_offset).abs() > OFFSET_TOLERANCE);

    let mut area = egui::ScrollArea::vertical()
        .id_source(("panel-box", panel.position()))
        .auto_shrink([false, false])
        .max_height(height)
        .min_scrolled_height(height);
    if forced {
        area = area.vertical_scroll_offset(model_offset);
    }

    let frame = egui::Frame::none()
        .fill(context.palette.background)
        .inner_margin(egui::Margin::symmetric(8.0, 0.0));

    let output = frame
        .show(ui, |ui| {
            area.show(ui, |ui| {
                let content_top = ui.min_rect().top();
                let mut layout = PanelLayout::default();
                for block in &content.blocks {
                    let top = ui.cursor().top() - content_top;
                    for id in &block.location_ids {
                        layout.locations.push(LocationEntry::new(id.clone(), top));
                    }
                    for id in &block.element_ids {
                        layout.anchors.push(LocationEntry::new(id.clone(), top));
                    }
                    let note_open = block
                        .note
                        .as_deref()
                        .map_or(true, |id| panel.open_note() == Some(id));
                    if note_open && context.filter.shows_block(block) {
                        let highlighted = panel
                            .highlighted()
                            .is_some_and(|id| block.has_location_id(id));
                        show_block(ui, block, highlighted, context, actions);
                    }
                }
                layout
            })
        })
        .inner;

    let mut layout = output.inner;
    layout.content_height = output.content_size.y;
    actions.push(PanelAction::Layout(layout));

    let observed = output.state.offset.y;
    state.observed_offset = Some(observed);
    if forced {
        if (observed - model_offset).abs() > OFFSET_TOLERANCE {
            actions.push(PanelAction::Scrolled {
                offset: observed,
                origin: ScrollOrigin::Sync,
            });
        }
    } else if (observed - model_offset).abs() > OFFSET_TOLERANCE {
        actions.push(PanelAction::Scrolled {
            offset: observed,
            origin: ScrollOrigin::User,
        });
    }
}

fn show_block(
    ui: &mut egui::Ui,
    block: &Block,
    highlighted: bool,
    context: &PanelContext<'_>,
    actions: &mut Vec<PanelAction>,
) {
    let fill = if highlighted {
        context.palette.highlight
    } else {
        Color32::TRANSPARENT
    };
    let indent = match block.kind {
        BlockKind::Quote | BlockKind::ListItem => 16.0,
        _ => 0.0,
    };
    let stroke = if block.note.is_some() {
        Stroke::new(1.0, context.palette.muted)
    } else {
        Stroke::NONE
    };

    egui::Frame::none()
        .fill(fill)
        .stroke(stroke)
        .inner_margin(egui::Margin {
            left: indent,
            right: 0.0,
            top: 2.0,
            bottom: 2.0,
        })
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal_wrapped(|ui| {
                ui.spacing_mut().item_spacing.x = 0.0;
                if block.kind == BlockKind::ListItem {
                    ui.label("• ");
                }
                for span in block.spans.iter().filter(|s| context.filter.shows(s.class)) {
                    let text = span_text(span, block.kind, context.palette);
                    match (&span.link, &span.note_link) {
                        (Some(link), _) => {
                            if ui.link(text).clicked() {
                                actions.push(PanelAction::FollowLink(link.clone()));
                            }
                        }
                        (None, Some(note_id)) => {
                            if ui.link(text).clicked() {
                                actions.push(PanelAction::ToggleNote(note_id.clone()));
                            }
                        }
                        (None, None) => {
                            ui.label(text);
                        }
                    }
                }
            });
        });
    ui.add_space(6.0);
}

fn span_text(span: &Span, kind: BlockKind, palette: &ReadingPalette) -> RichText {
    let mut text = RichText::new(&span.text).color(palette.class_color(span.class));
    if span.link.is_some() || span.note_link.is_some() {
        text = text.color(palette.link);
    }
    match kind {
        BlockKind::Heading(level) => {
            text = text.size(heading_size(level)).strong();
        }
        BlockKind::Preformatted => text = text.monospace(),
        BlockKind::Quote => text = text.italics(),
        _ => {}
    }
    if span.emphasis {
        text = text.italics();
    }
    if span.strong {
        text = text.strong();
    }
    text
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 24.0,
        2 => 20.0,
        3 => 17.0,
        _ => 15.0,
    }
}
