//! Quick section switcher with fuzzy search.
//!
//! Provides a Ctrl+P overlay for jumping to any section the content source
//! lists, matched on both label and reference.

use crate::content::SectionEntry;
use eframe::egui::{self, Color32, Key, RichText, Sense};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Maximum number of results to show in the quick switcher.
const MAX_RESULTS: usize = 15;

/// Output from the quick switcher.
#[derive(Debug, Default)]
pub struct QuickSwitcherOutput {
    /// Reference of the section picked by the user
    pub selected: Option<String>,
    /// Whether the quick switcher was closed (Escape or selection)
    pub closed: bool,
}

/// Quick section switcher state.
pub struct QuickSwitcher {
    is_open: bool,
    query: String,
    selected_index: usize,
    matcher: SkimMatcherV2,
}

impl Default for QuickSwitcher {
    fn default() -> Self {
        Self::new()
    }
}

impl QuickSwitcher {
    pub fn new() -> Self {
        Self {
            is_open: false,
            query: String::new(),
            selected_index: 0,
            matcher: SkimMatcherV2::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open(&mut self) {
        self.is_open = true;
        self.query.clear();
        self.selected_index = 0;
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.query.clear();
        self.selected_index = 0;
    }

    pub fn toggle(&mut self) {
        if self.is_open {
            self.close();
        } else {
            self.open();
        }
    }

    /// Render the quick switcher and return any output.
    ///
    /// `shown` lists the references currently displayed in a panel; they are
    /// marked in the result list.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        sections: &[SectionEntry],
        shown: &[String],
        is_dark: bool,
    ) -> QuickSwitcherOutput {
        let mut output = QuickSwitcherOutput::default();

        if !self.is_open {
            return output;
        }

        let results = self.filter_sections(sections, shown);

        let bg_color = if is_dark {
            Color32::from_rgb(35, 35, 40)
        } else {
            Color32::from_rgb(255, 255, 255)
        };
        let border_color = if is_dark {
            Color32::from_rgb(80, 80, 90)
        } else {
            Color32::from_rgb(180, 180, 190)
        };
        let text_color = if is_dark {
            Color32::from_rgb(220, 220, 220)
        } else {
            Color32::from_rgb(40, 40, 40)
        };
        let secondary_color = if is_dark {
            Color32::from_rgb(140, 140, 150)
        } else {
            Color32::from_rgb(100, 100, 110)
        };
        let selected_bg = if is_dark {
            Color32::from_rgb(55, 65, 85)
        } else {
            Color32::from_rgb(220, 230, 245)
        };

        ctx.input(|i| {
            if i.key_pressed(Key::Escape) {
                output.closed = true;
            }
            if i.key_pressed(Key::ArrowDown) && !results.is_empty() {
                self.selected_index = (self.selected_index + 1) % results.len();
            }
            if i.key_pressed(Key::ArrowUp) && !results.is_empty() {
                self.selected_index = self
                    .selected_index
                    .checked_sub(1)
                    .unwrap_or(results.len() - 1);
            }
            if i.key_pressed(Key::Enter) {
                if let Some(result) = results.get(self.selected_index) {
                    output.selected = Some(result.reference.clone());
                    output.closed = true;
                }
            }
        });

        egui::Area::new(egui::Id::new("quick_switcher_overlay"))
            .anchor(egui::Align2::CENTER_TOP, [0.0, 100.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(bg_color)
                    .stroke(egui::Stroke::new(1.0, border_color))
                    .rounding(8.0)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        ui.set_width(500.0);

                        let response = ui.add(
                            egui::TextEdit::singleline(&mut self.query)
                                .hint_text("Go to section...")
                                .frame(false)
                                .desired_width(f32::INFINITY),
                        );
                        response.request_focus();
                        if response.changed() {
                            self.selected_index = 0;
                        }

                        ui.separator();

                        if results.is_empty() {
                            ui.label(
                                RichText::new("No matching sections")
                                    .color(secondary_color)
                                    .italics(),
                            );
                        }

                        for (idx, result) in results.iter().enumerate() {
                            let row = ui
                                .horizontal(|ui| {
                                    let row_response = ui.interact(
                                        ui.available_rect_before_wrap(),
                                        ui.id().with(idx),
                                        Sense::click(),
                                    );
                                    if idx == self.selected_index || row_response.hovered() {
                                        ui.painter().rect_filled(
                                            row_response.rect.expand2(egui::vec2(4.0, 2.0)),
                                            4.0,
                                            selected_bg,
                                        );
                                    }
                                    ui.label(RichText::new(&result.label).color(text_color).strong());
                                    if result.label != result.reference {
                                        ui.label(
                                            RichText::new(&result.reference)
                                                .color(secondary_color)
                                                .small(),
                                        );
                                    }
                                    if result.is_shown {
                                        ui.with_layout(
                                            egui::Layout::right_to_left(egui::Align::Center),
                                            |ui| {
                                                ui.label(
                                                    RichText::new("shown")
                                                        .color(secondary_color)
                                                        .small(),
                                                );
                                            },
                                        );
                                    }
                                    row_response
                                })
                                .inner;

                            if row.clicked() {
                                output.selected = Some(result.reference.clone());
                                output.closed = true;
                            }
                        }

                        ui.separator();
                        ui.label(
                            RichText::new("↑↓ Navigate  ⏎ Open  Esc Close")
                                .color(secondary_color)
                                .small(),
                        );
                    });
            });

        if output.closed {
            self.close();
        }

        output
    }

    /// Filter and score sections against the current query.
    fn filter_sections(&self, sections: &[SectionEntry], shown: &[String]) -> Vec<SwitcherResult> {
        let result = |entry: &SectionEntry| SwitcherResult {
            reference: entry.reference.clone(),
            label: entry.label.clone(),
            is_shown: shown.contains(&entry.reference),
        };

        if self.query.is_empty() {
            return sections.iter().take(MAX_RESULTS).map(result).collect();
        }

        let mut scored: Vec<(i64, &SectionEntry)> = sections
            .iter()
            .filter_map(|entry| {
                let haystack = format!("{} {}", entry.label, entry.reference);
                self.matcher
                    .fuzzy_match(&haystack, &self.query)
                    .map(|score| (score, entry))
            })
            .collect();

        // Stable sort keeps catalog order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, entry)| result(entry))
            .collect()
    }
}

/// A single result in the quick switcher.
#[derive(Debug)]
struct SwitcherResult {
    reference: String,
    label: String,
    /// Whether a panel currently shows this section
    is_shown: bool,
}
