//! Toolbar UI Component for Facing
//!
//! The strip above the panels: source controls, the feature switches, and
//! location sharing.

use crate::theme::ReadingPalette;
use crate::viewer::{SWITCH_COLLATION, SWITCH_COMMENTARY, SWITCH_HIGHLIGHT, SWITCH_SYNC};
use eframe::egui::{self, Color32, Response, RichText, Ui, Vec2};

/// Size of icon buttons.
const ICON_BUTTON_SIZE: Vec2 = Vec2::new(32.0, 28.0);

/// Actions that can be triggered from the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    /// Pick a folder of section files
    OpenFolder,
    /// Fetch every shown section again
    Reload,
    /// Open the section switcher
    QuickSwitcher,
    /// Flip a named switch
    ToggleSwitch(&'static str),
    /// Copy the location string to the clipboard
    CopyLocation,
    /// Show the location in a web browser
    OpenInBrowser,
    /// Cycle through themes
    CycleTheme,
}

/// Labels of the switches in toolbar order.
const SWITCH_LABELS: &[(&str, &str, &str)] = &[
    (SWITCH_SYNC, "Sync", "Scroll the other panels along"),
    (SWITCH_HIGHLIGHT, "Highlight", "Highlight the shared location"),
    (SWITCH_COMMENTARY, "Commentary", "Show editorial commentary"),
    (SWITCH_COLLATION, "Collation", "Show collation marks"),
];

/// State the toolbar renders from.
pub struct ToolbarState<'a> {
    pub switch: &'a dyn Fn(&str) -> bool,
    pub has_source: bool,
    pub can_open_in_browser: bool,
    pub has_location: bool,
}

/// Render the toolbar and return the action the user triggered, if any.
pub fn show_toolbar(
    ui: &mut Ui,
    palette: &ReadingPalette,
    state: &ToolbarState<'_>,
) -> Option<ToolbarAction> {
    let mut action = None;
    let is_dark = palette.is_dark();

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 2.0;

        if icon_button(ui, "📁", "Open text folder", true, is_dark).clicked() {
            action = Some(ToolbarAction::OpenFolder);
        }
        if icon_button(ui, "⟳", "Reload sections (F5)", state.has_source, is_dark).clicked() {
            action = Some(ToolbarAction::Reload);
        }
        if icon_button(ui, "⚡", "Go to section (Ctrl+P)", state.has_source, is_dark).clicked() {
            action = Some(ToolbarAction::QuickSwitcher);
        }

        ui.separator();

        for &(name, label, tooltip) in SWITCH_LABELS {
            let on = (state.switch)(name);
            if ui
                .selectable_label(on, label)
                .on_hover_text(tooltip)
                .clicked()
            {
                action = Some(ToolbarAction::ToggleSwitch(name));
            }
        }

        ui.separator();

        if icon_button(
            ui,
            "📋",
            "Copy location (Ctrl+Shift+C)",
            state.has_location,
            is_dark,
        )
        .clicked()
        {
            action = Some(ToolbarAction::CopyLocation);
        }
        if icon_button(
            ui,
            "🌐",
            "Open in browser",
            state.can_open_in_browser && state.has_location,
            is_dark,
        )
        .clicked()
        {
            action = Some(ToolbarAction::OpenInBrowser);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let icon = if is_dark { "☀" } else { "🌙" };
            if icon_button(ui, icon, "Cycle theme (Ctrl+Shift+T)", true, is_dark).clicked() {
                action = Some(ToolbarAction::CycleTheme);
            }
        });
    });

    action
}

/// Render an icon button drawn on a frameless clickable area.
fn icon_button(ui: &mut Ui, icon: &str, tooltip: &str, enabled: bool, is_dark: bool) -> Response {
    let text_color = match (enabled, is_dark) {
        (true, true) => Color32::from_rgb(220, 220, 220),
        (true, false) => Color32::from_rgb(50, 50, 50),
        (false, true) => Color32::from_rgb(100, 100, 100),
        (false, false) => Color32::from_rgb(160, 160, 160),
    };
    let hover_bg = if is_dark {
        Color32::from_rgb(60, 60, 60)
    } else {
        Color32::from_rgb(220, 220, 220)
    };

    let btn = ui.add_enabled(
        enabled,
        egui::Button::new(RichText::new(" ").size(16.0))
            .frame(false)
            .min_size(ICON_BUTTON_SIZE),
    );

    if btn.hovered() && enabled {
        ui.painter()
            .rect_filled(btn.rect, egui::Rounding::same(3.0), hover_bg);
    }

    ui.painter().text(
        btn.rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(16.0),
        text_color,
    );

    btn.on_hover_text(tooltip)
}
