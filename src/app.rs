//! Main application module for Facing
//!
//! This module implements the eframe App trait: it owns the viewer model,
//! feeds it load results and window measurements, and renders the panels.

use crate::config::{save_config_silent, ContentSourceConfig, Settings, WindowSize};
use crate::content::{
    open_source, ContentSource, ContentWatcher, LoadEvent, LoadOutcome, LoadRequest,
    SectionEntry, SectionLoader,
};
use crate::error::{Error, ResultExt};
use crate::files::dialogs::open_folder_dialog;
use crate::share;
use crate::theme::{ReadingPalette, ThemeManager};
use crate::ui::{
    show_panel, show_toolbar, PanelAction, PanelContext, PanelViewState, QuickSwitcher,
    TextFilter, ToolbarAction, ToolbarState,
};
use crate::viewer::{
    parse_location, ScrollOrigin, Selection, Viewer, ViewportMetrics, SWITCHES,
    SWITCH_COLLATION, SWITCH_COMMENTARY,
};
use crate::APP_NAME;
use eframe::egui;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// How long a toast message stays in the status bar, in seconds.
const TOAST_DURATION: f64 = 3.0;

/// Overrides from the command line.
#[derive(Debug, Default)]
pub struct StartupOptions {
    /// Content source to use instead of the configured one
    pub source: Option<ContentSourceConfig>,
    /// Location to open instead of the last one
    pub location: Option<String>,
    /// Number of panels
    pub panels: Option<usize>,
}

/// Keyboard shortcut actions that need to be deferred.
///
/// These actions are detected in the input handling closure and executed
/// afterwards to avoid borrow conflicts.
#[derive(Debug, Clone, Copy)]
enum KeyboardAction {
    /// Go to section (Ctrl+P)
    QuickSwitcher,
    /// Reload all sections (F5)
    Reload,
    /// Copy location (Ctrl+Shift+C)
    CopyLocation,
    /// Cycle theme (Ctrl+Shift+T)
    CycleTheme,
}

/// A short message shown in the status bar.
struct Toast {
    message: String,
    expires_at: f64,
    is_error: bool,
}

/// The main application struct that holds all state and implements eframe::App.
pub struct FacingApp {
    /// Persisted preferences
    settings: Settings,
    /// Whether settings changed since the last save
    settings_dirty: bool,
    /// Panels, switches and the scroll synchronization model
    viewer: Viewer,
    /// Where section markup comes from
    source: Option<Arc<dyn ContentSource>>,
    /// Background fetcher for `source`
    loader: Option<SectionLoader>,
    /// Change notifications for directory sources
    watcher: Option<ContentWatcher>,
    /// Sections offered in the selection controls
    catalog: Vec<SectionEntry>,
    /// Widget state per panel
    panel_states: Vec<PanelViewState>,
    theme_manager: ThemeManager,
    quick_switcher: QuickSwitcher,
    /// Panel the user last interacted with
    focused_panel: usize,
    /// Measurements the panels were last resized for
    last_metrics: Option<ViewportMetrics>,
    /// Whether a box moved since the last resize
    resize_pending: bool,
    /// Title last sent to the window
    last_title: String,
    toast: Option<Toast>,
    /// Used to wake the UI from the loader thread
    egui_ctx: egui::Context,
    /// Application start time for timing toast messages
    start_time: std::time::Instant,
}

impl FacingApp {
    /// Create a new FacingApp instance.
    ///
    /// Connects the content source, creates the panels and opens either the
    /// location given on the command line or the one from the last session.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        options: StartupOptions,
    ) -> Self {
        info!("Initializing {}", APP_NAME);

        let mut app = Self::with_context(cc.egui_ctx.clone(), settings, options);
        app.theme_manager.apply_if_needed(&cc.egui_ctx);
        info!("Applied initial theme: {:?}", app.settings.theme);
        app
    }

    /// Build the application state without a window.
    fn with_context(egui_ctx: egui::Context, mut settings: Settings, options: StartupOptions) -> Self {
        if let Some(source) = options.source {
            settings.content_source = source;
        }
        let panel_count = options
            .panels
            .unwrap_or(settings.panel_count)
            .clamp(Settings::MIN_PANELS, Settings::MAX_PANELS);

        let mut viewer = Viewer::new(settings.geometry());
        for name in SWITCHES {
            viewer.set_switch(name, settings.switches.get(*name).copied().unwrap_or(false));
        }
        for _ in 0..panel_count {
            viewer.add_panel(Selection::default());
        }

        let location = initial_location(options.location, &settings);
        let expand_first = settings.expand_first_on_start && panel_count > 1;

        let mut app = Self {
            theme_manager: ThemeManager::new(settings.theme),
            settings,
            settings_dirty: false,
            viewer,
            source: None,
            loader: None,
            watcher: None,
            catalog: Vec::new(),
            panel_states: vec![PanelViewState::default(); panel_count],
            quick_switcher: QuickSwitcher::new(),
            focused_panel: 0,
            last_metrics: None,
            resize_pending: false,
            last_title: String::new(),
            toast: None,
            egui_ctx,
            start_time: std::time::Instant::now(),
        };

        app.connect_source();
        app.open_initial(location);
        if expand_first {
            app.viewer.toggle_expanded(0);
        }
        app
    }

    /// Get elapsed time since app start in seconds.
    fn get_app_time(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            expires_at: self.get_app_time() + TOAST_DURATION,
            is_error: false,
        });
    }

    fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.toast = Some(Toast {
            message,
            expires_at: self.get_app_time() + TOAST_DURATION * 2.0,
            is_error: true,
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content source
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the configured content source and start its loader.
    ///
    /// Returns `true` if a source is connected.
    fn connect_source(&mut self) -> bool {
        self.source = None;
        self.loader = None;
        self.watcher = None;
        self.catalog = self.settings.sections.clone();

        if !self.settings.content_source.is_configured() {
            info!("No content source configured");
            return false;
        }
        let source = match open_source(&self.settings.content_source) {
            Ok(Some(source)) => source,
            Ok(None) => return false,
            Err(e) => {
                self.show_error(format!("Cannot open content source: {}", e));
                return false;
            }
        };

        let ctx = self.egui_ctx.clone();
        let notify: Box<dyn Fn() + Send> = Box::new(move || ctx.request_repaint());
        match SectionLoader::spawn_with_notifier(source.clone(), Some(notify)) {
            Ok(loader) => self.loader = Some(loader),
            Err(e) => {
                self.show_error(format!("Cannot start section loader: {}", e));
                return false;
            }
        }

        if let Some(root) = source.watch_root() {
            match ContentWatcher::new(root) {
                Ok(watcher) => self.watcher = Some(watcher),
                Err(e) => warn!("Not watching {}: {}", root.display(), e),
            }
        }

        info!("Connected to {}", source.describe());
        self.source = Some(source);
        self.refresh_catalog();
        true
    }

    /// Rebuild the section catalog from settings and the source listing.
    fn refresh_catalog(&mut self) {
        let listed = match &self.source {
            Some(source) => source
                .sections()
                .unwrap_or_warn_default(Vec::new(), "Failed to list sections"),
            None => Vec::new(),
        };
        self.catalog = merge_catalog(&self.settings.sections, listed);
        debug!("Catalog has {} sections", self.catalog.len());
    }

    /// Select the start location, or the first catalog entries.
    fn open_initial(&mut self, location: Option<String>) {
        let requests = match location {
            Some(location) => self.viewer.restore_from_location(&location),
            None => default_selections(&self.catalog, self.viewer.panel_count())
                .into_iter()
                .enumerate()
                .filter_map(|(i, selection)| self.viewer.select_section(i, selection))
                .collect(),
        };
        self.dispatch(requests);
    }

    /// Hand load requests to the loader.
    ///
    /// Without a source every request fails immediately so the panels show
    /// an error instead of loading forever.
    fn dispatch(&mut self, requests: Vec<LoadRequest>) {
        if requests.is_empty() {
            return;
        }
        match &self.loader {
            Some(loader) => {
                if !loader.submit_all(requests) {
                    self.show_error("Section loader stopped");
                }
            }
            None => {
                for request in requests {
                    self.viewer.complete_load(LoadOutcome {
                        panel: request.panel,
                        generation: request.generation,
                        reference: request.reference,
                        result: Err(Error::InvalidSource(
                            "no content source configured".to_string(),
                        )),
                    });
                }
            }
        }
    }

    fn handle_load_events(&mut self) {
        let events = match &self.loader {
            Some(loader) => loader.poll_events(),
            None => return,
        };
        for event in events {
            match event {
                LoadEvent::Started { panel, generation } => {
                    debug!("Panel {} load {} started", panel, generation);
                }
                LoadEvent::Finished(outcome) => {
                    if !self.viewer.complete_load(outcome) {
                        debug!("Discarded a superseded load");
                    }
                }
            }
        }
    }

    /// Reload sections whose files changed on disk.
    fn handle_content_changes(&mut self) {
        let changed = match &self.watcher {
            Some(watcher) => watcher.poll_changed_sections(),
            None => return,
        };
        if changed.is_empty() {
            return;
        }

        let mut requests = Vec::new();
        for reference in &changed {
            debug!("Section changed on disk: {}", reference);
            requests.extend(self.viewer.reload_reference(reference));
        }
        self.refresh_catalog();

        if !requests.is_empty() {
            let msg = if changed.len() == 1 {
                format!("Section changed: {}", changed[0])
            } else {
                format!("{} sections changed", changed.len())
            };
            self.show_toast(msg);
        }
        self.dispatch(requests);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_keyboard_shortcuts(&mut self, ctx: &egui::Context) {
        let action = ctx.input(|i| {
            // Ctrl+Shift+C: Copy location
            if i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::C) {
                debug!("Keyboard shortcut: Ctrl+Shift+C (Copy Location)");
                return Some(KeyboardAction::CopyLocation);
            }

            // Ctrl+Shift+T: Cycle Theme
            if i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::T) {
                debug!("Keyboard shortcut: Ctrl+Shift+T (Cycle Theme)");
                return Some(KeyboardAction::CycleTheme);
            }

            // Ctrl+P: Go to section
            if i.modifiers.ctrl && i.key_pressed(egui::Key::P) {
                debug!("Keyboard shortcut: Ctrl+P (Quick Switcher)");
                return Some(KeyboardAction::QuickSwitcher);
            }

            if i.key_pressed(egui::Key::F5) {
                debug!("Keyboard shortcut: F5 (Reload)");
                return Some(KeyboardAction::Reload);
            }

            None
        });

        match action {
            Some(KeyboardAction::QuickSwitcher) => self.quick_switcher.toggle(),
            Some(KeyboardAction::Reload) => self.handle_reload(),
            Some(KeyboardAction::CopyLocation) => self.handle_copy_location(),
            Some(KeyboardAction::CycleTheme) => self.handle_cycle_theme(),
            None => {}
        }
    }

    fn handle_toolbar_action(&mut self, action: ToolbarAction) {
        debug!("Toolbar action: {:?}", action);
        match action {
            ToolbarAction::OpenFolder => self.handle_open_folder(),
            ToolbarAction::Reload => self.handle_reload(),
            ToolbarAction::QuickSwitcher => self.quick_switcher.toggle(),
            ToolbarAction::ToggleSwitch(name) => {
                let value = self.viewer.toggle_switch(name);
                info!("Switch '{}' is now {}", name, if value { "on" } else { "off" });
                self.settings.switches.insert(name.to_string(), value);
                self.settings_dirty = true;
            }
            ToolbarAction::CopyLocation => self.handle_copy_location(),
            ToolbarAction::OpenInBrowser => self.handle_open_in_browser(),
            ToolbarAction::CycleTheme => self.handle_cycle_theme(),
        }
    }

    fn handle_open_folder(&mut self) {
        let initial_dir = match &self.settings.content_source {
            ContentSourceConfig::Directory { path } => Some(path.clone()),
            _ => None,
        };
        let Some(path) = open_folder_dialog(initial_dir.as_deref()) else {
            return;
        };

        info!("Opening text folder: {}", path.display());
        self.settings.content_source = ContentSourceConfig::Directory { path };
        self.settings_dirty = true;
        if self.connect_source() {
            self.open_initial(None);
            self.show_toast("Opened text folder");
        }
    }

    fn handle_reload(&mut self) {
        self.refresh_catalog();
        let requests = self.viewer.reload_all();
        info!("Reloading {} panel(s)", requests.len());
        self.dispatch(requests);
    }

    fn handle_copy_location(&mut self) {
        let location = self.viewer.location().to_string();
        if location.is_empty() {
            return;
        }
        match share::copy_text_to_clipboard(&location) {
            Ok(()) => self.show_toast(format!("Copied location {}", location)),
            Err(e) => self.show_error(e.to_string()),
        }
    }

    fn handle_open_in_browser(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        let location = self.viewer.location().to_string();
        if let Err(e) = share::open_in_browser(source.as_ref(), &location) {
            self.show_error(e.to_string());
        }
    }

    fn handle_cycle_theme(&mut self) {
        let theme = self.theme_manager.cycle();
        info!("Theme changed to {:?}", theme);
        self.settings.theme = theme;
        self.settings_dirty = true;
        self.show_toast(format!("Theme: {}", theme.label()));
    }

    /// Panel the quick switcher loads into.
    fn target_panel(&self) -> usize {
        let last = self.viewer.panel_count().saturating_sub(1);
        self.viewer.expanded().unwrap_or(self.focused_panel).min(last)
    }

    fn apply_panel_action(&mut self, index: usize, action: PanelAction) {
        match action {
            PanelAction::Select(selection) => {
                self.focused_panel = index;
                let request = self.viewer.select_section(index, selection);
                self.dispatch(request.into_iter().collect());
            }
            PanelAction::FollowLink(link) => {
                self.focused_panel = index;
                let request = self.viewer.follow_link(index, &link);
                self.dispatch(request.into_iter().collect());
            }
            PanelAction::Retry => {
                let request = self.viewer.retry(index);
                self.dispatch(request.into_iter().collect());
            }
            PanelAction::ToggleExpanded => {
                self.viewer.toggle_expanded(index);
                self.resize_pending = true;
            }
            PanelAction::ToggleNote(note_id) => {
                self.viewer.toggle_note(index, &note_id);
            }
            PanelAction::Scrolled { offset, origin } => {
                if origin == ScrollOrigin::User {
                    self.focused_panel = index;
                }
                self.viewer.on_scroll(index, offset, origin);
            }
            PanelAction::Layout(layout) => {
                self.viewer.apply_layout(index, layout);
            }
            PanelAction::BoxTop(top) => {
                let moved = self
                    .viewer
                    .panel(index)
                    .map(|p| (p.box_top() - top).abs() > 0.5)
                    .unwrap_or(false);
                if moved {
                    self.viewer.set_box_top(index, top);
                    self.resize_pending = true;
                }
            }
        }
    }

    /// Resize the boxes when the window or a box position changed.
    fn update_box_heights(&mut self, metrics: ViewportMetrics) {
        if self.last_metrics == Some(metrics) && !self.resize_pending {
            return;
        }
        debug!(
            "Resizing panels: viewer bottom {}, window height {}",
            metrics.viewer_max_height, metrics.window_height
        );
        self.viewer.on_resize(&metrics);
        self.last_metrics = Some(metrics);
        self.resize_pending = false;
        self.egui_ctx.request_repaint();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Update window size in settings if changed.
    fn update_window_state(&mut self, ctx: &egui::Context) {
        let (size, maximized) = ctx.input(|i| {
            (
                i.viewport().inner_rect.map(|r| r.size()),
                i.viewport().maximized.unwrap_or(false),
            )
        });
        let Some(size) = size else {
            return;
        };
        let current = self.settings.window_size;
        let changed = (current.width - size.x).abs() > 1.0
            || (current.height - size.y).abs() > 1.0
            || current.maximized != maximized;
        if changed {
            // Keep the restored size when maximized
            if !maximized {
                self.settings.window_size = WindowSize {
                    width: size.x,
                    height: size.y,
                    maximized,
                };
            } else {
                self.settings.window_size.maximized = true;
            }
            self.settings_dirty = true;
        }
    }

    fn window_title(&self) -> String {
        let location = self.viewer.location();
        if location.is_empty() {
            APP_NAME.to_string()
        } else {
            format!("{} - {}", APP_NAME, location)
        }
    }

    fn render_ui(&mut self, ctx: &egui::Context) {
        let palette = ReadingPalette::for_visuals(&ctx.style().visuals);

        // Toolbar
        let can_open_in_browser = self
            .source
            .as_ref()
            .map(|s| share::browser_url(s.as_ref(), self.viewer.location()).is_some())
            .unwrap_or(false);
        let viewer = &self.viewer;
        let switch = |name: &str| viewer.switch(name);
        let state = ToolbarState {
            switch: &switch,
            has_source: self.source.is_some(),
            can_open_in_browser,
            has_location: !viewer.location().is_empty(),
        };
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| show_toolbar(ui, &palette, &state))
            .inner;
        if let Some(action) = toolbar_action {
            self.handle_toolbar_action(action);
        }

        // Status bar: its top edge bounds the boxes
        let now = self.get_app_time();
        if self.toast.as_ref().is_some_and(|t| t.expires_at <= now) {
            self.toast = None;
        }
        let status = egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let location = self.viewer.location();
                if location.is_empty() {
                    ui.label(egui::RichText::new("No location").color(palette.muted));
                } else {
                    ui.label(egui::RichText::new(location).monospace());
                }
                if let Some(toast) = &self.toast {
                    ui.separator();
                    let color = if toast.is_error { palette.error } else { palette.text };
                    ui.label(egui::RichText::new(&toast.message).color(color));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let description = match &self.source {
                        Some(source) => source.describe(),
                        None => "No content source".to_string(),
                    };
                    ui.label(egui::RichText::new(description).color(palette.muted).small());
                });
            });
        });
        if let Some(toast) = &self.toast {
            ctx.request_repaint_after(std::time::Duration::from_secs_f64(
                (toast.expires_at - now).max(0.0),
            ));
        }

        // Panels
        let visible = self.viewer.visible_panels();
        let filter = TextFilter {
            commentary: self.viewer.switch(SWITCH_COMMENTARY),
            collation: self.viewer.switch(SWITCH_COLLATION),
        };
        let expanded = self.viewer.expanded();
        let mut actions: Vec<(usize, PanelAction)> = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            if visible.is_empty() {
                return;
            }
            ui.columns(visible.len(), |columns| {
                for (column, &index) in columns.iter_mut().zip(&visible) {
                    let Some(panel) = self.viewer.panel(index) else {
                        continue;
                    };
                    let context = PanelContext {
                        catalog: &self.catalog,
                        filter,
                        palette: &palette,
                        expanded: expanded == Some(index),
                    };
                    let state = &mut self.panel_states[index];
                    for action in show_panel(column, panel, state, &context) {
                        actions.push((index, action));
                    }
                }
            });
        });

        let offsets_before: Vec<f32> = self.viewer.panels().iter().map(|p| p.scroll_offset()).collect();
        for (index, action) in actions {
            self.apply_panel_action(index, action);
        }

        self.update_box_heights(ViewportMetrics {
            viewer_max_height: status.response.rect.top(),
            window_height: ctx.screen_rect().height(),
            page_scroll_top: 0.0,
        });

        // Panels moved by synchronization are drawn at their new offset next frame
        let moved = self
            .viewer
            .panels()
            .iter()
            .zip(&offsets_before)
            .any(|(p, before)| (p.scroll_offset() - before).abs() > 0.5);
        if moved {
            ctx.request_repaint();
        }

        // Quick switcher overlay
        let shown: Vec<String> = self
            .viewer
            .panels()
            .iter()
            .map(|p| p.selection().section.clone())
            .collect();
        let output = self
            .quick_switcher
            .show(ctx, &self.catalog, &shown, palette.is_dark());
        if let Some(reference) = output.selected {
            let target = self.target_panel();
            info!("Opening '{}' in panel {}", reference, target);
            let request = self.viewer.select_section(target, Selection::new(reference));
            self.dispatch(request.into_iter().collect());
        }
    }

    /// Write the session state to the config file.
    fn persist(&mut self) {
        self.settings.last_location = self.viewer.location().to_string();
        for (name, value) in self.viewer.switches() {
            self.settings.switches.insert(name.clone(), *value);
        }
        self.settings.theme = self.theme_manager.current_theme();
        if save_config_silent(&self.settings) {
            self.settings_dirty = false;
        }
    }
}

impl eframe::App for FacingApp {
    /// Called each time the UI needs repainting.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme if needed (handles System theme changes)
        self.theme_manager.apply_if_needed(ctx);

        self.handle_load_events();
        self.handle_content_changes();
        self.update_window_state(ctx);

        self.render_ui(ctx);
        self.handle_keyboard_shortcuts(ctx);

        let title = self.window_title();
        if title != self.last_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.last_title = title;
        }
    }

    /// Called when the application is about to close.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application exiting");
        self.persist();
    }

    /// Save persistent state.
    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        if self.settings_dirty {
            debug!("Saving application state");
            self.persist();
        }
    }

    /// Auto-save interval in seconds.
    fn auto_save_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Location to open at startup: the command line wins over the last session.
fn initial_location(requested: Option<String>, settings: &Settings) -> Option<String> {
    let location = requested.or_else(|| {
        settings
            .restore_last_location
            .then(|| settings.last_location.clone())
    })?;
    if parse_location(&location).is_empty() {
        None
    } else {
        Some(location)
    }
}

/// Configured sections first, then listed ones not already configured.
fn merge_catalog(configured: &[SectionEntry], listed: Vec<SectionEntry>) -> Vec<SectionEntry> {
    let mut catalog = configured.to_vec();
    for entry in listed {
        if !catalog.iter().any(|e| e.reference == entry.reference) {
            catalog.push(entry);
        }
    }
    catalog
}

/// Panel `i` shows catalog entry `i`, or the first entry when there are
/// fewer sections than panels.
fn default_selections(catalog: &[SectionEntry], panel_count: usize) -> Vec<Selection> {
    (0..panel_count)
        .map(|i| {
            catalog
                .get(i)
                .or_else(|| catalog.first())
                .map(|entry| Selection::new(entry.reference.clone()))
                .unwrap_or_default()
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::tests::section_markup;
    use crate::viewer::{PanelStatus, SWITCH_SYNC};
    use std::fs;
    use tempfile::TempDir;

    fn app(settings: Settings, options: StartupOptions) -> FacingApp {
        FacingApp::with_context(egui::Context::default(), settings, options)
    }

    fn text_folder() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ch1.html"), section_markup("ch1", &["1", "2"])).unwrap();
        fs::write(dir.path().join("ch2.html"), section_markup("ch2", &["1", "2"])).unwrap();
        dir
    }

    /// Pump loader events until no panel is loading.
    fn wait_for_loads(app: &mut FacingApp) {
        for _ in 0..200 {
            app.handle_load_events();
            if !app.viewer.panels().iter().any(|p| p.is_loading()) {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        panic!("loads did not finish");
    }

    #[test]
    fn test_initial_location_prefers_command_line() {
        let mut settings = Settings::default();
        settings.last_location = "ch1/ch2".to_string();
        assert_eq!(
            initial_location(Some("ch3".to_string()), &settings).as_deref(),
            Some("ch3")
        );
        assert_eq!(initial_location(None, &settings).as_deref(), Some("ch1/ch2"));

        settings.restore_last_location = false;
        assert_eq!(initial_location(None, &settings), None);

        assert_eq!(initial_location(Some(String::new()), &settings), None);
    }

    #[test]
    fn test_merge_catalog_keeps_configured_first() {
        let configured = vec![SectionEntry::new("ch2", "Second")];
        let listed = vec![SectionEntry::new("ch1", "ch1"), SectionEntry::new("ch2", "ch2")];
        let catalog = merge_catalog(&configured, listed);
        let references: Vec<&str> = catalog.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(references, vec!["ch2", "ch1"]);
        assert_eq!(catalog[0].label, "Second");
    }

    #[test]
    fn test_default_selections() {
        let catalog = vec![SectionEntry::new("a", "A"), SectionEntry::new("b", "B")];
        let selections = default_selections(&catalog, 3);
        let sections: Vec<&str> = selections.iter().map(|s| s.section.as_str()).collect();
        assert_eq!(sections, vec!["a", "b", "a"]);

        assert!(default_selections(&[], 2).iter().all(Selection::is_empty));
    }

    #[test]
    fn test_without_source_loads_fail() {
        let options = StartupOptions {
            location: Some("ch1/ch2".to_string()),
            ..Default::default()
        };
        let app = app(Settings::default(), options);
        assert!(app.source.is_none());
        assert_eq!(app.viewer.panel_count(), 2);
        for panel in app.viewer.panels() {
            assert!(matches!(panel.status(), PanelStatus::Failed { .. }));
        }
        assert_eq!(app.viewer.location(), "ch1/ch2");
    }

    #[test]
    fn test_panel_count_is_clamped() {
        let options = StartupOptions {
            panels: Some(9),
            ..Default::default()
        };
        let app = app(Settings::default(), options);
        assert_eq!(app.viewer.panel_count(), Settings::MAX_PANELS);
        assert_eq!(app.panel_states.len(), Settings::MAX_PANELS);
    }

    #[test]
    fn test_directory_source_loads_default_sections() {
        let dir = text_folder();
        let mut settings = Settings::default();
        settings.restore_last_location = false;
        settings.expand_first_on_start = false;
        let options = StartupOptions {
            source: Some(ContentSourceConfig::Directory {
                path: dir.path().to_path_buf(),
            }),
            ..Default::default()
        };

        let mut app = app(settings, options);
        assert!(app.source.is_some());
        assert_eq!(app.catalog.len(), 2);

        wait_for_loads(&mut app);
        assert_eq!(app.viewer.location(), "ch1/ch2");
        assert!(app
            .viewer
            .panels()
            .iter()
            .all(|p| matches!(p.status(), PanelStatus::Ready)));
        assert_eq!(app.viewer.expanded(), None);
    }

    #[test]
    fn test_expand_first_on_start() {
        let app = app(Settings::default(), StartupOptions::default());
        assert_eq!(app.viewer.expanded(), Some(0));
        assert_eq!(app.viewer.visible_panels(), vec![0]);
    }

    #[test]
    fn test_toggle_switch_marks_settings_dirty() {
        let mut app = app(
            Settings::default(),
            StartupOptions {
                location: Some("ch1/ch2".to_string()),
                ..Default::default()
            },
        );
        app.handle_toolbar_action(ToolbarAction::ToggleSwitch(SWITCH_SYNC));
        assert!(app.settings_dirty);
        assert_eq!(app.settings.switches.get("sync"), Some(&true));
        assert_eq!(app.target_panel(), 0);
    }
}
