//! Theme Manager for Facing
//!
//! Holds the theme preference and applies it to the egui context.

use super::ReadingPalette;
use crate::config::Theme;
use eframe::egui::Context;
use log::{debug, info};

/// Manages theme state and applies themes to the egui context.
#[derive(Debug, Clone)]
pub struct ThemeManager {
    /// Current theme setting (Light, Dark, or System)
    current_theme: Theme,
    /// Whether the theme needs to be reapplied
    needs_apply: bool,
    /// Last detected system dark mode state (for System theme)
    last_system_dark_mode: Option<bool>,
}

impl ThemeManager {
    pub fn new(theme: Theme) -> Self {
        info!("ThemeManager initialized with theme: {:?}", theme);
        Self {
            current_theme: theme,
            needs_apply: true,
            last_system_dark_mode: None,
        }
    }

    pub fn current_theme(&self) -> Theme {
        self.current_theme
    }

    /// Set the theme and mark for reapplication.
    pub fn set_theme(&mut self, theme: Theme) {
        if self.current_theme != theme {
            info!("Theme changed from {:?} to {:?}", self.current_theme, theme);
            self.current_theme = theme;
            self.needs_apply = true;
        }
    }

    /// Cycle Light → Dark → System and return the new theme.
    pub fn cycle(&mut self) -> Theme {
        let theme = self.current_theme.next();
        self.set_theme(theme);
        theme
    }

    /// Apply the theme if it changed or the system preference flipped.
    ///
    /// Returns `true` if the theme was applied.
    pub fn apply_if_needed(&mut self, ctx: &Context) -> bool {
        let system_dark = ctx.style().visuals.dark_mode;
        if self.current_theme == Theme::System && self.last_system_dark_mode != Some(system_dark)
        {
            self.last_system_dark_mode = Some(system_dark);
            self.needs_apply = true;
            debug!("System dark mode changed to: {}", system_dark);
        }

        if !self.needs_apply {
            return false;
        }
        ctx.set_visuals(self.palette_for(system_dark).to_visuals());
        self.needs_apply = false;
        debug!("Applied theme: {:?}", self.current_theme);
        true
    }

    /// Palette of the effective theme, resolving System against `system_dark`.
    pub fn palette_for(&self, system_dark: bool) -> ReadingPalette {
        match self.current_theme {
            Theme::Light => ReadingPalette::light(),
            Theme::Dark => ReadingPalette::dark(),
            Theme::System if system_dark => ReadingPalette::dark(),
            Theme::System => ReadingPalette::light(),
        }
    }
}
