//! Theme System for Facing
//!
//! Colors for the reading panels and the egui visuals they sit in. The
//! `Theme` enum in `config::settings` (Light/Dark/System) selects the
//! palette at runtime.

mod manager;

pub use manager::ThemeManager;

use crate::markup::TextClass;
use eframe::egui::{Color32, Stroke, Visuals};

// ─────────────────────────────────────────────────────────────────────────────
// Reading Palette
// ─────────────────────────────────────────────────────────────────────────────

/// Colors used when rendering section text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingPalette {
    /// Panel box background
    pub background: Color32,
    /// Running text
    pub text: Color32,
    /// Collation marks
    pub collation: Color32,
    /// Editorial commentary
    pub commentary: Color32,
    /// Section links
    pub link: Color32,
    /// Fill behind the highlighted location
    pub highlight: Color32,
    /// Placeholders and secondary labels
    pub muted: Color32,
    /// Load failures
    pub error: Color32,
}

impl ReadingPalette {
    pub fn light() -> Self {
        Self {
            background: Color32::from_rgb(253, 252, 248),
            text: Color32::from_rgb(30, 30, 30),
            collation: Color32::from_rgb(150, 60, 40),
            commentary: Color32::from_rgb(40, 100, 60),
            link: Color32::from_rgb(30, 90, 170),
            highlight: Color32::from_rgb(255, 240, 170),
            muted: Color32::from_rgb(120, 120, 120),
            error: Color32::from_rgb(190, 40, 40),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Color32::from_rgb(28, 28, 30),
            text: Color32::from_rgb(222, 222, 222),
            collation: Color32::from_rgb(230, 140, 110),
            commentary: Color32::from_rgb(130, 200, 150),
            link: Color32::from_rgb(110, 170, 255),
            highlight: Color32::from_rgb(90, 80, 30),
            muted: Color32::from_rgb(140, 140, 150),
            error: Color32::from_rgb(240, 110, 110),
        }
    }

    /// Pick the palette matching egui's current visuals.
    pub fn for_visuals(visuals: &Visuals) -> Self {
        if visuals.dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    /// Text color for a span class.
    pub fn class_color(&self, class: TextClass) -> Color32 {
        match class {
            TextClass::Plain => self.text,
            TextClass::Collation => self.collation,
            TextClass::Commentary => self.commentary,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.background.r() < 128
    }

    /// egui visuals built around this palette.
    pub fn to_visuals(&self) -> Visuals {
        let mut visuals = if self.is_dark() {
            Visuals::dark()
        } else {
            Visuals::light()
        };
        visuals.extreme_bg_color = self.background;
        visuals.hyperlink_color = self.link;
        visuals.error_fg_color = self.error;
        visuals.selection.bg_fill = self.highlight;
        visuals.selection.stroke = Stroke::new(1.0, self.text);
        visuals
    }
}
