//! User settings and preferences for Facing
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use crate::content::SectionEntry;
use crate::viewer::{
    PanelGeometry, DEFAULT_MARGIN, DEFAULT_MIN_HEIGHT, DEFAULT_VISIBILITY_WINDOW,
    SWITCH_COLLATION, SWITCH_COMMENTARY, SWITCH_HIGHLIGHT, SWITCH_SYNC,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Theme Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Available color themes for the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn label(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::System => "System",
        }
    }

    /// Cycle Light → Dark → System.
    pub fn next(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
            Theme::System => Theme::Light,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Window Size Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Window dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    /// Window width in pixels
    pub width: f32,
    /// Window height in pixels
    pub height: f32,
    /// Whether the window was maximized
    #[serde(default)]
    pub maximized: bool,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            maximized: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Content Source Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Where section markup comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentSourceConfig {
    /// Nothing configured yet
    #[default]
    None,
    /// A local directory of `<section>.html` files
    Directory { path: PathBuf },
    /// A web server answering `<base_url><section>/`
    Http { base_url: String },
}

impl ContentSourceConfig {
    pub fn is_configured(&self) -> bool {
        !matches!(self, ContentSourceConfig::None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main Settings Struct
// ─────────────────────────────────────────────────────────────────────────────

/// User preferences and application settings.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Appearance
    // ─────────────────────────────────────────────────────────────────────────
    /// Color theme (light, dark, or system)
    pub theme: Theme,

    /// Window size at last exit
    pub window_size: WindowSize,

    // ─────────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────────
    /// Backend sections are fetched from
    pub content_source: ContentSourceConfig,

    /// Sections offered in the selection controls, in addition to those the
    /// source lists itself
    pub sections: Vec<SectionEntry>,

    // ─────────────────────────────────────────────────────────────────────────
    // Panels
    // ─────────────────────────────────────────────────────────────────────────
    /// Number of panels shown side by side
    pub panel_count: usize,

    /// Feature switches by name
    pub switches: HashMap<String, bool>,

    /// Whether the first panel starts expanded to full width
    pub expand_first_on_start: bool,

    /// Distance below a box top within which an element counts as visible
    pub visibility_window: f32,

    /// Smallest height a panel box is given
    pub min_box_height: f32,

    /// Space kept between a panel box and the status bar
    pub margin: f32,

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────
    /// Location string at last exit
    pub last_location: String,

    /// Whether to reopen `last_location` on start
    pub restore_last_location: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let switches = [
            (SWITCH_SYNC, false),
            (SWITCH_HIGHLIGHT, true),
            (SWITCH_COMMENTARY, true),
            (SWITCH_COLLATION, true),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();

        Self {
            // Appearance
            theme: Theme::default(),
            window_size: WindowSize::default(),

            // Content
            content_source: ContentSourceConfig::default(),
            sections: Vec::new(),

            // Panels
            panel_count: 2,
            switches,
            expand_first_on_start: true,
            visibility_window: DEFAULT_VISIBILITY_WINDOW,
            min_box_height: DEFAULT_MIN_HEIGHT,
            margin: DEFAULT_MARGIN,

            // Session
            last_location: String::new(),
            restore_last_location: true,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum number of panels.
    pub const MIN_PANELS: usize = 1;
    /// Maximum number of panels.
    pub const MAX_PANELS: usize = 4;
    /// Smallest allowed minimum box height.
    pub const MIN_BOX_HEIGHT: f32 = 50.0;
    /// Largest allowed visibility window.
    pub const MAX_VISIBILITY_WINDOW: f32 = 400.0;
    /// Largest allowed margin.
    pub const MAX_MARGIN: f32 = 200.0;
    /// Minimum window dimension.
    pub const MIN_WINDOW_SIZE: f32 = 200.0;
    /// Maximum window dimension.
    pub const MAX_WINDOW_SIZE: f32 = 10000.0;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        self.panel_count = self.panel_count.clamp(Self::MIN_PANELS, Self::MAX_PANELS);

        self.min_box_height = self.min_box_height.max(Self::MIN_BOX_HEIGHT);
        self.visibility_window = self
            .visibility_window
            .clamp(0.0, Self::MAX_VISIBILITY_WINDOW);
        self.margin = self.margin.clamp(0.0, Self::MAX_MARGIN);

        self.window_size.width = self
            .window_size
            .width
            .clamp(Self::MIN_WINDOW_SIZE, Self::MAX_WINDOW_SIZE);
        self.window_size.height = self
            .window_size
            .height
            .clamp(Self::MIN_WINDOW_SIZE, Self::MAX_WINDOW_SIZE);

        // Entries without a reference cannot be selected
        self.sections.retain(|s| !s.reference.trim().is_empty());
    }

    /// Load settings and sanitize them to ensure validity.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Panel sizing and visibility parameters.
    pub fn geometry(&self) -> PanelGeometry {
        PanelGeometry {
            visibility_window: self.visibility_window,
            min_height: self.min_box_height,
            margin: self.margin,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.panel_count, 2);
        assert_eq!(settings.switches.get(SWITCH_SYNC), Some(&false));
        assert_eq!(settings.switches.get(SWITCH_HIGHLIGHT), Some(&true));
        assert_eq!(settings.switches.get(SWITCH_COMMENTARY), Some(&true));
        assert_eq!(settings.switches.get(SWITCH_COLLATION), Some(&true));
        assert!(settings.expand_first_on_start);
        assert!(settings.restore_last_location);
        assert_eq!(settings.content_source, ContentSourceConfig::None);
    }

    #[test]
    fn test_theme_serialization() {
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        let theme: Theme = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(theme, Theme::System);
        assert_eq!(Theme::System.next(), Theme::Light);
    }

    #[test]
    fn test_content_source_serialization() {
        let config = ContentSourceConfig::Http {
            base_url: "https://example.org/texts/".to_string(),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""kind":"http""#));
        let parsed: ContentSourceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);

        let directory: ContentSourceConfig =
            serde_json::from_str(r#"{"kind": "directory", "path": "/srv/texts"}"#).unwrap();
        assert!(directory.is_configured());
        assert!(!ContentSourceConfig::None.is_configured());
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let settings = Settings {
            theme: Theme::Dark,
            panel_count: 3,
            sections: vec![SectionEntry::new("ch1", "Chapter 1")],
            last_location: "ch1/ch2,p3".to_string(),
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, loaded);
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"panel_count": 3}"#).unwrap();
        assert_eq!(settings.panel_count, 3);
        assert_eq!(settings.margin, DEFAULT_MARGIN);
        assert_eq!(settings.switches.len(), 4);
    }

    #[test]
    fn test_settings_deserialize_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_sanitize_panel_count() {
        let mut settings = Settings {
            panel_count: 0,
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.panel_count, Settings::MIN_PANELS);

        settings.panel_count = 12;
        settings.sanitize();
        assert_eq!(settings.panel_count, Settings::MAX_PANELS);
    }

    #[test]
    fn test_sanitize_geometry() {
        let mut settings = Settings {
            min_box_height: 10.0,
            visibility_window: -5.0,
            margin: 1000.0,
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.min_box_height, Settings::MIN_BOX_HEIGHT);
        assert_eq!(settings.visibility_window, 0.0);
        assert_eq!(settings.margin, Settings::MAX_MARGIN);

        let geometry = settings.geometry();
        assert_eq!(geometry.min_height, Settings::MIN_BOX_HEIGHT);
        assert_eq!(geometry.margin, Settings::MAX_MARGIN);
    }

    #[test]
    fn test_sanitize_drops_blank_sections() {
        let mut settings = Settings {
            sections: vec![SectionEntry::new(" ", "Blank"), SectionEntry::new("ch1", "One")],
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.sections.len(), 1);
        assert_eq!(settings.sections[0].reference, "ch1");
    }

    #[test]
    fn test_from_json_sanitized() {
        let settings =
            Settings::from_json_sanitized(r#"{"panel_count": 9, "min_box_height": 1}"#).unwrap();
        assert_eq!(settings.panel_count, Settings::MAX_PANELS);
        assert_eq!(settings.min_box_height, Settings::MIN_BOX_HEIGHT);
        assert!(Settings::from_json_sanitized("{ nope }").is_err());
    }
}
