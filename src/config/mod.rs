//! Configuration module for Facing
//!
//! This module handles user preferences and application settings,
//! including serialization to and from JSON and persistent storage in
//! platform-specific directories.

mod persistence;
mod settings;

pub use persistence::{load_config, save_config_silent};
pub use settings::{ContentSourceConfig, Settings, Theme, WindowSize};
