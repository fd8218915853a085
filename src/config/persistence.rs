//! Configuration file persistence for Facing
//!
//! This module handles loading and saving the configuration file in the
//! platform-specific config directory, falling back to defaults when the
//! file is missing or unreadable.

use crate::config::Settings;
use crate::error::{Error, Result, ResultExt};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Application name used for the config directory
const APP_NAME: &str = "facing";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Temporary file name used during atomic writes
const CONFIG_BACKUP_NAME: &str = "config.json.bak";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Directory Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Get the platform-specific configuration directory for the application.
///
/// - **Windows**: `%APPDATA%\facing\`
/// - **macOS**: `~/Library/Application Support/facing/`
/// - **Linux**: `~/.config/facing/`
///
/// # Errors
///
/// Returns `Error::ConfigDirNotFound` if the config directory cannot be
/// determined (e.g., if the HOME environment variable is not set).
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(Error::ConfigDirNotFound)
}

/// Get the full path to the configuration file.
pub fn get_config_file_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Ensure a directory exists, creating it if necessary.
fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        debug!("Creating config directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| Error::ConfigSave {
            path: dir.to_path_buf(),
            source: Box::new(e),
        })?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Load configuration from the default config file location.
///
/// 1. If the config file exists and is valid JSON, load and sanitize it
/// 2. If the config file doesn't exist, return default settings
/// 3. If the config file is corrupted, log a warning and return defaults
pub fn load_config() -> Settings {
    get_config_file_path()
        .and_then(|path| load_config_from(&path))
        .unwrap_or_warn_default(Settings::default(), "Failed to load configuration")
}

/// Load configuration from an explicit file path.
fn load_config_from(config_path: &Path) -> Result<Settings> {
    if !config_path.exists() {
        debug!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
        return Ok(Settings::default());
    }

    debug!("Loading config from: {}", config_path.display());

    let contents = fs::read_to_string(config_path).map_err(|e| Error::ConfigLoad {
        path: config_path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Config file is empty, using defaults");
        return Ok(Settings::default());
    }

    let settings = Settings::from_json_sanitized(&contents).map_err(|e| {
        warn!(
            "Config file at {} contains invalid JSON: {}",
            config_path.display(),
            e
        );
        Error::ConfigParse {
            message: format!("Failed to parse config file: {}", e),
            source: Some(Box::new(e)),
        }
    })?;

    info!("Configuration loaded from {}", config_path.display());
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Save Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Save configuration to the default config file location.
///
/// The settings are written to a temporary file first, which then replaces
/// the config file.
pub fn save_config(settings: &Settings) -> Result<()> {
    save_config_to(&get_config_dir()?, settings)
}

/// Save configuration into an explicit directory.
fn save_config_to(config_dir: &Path, settings: &Settings) -> Result<()> {
    ensure_dir(config_dir)?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);
    let backup_path = config_dir.join(CONFIG_BACKUP_NAME);

    debug!("Saving config to: {}", config_path.display());

    let json = serde_json::to_string_pretty(settings).map_err(|e| Error::ConfigSave {
        path: config_path.clone(),
        source: Box::new(e),
    })?;

    fs::write(&backup_path, &json).map_err(|e| Error::ConfigSave {
        path: backup_path.clone(),
        source: Box::new(e),
    })?;

    fs::rename(&backup_path, &config_path).map_err(|e| Error::ConfigSave {
        path: config_path.clone(),
        source: Box::new(e),
    })?;

    info!("Configuration saved to {}", config_path.display());
    Ok(())
}

/// Save configuration, logging instead of returning errors.
///
/// Used on exit, where a failed save must not interrupt shutdown.
pub fn save_config_silent(settings: &Settings) -> bool {
    match save_config(settings) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to save configuration: {}", e);
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContentSourceConfig, Theme};
    use tempfile::TempDir;

    /// Temporary config directory.
    struct TestEnv {
        temp_dir: TempDir,
    }

    impl TestEnv {
        fn new() -> Self {
            Self {
                temp_dir: TempDir::new().expect("Failed to create temp dir"),
            }
        }

        fn config_dir(&self) -> PathBuf {
            self.temp_dir.path().join(APP_NAME)
        }

        fn config_file(&self) -> PathBuf {
            self.config_dir().join(CONFIG_FILE_NAME)
        }

        fn write_config(&self, content: &str) {
            fs::create_dir_all(self.config_dir()).expect("Failed to create config dir");
            fs::write(self.config_file(), content).expect("Failed to write config");
        }
    }

    #[test]
    fn test_get_config_dir_returns_path() {
        // Some CI environments have no home directory
        if let Ok(path) = get_config_dir() {
            assert!(path.to_string_lossy().contains(APP_NAME));
        }
    }

    #[test]
    fn test_load_missing_config_uses_defaults() {
        let env = TestEnv::new();
        let settings = load_config_from(&env.config_file()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_empty_config_uses_defaults() {
        let env = TestEnv::new();
        env.write_config("  \n");
        let settings = load_config_from(&env.config_file()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_partial_config() {
        let env = TestEnv::new();
        env.write_config(r#"{"theme": "dark", "unknown_field": 1}"#);
        let settings = load_config_from(&env.config_file()).unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.panel_count, 2);
    }

    #[test]
    fn test_load_corrupted_config_returns_parse_error() {
        let env = TestEnv::new();
        env.write_config("{ invalid json }");
        let result = load_config_from(&env.config_file());
        assert!(matches!(result, Err(Error::ConfigParse { .. })));

        // The public path falls back to defaults
        let settings = result.unwrap_or_warn_default(Settings::default(), "test");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_config_sanitizes_values() {
        let env = TestEnv::new();
        env.write_config(r#"{"panel_count": 0, "margin": -3}"#);
        let settings = load_config_from(&env.config_file()).unwrap();
        assert_eq!(settings.panel_count, Settings::MIN_PANELS);
        assert_eq!(settings.margin, 0.0);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let env = TestEnv::new();
        let original = Settings {
            theme: Theme::System,
            content_source: ContentSourceConfig::Directory {
                path: PathBuf::from("/srv/texts"),
            },
            last_location: "ch1/ch2".to_string(),
            ..Settings::default()
        };

        save_config_to(&env.config_dir(), &original).unwrap();
        assert!(env.config_file().exists());
        assert!(!env.config_dir().join(CONFIG_BACKUP_NAME).exists());

        let loaded = load_config_from(&env.config_file()).unwrap();
        assert_eq!(original, loaded);
    }

    #[test]
    fn test_save_overwrites_existing_config() {
        let env = TestEnv::new();
        env.write_config(r#"{"theme": "dark"}"#);
        save_config_to(&env.config_dir(), &Settings::default()).unwrap();
        let loaded = load_config_from(&env.config_file()).unwrap();
        assert_eq!(loaded.theme, Theme::Light);
    }
}
