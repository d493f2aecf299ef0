//! Library settings.
//!
//! Settings live in `<config dir>/draftsmith/config.json`. A missing or broken
//! file falls back to defaults; `DRAFTSMITH_DRAFT_FOLDER` overrides the
//! draft folder either way.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DraftError, Result};
use crate::time::FrameRate;

/// Environment variable overriding [`Settings::draft_folder`].
pub const DRAFT_FOLDER_ENV: &str = "DRAFTSMITH_DRAFT_FOLDER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder containing one directory per draft project.
    pub draft_folder: PathBuf,
    pub logging: LoggingSettings,
    pub default_canvas: CanvasDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive (e.g. "info", "draftsmith_draft=debug,warn").
    pub level: String,
}

/// Canvas used for new drafts when the caller does not specify one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasDefaults {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            draft_folder: default_draft_folder(),
            logging: LoggingSettings::default(),
            default_canvas: CanvasDefaults::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for CanvasDefaults {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
        }
    }
}

impl CanvasDefaults {
    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.fps.max(1), 1).unwrap_or_default()
    }
}

impl Settings {
    /// Load from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let mut settings = match config_file_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!("Ignoring settings at {:?}: {}", path, e);
                    Self::default()
                }
            },
            _ => Self::default(),
        };
        settings.apply_env();
        settings
    }

    /// Load from an explicit file. Errors are reported, not defaulted.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DraftError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| DraftError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Save to the standard location.
    pub fn save(&self) -> Result<()> {
        let path = config_file_path()
            .ok_or_else(|| DraftError::Config("no configuration directory".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DraftError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(folder) = std::env::var_os(DRAFT_FOLDER_ENV) {
            if !folder.is_empty() {
                self.draft_folder = PathBuf::from(folder);
            }
        }
    }
}

/// Standard settings file location.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("draftsmith").join("config.json"))
}

fn default_draft_folder() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("draftsmith")
        .join("drafts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = std::env::temp_dir().join("draftsmith_settings_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"draft_folder": "/srv/drafts"}"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.draft_folder, PathBuf::from("/srv/drafts"));
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.default_canvas.width, 1920);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = std::env::temp_dir().join("draftsmith_settings_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            Settings::load_from(&path),
            Err(DraftError::Config(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("draftsmith_settings_save");
        let path = dir.join("nested").join("config.json");
        let mut settings = Settings::default();
        settings.logging.level = "debug".to_string();
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        std::fs::remove_dir_all(&dir).ok();
    }
}
