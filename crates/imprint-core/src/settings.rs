//! Persistent operator settings
//!
//! Stored as TOML at `<config dir>/imprint/imprint_config.toml`
//! (`~/Library/Application Support` on macOS, `~/.config` on Linux).
//!
//! ```toml
//! [output]
//! directory = "/Volumes/Archive/discs"
//! operator = "JD"
//!
//! [analysis]
//! enabled = true
//! command = "isolyzer"
//!
//! [behavior]
//! assume_yes = false
//! quiet = false
//! ```

use crate::config::DEFAULT_VALIDATOR_COMMAND;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = "imprint_config.toml";

const APP_NAME: &str = "imprint";

/// Settings loaded from the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Where images go and who makes them
    pub output: OutputSettings,

    /// Structural analysis
    pub analysis: AnalysisSettings,

    /// Prompting and console output
    pub behavior: BehaviorSettings,
}

/// Output defaults used when the matching flag is absent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Base directory for per-disc output directories
    pub directory: Option<PathBuf>,

    /// Operator name or initials
    pub operator: Option<String>,
}

/// Structural analysis settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Run the validator after each copy
    pub enabled: bool,

    /// Validator executable
    pub command: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: DEFAULT_VALIDATOR_COMMAND.to_string(),
        }
    }
}

/// General behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Answer yes to overwrite prompts
    pub assume_yes: bool,

    /// Suppress non-error output
    pub quiet: bool,
}

impl Settings {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from_path(Self::config_path())
    }

    /// Load from `path`; missing or invalid files give defaults
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            tracing::debug!("No config path available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Self::default();
        }

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("Failed to read config file {:?}: {}", path, e);
                return Self::default();
            }
        };

        match toml::from_str(&contents) {
            Ok(settings) => {
                tracing::debug!("Loaded settings from {:?}", path);
                settings
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save to the default location
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        self.save_to_path(Self::config_path())
    }

    /// Save to `path`, creating its parent directory
    pub fn save_to_path(&self, path: Option<PathBuf>) -> Result<PathBuf, SettingsError> {
        let path = path.ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let contents = toml::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        std::fs::write(&path, contents).map_err(|e| SettingsError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!("Saved settings to {:?}", path);
        Ok(path)
    }

    /// Path of the configuration file
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }

    /// Directory holding the configuration file
    pub fn config_dir() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join(APP_NAME))
    }

    /// Whether a configuration file exists
    pub fn config_exists() -> bool {
        Self::config_path().is_some_and(|p| p.exists())
    }

    /// Default settings as TOML text
    pub fn default_config_string() -> Result<String, SettingsError> {
        toml::to_string_pretty(&Self::default()).map_err(SettingsError::Serialize)
    }
}

/// Errors from reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// No configuration directory on this platform
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    /// Config file or directory I/O failed
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path that caused the error
        path: PathBuf,
        /// The underlying error
        source: std::io::Error,
    },

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),

    /// Settings could not be parsed
    #[error("Failed to parse settings: {0}")]
    Deserialize(toml::de::Error),
}

impl Settings {
    /// Parse settings text, reporting errors instead of falling back
    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        toml::from_str(contents).map_err(SettingsError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.output.directory, None);
        assert_eq!(settings.output.operator, None);
        assert!(settings.analysis.enabled);
        assert_eq!(settings.analysis.command, "isolyzer");
        assert!(!settings.behavior.assume_yes);
        assert!(!settings.behavior.quiet);
    }

    #[test]
    fn test_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        let settings = Settings {
            output: OutputSettings {
                directory: Some(PathBuf::from("/Volumes/Archive")),
                operator: Some("JD".to_string()),
            },
            analysis: AnalysisSettings {
                enabled: false,
                command: "/opt/bin/isolyzer".to_string(),
            },
            behavior: BehaviorSettings {
                assume_yes: true,
                quiet: true,
            },
        };

        settings.save_to_path(Some(config_path.clone())).unwrap();
        assert!(config_path.exists());
        assert_eq!(Settings::load_from_path(Some(config_path)), settings);
    }

    #[test]
    fn test_partial_config() {
        let settings = Settings::from_toml("[output]\noperator = \"AB\"\n").unwrap();
        assert_eq!(settings.output.operator.as_deref(), Some("AB"));
        assert!(settings.analysis.enabled);
        assert_eq!(settings.analysis.command, "isolyzer");
    }

    #[test]
    fn test_missing_and_invalid_files_use_defaults() {
        assert_eq!(Settings::load_from_path(None), Settings::default());
        assert_eq!(
            Settings::load_from_path(Some(PathBuf::from("/nonexistent/imprint_config.toml"))),
            Settings::default()
        );

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "this is not valid toml {{{{").unwrap();
        assert_eq!(Settings::load_from_path(Some(config_path)), Settings::default());
    }

    #[test]
    fn test_from_toml_reports_errors() {
        let err = Settings::from_toml("[analysis]\nenabled = \"maybe\"").unwrap_err();
        assert!(matches!(err, SettingsError::Deserialize(_)));
    }

    #[test]
    fn test_save_without_path() {
        let result = Settings::default().save_to_path(None);
        assert!(matches!(result, Err(SettingsError::NoConfigDir)));
    }

    #[test]
    fn test_default_config_string() {
        let text = Settings::default_config_string().unwrap();
        assert!(text.contains("[analysis]"));
        assert!(text.contains("[behavior]"));
        assert!(text.contains("command = \"isolyzer\""));
    }

    #[test]
    fn test_config_path_names() {
        if let Some(p) = Settings::config_path() {
            assert!(p.ends_with("imprint/imprint_config.toml"));
        }
    }
}
