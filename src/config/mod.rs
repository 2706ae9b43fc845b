//! Application Configuration
//!
//! User settings and preferences stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::acquisition::PermissionStatus;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Camera and photo library settings
    pub acquisition: AcquisitionConfig,
    /// Text recognition settings
    pub text: TextConfig,
}

/// General application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Set after the first successful run
    pub has_completed_onboarding: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Camera and photo library settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// File the photo library picker returns
    pub library_path: Option<PathBuf>,
    /// File the camera returns; no camera when unset
    pub capture_path: Option<PathBuf>,
    /// Initial camera permission
    pub camera_permission: PermissionStatus,
    /// Initial photo library permission
    pub library_permission: PermissionStatus,
    /// Answer given to permission prompts
    pub grant_when_prompted: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            capture_path: None,
            camera_permission: PermissionStatus::Undetermined,
            library_permission: PermissionStatus::Undetermined,
            grant_when_prompted: true,
        }
    }
}

/// Text recognition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Tesseract language code
    pub language: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_or_default(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!("No configuration at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }
    let config = load_config(path)?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!(!config.general.has_completed_onboarding);
        assert_eq!(config.logging.level, "info");
        assert!(config.acquisition.library_path.is_none());
        assert!(config.acquisition.capture_path.is_none());
        assert_eq!(
            config.acquisition.camera_permission,
            PermissionStatus::Undetermined
        );
        assert!(config.acquisition.grant_when_prompted);
        assert_eq!(config.text.language, "eng");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.general.has_completed_onboarding = true;
        config.acquisition.capture_path = Some(PathBuf::from("/tmp/capture.jpg"));
        config.acquisition.library_permission = PermissionStatus::Denied;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert!(parsed.general.has_completed_onboarding);
        assert_eq!(
            parsed.acquisition.capture_path,
            Some(PathBuf::from("/tmp/capture.jpg"))
        );
        assert_eq!(
            parsed.acquisition.library_permission,
            PermissionStatus::Denied
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [general]
            has_completed_onboarding = true

            [acquisition]
            camera_permission = "granted"
            "#,
        )
        .unwrap();

        assert!(parsed.general.has_completed_onboarding);
        assert_eq!(parsed.acquisition.camera_permission, PermissionStatus::Granted);
        assert!(parsed.acquisition.grant_when_prompted);
        assert_eq!(parsed.text.language, "eng");
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.text.language = "deu".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.text.language, "deu");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = load_or_default(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert!(!config.general.has_completed_onboarding);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
