use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use testweave_eval::{COMPLIANCE_THRESHOLD, PipelineOptions};
use testweave_generate::{CACHE_TTL_MINUTES, MAX_CACHE_SIZE, OrchestratorConfig};

use crate::atomic::write_bytes_atomic;

pub const DEFAULT_SETTINGS_FILE: &str = "testweave.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("toml encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("settings file already exists: {0}")]
    AlreadyExists(PathBuf),
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_size: usize,
    pub ttl_minutes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: MAX_CACHE_SIZE,
            ttl_minutes: CACHE_TTL_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub compliance_threshold: f64,
    /// Examples listed per report section.
    pub max_examples: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            compliance_threshold: COMPLIANCE_THRESHOLD,
            max_examples: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `TESTWEAVE_LOG` is unset.
    pub filter: String,
    /// Write `logs.ndjson` into each validation run directory.
    pub json_log: bool,
    pub run_dir: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json_log: true,
            run_dir: PathBuf::from("runs"),
        }
    }
}

/// Contents of `testweave.toml`. Missing sections and keys take defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub validation: ValidationSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> SettingsResult<()> {
        if self.cache.max_size == 0 {
            return Err(SettingsError::Invalid(
                "cache.max_size must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.validation.compliance_threshold) {
            return Err(SettingsError::Invalid(format!(
                "validation.compliance_threshold must be within 0-100, got {}",
                self.validation.compliance_threshold
            )));
        }
        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_cache_size: self.cache.max_size,
            cache_ttl: Duration::from_secs(self.cache.ttl_minutes * 60),
            enable_caching: self.cache.enabled,
        }
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            compliance_threshold: self.validation.compliance_threshold,
            ..PipelineOptions::default()
        }
    }
}

/// Load settings from `path`, falling back to defaults when the file is absent.
pub fn load_settings(path: &Path) -> SettingsResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &Settings) -> SettingsResult<()> {
    let encoded = toml::to_string_pretty(settings)?;
    write_bytes_atomic(path, encoded.as_bytes())?;
    Ok(())
}

/// Write the default settings file. An existing file is kept unless `force`.
pub fn write_default_settings(path: &Path, force: bool) -> SettingsResult<Settings> {
    if path.exists() && !force {
        return Err(SettingsError::AlreadyExists(path.to_path_buf()));
    }
    let settings = Settings::default();
    save_settings(path, &settings)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use testweave_core::new_id;

    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(new_id("testweave_settings"))
            .join(DEFAULT_SETTINGS_FILE)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings(&scratch_path()).expect("defaults");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.cache.max_size, 1000);
        assert_eq!(settings.orchestrator_config().cache_ttl, Duration::from_secs(3600));
        assert_eq!(settings.pipeline_options().compliance_threshold, 80.0);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let settings: Settings = toml::from_str(
            "[cache]\nenabled = false\n\n[validation]\ncompliance_threshold = 90.0\n",
        )
        .expect("parse");
        assert!(!settings.cache.enabled);
        assert_eq!(settings.cache.ttl_minutes, 60);
        assert_eq!(settings.validation.compliance_threshold, 90.0);
        assert_eq!(settings.validation.max_examples, 10);
        assert_eq!(settings.logging.filter, "info");
        assert!(!settings.orchestrator_config().enable_caching);
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let path = scratch_path();
        write_default_settings(&path, false).expect("first write");
        assert!(matches!(
            write_default_settings(&path, false),
            Err(SettingsError::AlreadyExists(_))
        ));

        let mut custom = Settings::default();
        custom.validation.max_examples = 3;
        save_settings(&path, &custom).expect("save");
        assert_eq!(load_settings(&path).expect("load").validation.max_examples, 3);

        write_default_settings(&path, true).expect("forced write");
        assert_eq!(load_settings(&path).expect("load"), Settings::default());

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let path = scratch_path();
        let mut settings = Settings::default();
        settings.validation.compliance_threshold = 120.0;
        save_settings(&path, &settings).expect("save");
        assert!(matches!(load_settings(&path), Err(SettingsError::Invalid(_))));

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }
}
