use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::pipeline::{Pipeline, Stage};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Explicit database directory. When unset the store lives at
    /// `~/.admitr/<project-hash>/`.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Custom stage list in pipeline order. Empty means the default
    /// admissions pipeline.
    pub stages: Vec<StageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// When false, notification decisions are computed but dropped.
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            storage: StorageConfig::default(),
            pipeline: PipelineConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir
                .join(project_name)
                .join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!(
                            "Failed to load config from {}: {}",
                            primary_config.display(),
                            e
                        );
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!(
                        "Failed to load config from {}: {}",
                        fallback_config.display(),
                        e
                    );
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// The pipeline this deployment runs: the configured stage list, or
    /// the default admissions pipeline when none is configured.
    pub fn pipeline(&self) -> Pipeline {
        if self.pipeline.stages.is_empty() {
            return Pipeline::default_admissions();
        }
        Pipeline::new(
            self.pipeline
                .stages
                .iter()
                .enumerate()
                .map(|(i, entry)| Stage::new(&entry.id, &entry.name, i as u32))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert!(config.storage.data_dir.is_none());
        assert!(config.pipeline.stages.is_empty());
        assert!(config.notifications.enabled);
    }

    #[test]
    fn test_default_pipeline_when_unconfigured() {
        let config = Config::default();
        let pipeline = config.pipeline();
        assert_eq!(pipeline.first().unwrap().id, "new_inquiry");
        assert_eq!(pipeline.stages().len(), 8);
    }

    #[test]
    fn test_custom_pipeline_from_config() {
        let yaml = r#"
pipeline:
  stages:
    - id: inquiry
      name: Inquiry
    - id: interview
      name: Interview
    - id: enrolled
      name: Enrolled
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let pipeline = config.pipeline();
        assert_eq!(pipeline.stages().len(), 3);
        assert_eq!(pipeline.first().unwrap().id, "inquiry");
        assert_eq!(pipeline.next_after("interview").unwrap().id, "enrolled");
    }

    #[test]
    fn test_load_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.yml");
        fs::write(
            &path,
            "log_level: debug\nnotifications:\n  enabled: false\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let path = PathBuf::from("/nonexistent/admitr.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("log_level: trace\n").unwrap();
        assert_eq!(config.log_level.as_deref(), Some("trace"));
        assert!(config.notifications.enabled);
        assert!(config.pipeline.stages.is_empty());
    }
}
