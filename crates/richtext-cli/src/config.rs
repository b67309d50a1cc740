use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::try_exists;

pub const DEFAULT_FIELD: &str = "description";
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024; // 10MB
const MAX_INPUT_BYTES_CEILING: u64 = 64 * 1024 * 1024; // 64MB

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub records: RecordsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Which fields of backend JSON records carry rich text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    pub fields: Vec<String>,
    pub null_as_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pretty_json: bool,
    pub trailing_newline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_input_bytes: u64,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            fields: vec![String::from(DEFAULT_FIELD)],
            null_as_empty: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty_json: false,
            trailing_newline: true,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        let Some(config_path) = Self::config_path() else {
            log::debug!("No config directory available, using defaults");
            return Ok(Self::default());
        };

        if !try_exists(&config_path).await? {
            log::debug!(
                "Config file does not exist, using defaults: {}",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let content = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => content,
            Err(io_err) => {
                log::error!("Failed to read config file: {}", io_err);
                return Ok(Self::default());
            }
        };

        if content.trim().is_empty() {
            log::warn!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        match serde_json::from_str::<Self>(&content) {
            Ok(mut config) => {
                config.validate()?;
                log::info!("Loaded config from: {}", config_path.display());
                Ok(config)
            }
            Err(json_err) => {
                log::error!("Failed to parse config file: {}", json_err);

                // Backup broken config
                let backup_path = config_path.with_extension("bak");
                if let Err(e) = tokio::fs::copy(&config_path, &backup_path).await {
                    log::warn!("Failed to backup broken config: {}", e);
                } else {
                    log::info!("Backed up broken config to: {}", backup_path.display());
                }

                Ok(Self::default())
            }
        }
    }

    /// Write this config to the resolved config path and return that path.
    pub async fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine a config directory"))?;

        let mut config_to_save = self.clone();
        config_to_save.validate()?;

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create config directory: {} - {}",
                    parent.display(),
                    e
                )
            })?;
        }

        let content = serde_json::to_string_pretty(&config_to_save)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
        tokio::fs::write(&config_path, content).await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to write config file: {} - {}",
                config_path.display(),
                e
            )
        })?;

        log::info!("Saved config to: {}", config_path.display());
        Ok(config_path)
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        let before = self.records.fields.len();
        self.records.fields.retain(|field| !field.trim().is_empty());
        if self.records.fields.len() != before {
            log::warn!("Dropped {} blank field names", before - self.records.fields.len());
            has_issues = true;
        }

        if self.records.fields.is_empty() {
            log::warn!("No rich-text fields configured, using default");
            self.records.fields = vec![String::from(DEFAULT_FIELD)];
            has_issues = true;
        }

        if self.limits.max_input_bytes == 0
            || self.limits.max_input_bytes > MAX_INPUT_BYTES_CEILING
        {
            log::warn!(
                "Invalid max_input_bytes: {}, using default",
                self.limits.max_input_bytes
            );
            self.limits.max_input_bytes = DEFAULT_MAX_INPUT_BYTES;
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("RICHTEXT_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("RICHTEXT_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("com", "richtext", "richtext")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}
