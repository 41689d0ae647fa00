use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::aggregator::ErrorPolicy;
use crate::core::cost::calculator::DEFAULT_AUDIO_MODEL;
use crate::core::error::ConfigError;
use crate::core::providers::openai::DEFAULT_BASE_URL;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Convert a wait in seconds, rejecting negative, NaN, infinite and oversized values.
pub fn wait_duration(seconds: f64) -> Result<Duration, ConfigError> {
    if seconds < 0.0 {
        return Err(ConfigError::InvalidWait(seconds));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ConfigError::InvalidWait(seconds))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_format() -> String {
    "text".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSettings {
    #[serde(default = "default_pricing_file")]
    pub pricing_file: PathBuf,
    /// Pause between daily requests, in seconds
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: f64,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default = "default_audio_model")]
    pub audio_model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

fn default_pricing_file() -> PathBuf {
    PathBuf::from("pricing.json")
}
fn default_wait_seconds() -> f64 {
    12.0
}
fn default_audio_model() -> String {
    DEFAULT_AUDIO_MODEL.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            pricing_file: default_pricing_file(),
            wait_seconds: default_wait_seconds(),
            continue_on_error: false,
            audio_model: default_audio_model(),
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            api_key: None,
            organization: None,
        }
    }
}

impl UsageSettings {
    pub fn wait(&self) -> Result<Duration, ConfigError> {
        wait_duration(self.wait_seconds)
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        if self.continue_on_error {
            ErrorPolicy::Continue
        } else {
            ErrorPolicy::Abort
        }
    }

    /// The configured key, else `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub usage: UsageSettings,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("ucost").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["text", "json"].contains(&self.settings.default_format.as_str()) {
            issues.push(format!(
                "Invalid default_format: '{}' (must be 'text' or 'json')",
                self.settings.default_format
            ));
        }
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        if self.usage.wait().is_err() {
            issues.push(format!(
                "Invalid wait_seconds: {} (must be a finite, non-negative number of seconds)",
                self.usage.wait_seconds
            ));
        }
        if !self.usage.base_url.starts_with("https://") {
            issues.push(format!(
                "Invalid base_url: '{}' (must use HTTPS)",
                self.usage.base_url
            ));
        }
        if self.usage.audio_model.trim().is_empty() {
            issues.push("audio_model must not be empty".to_string());
        }
        issues
    }
}
