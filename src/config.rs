//! Configuration loading and defaults
//!
//! This module provides:
//! - `AgentConfig` - Per-agent provider settings, persisted with the agent
//! - `ModelDefaults` - Fallbacks applied when an agent leaves a setting unset
//! - `Config` - Host configuration loaded from config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Directory name under the user's config and data directories
pub const APP_DIR: &str = "storehand";

/// Model used when neither the agent nor the host config names one
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Sampling temperature used when unset
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Completion token limit used when unset
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// OpenAI-compatible endpoint used when unset
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider settings for a single agent.
///
/// This is what gets persisted under `agentConfigs[id]`. Unset values fall
/// back to [`ModelDefaults`] at call time, so changing the host defaults
/// affects every agent that never pinned its own value.
///
/// # Example
///
/// ```
/// use storehand::AgentConfig;
///
/// let config = AgentConfig {
///     provider_key: "sk-test".to_string(),
///     model: Some("gpt-4o-mini".to_string()),
///     temperature: None,
///     max_tokens: Some(512),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub provider_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl AgentConfig {
    /// Config with only a provider key; everything else falls back to defaults
    pub fn with_key(provider_key: impl Into<String>) -> Self {
        Self {
            provider_key: provider_key.into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Resolve the settings used for one completion request
    pub fn resolve(&self, defaults: &ModelDefaults) -> ResolvedModel {
        ResolvedModel {
            model: self.model.clone().unwrap_or_else(|| defaults.model.clone()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

/// Concrete settings for one completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Host-wide fallbacks for unset agent settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Main configuration structure loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub provider: ProviderConfig,
    pub defaults: ModelDefaults,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an explicit path or the default location,
    /// falling back to defaults when no file exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_config_path(),
        };

        if let Some(path) = path {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
                return Ok(config);
            }
        }
        Ok(Config::default())
    }

    /// Get the config directory path (~/.config/storehand)
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join(APP_DIR))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Path of the persisted agent blob
    pub fn state_file(&self) -> PathBuf {
        self.general.state_file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("state.json")
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Where agent configs and states are persisted (default: data dir)
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file path; stdout is reserved for the message protocol
    pub file: PathBuf,
    /// `EnvFilter` directive
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: std::env::temp_dir().join("storehand.log"),
            filter: "info,storehand=debug".to_string(),
        }
    }
}
