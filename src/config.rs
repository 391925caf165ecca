use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::types::Language;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("Environment error: {0}")]
    EnvError(#[from] env::VarError),
}

impl ConfigError {
    fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Connection settings for the coaching backend proxy
#[derive(Debug)]
pub struct ApiConfig {
    pub backend_url: url::Url,
    pub api_key: Option<SecretBox<String>>,
}

impl ApiConfig {
    /// Load API configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let raw_url = env::var("VOICE_COACH_BACKEND_URL")
            .map_err(|_| ConfigError::MissingEnvVar("VOICE_COACH_BACKEND_URL".to_string()))?;
        let backend_url = Self::parse_backend_url(&raw_url)?;

        let api_key = match env::var("VOICE_COACH_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(SecretBox::new(Box::new(key))),
            Ok(_) | Err(env::VarError::NotPresent) => None,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            backend_url,
            api_key,
        })
    }

    fn parse_backend_url(raw: &str) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(raw.trim())
            .map_err(|e| ConfigError::invalid("VOICE_COACH_BACKEND_URL", e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(ConfigError::invalid(
                "VOICE_COACH_BACKEND_URL",
                format!("unsupported scheme '{}'", other),
            )),
        }
    }

    /// Bearer token for the backend (use only when making API calls)
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|key| key.expose_secret().as_str())
    }
}

/// Load configuration with helpful error messages for development
pub fn load_config() -> Result<ApiConfig, ConfigError> {
    match ApiConfig::load() {
        Ok(config) => {
            log::info!("Loaded backend configuration for {}", config.backend_url);
            Ok(config)
        }
        Err(ConfigError::MissingEnvVar(var)) => {
            log::error!("Missing required environment variable: {}", var);
            log::error!("Create a .env file in the project root with:");
            log::error!("{}=https://your-backend.example.com", var);
            Err(ConfigError::MissingEnvVar(var))
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Tuning for the real-time coach and the session reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    pub language: Language,
    /// Voice id or voice name; `None` uses the language default
    pub voice_id: Option<String>,
    pub cooldown_ms: u64,
    pub enabled: bool,
    /// Double the cooldown while the battery is low
    pub battery_adaptation: bool,
    /// Start the playback loop as soon as a clip is enqueued
    pub autoplay: bool,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            language: Language::En,
            voice_id: None,
            cooldown_ms: 3000,
            enabled: true,
            battery_adaptation: true,
            autoplay: true,
        }
    }
}

impl CoachConfig {
    /// Defaults overlaid with `VOICE_COACH_LANGUAGE`, `VOICE_COACH_COOLDOWN_MS`
    /// and `VOICE_COACH_ENABLED`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(language) = lookup("VOICE_COACH_LANGUAGE") {
            config.language = Language::from_str(language.trim())
                .map_err(|e| ConfigError::invalid("VOICE_COACH_LANGUAGE", e.to_string()))?;
        }
        if let Some(cooldown) = lookup("VOICE_COACH_COOLDOWN_MS") {
            config.cooldown_ms = cooldown
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    ConfigError::invalid("VOICE_COACH_COOLDOWN_MS", e.to_string())
                })?;
        }
        if let Some(enabled) = lookup("VOICE_COACH_ENABLED") {
            config.enabled = match enabled.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::invalid(
                        "VOICE_COACH_ENABLED",
                        format!("expected a boolean, got '{}'", other),
                    ))
                }
            };
        }

        Ok(config)
    }
}

/// Playback queue settings
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Background music volume while speech plays
    pub ducking_volume: f32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ducking_volume: 0.2,
        }
    }
}

impl QueueConfig {
    pub fn with_ducking_volume(volume: f32) -> Self {
        Self {
            ducking_volume: volume.clamp(0.0, 1.0),
        }
    }
}

/// Failure tracker thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub max_failures: u32,
    pub quiet_period: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            quiet_period: Duration::from_secs(30),
        }
    }
}

impl TrackerConfig {
    /// Failure count at which the tracker reports degraded service.
    pub fn degraded_threshold(&self) -> u32 {
        self.max_failures / 2
    }
}
