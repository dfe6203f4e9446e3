//! Configuration types and loading.
//!
//! Config is loaded from an optional JSON file (e.g. `~/.psyai/config.json`) and the
//! environment, which overrides the file. [`Settings`] is the validated result: built once
//! at startup and shared read-only afterwards.

use crate::channels::{DEFAULT_POLL_TIMEOUT, TELEGRAM_API_BASE};
use crate::qa::{QaSettings, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TOKENS};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_BOT_TOKEN: &str = "TELETOKEN";
pub const ENV_GREETING: &str = "START_TEXT";
pub const ENV_QA_BASE_URL: &str = "BASE_URL_BETA";
pub const ENV_BOT_USERNAME: &str = "BOT_USERNAME";
pub const ENV_TELEGRAM_API_BASE: &str = "TELEGRAM_API_BASE";
pub const ENV_CONFIG_PATH: &str = "PSYAI_CONFIG_PATH";

/// Username used for group mention checks when neither config nor getMe provides one.
pub const DEFAULT_BOT_USERNAME: &str = "doseslog_bot";
pub const DEFAULT_THINKING_TEXT: &str = "PsyAI is thinking...";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config from {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("bot token not configured (set TELETOKEN or telegram.botToken)")]
    Credential,
    #[error("{0} not configured")]
    Missing(&'static str),
    #[error("{key} could not be decoded: {reason}")]
    Decode { key: &'static str, reason: String },
}

/// Top-level config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub qa: QaConfig,
}

/// Telegram bot settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token from BotFather. Overridden by TELETOKEN.
    pub bot_token: Option<String>,
    /// Username (without `@`) that group messages must mention. Defaults to getMe's answer.
    pub bot_username: Option<String>,
    /// Bot API base URL (default https://api.telegram.org).
    pub api_base: Option<String>,
    /// getUpdates long-poll timeout in seconds (default 60).
    pub poll_timeout_secs: Option<u64>,
}

/// Reply texts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// Base64-encoded /start greeting. Overridden by START_TEXT.
    pub greeting: Option<String>,
    /// Placeholder sent while waiting for an answer.
    pub thinking_text: Option<String>,
}

/// Remote Q&A endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaConfig {
    /// Base URL; requests go to `{baseUrl}/prompt`. Overridden by BASE_URL_BETA.
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub tokens: Option<u32>,
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bot_token: String,
    pub telegram_api_base: String,
    /// None until resolved from getMe at startup.
    pub bot_username: Option<String>,
    pub greeting: String,
    pub thinking_text: String,
    pub poll_timeout_secs: u64,
    pub qa: QaSettings,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Decode a base64 value into UTF-8 text.
pub fn decode_base64_text(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|e| ConfigError::Decode {
            key,
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| ConfigError::Decode {
        key,
        reason: e.to_string(),
    })
}

impl Settings {
    /// Resolve from the config file and the process environment.
    pub fn from_env(config: &Config) -> Result<Self, ConfigError> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup; env values win over the file.
    pub fn resolve<F>(config: &Config, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = non_empty(env(ENV_BOT_TOKEN))
            .or_else(|| non_empty(config.telegram.bot_token.clone()))
            .ok_or(ConfigError::Credential)?;

        let greeting_b64 = non_empty(env(ENV_GREETING))
            .or_else(|| non_empty(config.relay.greeting.clone()))
            .ok_or(ConfigError::Missing(ENV_GREETING))?;
        let greeting = decode_base64_text(ENV_GREETING, &greeting_b64)?;

        let base_url = non_empty(env(ENV_QA_BASE_URL))
            .or_else(|| non_empty(config.qa.base_url.clone()))
            .ok_or(ConfigError::Missing(ENV_QA_BASE_URL))?;

        let bot_username = non_empty(env(ENV_BOT_USERNAME))
            .or_else(|| non_empty(config.telegram.bot_username.clone()))
            .map(|u| u.trim_start_matches('@').to_string());

        let telegram_api_base = non_empty(env(ENV_TELEGRAM_API_BASE))
            .or_else(|| non_empty(config.telegram.api_base.clone()))
            .unwrap_or_else(|| TELEGRAM_API_BASE.to_string());

        let qa = QaSettings {
            base_url,
            model: non_empty(config.qa.model.clone()).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.qa.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            tokens: config.qa.tokens.unwrap_or(DEFAULT_TOKENS),
        };

        Ok(Self {
            bot_token,
            telegram_api_base,
            bot_username,
            greeting,
            thinking_text: non_empty(config.relay.thinking_text.clone())
                .unwrap_or_else(|| DEFAULT_THINKING_TEXT.to_string()),
            poll_timeout_secs: config
                .telegram
                .poll_timeout_secs
                .unwrap_or(DEFAULT_POLL_TIMEOUT),
            qa,
        })
    }

    /// Username to match in group mentions.
    pub fn bot_username(&self) -> &str {
        self.bot_username.as_deref().unwrap_or(DEFAULT_BOT_USERNAME)
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var(ENV_CONFIG_PATH).map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".psyai").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path. Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf), ConfigError> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?
    };
    Ok((config, path))
}
