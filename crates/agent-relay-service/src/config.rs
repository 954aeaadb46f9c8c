//! Environment-driven relay configuration.
//!
//! Typed defaults overridden by `RELAY_*` environment variables, then
//! validated once at startup.

use std::collections::BTreeMap;
use std::env;

use thiserror::Error;

use agent_relay_agent::ToolFlags;
use agent_relay_agent::model::DEFAULT_MODEL_ID;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to a set of \
tools: HTTP requests, hashing, JSON formatting, text analysis and the current time. Answer \
the user's request accurately, use the available tools when they help, and keep the tone \
friendly and upbeat.";

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required variable: {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Application id forming the webhook path.
    pub application_id: String,
    /// Bot credential for the webhook authorization header.
    pub bot_token: String,
    /// Destination API base.
    pub api_base: String,
    /// When false, the streaming relay is bypassed and only the agent's
    /// return value is delivered, once.
    pub enable_streaming: bool,
    /// Minimum completed lines per streamed batch.
    pub stream_min_lines: usize,
    /// Character ceiling forcing a batch out regardless of line count.
    pub stream_max_buffer: usize,
    /// Prompt length ceiling, in characters.
    pub max_prompt_length: usize,
    /// System prompt handed to the agent backend.
    pub system_prompt: String,
    /// Model used when no keyword matches.
    pub default_model_id: String,
    /// Prompt keyword to model-id overrides.
    pub model_keywords: BTreeMap<String, String>,
    /// Which built-in tools are exposed.
    pub tools: ToolFlags,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            bot_token: String::new(),
            api_base: "https://discord.com".to_string(),
            enable_streaming: true,
            stream_min_lines: 1,
            stream_max_buffer: 1500,
            max_prompt_length: 10_000,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            default_model_id: DEFAULT_MODEL_ID.to_string(),
            model_keywords: BTreeMap::from([
                (
                    "sonnet".to_string(),
                    "us.anthropic.claude-3-7-sonnet-20250219-v1:0".to_string(),
                ),
                (
                    "premier".to_string(),
                    "us.amazon.nova-premier-v1:0".to_string(),
                ),
            ]),
            tools: ToolFlags::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    /// Returns error when a required variable is absent, a value does not
    /// parse, or validation fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.application_id = env::var("RELAY_APPLICATION_ID")
            .map_err(|_| ConfigError::MissingVar("RELAY_APPLICATION_ID"))?;
        config.bot_token = env::var("RELAY_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingVar("RELAY_BOT_TOKEN"))?;

        if let Ok(value) = env::var("RELAY_API_BASE") {
            config.api_base = value;
        }
        if let Ok(value) = env::var("RELAY_SYSTEM_PROMPT") {
            config.system_prompt = value;
        }
        if let Ok(value) = env::var("RELAY_DEFAULT_MODEL_ID") {
            config.default_model_id = value;
        }

        override_bool(&mut config.enable_streaming, "RELAY_ENABLE_STREAMING");
        override_bool(&mut config.tools.hash_generator, "RELAY_ENABLE_HASH_TOOL");
        override_bool(&mut config.tools.json_formatter, "RELAY_ENABLE_JSON_TOOL");
        override_bool(&mut config.tools.text_analyzer, "RELAY_ENABLE_TEXT_TOOL");
        override_bool(&mut config.tools.http_request, "RELAY_ENABLE_HTTP_TOOL");

        override_usize(&mut config.stream_min_lines, "RELAY_STREAM_MIN_LINES")?;
        override_usize(&mut config.stream_max_buffer, "RELAY_STREAM_MAX_BUFFER")?;
        override_usize(&mut config.max_prompt_length, "RELAY_MAX_PROMPT_LENGTH")?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the service relies on.
    ///
    /// # Errors
    /// Returns error describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_id.is_empty() {
            return Err(ConfigError::Invalid("application_id must not be empty"));
        }
        if self.bot_token.is_empty() {
            return Err(ConfigError::Invalid("bot_token must not be empty"));
        }
        if self.stream_min_lines == 0 {
            return Err(ConfigError::Invalid("stream_min_lines must be at least 1"));
        }
        if self.stream_max_buffer == 0 {
            return Err(ConfigError::Invalid("stream_max_buffer must be positive"));
        }
        if self.max_prompt_length == 0 {
            return Err(ConfigError::Invalid("max_prompt_length must be positive"));
        }
        if self.default_model_id.is_empty() {
            return Err(ConfigError::Invalid("default_model_id must not be empty"));
        }
        Ok(())
    }
}

/// Truthy strings enable, everything else disables.
fn override_bool(slot: &mut bool, var: &'static str) {
    if let Ok(value) = env::var(var) {
        *slot = matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on");
    }
}

fn override_usize(slot: &mut usize, var: &'static str) -> Result<(), ConfigError> {
    if let Ok(value) = env::var(var) {
        *slot = value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value })?;
    }
    Ok(())
}
