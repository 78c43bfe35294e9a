//! Configuration module for the live tutor
//!
//! Session and transcription settings come from environment variables (a `.env`
//! file is loaded by the binary at startup) and an optional YAML file.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use live_tutor::config::LiveConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = LiveConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallbacks
//! let config = LiveConfig::from_file(&PathBuf::from("config.yaml"))?;
//! println!("Using model {} with voice {}", config.model, config.voice);
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod yaml;

pub use yaml::{SessionYaml, TranscriptionYaml, YamlConfig};

use crate::core::session::{
    DEFAULT_LIVE_MODEL, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SYSTEM_INSTRUCTION, LIVE_API_ENDPOINT,
    LiveVoice,
};

/// Default sampling temperature for generated responses.
pub const DEFAULT_TEMPERATURE: f32 = 0.01;

/// Default cap on tokens per generated response.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 120;

/// Default REST base URL for the transcription provider.
pub const DEFAULT_TRANSCRIPTION_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model used to transcribe finished turns.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "gemini-1.5-flash";

/// Default instruction sent alongside the audio to transcribe.
pub const DEFAULT_TRANSCRIPTION_PROMPT: &str =
    "Transcribe this audio exactly as spoken. Return only the transcript text.";

const DEFAULT_TRANSCRIPTION_TIMEOUT_SECS: u64 = 30;

/// Settings for the transcription provider.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionConfig {
    /// API key; falls back to the session key when not set separately
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub prompt: String,
    pub timeout_secs: u64,
}

impl TranscriptionConfig {
    /// Build a config with defaults for everything except the key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_TRANSCRIPTION_BASE_URL.to_string(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            prompt: DEFAULT_TRANSCRIPTION_PROMPT.to_string(),
            timeout_secs: DEFAULT_TRANSCRIPTION_TIMEOUT_SECS,
        }
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration for a streaming session.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub api_key: String,
    /// Socket endpoint, scheme and host only (`wss://...`)
    pub endpoint: String,
    pub model: String,
    pub voice: LiveVoice,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub system_instruction: String,
    /// Delay before the reconnect attempt after an unexpected close
    pub reconnect_delay_ms: u64,
    pub transcription: TranscriptionConfig,
}

impl LiveConfig {
    /// Build a config with defaults for everything except the key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            transcription: TranscriptionConfig::with_api_key(api_key.clone()),
            api_key,
            endpoint: LIVE_API_ENDPOINT.to_string(),
            model: DEFAULT_LIVE_MODEL.to_string(),
            voice: LiveVoice::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }

    /// Load configuration from environment variables
    ///
    /// `GEMINI_API_KEY` is required; everything else falls back to defaults.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment
    ///
    /// Values in the file override environment variables. Validation runs on
    /// the merged result, so the API key may come from either source.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = Self::load_env()?;
        config.apply_yaml(yaml_config);
        config.validate()?;

        Ok(config)
    }

    /// Check the configuration for values the service would reject.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("GEMINI_API_KEY is required".to_string());
        }

        if !(self.endpoint.starts_with("ws://") || self.endpoint.starts_with("wss://")) {
            return Err(format!(
                "Live endpoint must use ws:// or wss://, got '{}'",
                self.endpoint
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }

        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than zero".to_string());
        }

        if self.transcription.api_key.trim().is_empty() {
            return Err("Transcription API key is required".to_string());
        }

        if !(self.transcription.base_url.starts_with("http://")
            || self.transcription.base_url.starts_with("https://"))
        {
            return Err(format!(
                "Transcription base URL must use http:// or https://, got '{}'",
                self.transcription.base_url
            ));
        }

        Ok(())
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    fn load_env() -> Result<Self, String> {
        let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        let mut config = Self::with_api_key(api_key);

        if let Some(endpoint) = env_string("LIVE_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(model) = env_string("LIVE_MODEL") {
            config.model = model;
        }
        if let Some(voice) = env_string("LIVE_VOICE") {
            config.voice = LiveVoice::from_str_or_default(&voice);
        }
        if let Some(temperature) = env_parse::<f32>("LIVE_TEMPERATURE")? {
            config.temperature = temperature;
        }
        if let Some(tokens) = env_parse::<u32>("LIVE_MAX_OUTPUT_TOKENS")? {
            config.max_output_tokens = tokens;
        }
        if let Some(instruction) = env_string("LIVE_SYSTEM_INSTRUCTION") {
            config.system_instruction = instruction;
        }
        if let Some(delay) = env_parse::<u64>("LIVE_RECONNECT_DELAY_MS")? {
            config.reconnect_delay_ms = delay;
        }

        if let Some(key) = env_string("TRANSCRIPTION_API_KEY") {
            config.transcription.api_key = key;
        }
        if let Some(model) = env_string("TRANSCRIPTION_MODEL") {
            config.transcription.model = model;
        }
        if let Some(base_url) = env_string("TRANSCRIPTION_BASE_URL") {
            config.transcription.base_url = base_url;
        }

        Ok(config)
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) {
        // Tracks whether the transcription key was inherited so a YAML session
        // key propagates unless a dedicated key is set.
        let inherits_key = self.transcription.api_key == self.api_key;

        if let Some(session) = yaml.session {
            if let Some(api_key) = session.api_key {
                self.api_key = api_key;
            }
            if let Some(endpoint) = session.endpoint {
                self.endpoint = endpoint;
            }
            if let Some(model) = session.model {
                self.model = model;
            }
            if let Some(voice) = session.voice {
                self.voice = LiveVoice::from_str_or_default(&voice);
            }
            if let Some(temperature) = session.temperature {
                self.temperature = temperature;
            }
            if let Some(tokens) = session.max_output_tokens {
                self.max_output_tokens = tokens;
            }
            if let Some(instruction) = session.system_instruction {
                self.system_instruction = instruction;
            }
            if let Some(delay) = session.reconnect_delay_ms {
                self.reconnect_delay_ms = delay;
            }
        }

        if inherits_key {
            self.transcription.api_key = self.api_key.clone();
        }

        if let Some(transcription) = yaml.transcription {
            if let Some(api_key) = transcription.api_key {
                self.transcription.api_key = api_key;
            }
            if let Some(base_url) = transcription.base_url {
                self.transcription.base_url = base_url;
            }
            if let Some(model) = transcription.model {
                self.transcription.model = model;
            }
            if let Some(prompt) = transcription.prompt {
                self.transcription.prompt = prompt;
            }
            if let Some(timeout) = transcription.timeout_seconds {
                self.transcription.timeout_secs = timeout;
            }
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid value for {key}: '{raw}'")),
        None => Ok(None),
    }
}
