use serde::Deserialize;
use std::path::Path;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// session:
///   api_key: "your-gemini-key"
///   endpoint: "wss://generativelanguage.googleapis.com"
///   model: "models/gemini-2.0-flash-exp"
///   voice: "Kore"
///   temperature: 0.6
///   max_output_tokens: 512
///   system_instruction: "You are a tutor for the Rust course."
///   reconnect_delay_ms: 1000
///
/// transcription:
///   api_key: "separate-key-if-needed"
///   base_url: "https://generativelanguage.googleapis.com"
///   model: "gemini-1.5-flash"
///   prompt: "Transcribe this audio verbatim."
///   timeout_seconds: 30
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub session: Option<SessionYaml>,
    pub transcription: Option<TranscriptionYaml>,
}

/// Live session configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Prebuilt voice name (Puck, Charon, Kore, Fenrir, Aoede)
    pub voice: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub system_instruction: Option<String>,
    /// Delay before the reconnect attempt after an unexpected close
    pub reconnect_delay_ms: Option<u64>,
}

/// Transcription provider configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TranscriptionYaml {
    /// Defaults to the session API key when absent
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
