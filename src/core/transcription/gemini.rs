//! Transcription over the Gemini `generateContent` REST endpoint.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{TranscriptionError, TranscriptionProvider};
use crate::config::TranscriptionConfig;

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: &'a str },
    InlineData { inline_data: RequestInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct RequestInlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// [`TranscriptionProvider`] backed by a Gemini model.
///
/// Each call is a single `POST {base_url}/v1beta/models/{model}:generateContent`
/// carrying the transcription prompt and the audio as inline base64 data. The
/// text of every part of the first candidate is joined into the transcript.
#[derive(Debug, Clone)]
pub struct GeminiTranscriber {
    config: TranscriptionConfig,
    http_client: Client,
}

impl GeminiTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self, TranscriptionError> {
        if config.api_key.trim().is_empty() {
            return Err(TranscriptionError::ConfigurationError(
                "API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| {
                TranscriptionError::ConfigurationError(format!(
                    "Failed to create HTTP client: {e}"
                ))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Full request URL, without the key.
    pub fn api_url(&self) -> String {
        let model = self
            .config
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.config.model);
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn parse_response(body: &str) -> Result<String, TranscriptionError> {
        let response: GenerateResponse = serde_json::from_str(body)
            .map_err(|e| TranscriptionError::InvalidResponse(format!("{e}: {body}")))?;

        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            TranscriptionError::InvalidResponse("Response has no candidates".to_string())
        })?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl TranscriptionProvider for GeminiTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        mime_type: &str,
    ) -> Result<String, TranscriptionError> {
        if audio.is_empty() {
            return Err(TranscriptionError::EmptyAudio);
        }

        debug!(
            "Transcribing {} bytes of {} with {}",
            audio.len(),
            mime_type,
            self.config.model
        );

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: &self.config.prompt,
                    },
                    RequestPart::InlineData {
                        inline_data: RequestInlineData {
                            mime_type,
                            data: STANDARD.encode(audio),
                        },
                    },
                ],
            }],
        };

        let response = self
            .http_client
            .post(self.api_url())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| TranscriptionError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            TranscriptionError::NetworkError(format!("Failed to read response: {e}"))
        })?;

        if !status.is_success() {
            let error_msg = match serde_json::from_str::<ApiErrorResponse>(&response_text) {
                Ok(error_response) => format!(
                    "Gemini API error: {} ({})",
                    error_response.error.message,
                    error_response.error.status.unwrap_or_default()
                ),
                Err(_) => format!("Gemini API error ({status}): {response_text}"),
            };

            return Err(match status.as_u16() {
                401 | 403 => TranscriptionError::AuthenticationFailed(error_msg),
                _ => TranscriptionError::ProviderError(error_msg),
            });
        }

        let transcript = Self::parse_response(&response_text)?;
        info!("Transcription complete: {} characters", transcript.len());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TranscriptionConfig {
        TranscriptionConfig::with_api_key("test-key")
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = GeminiTranscriber::new(TranscriptionConfig::with_api_key(""));
        assert!(matches!(
            result,
            Err(TranscriptionError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_api_url_strips_models_prefix() {
        let mut config = config();
        config.base_url = "http://localhost:1234/".to_string();
        config.model = "models/gemini-1.5-flash".to_string();

        let transcriber = GeminiTranscriber::new(config).unwrap();
        assert_eq!(
            transcriber.api_url(),
            "http://localhost:1234/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: "prompt" },
                    RequestPart::InlineData {
                        inline_data: RequestInlineData {
                            mime_type: "audio/wav",
                            data: STANDARD.encode([1u8, 2, 3]),
                        },
                    },
                ],
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            json["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "audio/wav"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world\n"}]}}]}"#;
        assert_eq!(GeminiTranscriber::parse_response(body).unwrap(), "Hello world");
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let result = GeminiTranscriber::parse_response(r#"{"candidates":[]}"#);
        assert!(matches!(result, Err(TranscriptionError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_response_empty_content() {
        let body = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(GeminiTranscriber::parse_response(body).unwrap(), "");
    }

    #[tokio::test]
    async fn test_transcribe_empty_audio() {
        let transcriber = GeminiTranscriber::new(config()).unwrap();
        let result = transcriber.transcribe(&[], "audio/wav").await;
        assert!(matches!(result, Err(TranscriptionError::EmptyAudio)));
    }
}
