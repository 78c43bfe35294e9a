//! Integration tests for the Gemini transcription provider
//!
//! Runs the HTTP client against a wiremock server and verifies the request
//! shape, response parsing and error mapping.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use live_tutor::config::TranscriptionConfig;
use live_tutor::core::transcription::{
    GeminiTranscriber, TranscriptionError, TranscriptionProvider, WAV_MIME, wrap_pcm16,
};

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn transcriber(server: &MockServer) -> GeminiTranscriber {
    let mut config = TranscriptionConfig::with_api_key("test-key");
    config.base_url = server.uri();
    config.prompt = "Transcribe.".to_string();
    GeminiTranscriber::new(config).unwrap()
}

/// Test a successful transcription round trip
#[tokio::test]
async fn test_transcribe_success() {
    let server = MockServer::start().await;
    let wav = wrap_pcm16(&[0, 0], 24000, 1);

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{
                "parts": [
                    { "text": "Transcribe." },
                    { "inline_data": { "mime_type": "audio/wav" } }
                ]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Loops repeat " }, { "text": "work." }] }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = transcriber(&server)
        .transcribe(&wav, WAV_MIME)
        .await
        .unwrap();
    assert_eq!(text, "Loops repeat work.");
}

/// Test that rejected credentials map to AuthenticationFailed
#[tokio::test]
async fn test_transcribe_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let result = transcriber(&server).transcribe(&[1, 2, 3], WAV_MIME).await;
    match result {
        Err(TranscriptionError::AuthenticationFailed(msg)) => {
            assert!(msg.contains("API key not valid"));
        }
        other => panic!("Expected AuthenticationFailed, got {other:?}"),
    }
}

/// Test that server errors map to ProviderError
#[tokio::test]
async fn test_transcribe_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let result = transcriber(&server).transcribe(&[1, 2, 3], WAV_MIME).await;
    match result {
        Err(TranscriptionError::ProviderError(msg)) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("upstream exploded"));
        }
        other => panic!("Expected ProviderError, got {other:?}"),
    }
}

/// Test that a response without candidates is rejected
#[tokio::test]
async fn test_transcribe_no_candidates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let result = transcriber(&server).transcribe(&[1, 2, 3], WAV_MIME).await;
    assert!(matches!(result, Err(TranscriptionError::InvalidResponse(_))));
}

/// Test that an unreachable host is a network error
#[tokio::test]
async fn test_transcribe_network_error() {
    let mut config = TranscriptionConfig::with_api_key("test-key");
    config.base_url = "http://127.0.0.1:1".to_string();
    let transcriber = GeminiTranscriber::new(config).unwrap();

    let result = transcriber.transcribe(&[1, 2, 3], WAV_MIME).await;
    assert!(matches!(result, Err(TranscriptionError::NetworkError(_))));
}
