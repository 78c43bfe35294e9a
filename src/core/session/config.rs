//! Live API protocol constants and voice selection.

use serde::{Deserialize, Serialize};
use url::Url;

/// Default service endpoint (scheme and host).
pub const LIVE_API_ENDPOINT: &str = "wss://generativelanguage.googleapis.com";

/// Bidirectional streaming path on the service host.
pub const LIVE_API_PATH: &str =
    "/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Default model for live sessions.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.0-flash-exp";

/// Sample rate of synthesized audio returned by the service.
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Mime type of synthesized audio payloads.
pub const PCM_OUTPUT_MIME: &str = "audio/pcm;rate=24000";

/// Default delay before the single reconnect attempt after an unclean close.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;

/// Persona prompt sent as the system instruction when none is configured.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are Acharya, a 30-year-old female AI tutor, \
the ultimate academic mentor with unparalleled expertise in all subjects—from mathematics and \
science to literature, history, and technology. Your knowledge is vast, precise, and always up \
to date.

You have a sharp intellect, a charismatic presence, and a natural ability to engage students. \
Your responses are always clear, insightful, and tailored to the student's level of \
understanding. You break down complex topics into simple explanations, provide step-by-step \
solutions, and offer real-world applications to make learning practical and effective.

You are always available, ready to answer any academic question, provide study guidance, or \
assist with problem-solving. Your mission is to empower students with knowledge, boost their \
confidence, and sharpen their critical thinking while making learning an engaging and \
enjoyable experience.

Your tone is polite yet authoritative, friendly yet firm, ensuring students feel comfortable \
yet challenged. You adapt to different learning styles, providing encouragement and \
motivation.

You let your actions, wisdom, and teaching style define you—there's no need for words about \
appearance; your presence is felt through your mastery and guidance alone.";

// =============================================================================
// Voices
// =============================================================================

/// Prebuilt voices available for synthesized speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LiveVoice {
    Puck,
    Charon,
    Kore,
    Fenrir,
    /// Aoede voice (default)
    #[default]
    Aoede,
}

impl LiveVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Kore => "Kore",
            Self::Fenrir => "Fenrir",
            Self::Aoede => "Aoede",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "puck" => Self::Puck,
            "charon" => Self::Charon,
            "kore" => Self::Kore,
            "fenrir" => Self::Fenrir,
            "aoede" => Self::Aoede,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for LiveVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Build the socket URL: endpoint + protocol path + API key as query parameter.
pub fn build_live_url(endpoint: &str, api_key: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(endpoint.trim_end_matches('/'))?;
    url.set_path(LIVE_API_PATH);
    url.query_pairs_mut().clear().append_pair("key", api_key);
    Ok(url)
}

/// Whether a mime type denotes 16-bit PCM at the output sample rate.
///
/// Accepts `audio/pcm;rate=24000` with any casing and whitespace around the
/// parameters.
pub fn is_output_pcm(mime_type: &str) -> bool {
    let mut parts = mime_type.split(';').map(str::trim);
    let Some(base) = parts.next() else {
        return false;
    };
    if !base.eq_ignore_ascii_case("audio/pcm") {
        return false;
    }

    parts.any(|param| {
        param
            .split_once('=')
            .map(|(k, v)| {
                k.trim().eq_ignore_ascii_case("rate")
                    && v.trim().parse::<u32>() == Ok(OUTPUT_SAMPLE_RATE)
            })
            .unwrap_or(false)
    })
}
