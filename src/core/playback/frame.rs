//! Decoded audio frames.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use super::PlaybackError;
use crate::core::session::OUTPUT_SAMPLE_RATE;

/// Scale factor for converting PCM 16-bit samples to normalized float (-1.0 to 1.0)
const PCM_TO_FLOAT_SCALE: f32 = 1.0 / 32768.0;

/// Gain applied to the mean absolute amplitude when computing the level.
pub const LEVEL_GAIN: f32 = 500.0;

/// Standard alphabet, padding optional. Streaming services do not always pad
/// their chunks.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 payload, accepting both padded and unpadded input.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    LENIENT_BASE64.decode(payload.trim())
}

/// One unit of synthesized speech, ready for playback.
///
/// Samples are mono, normalized to [-1.0, 1.0]. Cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Decode an inline audio payload: base64, then little-endian i16 at 24 kHz.
    pub fn from_base64(payload: &str) -> Result<Self, PlaybackError> {
        let bytes = decode_base64(payload).map_err(|e| PlaybackError::Decode(e.to_string()))?;
        Ok(Self::from_pcm16(&bytes, OUTPUT_SAMPLE_RATE))
    }

    /// Interpret raw bytes as little-endian i16 samples. A trailing odd byte is ignored.
    pub fn from_pcm16(bytes: &[u8], sample_rate: u32) -> Self {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 * PCM_TO_FLOAT_SCALE)
            .collect();
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration at the frame's sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Coarse output level in 0..=100: mean absolute amplitude times
    /// [`LEVEL_GAIN`], clamped.
    pub fn level(&self) -> u8 {
        if self.samples.is_empty() {
            return 0;
        }
        let sum: f32 = self.samples.iter().map(|s| s.abs()).sum();
        let mean = sum / self.samples.len() as f32;
        (mean * LEVEL_GAIN).clamp(0.0, 100.0).round() as u8
    }

    /// Convert back to 16-bit samples (for recording).
    pub fn to_i16(&self) -> impl Iterator<Item = i16> + '_ {
        self.samples
            .iter()
            .map(|s| (s * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_normalizes() {
        let frame = AudioFrame::from_pcm16(&pcm(&[0, 16384, -32768, 32767]), 24000);
        assert_eq!(frame.len(), 4);
        assert_eq!(frame.samples()[0], 0.0);
        assert_eq!(frame.samples()[1], 0.5);
        assert_eq!(frame.samples()[2], -1.0);
        assert!(frame.samples()[3] < 1.0);
    }

    #[test]
    fn test_odd_trailing_byte_ignored() {
        let frame = AudioFrame::from_pcm16(&[0x00, 0x40, 0x7f], 24000);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.samples()[0], 0.5);
    }

    #[test]
    fn test_from_base64_unpadded() {
        let frame = AudioFrame::from_base64("AAA").unwrap();
        assert_eq!(frame.samples(), &[0.0]);
        assert_eq!(frame.sample_rate(), OUTPUT_SAMPLE_RATE);
    }

    #[test]
    fn test_from_base64_invalid() {
        let err = AudioFrame::from_base64("***").unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
    }

    #[test]
    fn test_duration() {
        let frame = AudioFrame::new(vec![0.0; 24000], 24000);
        assert_eq!(frame.duration(), Duration::from_secs(1));

        let frame = AudioFrame::new(vec![0.0; 12], 0);
        assert_eq!(frame.duration(), Duration::ZERO);
    }

    #[test]
    fn test_level_silence_and_clamp() {
        assert_eq!(AudioFrame::new(vec![0.0; 100], 24000).level(), 0);
        assert_eq!(AudioFrame::new(Vec::<f32>::new(), 24000).level(), 0);
        assert_eq!(AudioFrame::new(vec![0.9, -0.9], 24000).level(), 100);
    }

    #[test]
    fn test_level_scales_mean_absolute() {
        // mean |x| = 0.1 -> 0.1 * 500 = 50
        let frame = AudioFrame::new(vec![0.1, -0.1, 0.1, -0.1], 24000);
        assert_eq!(frame.level(), 50);
    }

    #[test]
    fn test_to_i16_round_trip_samples() {
        let frame = AudioFrame::from_pcm16(&pcm(&[100, -100, 0]), 24000);
        assert_eq!(frame.to_i16().collect::<Vec<_>>(), vec![100, -100, 0]);
    }
}
