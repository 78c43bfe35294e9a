//! Audio output devices.
//!
//! An [`AudioOutput`] plays one frame at a time; the queue guarantees it is
//! never asked to play two frames concurrently. Dropping the `play` future
//! must stop the frame.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::PlaybackError;
use super::frame::AudioFrame;
use crate::core::session::OUTPUT_SAMPLE_RATE;

/// A device that renders decoded frames.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play `frame`, completing when it has finished playing.
    async fn play(&self, frame: &AudioFrame) -> Result<(), PlaybackError>;
}

/// Holds each frame for its real-time duration without producing sound.
///
/// Keeps the session's speaking indicator and pacing honest when no audio
/// device is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacedOutput;

#[async_trait]
impl AudioOutput for PacedOutput {
    async fn play(&self, frame: &AudioFrame) -> Result<(), PlaybackError> {
        tokio::time::sleep(frame.duration()).await;
        Ok(())
    }
}

/// Paced output that also appends every played frame to a WAV file.
pub struct WavRecorderOutput {
    writer: Mutex<Option<hound::WavWriter<BufWriter<File>>>>,
}

impl WavRecorderOutput {
    /// Create (or truncate) a 16-bit mono WAV file at the output sample rate.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: OUTPUT_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path.as_ref(), spec)
            .map_err(|e| PlaybackError::Device(format!("Failed to create WAV file: {e}")))?;

        Ok(Self {
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Flush the header and close the file. Later frames are rejected.
    pub fn finalize(&self) -> Result<(), PlaybackError> {
        if let Some(writer) = self.writer.lock().take() {
            writer
                .finalize()
                .map_err(|e| PlaybackError::Device(format!("Failed to finalize WAV file: {e}")))?;
        }
        Ok(())
    }

    fn write(&self, frame: &AudioFrame) -> Result<(), PlaybackError> {
        let mut guard = self.writer.lock();
        let writer = guard
            .as_mut()
            .ok_or_else(|| PlaybackError::Device("Recorder already finalized".to_string()))?;

        for sample in frame.to_i16() {
            writer
                .write_sample(sample)
                .map_err(|e| PlaybackError::Device(format!("Failed to write sample: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl AudioOutput for WavRecorderOutput {
    async fn play(&self, frame: &AudioFrame) -> Result<(), PlaybackError> {
        self.write(frame)?;
        tokio::time::sleep(frame.duration()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_paced_output_waits_frame_duration() {
        let frame = AudioFrame::new(vec![0.0; 12000], 24000);
        let start = tokio::time::Instant::now();
        PacedOutput.play(&frame).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wav_recorder_writes_samples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reply.wav");

        let output = WavRecorderOutput::create(&path).unwrap();
        output
            .play(&AudioFrame::from_pcm16(&[0x10, 0x00, 0xf0, 0xff], 24000))
            .await
            .unwrap();
        output
            .play(&AudioFrame::from_pcm16(&[0x20, 0x00], 24000))
            .await
            .unwrap();
        output.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![16, -16, 32]);
    }

    #[tokio::test]
    async fn test_wav_recorder_rejects_after_finalize() {
        let dir = TempDir::new().unwrap();
        let output = WavRecorderOutput::create(dir.path().join("a.wav")).unwrap();
        output.finalize().unwrap();
        output.finalize().unwrap();

        let err = output
            .play(&AudioFrame::new(vec![0.0], 24000))
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Device(_)));
    }
}
