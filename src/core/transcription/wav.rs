//! WAV container for raw PCM.
//!
//! Transcription services take a self-describing file rather than bare
//! samples, so each finished turn is wrapped in a canonical 44-byte RIFF
//! header before upload.

/// Mime type of the produced container.
pub const WAV_MIME: &str = "audio/wav";

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Build a WAV header for PCM audio.
///
/// # Arguments
/// * `data_size` - Size of the audio data in bytes
/// * `sample_rate` - Sample rate in Hz (e.g., 24000)
/// * `channels` - Number of channels (1 for mono)
/// * `bits_per_sample` - Bits per sample (typically 16)
pub fn create_header(
    data_size: u32,
    sample_rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> [u8; WAV_HEADER_LEN] {
    let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
    let block_align = channels * bits_per_sample / 8;
    // RIFF size excludes the 8-byte "RIFF" + size prefix
    let riff_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_LEN];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Wrap 16-bit little-endian PCM in a complete WAV file.
pub fn wrap_pcm16(pcm_data: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let header = create_header(pcm_data.len() as u32, sample_rate, channels, 16);
    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm_data.len());
    wav.extend_from_slice(&header);
    wav.extend_from_slice(pcm_data);
    wav
}
