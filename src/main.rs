use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use live_tutor::config::LiveConfig;
use live_tutor::core::playback::{AudioOutput, PacedOutput, WavRecorderOutput};
use live_tutor::core::session::{
    ChannelEvents, MediaChunk, SessionEvent, StreamingSession, ToolRegistry,
};
use live_tutor::core::transcription::{GeminiTranscriber, TranscriptionProvider, WAV_MIME};

/// Live Tutor - voice tutoring over the Gemini Live API
#[derive(Parser, Debug)]
#[command(name = "live-tutor")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a live session and stream audio and text to the tutor
    Stream {
        /// 16-bit PCM WAV file streamed to the service in real time
        #[arg(short = 'i', long = "input", value_name = "WAV")]
        input: Option<PathBuf>,

        /// Size of each streamed chunk in milliseconds
        #[arg(long = "chunk-ms", default_value_t = 100)]
        chunk_ms: u64,

        /// Record the tutor's voice to this WAV file
        #[arg(short = 'r', long = "record", value_name = "WAV")]
        record: Option<PathBuf>,

        /// Text turn sent once the session is ready
        #[arg(short = 't', long = "text")]
        text: Option<String>,

        /// Seconds to stay connected
        #[arg(short = 'd', long = "duration", default_value_t = 30)]
        duration: u64,
    },

    /// Transcribe a WAV file once with the configured provider
    Transcribe {
        #[arg(short = 'i', long = "input", value_name = "WAV")]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LiveConfig::from_file(path),
        None => LiveConfig::from_env(),
    }
    .map_err(|e| anyhow!("Failed to load configuration: {e}"))?;

    match cli.command {
        Commands::Stream {
            input,
            chunk_ms,
            record,
            text,
            duration,
        } => {
            run_stream(
                config,
                input,
                chunk_ms,
                record,
                text,
                Duration::from_secs(duration),
            )
            .await
        }
        Commands::Transcribe { input } => run_transcribe(config, &input).await,
    }
}

async fn run_stream(
    config: LiveConfig,
    input: Option<PathBuf>,
    chunk_ms: u64,
    record: Option<PathBuf>,
    text: Option<String>,
    duration: Duration,
) -> anyhow::Result<()> {
    let input_audio = input.as_deref().map(read_pcm16_wav).transpose()?;

    let recorder = record
        .as_deref()
        .map(WavRecorderOutput::create)
        .transpose()?
        .map(Arc::new);
    let output: Arc<dyn AudioOutput> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => Arc::new(PacedOutput),
    };

    let (events, mut event_rx) = ChannelEvents::new();
    let session = Arc::new(
        StreamingSession::builder(config)
            .events(Arc::new(events))
            .output(output)
            .tools(ToolRegistry::with_defaults())
            .build()?,
    );

    session.connect().await?;
    info!("Connecting, will stay up for {}s", duration.as_secs());

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut text = text;
    let mut input_audio = input_audio;

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(SessionEvent::SetupComplete) => {
                    println!("[ready]");
                    if let Some(text) = text.take()
                        && !session.send_text(&text).await
                    {
                        warn!("Text turn was not sent");
                    }
                    if let Some(audio) = input_audio.take() {
                        tokio::spawn(stream_audio(session.clone(), audio, chunk_ms));
                    }
                }
                Some(SessionEvent::Text(delta)) => println!("[text] {delta}"),
                Some(SessionEvent::PlayingChanged(playing)) => {
                    println!("[speaking] {}", if playing { "start" } else { "stop" });
                }
                Some(SessionEvent::LevelChanged(level)) => tracing::trace!("level {}", level),
                Some(SessionEvent::Transcription(transcript)) => {
                    println!("[tutor] {transcript}");
                }
                None => break,
            },
            _ = &mut deadline => {
                info!("Session duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    session.disconnect();

    if let Some(recorder) = recorder {
        recorder.finalize()?;
    }

    Ok(())
}

async fn run_transcribe(config: LiveConfig, input: &Path) -> anyhow::Result<()> {
    let audio = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let transcriber = GeminiTranscriber::new(config.transcription)?;
    let transcript = transcriber.transcribe(&audio, WAV_MIME).await?;
    println!("{transcript}");

    Ok(())
}

/// 16-bit mono PCM read from a WAV file.
struct InputAudio {
    pcm: Vec<u8>,
    sample_rate: u32,
}

fn read_pcm16_wav(path: &Path) -> anyhow::Result<InputAudio> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let spec = reader.spec();

    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        anyhow::bail!("{} must be 16-bit integer PCM", path.display());
    }
    if spec.channels != 1 {
        anyhow::bail!("{} must be mono, found {} channels", path.display(), spec.channels);
    }

    let mut pcm = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.samples::<i16>() {
        pcm.extend_from_slice(&sample?.to_le_bytes());
    }

    Ok(InputAudio {
        pcm,
        sample_rate: spec.sample_rate,
    })
}

/// Send `audio` in `chunk_ms` slices at real-time pace.
async fn stream_audio(session: Arc<StreamingSession>, audio: InputAudio, chunk_ms: u64) {
    let chunk_ms = chunk_ms.max(10);
    let bytes_per_chunk = ((audio.sample_rate as u64 * chunk_ms / 1000) as usize * 2).max(2);
    let total = audio.pcm.len().div_ceil(bytes_per_chunk);
    let mut interval = tokio::time::interval(Duration::from_millis(chunk_ms));

    for (index, chunk) in audio.pcm.chunks(bytes_per_chunk).enumerate() {
        interval.tick().await;
        if !session
            .send_media(MediaChunk::pcm16(chunk, audio.sample_rate))
            .await
        {
            warn!("Session not ready, stopped streaming at chunk {}/{}", index, total);
            return;
        }
    }

    info!("Finished streaming {} chunk(s)", total);
}
