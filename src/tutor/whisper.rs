//! Voice transcription with a local Whisper model.
//!
//! Telegram voice notes arrive as OGG Opus; ffmpeg converts them to the
//! 16 kHz mono PCM stream Whisper expects.

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

const SAMPLE_RATE: &str = "16000";

/// Monotonic suffix so concurrent transcriptions never share a temp file.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Speech-to-text engine. Cheap to clone; the model context is shared.
#[derive(Clone)]
pub struct Transcriber {
    ctx: Arc<WhisperContext>,
}

impl Transcriber {
    /// Load a Whisper model from a ggml .bin file.
    pub fn new(model_path: &Path) -> Result<Self, String> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found: {:?}", model_path));
        }

        info!("Loading Whisper model from {:?}", model_path);
        let ctx = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Whisper model path is not UTF-8")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        Ok(Self { ctx: Arc::new(ctx) })
    }

    /// Transcribe OGG Opus audio to text. Blocking; run on a worker thread.
    pub fn transcribe(&self, ogg_data: &[u8]) -> Result<String, String> {
        debug!("Transcribing {} bytes of audio", ogg_data.len());
        let samples = decode_to_pcm(ogg_data)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some("en"));
        params.set_translate(false);
        params.set_no_timestamps(true);
        params.set_single_segment(false);

        state
            .full(params, &samples)
            .map_err(|e| format!("Whisper transcription failed: {e}"))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            if let Ok(s) = segment.to_str() {
                text.push_str(s);
                text.push(' ');
            }
        }

        let text = text.trim().to_string();
        let preview: String = text.chars().take(100).collect();
        info!("Transcribed: \"{}\"", preview);
        Ok(text)
    }
}

/// Decode OGG Opus to 16 kHz mono f32 PCM via ffmpeg. ffmpeg needs a
/// seekable input for OGG, so the bytes go through a temp file.
fn decode_to_pcm(ogg_data: &[u8]) -> Result<Vec<f32>, String> {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let input_path = std::env::temp_dir().join(format!(
        "merlin_voice_{}_{}.ogg",
        std::process::id(),
        seq
    ));

    std::fs::write(&input_path, ogg_data)
        .map_err(|e| format!("Failed to write temp audio: {e}"))?;

    let output = Command::new("ffmpeg")
        .args([
            "-i",
            input_path.to_str().ok_or("Temp path is not UTF-8")?,
            "-ar",
            SAMPLE_RATE,
            "-ac",
            "1",
            "-f",
            "s16le",
            "-acodec",
            "pcm_s16le",
            "-y",
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let _ = std::fs::remove_file(&input_path);

    let output = output.map_err(|e| format!("Failed to run ffmpeg: {e}"))?;
    if !output.status.success() {
        return Err(format!(
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    let samples: Vec<f32> = output
        .stdout
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();

    debug!("Decoded {} PCM samples", samples.len());
    Ok(samples)
}
