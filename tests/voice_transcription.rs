//! Integration tests for voice transcription.
//!
//! These tests require:
//! 1. A Whisper model file (ggml-base.en.bin recommended for tests)
//! 2. ffmpeg installed for audio conversion
//!
//! Run with: cargo test --features integ_test --test voice_transcription

#[cfg(feature = "integ_test")]
mod tests {
    use merlinbot::tutor::whisper::Transcriber;
    use std::path::PathBuf;

    /// Path to test Whisper model (set via env var or default location)
    fn get_test_model_path() -> PathBuf {
        std::env::var("WHISPER_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/test/ggml-base.en.bin"))
    }

    /// Path to test audio files
    fn get_test_audio_dir() -> PathBuf {
        PathBuf::from("data/test/audio")
    }

    /// Test that the Whisper model loads successfully.
    #[test]
    fn test_transcriber_loads() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found at {:?}", model_path);
            eprintln!("Download from: https://huggingface.co/ggerganov/whisper.cpp/tree/main");
            return;
        }

        let transcriber = Transcriber::new(&model_path);
        assert!(transcriber.is_ok(), "Failed to load Whisper: {:?}", transcriber.err());
    }

    /// Test that a missing model path is a clean error, not a panic.
    #[test]
    fn test_missing_model_is_an_error() {
        let result = Transcriber::new(&PathBuf::from("/nonexistent/model.bin"));
        assert!(result.is_err());
    }

    /// Test transcription of a simple audio file.
    ///
    /// This test requires a test audio file at data/test/audio/hello.ogg
    /// containing someone saying "hello" or similar.
    #[test]
    fn test_transcribe_hello() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping test: model not found");
            return;
        }

        let audio_path = get_test_audio_dir().join("hello.ogg");
        if !audio_path.exists() {
            eprintln!("Skipping test: test audio not found at {:?}", audio_path);
            eprintln!("Create a short voice recording saying 'hello' and save as hello.ogg");
            return;
        }

        let transcriber = Transcriber::new(&model_path).expect("Failed to load model");
        let audio_data = std::fs::read(&audio_path).expect("Failed to read audio file");

        let result = transcriber.transcribe(&audio_data);
        assert!(result.is_ok(), "Transcription failed: {:?}", result.err());

        let text = result.unwrap().to_lowercase();
        println!("Transcribed: {}", text);

        // Should contain "hello" or similar
        assert!(
            text.contains("hello") || text.contains("hi") || text.contains("hey"),
            "Expected greeting in transcription, got: {}",
            text
        );
    }

    /// E2E check: load the model, read an audio file as if it had just been
    /// downloaded from Telegram, and transcribe it.
    #[test]
    fn test_e2e_voice_flow() {
        let model_path = get_test_model_path();
        if !model_path.exists() {
            eprintln!("Skipping E2E test: model not found at {:?}", model_path);
            return;
        }

        let audio_path = get_test_audio_dir().join("test_phrase.ogg");
        if !audio_path.exists() {
            eprintln!("Skipping E2E test: audio not found at {:?}", audio_path);
            eprintln!("Record a voice message with a known phrase and save as test_phrase.ogg");
            return;
        }

        let transcriber = Transcriber::new(&model_path).expect("Failed to load Whisper model");
        let audio_data = std::fs::read(&audio_path).expect("Failed to read test audio");

        let transcription = transcriber.transcribe(&audio_data).expect("Transcription failed");
        println!("E2E Transcription: {}", transcription);
        assert!(!transcription.is_empty(), "Transcription should not be empty");
    }
}
