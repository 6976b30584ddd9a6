//! Text extraction from images via the tesseract binary.

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// OCR adapter. Shells out to tesseract; the command is configurable for
/// systems where the binary is not on PATH.
#[derive(Clone)]
pub struct Ocr {
    command: String,
}

impl Ocr {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or_else(|| "tesseract".to_string()),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Extract text from an image. Blocking; run on a worker thread.
    /// Returns an empty string when the image contains no readable text.
    pub fn extract_text(&self, image_data: &[u8]) -> Result<String, String> {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let input_path = std::env::temp_dir().join(format!(
            "merlin_ocr_{}_{}.png",
            std::process::id(),
            seq
        ));

        std::fs::write(&input_path, image_data)
            .map_err(|e| format!("Failed to write temp image: {e}"))?;

        // "stdout" as the output name makes tesseract print to stdout.
        let output = Command::new(&self.command)
            .args([
                input_path.to_str().ok_or("Temp path is not UTF-8")?,
                "stdout",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let _ = std::fs::remove_file(&input_path);

        let output = output.map_err(|e| format!("Failed to run {}: {e}", self.command))?;
        if !output.status.success() {
            return Err(format!(
                "{} failed: {}",
                self.command,
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Extracted {} chars of text from image", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        assert_eq!(Ocr::new(None).command(), "tesseract");
    }

    #[test]
    fn test_custom_command() {
        let ocr = Ocr::new(Some("/opt/tesseract/bin/tesseract".to_string()));
        assert_eq!(ocr.command(), "/opt/tesseract/bin/tesseract");
    }
}
