//! Text-to-speech over an HTTP synthesis endpoint.
//!
//! The endpoint is expected to accept `POST {base}/v1/tts` with a JSON body
//! and return MP3 audio, which is sent back to the user as a document.

use tracing::{debug, info};

pub struct TtsClient {
    endpoint: String,
    client: reqwest::Client,
}

impl TtsClient {
    /// `endpoint` is the base URL of the synthesis server,
    /// e.g. "http://localhost:8880".
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Synthesize speech for `text`, returning MP3 bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, String> {
        let preview: String = text.chars().take(50).collect();
        info!("TTS: \"{}\"", preview);

        let response = self
            .client
            .post(format!("{}/v1/tts", self.endpoint))
            .json(&serde_json::json!({
                "text": text,
                "format": "mp3",
            }))
            .send()
            .await
            .map_err(|e| format!("TTS request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("TTS error {}: {}", status, body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read TTS response: {e}"))?;

        debug!("Synthesized {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_client_creation() {
        let client = TtsClient::new("http://localhost:8880".to_string());
        assert_eq!(client.endpoint(), "http://localhost:8880");
    }
}
