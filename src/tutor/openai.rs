//! OpenAI API client: chat completions and image generation.

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const IMAGE_GENERATIONS_URL: &str = "https://api.openai.com/v1/images/generations";

const CHAT_MODEL: &str = "gpt-4";
const IMAGE_SIZE: &str = "512x512";

/// The tutor persona sent as the system message on every completion.
pub const DEFAULT_PERSONA: &str =
    "Your name is Merlin and you are a very helpful tutor and provide succinct answers to us.";

pub struct OpenAiClient {
    api_key: String,
    persona: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize, Debug)]
struct ImageResponse {
    data: Option<Vec<ImageData>>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    b64_json: String,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

/// Hosted AI surface: chat completions and image generation. OpenAiClient
/// implements it; tests use recording fakes.
pub trait AiClient {
    /// Run a chat completion against the tutor persona.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, String>> + Send;

    /// Generate one image and return the decoded PNG bytes.
    fn generate_image(&self, prompt: &str) -> impl Future<Output = Result<Vec<u8>, String>> + Send;
}

impl OpenAiClient {
    pub fn new(api_key: String, persona: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key,
            persona: persona.unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            client,
        }
    }
}

impl AiClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        let preview: String = prompt.chars().take(80).collect();
        debug!("Sending prompt to OpenAI: \"{}\"", preview);

        let request = ChatRequest {
            model: CHAT_MODEL,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: &self.persona,
                },
                ChatRequestMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Completion request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read completion response: {e}"))?;

        if !status.is_success() {
            return Err(format!("Completion API error {status}: {body}"));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse completion response: {e}"))?;

        if let Some(error) = parsed.error {
            return Err(format!("Completion error: {}", error.message));
        }

        let answer = parsed
            .choices
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .ok_or("No choices in completion response")?
            .message
            .content;

        debug!("Received AI response ({} chars)", answer.len());
        Ok(answer)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, String> {
        info!("Generating image: {}", prompt);

        let request = ImageRequest {
            prompt,
            n: 1,
            size: IMAGE_SIZE,
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(IMAGE_GENERATIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Image request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read image response: {e}"))?;

        if !status.is_success() {
            return Err(format!("Image API error {status}: {body}"));
        }

        let parsed: ImageResponse = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse image response: {e}"))?;

        if let Some(error) = parsed.error {
            return Err(format!("Image generation error: {}", error.message));
        }

        let first = parsed
            .data
            .and_then(|mut d| if d.is_empty() { None } else { Some(d.remove(0)) })
            .ok_or("No image in response")?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&first.b64_json)
            .map_err(|e| format!("Failed to decode image payload: {e}"))?;

        info!("Image generated: {} bytes", bytes.len());
        Ok(bytes)
    }
}
