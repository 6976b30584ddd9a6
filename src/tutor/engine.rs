//! Message dispatcher: routes inbound voice, photo and text messages to the
//! AI collaborators and delivers the results.
//!
//! Every handler is a terminal boundary: any failure inside it is logged,
//! the user gets a generic apology, and nothing propagates to the dispatch
//! loop or the reminder scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::tutor::auth::AuthorizedUsers;
use crate::tutor::database::InteractionLog;
use crate::tutor::intent::{self, Intent, IntentError, TimeUnit, classify};
use crate::tutor::ocr::Ocr;
use crate::tutor::openai::{AiClient, OpenAiClient};
use crate::tutor::reminders::ReminderStore;
use crate::tutor::telegram::{Messenger, TelegramClient};
use crate::tutor::tts::TtsClient;
use crate::tutor::whisper::Transcriber;

const UNAUTHORIZED_REPLY: &str = "You are not authorized.";
const VOICE_APOLOGY: &str = "Sorry, I couldn't process your voice message.";
const PHOTO_APOLOGY: &str = "Sorry, I couldn't process your image.";
const TEXT_APOLOGY: &str = "Sorry, I'm having trouble generating a response right now.";
const NOTHING_READABLE_REPLY: &str =
    "Sorry, I couldn't read any text in the image or caption.";
const EMPTY_PROMPT_REPLY: &str =
    "Please provide a prompt for image generation after 'generate image:'.";
const BAD_TIME_UNIT_REPLY: &str = "Sorry, I didn't understand the time unit.";
const REMINDER_TOO_FAR_REPLY: &str = "Sorry, that reminder is too far in the future.";
const EXTRACT_TEXT_REPLY: &str =
    "Please send the image you want to extract text from, and include 'extract text:' in the caption.";

const GREETING: &str = "Hello! I'm your AI tutor 'Merlin' v1.0. Send me a message, and I'll \
help you out! Type /help for more info.";

const HELP_TEXT: &str = "Hello! I'm your AI tutor 'Merlin' v1.0. Here is what I can do:\n\n\
/start - Start interacting with the bot.\n\n\
Reminders:\n\
Say 'remind me in N [seconds/minutes/hours/days] ...' to set a reminder.\n\
Example: 'remind me in 5 minutes to do my math homework.'\n\n\
Voice messages:\n\
Send a voice message and I'll transcribe it and reply with text and audio.\n\n\
Image text extraction:\n\
Send a photo and I'll read the text in it. Include 'extract text:' in the \
caption to get the raw extracted text back.\n\n\
Image generation:\n\
Type 'generate image: [your prompt]'.\n\
Example: 'generate image: a sunny beach with palm trees.'\n\n\
Anything else, just ask and I'll do my best to help!";

/// Bot commands understood alongside free-form text.
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Help,
}

/// Identity and reply handle for the sender of one inbound message.
#[derive(Debug, Clone)]
pub struct Sender {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub full_name: String,
}

impl Sender {
    /// Display name for the interaction log: username if set, else full name.
    fn log_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.full_name)
    }
}

/// Where a photo message goes after OCR.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PhotoRoute {
    /// Caption asked for raw extraction; deliver OCR output, skip the AI.
    Verbatim,
    /// Nothing readable in image or caption; notify and stop.
    NothingReadable,
    /// Forward the combined caption + OCR text to the AI.
    Ask(String),
}

/// Pure routing decision for photo messages.
pub(crate) fn route_photo(caption: &str, extracted: &str) -> PhotoRoute {
    if intent::strip_prefix_ci(caption, "extract text:").is_some() {
        return PhotoRoute::Verbatim;
    }

    let combined = if extracted.is_empty() {
        caption.to_string()
    } else {
        format!("{caption}\n{extracted}")
    };

    if combined.trim().is_empty() {
        PhotoRoute::NothingReadable
    } else {
        PhotoRoute::Ask(combined)
    }
}

/// Corrective prompt for a classification failure.
pub(crate) fn corrective_reply(err: &IntentError) -> &'static str {
    match err {
        IntentError::UnrecognizedTimeUnit(_) => BAD_TIME_UNIT_REPLY,
        IntentError::EmptyPrompt => EMPTY_PROMPT_REPLY,
    }
}

/// Resolve a relative reminder offset against `now`. The amount has only
/// been checked to parse as an i64; the offset may still overflow the
/// duration type or the calendar, and either way the answer is None and no
/// reminder is created.
pub(crate) fn resolve_fire_at(
    now: DateTime<Utc>,
    amount: i64,
    unit: TimeUnit,
) -> Option<DateTime<Utc>> {
    now.checked_add_signed(unit.duration(amount)?)
}

/// The dispatcher and its collaborators. Generic over the AI and Telegram
/// surfaces so tests can substitute recording fakes.
pub struct TutorEngine<A = OpenAiClient, M = TelegramClient> {
    auth: AuthorizedUsers,
    telegram: Arc<M>,
    openai: A,
    transcriber: Option<Transcriber>,
    tts: Option<TtsClient>,
    ocr: Ocr,
    reminders: Arc<ReminderStore>,
    interactions: Arc<InteractionLog>,
    reminder_tick: Duration,
}

impl TutorEngine {
    pub fn new(config: &Config, telegram: TelegramClient) -> Result<Self, String> {
        let transcriber = match &config.whisper_model_path {
            Some(path) => Some(Transcriber::new(path)?),
            None => {
                warn!("Voice transcription disabled (no whisper_model_path)");
                None
            }
        };

        let tts = match &config.tts_endpoint {
            Some(endpoint) => Some(TtsClient::new(endpoint.clone())),
            None => {
                warn!("Speech synthesis disabled (no tts_endpoint)");
                None
            }
        };

        let interactions = match &config.database_path {
            Some(path) => InteractionLog::open(path)?,
            None => {
                warn!("No database_path configured; interaction log is in-memory only");
                InteractionLog::in_memory()?
            }
        };

        Ok(Self {
            auth: config.authorized_users.clone(),
            telegram: Arc::new(telegram),
            openai: OpenAiClient::new(config.openai_api_key.clone(), config.persona.clone()),
            transcriber,
            tts,
            ocr: Ocr::new(config.tesseract_cmd.clone()),
            reminders: Arc::new(ReminderStore::new()),
            interactions: Arc::new(interactions),
            reminder_tick: Duration::from_secs(config.reminder_tick_secs),
        })
    }
}

impl<A: AiClient, M: Messenger> TutorEngine<A, M> {
    pub fn reminders(&self) -> Arc<ReminderStore> {
        self.reminders.clone()
    }

    pub fn telegram(&self) -> Arc<M> {
        self.telegram.clone()
    }

    pub fn reminder_tick(&self) -> Duration {
        self.reminder_tick
    }

    /// Handle a /start or /help command.
    pub async fn handle_command(&self, sender: Sender, command: Command) {
        if !self.authorize(&sender).await {
            return;
        }
        let reply = match command {
            Command::Start => GREETING,
            Command::Help => HELP_TEXT,
        };
        if let Err(e) = self.telegram.send_message(sender.chat_id, reply).await {
            error!("Failed to answer {:?} for user {}: {}", command, sender.user_id, e);
        }
    }

    /// Handle a voice message.
    pub async fn handle_voice(&self, sender: Sender, file_id: String) {
        if !self.authorize(&sender).await {
            return;
        }
        info!("Handling voice message from {}", sender.user_id);
        if let Err(e) = self.process_voice(&sender, &file_id).await {
            error!("Voice handler failed for user {}: {}", sender.user_id, e);
            self.apologize(sender.chat_id, VOICE_APOLOGY).await;
        }
    }

    /// Handle a photo message with an optional caption.
    pub async fn handle_photo(&self, sender: Sender, file_id: String, caption: String) {
        if !self.authorize(&sender).await {
            return;
        }
        info!("Handling photo message from {}", sender.user_id);
        if let Err(e) = self.process_photo(&sender, &file_id, &caption).await {
            error!("Photo handler failed for user {}: {}", sender.user_id, e);
            self.apologize(sender.chat_id, PHOTO_APOLOGY).await;
        }
    }

    /// Handle a free-form text message.
    pub async fn handle_text(&self, sender: Sender, text: String) {
        if !self.authorize(&sender).await {
            return;
        }
        if let Err(e) = self.process_text(&sender, &text).await {
            error!("Text handler failed for user {}: {}", sender.user_id, e);
            self.apologize(sender.chat_id, TEXT_APOLOGY).await;
        }
    }

    async fn process_voice(&self, sender: &Sender, file_id: &str) -> Result<(), String> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or("Voice transcription is not configured")?;

        let audio = self.telegram.download_file(file_id).await?;
        let transcript = {
            let transcriber = transcriber.clone();
            tokio::task::spawn_blocking(move || transcriber.transcribe(&audio))
                .await
                .map_err(|e| format!("Transcription task failed: {e}"))??
        };

        // Voice transcripts go straight to the AI; intent parsing is
        // applied to typed text only.
        let answer = self.openai.complete(&transcript).await?;
        self.telegram.send_message(sender.chat_id, &answer).await?;

        // The audio reply is best-effort: synthesis trouble degrades to
        // text-only instead of failing the whole message.
        if let Some(tts) = &self.tts {
            match tts.synthesize(&answer).await {
                Ok(audio) => {
                    if let Err(e) = self
                        .telegram
                        .send_document(sender.chat_id, audio, "merlin_response.mp3")
                        .await
                    {
                        warn!("Failed to send voice reply audio: {}", e);
                    }
                }
                Err(e) => warn!("Speech synthesis failed: {}", e),
            }
        }

        self.record(sender, "voice", &transcript, &answer);
        Ok(())
    }

    async fn process_photo(
        &self,
        sender: &Sender,
        file_id: &str,
        caption: &str,
    ) -> Result<(), String> {
        let image = self.telegram.download_file(file_id).await?;
        let extracted = {
            let ocr = self.ocr.clone();
            tokio::task::spawn_blocking(move || ocr.extract_text(&image))
                .await
                .map_err(|e| format!("OCR task failed: {e}"))??
        };

        match route_photo(caption, &extracted) {
            PhotoRoute::Verbatim => {
                let reply = format!("Extracted Text:\n{extracted}");
                self.telegram.send_message(sender.chat_id, &reply).await?;
                self.record(sender, "extract text", &extracted, &extracted);
            }
            PhotoRoute::NothingReadable => {
                self.telegram
                    .send_message(sender.chat_id, NOTHING_READABLE_REPLY)
                    .await?;
                self.record(sender, "photo", caption, NOTHING_READABLE_REPLY);
            }
            PhotoRoute::Ask(combined) => {
                let answer = self.openai.complete(&combined).await?;
                self.telegram.send_message(sender.chat_id, &answer).await?;
                self.record(sender, "photo", &combined, &answer);
            }
        }
        Ok(())
    }

    async fn process_text(&self, sender: &Sender, text: &str) -> Result<(), String> {
        let intent = match classify(text) {
            Ok(intent) => intent,
            Err(err) => {
                // Terminal for this message: corrective prompt, no
                // collaborator call, no reminder created.
                warn!("Classification failed for user {}: {}", sender.user_id, err);
                self.telegram
                    .send_message(sender.chat_id, corrective_reply(&err))
                    .await?;
                return Ok(());
            }
        };

        match intent {
            Intent::Reminder { amount, unit, body } => {
                let Some(fire_at) = resolve_fire_at(Utc::now(), amount, unit) else {
                    warn!(
                        "Reminder offset out of range for user {}: {} {:?}",
                        sender.user_id, amount, unit
                    );
                    self.telegram
                        .send_message(sender.chat_id, REMINDER_TOO_FAR_REPLY)
                        .await?;
                    return Ok(());
                };
                self.reminders
                    .add(sender.chat_id, sender.user_id, fire_at, &body);

                let confirmation = format!(
                    "You have a reminder set for [{}]: '{}'.",
                    fire_at.format("%Y/%m/%d %H:%M:%S"),
                    body
                );
                self.telegram.send_message(sender.chat_id, &confirmation).await?;
                self.record(sender, "reminder", text, &confirmation);
            }
            Intent::GenerateImage { prompt } => {
                let image = self.openai.generate_image(&prompt).await?;
                self.telegram.send_photo(sender.chat_id, image).await?;
                self.record(sender, "generate image", &prompt, "Image generated");
            }
            Intent::ExtractText => {
                self.telegram
                    .send_message(sender.chat_id, EXTRACT_TEXT_REPLY)
                    .await?;
                self.record(sender, "text", text, EXTRACT_TEXT_REPLY);
            }
            Intent::Query { text: query } => {
                let answer = self.openai.complete(&query).await?;
                self.telegram.send_message(sender.chat_id, &answer).await?;
                self.record(sender, "text", &query, &answer);
            }
        }
        Ok(())
    }

    /// Gate check. On denial sends the generic rejection; no collaborator
    /// is invoked and nothing is logged to the interaction store.
    async fn authorize(&self, sender: &Sender) -> bool {
        if self.auth.is_authorized(
            sender.user_id,
            sender.username.as_deref(),
            &sender.full_name,
        ) {
            return true;
        }
        if let Err(e) = self
            .telegram
            .send_message(sender.chat_id, UNAUTHORIZED_REPLY)
            .await
        {
            warn!("Failed to send rejection to chat {}: {}", sender.chat_id, e);
        }
        false
    }

    /// Best-effort apology after an unhandled failure.
    async fn apologize(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.telegram.send_message(chat_id, text).await {
            error!("Failed to send apology to chat {}: {}", chat_id, e);
        }
    }

    /// Interaction-log write; failures are logged and never surfaced.
    fn record(&self, sender: &Sender, message_type: &str, input: &str, output: &str) {
        if let Err(e) = self.interactions.record(
            sender.user_id,
            sender.log_name(),
            message_type,
            input,
            output,
        ) {
            error!("Error logging interaction: {}", e);
        }
    }
}
