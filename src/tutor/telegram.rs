//! Telegram delivery channel using teloxide.

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use tracing::{info, warn};

use crate::tutor::reminders::{DeliverySink, Reminder};

/// Outbound Telegram surface the dispatcher talks through. TelegramClient
/// implements it; tests use recording fakes.
pub trait Messenger {
    /// Send a plain text message. Returns the sent message id.
    fn send_message(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<i64, String>> + Send;

    /// Send bytes as a named document.
    fn send_document(
        &self,
        chat_id: i64,
        data: Vec<u8>,
        file_name: &str,
    ) -> impl Future<Output = Result<i64, String>> + Send;

    /// Send image bytes as a photo.
    fn send_photo(
        &self,
        chat_id: i64,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<i64, String>> + Send;

    /// Download a file (voice note, photo) by its file id.
    fn download_file(&self, file_id: &str) -> impl Future<Output = Result<Vec<u8>, String>> + Send;
}

/// Thin wrapper over the Telegram Bot API: sends and file downloads.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, String> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send message: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn send_document(
        &self,
        chat_id: i64,
        data: Vec<u8>,
        file_name: &str,
    ) -> Result<i64, String> {
        info!("Sending document {} to chat {} ({} bytes)", file_name, chat_id, data.len());
        let input_file = InputFile::memory(data).file_name(file_name.to_string());

        self.bot
            .send_document(ChatId(chat_id), input_file)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send document: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn send_photo(&self, chat_id: i64, data: Vec<u8>) -> Result<i64, String> {
        info!("Sending photo to chat {} ({} bytes)", chat_id, data.len());
        let input_file = InputFile::memory(data).file_name("image.png");

        self.bot
            .send_photo(ChatId(chat_id), input_file)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                let msg = format!("Failed to send photo: {e}");
                warn!("{}", msg);
                msg
            })
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| format!("Failed to get file info: {e}"))?;

        let mut data = Vec::new();
        self.bot
            .download_file(&file.path, &mut data)
            .await
            .map_err(|e| format!("Failed to download file: {e}"))?;

        info!("Downloaded file ({} bytes)", data.len());
        Ok(data)
    }
}

impl DeliverySink for TelegramClient {
    async fn deliver(&self, reminder: &Reminder) -> Result<(), String> {
        let text = format!("Reminder!!\n{}", reminder.body);
        self.send_message(reminder.chat_id, &text).await.map(|_| ())
    }
}
