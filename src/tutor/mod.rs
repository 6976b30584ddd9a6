//! Tutor module - relays Telegram messages to the AI services and runs
//! the reminder scheduler.

pub mod auth;
pub mod database;
pub mod engine;
pub mod intent;
pub mod ocr;
pub mod openai;
pub mod reminders;
pub mod telegram;
pub mod tts;
pub mod whisper;

pub use auth::AuthorizedUsers;
pub use engine::{Command, Sender, TutorEngine};
pub use intent::{Intent, IntentError, TimeUnit, classify};
pub use openai::{AiClient, OpenAiClient};
pub use reminders::{DeliverySink, Reminder, ReminderStore, spawn_scheduler};
pub use telegram::{Messenger, TelegramClient};
pub use whisper::Transcriber;
