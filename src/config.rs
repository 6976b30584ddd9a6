use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::tutor::AuthorizedUsers;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Comma-separated identities (usernames, full names, or numeric ids)
    /// allowed to use the bot.
    authorized_users: String,
    openai_api_key: String,
    /// Custom tutor persona sent as the system prompt. If not set, uses the
    /// default Merlin description.
    persona: Option<String>,
    /// SQLite database for the interaction log. If not set, the log lives
    /// in memory and is lost on exit.
    database_path: Option<String>,
    /// Directory for state files (logs). Defaults to current directory.
    data_dir: Option<String>,
    /// Path to Whisper model file (.bin) for voice transcription.
    whisper_model_path: Option<String>,
    /// TTS endpoint for spoken replies (e.g., "http://localhost:8880").
    tts_endpoint: Option<String>,
    /// OCR command to run on incoming photos. Defaults to "tesseract".
    tesseract_cmd: Option<String>,
    /// Seconds between reminder scheduler scans.
    #[serde(default = "default_reminder_tick_secs")]
    reminder_tick_secs: u64,
}

fn default_reminder_tick_secs() -> u64 {
    10
}

pub struct Config {
    pub telegram_bot_token: String,
    pub authorized_users: AuthorizedUsers,
    pub openai_api_key: String,
    /// Custom tutor persona override.
    pub persona: Option<String>,
    /// SQLite database for the interaction log.
    pub database_path: Option<PathBuf>,
    /// Directory for state files (logs).
    pub data_dir: PathBuf,
    /// Path to Whisper model file (.bin) for voice transcription.
    pub whisper_model_path: Option<PathBuf>,
    /// TTS endpoint for spoken replies.
    pub tts_endpoint: Option<String>,
    /// OCR command to run on incoming photos.
    pub tesseract_cmd: Option<String>,
    /// Seconds between reminder scheduler scans.
    pub reminder_tick_secs: u64,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.openai_api_key.is_empty() {
            return Err(ConfigError::Validation("openai_api_key is required".into()));
        }
        let authorized_users = AuthorizedUsers::from_list(&file.authorized_users);
        if authorized_users.is_empty() {
            return Err(ConfigError::Validation(
                "authorized_users must contain at least one identity".into(),
            ));
        }
        if file.reminder_tick_secs == 0 {
            return Err(ConfigError::Validation("reminder_tick_secs must be at least 1".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            authorized_users,
            openai_api_key: file.openai_api_key,
            persona: file.persona,
            database_path: file.database_path.map(PathBuf::from),
            data_dir,
            whisper_model_path: file.whisper_model_path.map(PathBuf::from),
            tts_endpoint: file.tts_endpoint,
            tesseract_cmd: file.tesseract_cmd,
            reminder_tick_secs: file.reminder_tick_secs,
        })
    }
}
