use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::prelude::*;

use merlinbot::config::Config;
use merlinbot::tutor::{Command, Sender, TelegramClient, TutorEngine, spawn_scheduler};
use teloxide::utils::command::BotCommands;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "merlin.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("merlin.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("Starting Merlin...");
    info!("Loaded config from {config_path}");
    info!("Authorized identities: {}", config.authorized_users.len());

    let bot = Bot::new(&config.telegram_bot_token);
    let bot_username = match bot.get_me().await {
        Ok(me) => {
            info!("Bot user ID: {}, username: @{}", me.id, me.username());
            me.username().to_string()
        }
        Err(e) => {
            eprintln!("Failed to get bot info: {e}");
            std::process::exit(1);
        }
    };

    let telegram = TelegramClient::new(bot.clone());
    let engine = match TutorEngine::new(&config, telegram) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("Failed to start engine: {e}");
            std::process::exit(1);
        }
    };

    spawn_scheduler(engine.reminders(), engine.telegram(), engine.reminder_tick());
    info!("Reminder scheduler running every {:?}", engine.reminder_tick());

    let bot_username = Arc::new(bot_username);
    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, bot_username])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(
    msg: Message,
    engine: Arc<TutorEngine>,
    bot_username: Arc<String>,
) -> ResponseResult<()> {
    let Some(ref user) = msg.from else {
        return Ok(());
    };

    let sender = Sender {
        user_id: user.id.0 as i64,
        chat_id: msg.chat.id.0,
        username: user.username.clone(),
        full_name: user.full_name(),
    };

    // Each message runs in its own task so a slow AI call never stalls
    // the dispatch loop.
    if let Some(voice) = msg.voice() {
        let file_id = voice.file.id.0.clone();
        tokio::spawn(async move { engine.handle_voice(sender, file_id).await });
        return Ok(());
    }

    if let Some(photos) = msg.photo() {
        // Telegram sends several sizes; the last is the largest.
        let Some(photo) = photos.last() else {
            return Ok(());
        };
        let file_id = photo.file.id.0.clone();
        let caption = msg.caption().unwrap_or("").to_string();
        tokio::spawn(async move { engine.handle_photo(sender, file_id, caption).await });
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if let Ok(command) = Command::parse(text, bot_username.as_str()) {
            tokio::spawn(async move { engine.handle_command(sender, command).await });
            return Ok(());
        }
        if text.starts_with('/') {
            // Unknown command; leave it alone.
            return Ok(());
        }
        let text = text.to_string();
        tokio::spawn(async move { engine.handle_text(sender, text).await });
    }

    Ok(())
}
