//! Merlin: a Telegram AI tutor bot.

pub mod config;
pub mod tutor;
