//! SQLite interaction log.
//!
//! One row per successfully handled message. Write failures are reported
//! to the caller, which logs them and moves on; the log never blocks a
//! reply that has already been sent.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, params};
use tracing::info;

/// Persisted interaction record, one per delivered message.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub user_id: i64,
    pub user_name: String,
    pub message_type: String,
    pub user_message: String,
    pub bot_response: String,
    pub created_at: String,
}

/// Interaction log backed by SQLite.
pub struct InteractionLog {
    conn: Mutex<Connection>,
}

impl InteractionLog {
    /// In-memory log, used when no database path is configured and in tests.
    pub fn in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory()
            .map_err(|e| format!("Failed to open in-memory database: {e}"))?;
        Self::with_connection(conn)
    }

    /// Open (or create) the log at the given path.
    pub fn open(path: &Path) -> Result<Self, String> {
        let conn = Connection::open(path)
            .map_err(|e| format!("Failed to open database {:?}: {e}", path))?;
        let log = Self::with_connection(conn)?;
        info!("Opened interaction log at {:?}", path);
        Ok(log)
    }

    fn with_connection(conn: Connection) -> Result<Self, String> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                user_name TEXT NOT NULL,
                message_type TEXT NOT NULL,
                user_message TEXT NOT NULL,
                bot_response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_interactions_user_id ON interactions(user_id);
            CREATE INDEX IF NOT EXISTS idx_interactions_created_at ON interactions(created_at);
        "#,
        )
        .map_err(|e| format!("Failed to initialize interaction schema: {e}"))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record one interaction. Non-fatal by contract: callers log the error
    /// and continue.
    pub fn record(
        &self,
        user_id: i64,
        user_name: &str,
        message_type: &str,
        user_message: &str,
        bot_response: &str,
    ) -> Result<(), String> {
        let created_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let conn = self.conn.lock().expect("interaction log lock poisoned");
        conn.execute(
            "INSERT INTO interactions (user_id, user_name, message_type, user_message, bot_response, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id, user_name, message_type, user_message, bot_response, created_at],
        )
        .map_err(|e| format!("Failed to record interaction: {e}"))?;
        Ok(())
    }

    /// Total recorded interactions.
    pub fn count(&self) -> usize {
        let conn = self.conn.lock().expect("interaction log lock poisoned");
        conn.query_row("SELECT COUNT(*) FROM interactions", [], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap_or(0) as usize
    }

    /// Most recent interaction, if any.
    pub fn last(&self) -> Option<Interaction> {
        let conn = self.conn.lock().expect("interaction log lock poisoned");
        conn.query_row(
            "SELECT user_id, user_name, message_type, user_message, bot_response, created_at
             FROM interactions ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                Ok(Interaction {
                    user_id: row.get(0)?,
                    user_name: row.get(1)?,
                    message_type: row.get(2)?,
                    user_message: row.get(3)?,
                    bot_response: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let log = InteractionLog::in_memory().unwrap();
        assert_eq!(log.count(), 0);

        log.record(100, "alice", "text", "hi", "hello!").unwrap();
        log.record(101, "bob", "voice", "what time is it", "noon").unwrap();
        assert_eq!(log.count(), 2);
    }

    #[test]
    fn test_last_returns_fields() {
        let log = InteractionLog::in_memory().unwrap();
        log.record(100, "alice", "generate image", "a cat", "Image generated")
            .unwrap();

        let last = log.last().unwrap();
        assert_eq!(last.user_id, 100);
        assert_eq!(last.user_name, "alice");
        assert_eq!(last.message_type, "generate image");
        assert_eq!(last.user_message, "a cat");
        assert_eq!(last.bot_response, "Image generated");
        assert!(!last.created_at.is_empty());
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interactions.db");

        let log = InteractionLog::open(&path).unwrap();
        log.record(1, "x", "text", "a", "b").unwrap();
        drop(log);

        // Reopen and verify persistence.
        let log = InteractionLog::open(&path).unwrap();
        assert_eq!(log.count(), 1);
    }
}
