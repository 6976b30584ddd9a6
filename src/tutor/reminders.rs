//! Pending reminder store and the background scheduler that fires them.
//!
//! The store is shared between per-message dispatch tasks (which add) and
//! the scheduler task (which scans and removes), so all access goes through
//! a mutex. The lock is never held across a network send: `due` hands out
//! clones, and `remove` re-acquires only after a successful delivery.

use std::sync::Mutex;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// A pending reminder. `chat_id` is the delivery context: it is captured at
/// creation and is all that is needed to reach the recipient later.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    /// Store-assigned identity. Distinguishes duplicates with equal payloads.
    pub id: u64,
    pub chat_id: i64,
    pub user_id: i64,
    pub fire_at: DateTime<Utc>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

struct Inner {
    next_id: u64,
    /// Insertion order; the only ordering `due` guarantees.
    pending: Vec<Reminder>,
}

/// In-memory pending set. Reminders are ephemeral: they do not survive a
/// restart. A reminder stays visible to every scan until `remove` is
/// called with its id.
pub struct ReminderStore {
    inner: Mutex<Inner>,
}

impl ReminderStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                pending: Vec::new(),
            }),
        }
    }

    /// Append a reminder and return its id. Never rejects.
    pub fn add(&self, chat_id: i64, user_id: i64, fire_at: DateTime<Utc>, body: &str) -> u64 {
        let mut inner = self.inner.lock().expect("reminder store lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.pending.push(Reminder {
            id,
            chat_id,
            user_id,
            fire_at,
            body: body.to_string(),
            created_at: Utc::now(),
        });
        info!(
            "Reminder #{} added for user {} at {} with message: '{}'",
            id, user_id, fire_at, body
        );
        id
    }

    /// All reminders with `fire_at <= at`, in insertion order. Does not
    /// remove anything; removal happens only after a successful delivery.
    pub fn due(&self, at: DateTime<Utc>) -> Vec<Reminder> {
        let inner = self.inner.lock().expect("reminder store lock poisoned");
        inner
            .pending
            .iter()
            .filter(|r| r.fire_at <= at)
            .cloned()
            .collect()
    }

    /// Remove by id. Idempotent: removing an id that is gone is a no-op.
    pub fn remove(&self, id: u64) {
        let mut inner = self.inner.lock().expect("reminder store lock poisoned");
        inner.pending.retain(|r| r.id != id);
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("reminder store lock poisoned");
        inner.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ReminderStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery channel for fired reminders. The Telegram client implements
/// this; tests use recording sinks.
pub trait DeliverySink {
    fn deliver(&self, reminder: &Reminder) -> impl Future<Output = Result<(), String>> + Send;
}

/// One scheduler pass: scan, deliver, remove on success. A failed delivery
/// is logged and the reminder stays queued for the next tick. Returns the
/// number of reminders delivered.
pub async fn run_tick<S: DeliverySink + Sync>(store: &ReminderStore, sink: &S) -> usize {
    let due = store.due(Utc::now());
    if due.is_empty() {
        return 0;
    }

    debug!("Firing {} due reminder(s)", due.len());
    let mut delivered = 0;
    for reminder in due {
        match sink.deliver(&reminder).await {
            Ok(()) => {
                store.remove(reminder.id);
                delivered += 1;
                info!(
                    "Reminder #{} delivered to chat {} for message: '{}'",
                    reminder.id, reminder.chat_id, reminder.body
                );
            }
            Err(e) => {
                // Left in the store; retried on the next tick.
                warn!("Failed to deliver reminder #{}: {}", reminder.id, e);
            }
        }
    }
    delivered
}

/// Spawn the periodic scheduler. Runs until the task is aborted; a bad tick
/// never stops the loop.
pub fn spawn_scheduler<S>(
    store: std::sync::Arc<ReminderStore>,
    sink: std::sync::Arc<S>,
    tick: StdDuration,
) -> tokio::task::JoinHandle<()>
where
    S: DeliverySink + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        loop {
            interval.tick().await;
            run_tick(&store, &*sink).await;
        }
    })
}
