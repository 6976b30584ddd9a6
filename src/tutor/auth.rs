//! Authorization gate: a fixed identity set loaded once at startup.

use std::collections::HashSet;

use tracing::warn;

/// The set of identities allowed to use the bot. Each entry may be a
/// username, a display name, or a numeric user id; all are stored
/// lower-cased and matched exactly.
#[derive(Debug, Clone)]
pub struct AuthorizedUsers {
    identities: HashSet<String>,
}

impl AuthorizedUsers {
    /// Build from a comma-separated list. Entries are trimmed and
    /// lower-cased; empty entries are dropped.
    pub fn from_list(raw: &str) -> Self {
        let identities = raw
            .split(',')
            .map(|entry| entry.trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { identities }
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Pure predicate: true iff any of the sender's identity forms is in
    /// the set. Denials leave a warn-level audit line with all three forms.
    pub fn is_authorized(&self, user_id: i64, username: Option<&str>, full_name: &str) -> bool {
        let username = username.unwrap_or("").to_lowercase();
        let full_name = full_name.to_lowercase();
        let id = user_id.to_string();

        if self.identities.contains(&username)
            || self.identities.contains(&full_name)
            || self.identities.contains(&id)
        {
            return true;
        }

        warn!(
            "Unauthorized access attempt by user: [{}] - [{}] - [@{}]",
            id, full_name, username
        );
        false
    }
}
