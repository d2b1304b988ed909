//! Per-conversation response state

use dashmap::DashMap;
use serde::Serialize;

/// Response state tracked for one conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Conversation {
    /// An automatic reply has already been sent
    pub responded: bool,

    /// Epoch milliseconds of the owner's most recent activity
    pub last_owner_activity_at: Option<i64>,
}

impl Conversation {
    /// State recorded right after an automatic reply
    #[must_use]
    pub const fn replied() -> Self {
        Self {
            responded: true,
            last_owner_activity_at: None,
        }
    }
}

/// In-memory conversation ledger keyed by conversation key
///
/// Sharded so that different conversations never contend on one lock.
/// Nothing is persisted; a restart starts from an empty ledger.
#[derive(Debug, Default)]
pub struct ConversationStore {
    entries: DashMap<String, Conversation>,
}

impl ConversationStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a conversation
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Conversation> {
        self.entries.get(key).map(|entry| *entry)
    }

    /// Insert or replace a conversation
    pub fn set(&self, key: &str, conversation: Conversation) {
        self.entries.insert(key.to_string(), conversation);
    }

    /// Apply `f` to the stored conversation, creating a default one first if absent
    pub fn update<F>(&self, key: &str, f: F) -> Conversation
    where
        F: FnOnce(&mut Conversation),
    {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        f(&mut entry);
        *entry
    }

    /// Forget a conversation. Returns whether it was tracked.
    pub fn clear(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Forget every conversation
    pub fn clear_all(&self) {
        self.entries.clear();
    }

    /// Number of tracked conversations
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether no conversation is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
