//! Owner takeover and reactivation
//!
//! Owner activity in a conversation silences the bot there until the
//! reactivation time has passed since the most recent owner activity.
//! Expiry is detected lazily, on the next inbound user message.

use super::elapsed_ms;
use super::store::ConversationStore;

/// Reactivation rules applied to a conversation store
#[derive(Debug, Clone, Copy)]
pub struct ReactivationPolicy<'a> {
    store: &'a ConversationStore,
}

impl<'a> ReactivationPolicy<'a> {
    /// Apply the policy to `store`
    #[must_use]
    pub const fn new(store: &'a ConversationStore) -> Self {
        Self { store }
    }

    /// Record that the owner wrote into conversation `key` at `now`
    ///
    /// Clears the responded flag so the bot may reply again once the
    /// conversation reactivates. The recorded timestamp never moves
    /// backwards, so an out-of-order event cannot shorten suppression.
    pub fn record_owner_activity(&self, key: &str, now: i64) {
        let conversation = self.store.update(key, |c| {
            c.responded = false;
            c.last_owner_activity_at = Some(c.last_owner_activity_at.map_or(now, |t| t.max(now)));
        });

        tracing::debug!(
            conversation = key,
            last_owner_activity_at = ?conversation.last_owner_activity_at,
            "owner activity recorded"
        );
    }

    /// Whether the bot must stay silent in `key` because of owner activity
    ///
    /// When the reactivation time has elapsed the conversation is dropped
    /// entirely, so the next message is handled as a brand-new conversation.
    pub fn check_owner_recent_activity(&self, key: &str, now: i64, reactivation_time_ms: u64) -> bool {
        let Some(last) = self
            .store
            .get(key)
            .and_then(|c| c.last_owner_activity_at)
        else {
            return false;
        };

        if elapsed_ms(now, last) >= reactivation_time_ms {
            self.store.clear(key);
            tracing::info!(conversation = key, "bot reactivated for conversation");
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::store::Conversation;

    const REACTIVATION: u64 = 1_800_000;

    #[test]
    fn test_no_owner_activity_is_not_suppressed() {
        let store = ConversationStore::new();
        let policy = ReactivationPolicy::new(&store);

        assert!(!policy.check_owner_recent_activity("a", 0, REACTIVATION));

        store.set("a", Conversation::replied());
        assert!(!policy.check_owner_recent_activity("a", 0, REACTIVATION));
        assert_eq!(store.get("a"), Some(Conversation::replied()));
    }

    #[test]
    fn test_owner_activity_resets_responded() {
        let store = ConversationStore::new();
        store.set("a", Conversation::replied());

        ReactivationPolicy::new(&store).record_owner_activity("a", 500);

        assert_eq!(
            store.get("a"),
            Some(Conversation {
                responded: false,
                last_owner_activity_at: Some(500),
            })
        );
    }

    #[test]
    fn test_suppressed_until_reactivation_time() {
        let store = ConversationStore::new();
        let policy = ReactivationPolicy::new(&store);
        policy.record_owner_activity("a", 0);

        assert!(policy.check_owner_recent_activity("a", 1_000, REACTIVATION));
        assert!(policy.check_owner_recent_activity("a", 1_799_999, REACTIVATION));
        assert_eq!(store.size(), 1);

        assert!(!policy.check_owner_recent_activity("a", 1_800_000, REACTIVATION));
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_new_activity_extends_suppression() {
        let store = ConversationStore::new();
        let policy = ReactivationPolicy::new(&store);
        policy.record_owner_activity("a", 0);
        policy.record_owner_activity("a", 1_000_000);

        assert!(policy.check_owner_recent_activity("a", 1_800_001, REACTIVATION));
    }

    #[test]
    fn test_stale_activity_never_shortens_suppression() {
        let store = ConversationStore::new();
        let policy = ReactivationPolicy::new(&store);
        policy.record_owner_activity("a", 1_000_000);
        policy.record_owner_activity("a", 10);

        assert_eq!(
            store.get("a").and_then(|c| c.last_owner_activity_at),
            Some(1_000_000)
        );
    }
}
