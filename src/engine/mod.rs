//! Auto-reply decision engine
//!
//! Classifies every inbound message into an [`Action`]. The engine never
//! talks to the network: a reply is returned as a [`SendEffect`] for the
//! caller to deliver.
//!
//! Decision order (first match wins):
//!
//! 1. non-text or malformed message -> [`Action::IgnoreNonText`]
//! 2. sent by the bot itself -> [`Action::IgnoreSelf`]
//! 3. sent by the owner -> record owner activity, [`Action::IgnoreOwner`]
//! 4. bot toggled off -> [`Action::SuppressInactive`]
//! 5. owner active recently -> [`Action::SuppressOwnerActive`]
//! 6. rate limit exceeded -> [`Action::SuppressSpam`]
//! 7. already replied -> [`Action::SuppressAlreadyResponded`]
//! 8. otherwise -> mark responded, [`Action::Reply`]

mod locks;
mod message;
mod reactivation;
mod spam;
mod store;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

pub use locks::KeyedLocks;
pub use message::InboundMessage;
pub use reactivation::ReactivationPolicy;
pub use spam::{RateWindow, SpamGuard};
pub use store::{Conversation, ConversationStore};

use crate::config::{ResponderConfig, ResponderUpdate};
use crate::Result;

/// Outcome of processing one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Send the automatic reply
    Reply,
    /// Not a text message, or missing required fields
    IgnoreNonText,
    /// Message sent by the bot itself
    IgnoreSelf,
    /// Message sent by the owner
    IgnoreOwner,
    /// Automatic replies are toggled off
    SuppressInactive,
    /// The owner is handling this conversation
    SuppressOwnerActive,
    /// Too many messages in the current spam window
    SuppressSpam,
    /// A reply was already sent in this conversation
    SuppressAlreadyResponded,
}

impl Action {
    /// Stable reason code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reply => "reply",
            Self::IgnoreNonText => "ignore_non_text",
            Self::IgnoreSelf => "ignore_self",
            Self::IgnoreOwner => "ignore_owner",
            Self::SuppressInactive => "suppress_inactive",
            Self::SuppressOwnerActive => "suppress_owner_active",
            Self::SuppressSpam => "suppress_spam",
            Self::SuppressAlreadyResponded => "suppress_already_responded",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply the caller should deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendEffect {
    pub conversation_key: String,
    pub recipient_id: String,
    pub body: String,
}

/// Action plus the side effect it requires, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub effect: Option<SendEffect>,
}

impl Decision {
    const fn skip(action: Action) -> Self {
        Self {
            action,
            effect: None,
        }
    }
}

/// Point-in-time view for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub active: bool,
    pub tracked_conversations: usize,
}

/// Per-conversation response state machine
#[derive(Debug)]
pub struct ResponseEngine {
    settings: RwLock<ResponderConfig>,
    active: AtomicBool,
    conversations: ConversationStore,
    spam: SpamGuard,
    locks: KeyedLocks,
}

impl ResponseEngine {
    /// Create an engine with empty stores
    ///
    /// # Errors
    ///
    /// Returns error if the thresholds are invalid
    pub fn new(settings: ResponderConfig) -> Result<Self> {
        Self::with_stores(settings, ConversationStore::new(), SpamGuard::new())
    }

    /// Create an engine over the given stores
    ///
    /// # Errors
    ///
    /// Returns error if the thresholds are invalid
    pub fn with_stores(
        settings: ResponderConfig,
        conversations: ConversationStore,
        spam: SpamGuard,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            settings: RwLock::new(settings),
            active: AtomicBool::new(true),
            conversations,
            spam,
            locks: KeyedLocks::new(),
        })
    }

    /// Classify `message`, updating conversation state
    ///
    /// Calls for the same conversation are serialized; the responded flag is
    /// already stored when a [`Action::Reply`] decision is returned.
    pub fn decide(&self, message: &InboundMessage) -> Decision {
        let decision = self.classify(message);

        tracing::debug!(
            conversation = %message.conversation_key,
            sender = %message.sender_id,
            action = %decision.action,
            "message classified"
        );

        decision
    }

    fn classify(&self, message: &InboundMessage) -> Decision {
        if !message.is_text_type || message.is_malformed() {
            return Decision::skip(Action::IgnoreNonText);
        }

        if message.sender_is_self {
            return Decision::skip(Action::IgnoreSelf);
        }

        let key = message.conversation_key.as_str();
        let now = message.timestamp;

        if message.sender_is_owner {
            self.locks.with_lock(key, || {
                self.reactivation().record_owner_activity(key, now);
            });
            return Decision::skip(Action::IgnoreOwner);
        }

        if !self.is_active() {
            return Decision::skip(Action::SuppressInactive);
        }

        let settings = self.settings();

        self.locks.with_lock(key, || {
            if self
                .reactivation()
                .check_owner_recent_activity(key, now, settings.reactivation_time_ms)
            {
                return Decision::skip(Action::SuppressOwnerActive);
            }

            if self
                .spam
                .is_spam(key, now, settings.spam_limit, settings.spam_time_window_ms)
            {
                return Decision::skip(Action::SuppressSpam);
            }

            if self.conversations.get(key).is_some_and(|c| c.responded) {
                return Decision::skip(Action::SuppressAlreadyResponded);
            }

            self.conversations.set(key, Conversation::replied());

            Decision {
                action: Action::Reply,
                effect: Some(SendEffect {
                    conversation_key: key.to_string(),
                    recipient_id: message.sender_id.clone(),
                    body: settings.auto_response_message.clone(),
                }),
            }
        })
    }

    /// Record owner activity outside the message stream
    pub fn record_owner_activity(&self, key: &str, now: i64) {
        self.locks.with_lock(key, || {
            self.reactivation().record_owner_activity(key, now);
        });
    }

    const fn reactivation(&self) -> ReactivationPolicy<'_> {
        ReactivationPolicy::new(&self.conversations)
    }

    /// Flip the active flag, returning the new value
    pub fn toggle_active(&self) -> bool {
        let active = !self.active.fetch_xor(true, Ordering::SeqCst);
        tracing::info!(active, "automatic replies toggled");
        active
    }

    /// Whether automatic replies are enabled
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Forget every conversation's response state
    ///
    /// Spam windows are left alone; they expire on their own.
    pub fn clear_all_conversation_state(&self) {
        self.conversations.clear_all();
        tracing::info!("conversation state cleared");
    }

    /// Current status
    #[must_use]
    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            active: self.is_active(),
            tracked_conversations: self.conversations.size(),
        }
    }

    /// Copy of the current settings
    #[must_use]
    pub fn settings(&self) -> ResponderConfig {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace settings atomically
    ///
    /// # Errors
    ///
    /// Returns error if the updated settings are invalid; current settings
    /// are left unchanged in that case
    pub fn reconfigure(&self, update: &ResponderUpdate) -> Result<ResponderConfig> {
        let mut settings = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let updated = settings.apply(update)?;
        *settings = updated.clone();

        tracing::info!(
            spam_limit = updated.spam_limit,
            spam_time_window_ms = updated.spam_time_window_ms,
            reactivation_time_ms = updated.reactivation_time_ms,
            "responder reconfigured"
        );

        Ok(updated)
    }

    /// Drop spam windows and locks idle for longer than the spam window
    pub fn prune(&self, now: i64) -> usize {
        let idle = self.settings().spam_time_window_ms;
        let windows = self.spam.prune_idle(now, idle);
        self.locks.prune_unused();
        windows
    }

    /// Conversation state for `key`
    #[must_use]
    pub fn conversation(&self, key: &str) -> Option<Conversation> {
        self.conversations.get(key)
    }

    /// Spam window for `key`
    #[must_use]
    pub fn rate_window(&self, key: &str) -> Option<RateWindow> {
        self.spam.window(key)
    }
}

/// Current wall-clock time in epoch milliseconds
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Milliseconds from `since` to `now`; zero if the clock went backwards
pub(crate) fn elapsed_ms(now: i64, since: i64) -> u64 {
    u64::try_from(now.saturating_sub(since)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ResponseEngine {
        ResponseEngine::new(ResponderConfig::default()).unwrap()
    }

    fn user(key: &str, t: i64) -> InboundMessage {
        InboundMessage::text(key, key, "oi", t)
    }

    #[test]
    fn test_first_message_replies_with_configured_text() {
        let engine = engine();
        let decision = engine.decide(&user("5511", 0));

        assert_eq!(decision.action, Action::Reply);
        let effect = decision.effect.unwrap();
        assert_eq!(effect.recipient_id, "5511");
        assert_eq!(effect.body, ResponderConfig::default().auto_response_message);
        assert_eq!(engine.conversation("5511"), Some(Conversation::replied()));
    }

    #[test]
    fn test_non_text_is_ignored_before_anything_else() {
        let engine = engine();
        let mut message = user("5511", 0);
        message.is_text_type = false;
        message.sender_is_owner = true;

        assert_eq!(engine.decide(&message).action, Action::IgnoreNonText);
        assert!(engine.conversation("5511").is_none());
    }

    #[test]
    fn test_malformed_message_is_ignored() {
        let engine = engine();
        let message = InboundMessage::text("", "5511", "oi", 0);

        let decision = engine.decide(&message);
        assert_eq!(decision.action, Action::IgnoreNonText);
        assert!(decision.effect.is_none());
    }

    #[test]
    fn test_self_message_touches_nothing() {
        let engine = engine();
        let mut message = user("5511", 0);
        message.sender_is_self = true;
        message.sender_is_owner = true;

        assert_eq!(engine.decide(&message).action, Action::IgnoreSelf);
        assert!(engine.conversation("5511").is_none());
        assert!(engine.rate_window("5511").is_none());
    }

    #[test]
    fn test_owner_message_is_never_answered() {
        let engine = engine();
        let owner = InboundMessage::owner_activity("5511", "owner", 0);

        let decision = engine.decide(&owner);
        assert_eq!(decision.action, Action::IgnoreOwner);
        assert!(decision.effect.is_none());
        assert!(engine.rate_window("5511").is_none());
    }

    #[test]
    fn test_inactive_suppresses_without_counting() {
        let engine = engine();
        assert!(!engine.toggle_active());

        assert_eq!(engine.decide(&user("5511", 0)).action, Action::SuppressInactive);
        assert!(engine.rate_window("5511").is_none());

        // Owner activity is still recorded while inactive
        engine.decide(&InboundMessage::owner_activity("5511", "owner", 0));
        assert!(engine.conversation("5511").is_some());

        assert!(engine.toggle_active());
    }

    #[test]
    fn test_reconfigure_changes_reply_text() {
        let engine = engine();
        engine
            .reconfigure(&ResponderUpdate {
                auto_response_message: Some("back soon".to_string()),
                ..ResponderUpdate::default()
            })
            .unwrap();

        let effect = engine.decide(&user("5511", 0)).effect.unwrap();
        assert_eq!(effect.body, "back soon");
    }

    #[test]
    fn test_invalid_reconfigure_keeps_settings() {
        let engine = engine();
        let result = engine.reconfigure(&ResponderUpdate {
            spam_limit: Some(0),
            ..ResponderUpdate::default()
        });

        assert!(result.is_err());
        assert_eq!(engine.settings(), ResponderConfig::default());
    }

    #[test]
    fn test_prune_drops_idle_windows() {
        let engine = engine();
        engine.decide(&user("5511", 0));

        assert_eq!(engine.prune(10 * 60_000), 1);
        assert!(engine.rate_window("5511").is_none());
        // Response state survives pruning
        assert!(engine.conversation("5511").is_some());
    }

    #[test]
    fn test_action_reason_codes() {
        assert_eq!(Action::SuppressAlreadyResponded.to_string(), "suppress_already_responded");
        assert_eq!(
            serde_json::to_value(Action::IgnoreNonText).unwrap(),
            serde_json::json!("ignore_non_text")
        );
    }

    #[test]
    fn test_elapsed_never_negative() {
        assert_eq!(elapsed_ms(10, 20), 0);
        assert_eq!(elapsed_ms(20, 10), 10);
    }
}
