//! Provider-independent inbound event

/// An inbound message, already mapped from the provider payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Stable key of the conversation this message belongs to
    pub conversation_key: String,

    /// Sender identifier; automatic replies go here
    pub sender_id: String,

    /// Sender is the account owner
    pub sender_is_owner: bool,

    /// Sender is this bot itself
    pub sender_is_self: bool,

    /// Message is plain text
    pub is_text_type: bool,

    /// Text body, if any
    pub text_body: Option<String>,

    /// Epoch milliseconds when the message was received
    pub timestamp: i64,
}

impl InboundMessage {
    /// A text message from a regular contact
    #[must_use]
    pub fn text(conversation_key: &str, sender_id: &str, body: &str, timestamp: i64) -> Self {
        Self {
            conversation_key: conversation_key.to_string(),
            sender_id: sender_id.to_string(),
            sender_is_owner: false,
            sender_is_self: false,
            is_text_type: true,
            text_body: Some(body.to_string()),
            timestamp,
        }
    }

    /// A synthetic "owner wrote into this conversation" event
    #[must_use]
    pub fn owner_activity(conversation_key: &str, owner_id: &str, timestamp: i64) -> Self {
        Self {
            conversation_key: conversation_key.to_string(),
            sender_id: owner_id.to_string(),
            sender_is_owner: true,
            sender_is_self: false,
            is_text_type: true,
            text_body: None,
            timestamp,
        }
    }

    /// Missing identifiers make a message unusable for any decision
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.conversation_key.trim().is_empty() || self.sender_id.trim().is_empty()
    }
}
