//! Messaging channel adapters
//!
//! A channel maps provider payloads to [`InboundMessage`](crate::engine::InboundMessage)
//! and delivers automatic replies through [`MessageSender`].

mod whatsapp;

use async_trait::async_trait;

pub use whatsapp::{
    WebhookEvent, WhatsAppChannel, WhatsAppContact, WhatsAppMessage, WhatsAppMetadata,
    WhatsAppProfile, WhatsAppTextContent, WhatsAppWebhook, WhatsAppWebhookChange,
    WhatsAppWebhookEntry, WhatsAppWebhookValue,
};

use crate::Result;

/// Outbound delivery collaborator
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Channel name for logging
    fn name(&self) -> &'static str;

    /// Deliver `body` to `recipient_id`
    async fn send(&self, recipient_id: &str, body: &str) -> Result<()>;
}

/// Decides whether a sender identifier belongs to the account owner
#[derive(Debug, Clone, Default)]
pub struct OwnerIdentity {
    owner: Option<String>,
}

impl OwnerIdentity {
    /// Identity for the given owner number, if known
    #[must_use]
    pub fn new(owner_number: Option<&str>) -> Self {
        Self {
            owner: owner_number.map(normalize_number).filter(|n| !n.is_empty()),
        }
    }

    /// Whether `sender` is the owner
    #[must_use]
    pub fn is_owner(&self, sender: &str) -> bool {
        self.owner
            .as_deref()
            .is_some_and(|owner| owner == normalize_number(sender))
    }

    /// Owner number, normalized
    #[must_use]
    pub fn number(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// Reduce a phone number to its digits (`+55 (11) 9999-0000` -> `551199990000`)
#[must_use]
pub fn normalize_number(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number("+55 (11) 9999-0000"), "551199990000");
        assert_eq!(normalize_number("5511"), "5511");
    }

    #[test]
    fn test_owner_identity() {
        let identity = OwnerIdentity::new(Some("+55 11 99999-0000"));
        assert!(identity.is_owner("5511999990000"));
        assert!(!identity.is_owner("5511888880000"));

        let unknown = OwnerIdentity::new(None);
        assert!(!unknown.is_owner("5511999990000"));
        assert!(!OwnerIdentity::new(Some("")).is_owner(""));
    }
}
