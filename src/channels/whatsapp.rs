//! `WhatsApp` channel adapter
//!
//! Uses the `WhatsApp` Business Cloud API for sending. Incoming messages
//! arrive through the webhook endpoint and are mapped here to
//! [`InboundMessage`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{MessageSender, OwnerIdentity, normalize_number};
use crate::config::WhatsAppConfig;
use crate::engine::InboundMessage;
use crate::{Error, Result};

/// Cloud API request timeout
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Object type of Business Account webhook deliveries
const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// `WhatsApp` channel adapter
pub struct WhatsAppChannel {
    /// Business API access token
    access_token: SecretString,
    /// Phone number ID for sending messages
    phone_number_id: String,
    /// Graph API base URL
    api_base_url: String,
    client: Client,
}

impl WhatsAppChannel {
    /// Create a new `WhatsApp` channel adapter
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        access_token: SecretString,
        phone_number_id: String,
        api_base_url: String,
    ) -> Result<Self> {
        let client = Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            access_token,
            phone_number_id,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the access token or phone number ID is missing
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self> {
        let Some(access_token) = config.access_token.clone() else {
            return Err(Error::Config("WhatsApp access token required (WHATSAPP_TOKEN)".to_string()));
        };
        let Some(phone_number_id) = config.phone_number_id.clone().filter(|id| !id.is_empty())
        else {
            return Err(Error::Config(
                "WhatsApp phone number ID required (WHATSAPP_PHONE_ID)".to_string(),
            ));
        };

        Self::new(access_token, phone_number_id, config.api_base_url.clone())
    }

    /// Messages endpoint for the configured phone number
    #[must_use]
    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.api_base_url, self.phone_number_id)
    }

    /// Send a text message to a `WhatsApp` number
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": {
                "body": text
            }
        });

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Channel(format!("WhatsApp API error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Channel(format!(
                "WhatsApp API error: {status} - {body}"
            )));
        }

        // Delivery already succeeded; the body only carries the message id
        let message_id = match response.text().await {
            Ok(body) => SendResponse::message_id(&body),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read WhatsApp send response");
                None
            }
        };

        tracing::debug!(to, message_id = ?message_id, "WhatsApp message sent");
        Ok(())
    }
}

/// Cloud API send response
#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

impl SendResponse {
    /// Id of the first sent message, if the body names one
    fn message_id(body: &str) -> Option<String> {
        serde_json::from_str::<Self>(body)
            .ok()
            .and_then(|sent| sent.messages.into_iter().next())
            .map(|m| m.id)
    }
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[async_trait]
impl MessageSender for WhatsAppChannel {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, recipient_id: &str, body: &str) -> Result<()> {
        self.send_text(recipient_id, body).await
    }
}

/// Inbound event mapped from a webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Engine input
    pub message: InboundMessage,
    /// Contact display name (falls back to the sender number)
    pub sender_name: String,
}

/// `WhatsApp` webhook payload from Cloud API
///
/// Every field is optional so that a partial payload still deserializes;
/// incomplete messages are classified as non-text by the engine.
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppWebhook {
    /// Object type, `whatsapp_business_account` for message deliveries
    #[serde(default)]
    pub object: Option<String>,
    /// Webhook entries
    #[serde(default)]
    pub entry: Vec<WhatsAppWebhookEntry>,
}

impl WhatsAppWebhook {
    /// Parse a webhook request body
    ///
    /// # Errors
    ///
    /// Returns error if the body is not a JSON webhook payload
    pub fn parse(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Whether this delivery comes from a Business Account
    #[must_use]
    pub fn is_business_account(&self) -> bool {
        self.object.as_deref() == Some(BUSINESS_ACCOUNT_OBJECT)
    }

    /// Map every message in the delivery to engine input
    ///
    /// `messages` changes become contact messages keyed by sender number.
    /// `smb_message_echoes` changes (messages the owner sent from the
    /// business app) become owner-activity events for the recipient's
    /// conversation.
    #[must_use]
    pub fn inbound_events(&self, owner: &OwnerIdentity, received_at: i64) -> Vec<WebhookEvent> {
        let mut events = Vec::new();

        for change in self.entry.iter().flat_map(|e| &e.changes) {
            match change.field.as_deref() {
                Some("messages") => {
                    for msg in change.value.messages.iter().flatten() {
                        events.push(change.value.contact_event(msg, owner, received_at));
                    }
                }
                Some("smb_message_echoes") => {
                    for echo in change.value.message_echoes.iter().flatten() {
                        events.push(WhatsAppWebhookValue::owner_echo_event(echo, owner, received_at));
                    }
                }
                other => {
                    tracing::debug!(field = ?other, "ignoring webhook change");
                }
            }
        }

        events
    }
}

/// `WhatsApp` webhook entry
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppWebhookEntry {
    /// Changes in this entry
    #[serde(default)]
    pub changes: Vec<WhatsAppWebhookChange>,
}

/// `WhatsApp` webhook change
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppWebhookChange {
    /// Subscription field (`messages`, `smb_message_echoes`, ...)
    #[serde(default)]
    pub field: Option<String>,
    /// The change value
    #[serde(default)]
    pub value: WhatsAppWebhookValue,
}

/// `WhatsApp` webhook value
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppWebhookValue {
    /// Receiving business number
    pub metadata: Option<WhatsAppMetadata>,
    /// Sender profiles
    pub contacts: Option<Vec<WhatsAppContact>>,
    /// Incoming messages (if any)
    pub messages: Option<Vec<WhatsAppMessage>>,
    /// Messages sent by the owner from the business app
    pub message_echoes: Option<Vec<WhatsAppMessage>>,
}

impl WhatsAppWebhookValue {
    fn contact_event(&self, msg: &WhatsAppMessage, owner: &OwnerIdentity, received_at: i64) -> WebhookEvent {
        let from = msg.from.clone().unwrap_or_default();
        let body = msg.text.as_ref().map(|t| t.body.clone());

        let sender_is_self = self
            .metadata
            .as_ref()
            .and_then(|m| m.display_phone_number.as_deref())
            .is_some_and(|own| !from.is_empty() && normalize_number(own) == normalize_number(&from));

        let sender_name = self
            .contacts
            .iter()
            .flatten()
            .find(|c| c.wa_id.as_deref() == Some(from.as_str()))
            .and_then(|c| c.profile.as_ref())
            .and_then(|p| p.name.clone())
            .unwrap_or_else(|| from.clone());

        WebhookEvent {
            message: InboundMessage {
                conversation_key: from.clone(),
                sender_id: from.clone(),
                sender_is_owner: owner.is_owner(&from),
                sender_is_self,
                is_text_type: msg.message_type.as_deref() == Some("text") && body.is_some(),
                text_body: body,
                timestamp: received_at,
            },
            sender_name,
        }
    }

    fn owner_echo_event(echo: &WhatsAppMessage, owner: &OwnerIdentity, received_at: i64) -> WebhookEvent {
        let to = echo.to.clone().unwrap_or_default();
        let owner_id = owner
            .number()
            .map(ToString::to_string)
            .or_else(|| echo.from.clone())
            .unwrap_or_default();

        // Any owner message counts as activity, whatever its media type
        let mut message = InboundMessage::owner_activity(&to, &owner_id, received_at);
        message.text_body = echo.text.as_ref().map(|t| t.body.clone());

        WebhookEvent {
            message,
            sender_name: "owner".to_string(),
        }
    }
}

/// Business number the webhook was delivered to
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppMetadata {
    pub display_phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

/// Sender profile
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppContact {
    pub wa_id: Option<String>,
    pub profile: Option<WhatsAppProfile>,
}

/// Sender profile details
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppProfile {
    pub name: Option<String>,
}

/// `WhatsApp` message
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppMessage {
    /// Sender phone number
    pub from: Option<String>,
    /// Recipient phone number (echoes only)
    pub to: Option<String>,
    /// Message ID
    pub id: Option<String>,
    /// Message timestamp (epoch seconds, as a string)
    pub timestamp: Option<String>,
    /// Message type
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    /// Text content (for text messages)
    pub text: Option<WhatsAppTextContent>,
}

/// `WhatsApp` text message content
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppTextContent {
    /// Message body
    pub body: String,
}
